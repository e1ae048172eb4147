//! Shops: a small daily stock, browsed and bought from in a locked-step menu.
//!
//! RULES:
//!   - Stock is rolled on first load and at the start of every day, from
//!     the entity's own RNG stream for that day.
//!   - A roll never repeats an item and avoids yesterday's items whenever
//!     the catalog is large enough to do so.
//!   - Every menu input locks the shop for a few frames.

use crate::{
    config::{ItemData, ShopConfig},
    error::GameResult,
    event::GameEvent,
    interaction::{InteractionPrompt, PromptEdge},
    save::SaveData,
    state_machine::{StateLabel, StateMachine, Transitioned},
    time_affected::{EntityContext, EventBuffer, TimeAffected, TimeTracker},
    types::{EntityId, ItemId, Position},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShopAction {
    Idle,
    Locked,
}

impl StateLabel for ShopAction {
    fn label(&self) -> &'static str {
        match self {
            Self::Idle   => "idle",
            Self::Locked => "locked",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockSlot {
    Available(ItemId),
    SoldOut,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PurchaseOutcome {
    Bought { item_id: ItemId, price: i64 },
    SoldOut,
    InsufficientFunds { price: i64, money: i64 },
    /// The menu is closed or still locked from the last input.
    Unavailable,
}

pub struct Shop {
    tracker:  TimeTracker,
    config:   ShopConfig,
    action:   StateMachine<ShopAction>,
    stock:    Vec<StockSlot>,
    selected: usize,
    open:     bool,
    prompt:   InteractionPrompt,
    events:   EventBuffer,
}

impl Shop {
    pub fn new(unique_id: impl Into<EntityId>, position: Position, config: &ShopConfig) -> Self {
        Self {
            tracker:  TimeTracker::new(unique_id).with_position(position),
            config:   config.clone(),
            action:   StateMachine::new(ShopAction::Idle),
            stock:    Vec::new(),
            selected: 0,
            open:     false,
            prompt:   InteractionPrompt::new(),
            events:   EventBuffer::default(),
        }
    }

    pub fn stock(&self) -> &[StockSlot] { &self.stock }
    pub fn selected(&self) -> usize { self.selected }
    pub fn is_open(&self) -> bool { self.open }
    pub fn action(&self) -> ShopAction { self.action.current() }

    /// Accepting menu input: open and not locked.
    pub fn is_ready(&self) -> bool {
        self.open && self.action.current() == ShopAction::Idle
    }

    /// Catalog entry under the cursor, if it has not sold out.
    pub fn selected_item(&self) -> Option<&ItemData> {
        match self.stock.get(self.selected)? {
            StockSlot::Available(id) => self.item(*id),
            StockSlot::SoldOut => None,
        }
    }

    pub fn item(&self, id: ItemId) -> Option<&ItemData> {
        self.config.catalog.iter().find(|item| item.id == id)
    }

    /// Sample the interaction prompt. Returns true when the player asked to
    /// open the shop; `GameSession::open_shop` does the opening.
    pub fn observe(&mut self, facing: bool, interact_pressed: bool, player_busy: bool) -> bool {
        let available = !self.open && self.action.current() == ShopAction::Idle;
        let outcome = self.prompt.observe(facing, interact_pressed, available, player_busy);
        let entity = self.tracker.unique_id.clone();
        match outcome.edge {
            Some(PromptEdge::Shown) => self.events.push(GameEvent::PromptShown { entity }),
            Some(PromptEdge::Hidden) => self.events.push(GameEvent::PromptHidden { entity }),
            None => {}
        }
        outcome.interact
    }

    /// Open the menu. The player is not touched; prefer
    /// `GameSession::open_shop`, which also holds the player still.
    pub fn open(&mut self) -> bool {
        if self.open {
            return false;
        }
        self.open = true;
        self.lock_for(self.config.open_lock_ticks);
        log::debug!("'{}' opened", self.tracker.unique_id);
        true
    }

    pub fn close(&mut self) -> bool {
        if !self.is_ready() {
            return false;
        }
        self.open = false;
        log::debug!("'{}' closed", self.tracker.unique_id);
        true
    }

    pub fn browse_right(&mut self) -> bool {
        self.browse(1)
    }

    pub fn browse_left(&mut self) -> bool {
        self.browse(-1)
    }

    fn browse(&mut self, step: isize) -> bool {
        if !self.is_ready() || self.stock.is_empty() {
            return false;
        }
        let len = self.stock.len() as isize;
        self.selected = (self.selected as isize + step).rem_euclid(len) as usize;
        self.lock_for(self.config.browse_lock_ticks);
        true
    }

    /// Try to buy the item under the cursor, paying from `money`.
    pub fn buy(&mut self, money: &mut i64) -> PurchaseOutcome {
        if !self.is_ready() {
            return PurchaseOutcome::Unavailable;
        }
        let Some(StockSlot::Available(item_id)) = self.stock.get(self.selected).copied() else {
            return PurchaseOutcome::SoldOut;
        };
        let Some(price) = self.item(item_id).map(|item| item.buy_price) else {
            log::warn!("'{}' stocks unknown item {item_id}", self.tracker.unique_id);
            return PurchaseOutcome::Unavailable;
        };
        if *money < price {
            return PurchaseOutcome::InsufficientFunds { price, money: *money };
        }

        *money -= price;
        self.stock[self.selected] = StockSlot::SoldOut;
        self.lock_for(self.config.purchase_lock_ticks);
        self.events.push(GameEvent::ItemPurchased {
            entity: self.tracker.unique_id.clone(),
            item_id,
            price,
        });
        PurchaseOutcome::Bought { item_id, price }
    }

    /// Roll a fresh stock for today.
    pub fn refresh_stock(&mut self, ctx: &mut EntityContext<'_>) {
        let yesterday: Vec<ItemId> = self
            .stock
            .iter()
            .filter_map(|slot| match slot {
                StockSlot::Available(id) => Some(*id),
                StockSlot::SoldOut => None,
            })
            .collect();

        let wanted = self.config.stock_size.min(self.config.catalog.len());
        let mut candidates: Vec<&ItemData> = self.config.catalog.iter().collect();
        let fresh = candidates.iter().filter(|item| !yesterday.contains(&item.id)).count();
        if fresh >= wanted {
            candidates.retain(|item| !yesterday.contains(&item.id));
        }

        let mut rng = ctx.rng_for(&self.tracker.unique_id);
        let mut picked = Vec::with_capacity(wanted);
        while picked.len() < wanted {
            let weights: Vec<u32> = candidates.iter().map(|item| item.weight).collect();
            let Some(index) = rng.weighted_index(&weights) else {
                break;
            };
            picked.push(candidates.swap_remove(index).id);
        }

        self.stock = picked.iter().copied().map(StockSlot::Available).collect();
        self.selected = 0;
        log::debug!("'{}' restocked for day {}: {picked:?}", self.tracker.unique_id, ctx.now().day);
        ctx.emit(GameEvent::ShopRestocked {
            entity: self.tracker.unique_id.clone(),
            day:    ctx.now().day,
            items:  picked,
        });
    }

    fn lock_for(&mut self, ticks: u32) {
        let t = self.action.transition(ShopAction::Locked);
        self.record(t);
        if let Some(t) = self.action.transition_after(ShopAction::Idle, ticks) {
            self.record(t);
        }
    }

    fn record(&mut self, t: Transitioned<ShopAction>) {
        let id = self.tracker.unique_id.clone();
        self.events.record_transition(&id, "action", t);
    }
}

impl TimeAffected for Shop {
    fn tracker(&self) -> &TimeTracker { &self.tracker }
    fn tracker_mut(&mut self) -> &mut TimeTracker { &mut self.tracker }

    fn on_new_day(&mut self, ctx: &mut EntityContext<'_>) -> GameResult<()> {
        self.tracker.restamp(ctx.now());
        self.refresh_stock(ctx);
        Ok(())
    }

    fn on_first_load(&mut self, ctx: &mut EntityContext<'_>) -> GameResult<()> {
        self.tracker.restamp(ctx.now());
        self.refresh_stock(ctx);
        Ok(())
    }

    fn update(&mut self, ctx: &mut EntityContext<'_>) -> GameResult<()> {
        if let Some(t) = self.action.tick() {
            self.record(t);
        }
        self.events.flush(ctx);
        Ok(())
    }

    fn copy_to_save(&self, save: &mut SaveData) -> GameResult<()> {
        if let Some(record) = self.tracker.record() {
            save.write_entity(&self.tracker.unique_id, record);
        }
        save.set_extra(&self.tracker.unique_id, &self.stock)
    }

    fn load_from_save(&mut self, save: &SaveData) -> GameResult<bool> {
        let found = self.tracker.load_record(save, true);
        if let Some(stock) = save.extra::<Vec<StockSlot>>(&self.tracker.unique_id) {
            self.stock = stock;
            self.selected = 0;
        }
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{rng::RngBank, time_data::TimeData};

    fn restocked(config: &ShopConfig, day: u32) -> Shop {
        let bank = RngBank::new(1);
        let mut events = Vec::new();
        let now = TimeData::new(day, 6, 0).unwrap();
        let mut ctx = EntityContext::new(now, 0, &bank, &mut events);
        let mut shop = Shop::new("stall", [0.0; 3], config);
        shop.refresh_stock(&mut ctx);
        shop
    }

    #[test]
    fn stock_has_no_duplicates() {
        let shop = restocked(&ShopConfig::default(), 1);
        let mut ids: Vec<ItemId> = shop
            .stock()
            .iter()
            .filter_map(|s| match s {
                StockSlot::Available(id) => Some(*id),
                StockSlot::SoldOut => None,
            })
            .collect();
        assert_eq!(ids.len(), 5);
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 5);
    }

    #[test]
    fn stock_is_capped_by_catalog_size() {
        let mut config = ShopConfig::default();
        config.catalog.truncate(3);
        let shop = restocked(&config, 1);
        assert_eq!(shop.stock().len(), 3);
    }

    #[test]
    fn closed_shop_sells_nothing() {
        let mut shop = restocked(&ShopConfig::default(), 1);
        let mut money = 10_000;
        assert_eq!(shop.buy(&mut money), PurchaseOutcome::Unavailable);
        assert_eq!(money, 10_000);
    }
}
