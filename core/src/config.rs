use crate::{
    clock::TimeOfDay,
    error::{GameError, GameResult},
    time_data::TimeData,
    types::ItemId,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClockConfig {
    /// Clock ticks per in-game minute.
    pub ticks_per_minute: u32,
    /// Clock ticks per external update (time passage speed).
    pub ticks_per_update: u32,
    /// Time on a fresh save.
    pub start: TimeData,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            ticks_per_minute: 60,
            ticks_per_update: 1,
            start:            TimeData::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlayerConfig {
    /// Frames locked while picking up or putting down an item.
    pub pickup_delay:     u32,
    /// Frames before the player may move again after a conversation.
    pub talk_exit_delay:  u32,
    /// Frames of jump squat before leaving the ground.
    pub jump_squat_ticks: u32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            pickup_delay:     6,
            talk_exit_delay:  4,
            jump_squat_ticks: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NpcConfig {
    /// Frames before an NPC returns to its previous state after talking.
    pub talk_exit_delay: u32,
}

impl Default for NpcConfig {
    fn default() -> Self {
        Self { talk_exit_delay: 4 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ItemData {
    pub id:          ItemId,
    pub name:        String,
    pub description: String,
    pub buy_price:   i64,
    /// Relative chance of being rolled into a shop's stock.
    pub weight:      u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ShopConfig {
    pub stock_size:          usize,
    pub open_lock_ticks:     u32,
    pub browse_lock_ticks:   u32,
    pub purchase_lock_ticks: u32,
    pub catalog:             Vec<ItemData>,
}

impl Default for ShopConfig {
    fn default() -> Self {
        Self {
            stock_size:          5,
            open_lock_ticks:     3,
            browse_lock_ticks:   9,
            purchase_lock_ticks: 16,
            catalog:             default_catalog(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WakeOption {
    pub segment: TimeOfDay,
    pub hour:    u32,
    pub minute:  u32,
    pub label:   String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SleepConfig {
    pub wake_options: Vec<WakeOption>,
}

impl Default for SleepConfig {
    fn default() -> Self {
        let option = |segment: TimeOfDay, label: &str| WakeOption {
            segment,
            hour: segment.start_hour(),
            minute: 0,
            label: label.into(),
        };
        Self {
            wake_options: vec![
                option(TimeOfDay::Dawn, "Until dawn"),
                option(TimeOfDay::Morning, "Until morning"),
                option(TimeOfDay::Evening, "Until evening"),
                option(TimeOfDay::Night, "Until night"),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GameConfig {
    pub seed:   u64,
    pub clock:  ClockConfig,
    pub player: PlayerConfig,
    pub npc:    NpcConfig,
    pub shop:   ShopConfig,
    pub sleep:  SleepConfig,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            seed:   42,
            clock:  ClockConfig::default(),
            player: PlayerConfig::default(),
            npc:    NpcConfig::default(),
            shop:   ShopConfig::default(),
            sleep:  SleepConfig::default(),
        }
    }
}

impl GameConfig {
    /// Load from a JSON file. Missing sections fall back to defaults.
    /// In tests, use GameConfig::default_test().
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: GameConfig = serde_json::from_str(&content)?;
        config.validate()?;
        log::info!("config loaded from {path}");
        Ok(config)
    }

    pub fn validate(&self) -> GameResult<()> {
        if self.clock.ticks_per_minute == 0 {
            return Err(GameError::InvalidConfig("clock.ticks_per_minute must be > 0".into()));
        }
        self.clock.start.validate()?;
        if self.shop.catalog.iter().any(|item| item.weight == 0) {
            return Err(GameError::InvalidConfig("shop.catalog weights must be > 0".into()));
        }
        for option in &self.sleep.wake_options {
            TimeData::new(0, option.hour, option.minute)?;
        }
        Ok(())
    }

    /// Config with hardcoded defaults for use in tests.
    /// One tick per in-game minute keeps hour boundaries 60 ticks apart.
    pub fn default_test() -> Self {
        Self {
            seed: 7,
            clock: ClockConfig {
                ticks_per_minute: 1,
                ..ClockConfig::default()
            },
            ..Self::default()
        }
    }
}

fn default_catalog() -> Vec<ItemData> {
    let item = |id: ItemId, name: &str, description: &str, buy_price: i64, weight: u32| ItemData {
        id,
        name: name.into(),
        description: description.into(),
        buy_price,
        weight,
    };
    vec![
        item(1, "Apple", "Crisp and a little sour.", 15, 30),
        item(2, "Rope", "Twelve feet of hemp.", 40, 20),
        item(3, "Lantern", "Keeps the night at bay.", 120, 10),
        item(4, "Fishing Rod", "Bamboo, slightly bent.", 200, 8),
        item(5, "Tea Leaves", "Smells like rain.", 25, 25),
        item(6, "Map Fragment", "Part of something bigger.", 350, 4),
        item(7, "Bread", "Baked this morning.", 10, 30),
        item(8, "Paint Brush", "Bristles still stiff.", 60, 12),
    ]
}
