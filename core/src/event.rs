//! Every event the gameplay core emits.
//!
//! RULE: The clock never calls entities directly. It returns its cascade
//! as events, in order, and the session broadcasts them. UI, audio and
//! tooling subscribe to the same events without the core knowing what a
//! sprite or a sound is.

use crate::{
    clock::TimeOfDay,
    time_data::TimeData,
    types::{EntityId, ItemId, SlotId, Tick},
};
use serde::{Deserialize, Serialize};

/// Variants are appended. Never remove or reorder them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEvent {
    // ── Clock cascade ──────────────────────────────
    MinuteChanged {
        time: TimeData,
    },
    HourChanged {
        time: TimeData,
    },
    TimeOfDayChanged {
        time:    TimeData,
        segment: TimeOfDay,
    },
    NewDayStarted {
        time: TimeData,
    },
    ClockFrozen {
        time: TimeData,
    },
    ClockUnfrozen {
        time: TimeData,
    },

    // ── Persistence ────────────────────────────────
    GameSaved {
        slot:     SlotId,
        time:     TimeData,
        entities: usize,
    },
    GameLoaded {
        slot: SlotId,
        time: TimeData,
    },

    // ── Entity lifecycle ───────────────────────────
    EntityFirstLoad {
        entity: EntityId,
        time:   TimeData,
    },
    EntityCaughtUp {
        entity:      EntityId,
        elapsed:     TimeData,
        hour_change: bool,
        new_day:     bool,
    },
    EntityClockRewound {
        entity:      EntityId,
        last_update: TimeData,
        now:         TimeData,
    },

    // ── State machines ─────────────────────────────
    StateTransitioned {
        entity:  EntityId,
        machine: String,
        from:    String,
        to:      String,
    },

    // ── Interaction ────────────────────────────────
    PromptShown {
        entity: EntityId,
    },
    PromptHidden {
        entity: EntityId,
    },

    // ── Shop ───────────────────────────────────────
    ShopRestocked {
        entity: EntityId,
        day:    u32,
        items:  Vec<ItemId>,
    },
    ItemPurchased {
        entity:  EntityId,
        item_id: ItemId,
        price:   i64,
    },
}

impl GameEvent {
    /// Stable string name, used for the event_type column in event_log.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::MinuteChanged { .. }      => "minute_changed",
            Self::HourChanged { .. }        => "hour_changed",
            Self::TimeOfDayChanged { .. }   => "time_of_day_changed",
            Self::NewDayStarted { .. }      => "new_day_started",
            Self::ClockFrozen { .. }        => "clock_frozen",
            Self::ClockUnfrozen { .. }      => "clock_unfrozen",
            Self::GameSaved { .. }          => "game_saved",
            Self::GameLoaded { .. }         => "game_loaded",
            Self::EntityFirstLoad { .. }    => "entity_first_load",
            Self::EntityCaughtUp { .. }     => "entity_caught_up",
            Self::EntityClockRewound { .. } => "entity_clock_rewound",
            Self::StateTransitioned { .. }  => "state_transitioned",
            Self::PromptShown { .. }        => "prompt_shown",
            Self::PromptHidden { .. }       => "prompt_hidden",
            Self::ShopRestocked { .. }      => "shop_restocked",
            Self::ItemPurchased { .. }      => "item_purchased",
        }
    }
}

/// The event log entry as persisted to SQLite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLogEntry {
    pub id:         Option<i64>,
    pub slot:       SlotId,
    pub tick:       Tick,
    pub source:     String,
    pub event_type: String,
    pub payload:    String, // JSON-serialized GameEvent
}
