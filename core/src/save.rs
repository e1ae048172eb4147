//! In-memory save data, keyed by entity unique id.
//!
//! Entities copy themselves in here during "save all"; the store writes
//! the whole thing to a slot afterwards. Reads never fail: a missing or
//! unreadable record simply means the entity has never been saved.

use crate::{
    error::GameResult,
    time_data::TimeData,
    types::{EntityId, Position},
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectRecord {
    pub last_update_time: TimeData,
    pub position:         Position,
    pub scene:            String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveData {
    pub time:       TimeData,
    pub time_speed: u32,
    pub money:      i64,
    pub objects:    BTreeMap<EntityId, ObjectRecord>,
    /// Per-entity extra state (e.g. a shop's stock), as JSON.
    pub extras:     BTreeMap<EntityId, serde_json::Value>,
}

impl Default for SaveData {
    fn default() -> Self {
        Self {
            time:       TimeData::default(),
            time_speed: 1,
            money:      0,
            objects:    BTreeMap::new(),
            extras:     BTreeMap::new(),
        }
    }
}

impl SaveData {
    pub fn read_entity_timestamp(&self, unique_id: &str) -> Option<TimeData> {
        self.objects.get(unique_id).map(|r| r.last_update_time)
    }

    pub fn record(&self, unique_id: &str) -> Option<&ObjectRecord> {
        self.objects.get(unique_id)
    }

    pub fn write_entity(&mut self, unique_id: &str, record: ObjectRecord) {
        self.objects.insert(unique_id.to_string(), record);
    }

    /// Forget an entity entirely, so it first-loads next time.
    pub fn remove_entity(&mut self, unique_id: &str) -> bool {
        self.extras.remove(unique_id);
        self.objects.remove(unique_id).is_some()
    }

    pub fn set_extra<T: Serialize>(&mut self, unique_id: &str, value: &T) -> GameResult<()> {
        self.extras.insert(unique_id.to_string(), serde_json::to_value(value)?);
        Ok(())
    }

    /// Decode an entity's extra state. An unreadable payload is logged and
    /// treated as absent.
    pub fn extra<T: DeserializeOwned>(&self, unique_id: &str) -> Option<T> {
        let value = self.extras.get(unique_id)?;
        match serde_json::from_value(value.clone()) {
            Ok(v) => Some(v),
            Err(e) => {
                log::warn!("discarding unreadable extra data for '{unique_id}': {e}");
                None
            }
        }
    }
}
