//! SQLite persistence layer.
//!
//! RULE: Only store.rs talks to the database.
//! The session hands over whole SaveData values. Nothing else executes SQL.

use crate::{
    error::GameResult,
    event::EventLogEntry,
    save::{ObjectRecord, SaveData},
    time_data::TimeData,
    types::Tick,
};
use rusqlite::{params, Connection, OptionalExtension};

#[derive(Debug, Clone, PartialEq)]
pub struct SlotSummary {
    pub slot:     String,
    pub time:     TimeData,
    pub money:    i64,
    pub saved_at: String,
}

pub struct GameStore {
    conn: Connection,
}

impl GameStore {
    /// Open (or create) the save database at `path`.
    pub fn open(path: &str) -> GameResult<Self> {
        let conn = Connection::open(path)?;
        // WAL mode only matters for real files; :memory: ignores it.
        if let Err(e) = conn.execute_batch("PRAGMA journal_mode=WAL;") {
            log::warn!("'{path}' stays in the default journal mode: {e}");
        }
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> GameResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> GameResult<()> {
        self.conn
            .execute_batch(include_str!("../../migrations/001_save_slots.sql"))?;
        Ok(())
    }

    // ── Save slots ─────────────────────────────────────────────

    /// Replace the contents of `slot` with `save`, atomically.
    pub fn write_save(&self, slot: &str, save: &SaveData) -> GameResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        let saved_at = chrono::Utc::now().to_rfc3339();

        tx.execute(
            "INSERT INTO save_slot (slot, day, hour, minute, time_speed, money, saved_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(slot) DO UPDATE SET
                day = excluded.day, hour = excluded.hour, minute = excluded.minute,
                time_speed = excluded.time_speed, money = excluded.money,
                saved_at = excluded.saved_at",
            params![
                slot,
                save.time.day,
                save.time.hour,
                save.time.minute,
                save.time_speed,
                save.money,
                saved_at,
            ],
        )?;

        tx.execute("DELETE FROM object_data WHERE slot = ?1", params![slot])?;
        tx.execute("DELETE FROM object_extra WHERE slot = ?1", params![slot])?;

        {
            let mut insert_object = tx.prepare(
                "INSERT INTO object_data
                    (slot, unique_id, day, hour, minute, pos_x, pos_y, pos_z, scene)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )?;
            for (unique_id, record) in &save.objects {
                insert_object.execute(params![
                    slot,
                    unique_id,
                    record.last_update_time.day,
                    record.last_update_time.hour,
                    record.last_update_time.minute,
                    f64::from(record.position[0]),
                    f64::from(record.position[1]),
                    f64::from(record.position[2]),
                    record.scene,
                ])?;
            }

            let mut insert_extra = tx.prepare(
                "INSERT INTO object_extra (slot, unique_id, payload) VALUES (?1, ?2, ?3)",
            )?;
            for (unique_id, value) in &save.extras {
                insert_extra.execute(params![slot, unique_id, serde_json::to_string(value)?])?;
            }
        }

        tx.commit()?;
        log::debug!(
            "slot '{slot}' written: {} objects, {} extras",
            save.objects.len(),
            save.extras.len()
        );
        Ok(())
    }

    /// Read a slot back. Returns None if the slot was never written.
    /// Object rows with an impossible timestamp are skipped, so the entity
    /// first-loads instead.
    pub fn read_save(&self, slot: &str) -> GameResult<Option<SaveData>> {
        let header = self
            .conn
            .query_row(
                "SELECT day, hour, minute, time_speed, money FROM save_slot WHERE slot = ?1",
                params![slot],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, i64>(3)?,
                        row.get::<_, i64>(4)?,
                    ))
                },
            )
            .optional()?;

        let Some((day, hour, minute, time_speed, money)) = header else {
            return Ok(None);
        };

        let mut save = SaveData {
            time: parse_time(day, hour, minute).unwrap_or_else(|| {
                log::warn!("slot '{slot}' has an unreadable clock time; using the default");
                TimeData::default()
            }),
            time_speed: u32::try_from(time_speed).unwrap_or(1),
            money,
            ..SaveData::default()
        };

        let mut stmt = self.conn.prepare(
            "SELECT unique_id, day, hour, minute, pos_x, pos_y, pos_z, scene
             FROM object_data WHERE slot = ?1 ORDER BY unique_id",
        )?;
        let rows = stmt
            .query_map(params![slot], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, i64>(3)?,
                    [
                        row.get::<_, f64>(4)? as f32,
                        row.get::<_, f64>(5)? as f32,
                        row.get::<_, f64>(6)? as f32,
                    ],
                    row.get::<_, String>(7)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        for (unique_id, day, hour, minute, position, scene) in rows {
            match parse_time(day, hour, minute) {
                Some(last_update_time) => {
                    save.objects.insert(
                        unique_id,
                        ObjectRecord { last_update_time, position, scene },
                    );
                }
                None => log::warn!(
                    "skipping '{unique_id}' in slot '{slot}': bad timestamp {day}/{hour}/{minute}"
                ),
            }
        }

        let mut stmt = self.conn.prepare(
            "SELECT unique_id, payload FROM object_extra WHERE slot = ?1 ORDER BY unique_id",
        )?;
        let extras = stmt
            .query_map(params![slot], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        for (unique_id, payload) in extras {
            match serde_json::from_str(&payload) {
                Ok(value) => {
                    save.extras.insert(unique_id, value);
                }
                Err(e) => log::warn!("skipping extra data for '{unique_id}': {e}"),
            }
        }

        Ok(Some(save))
    }

    pub fn list_slots(&self) -> GameResult<Vec<SlotSummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT slot, day, hour, minute, money, saved_at FROM save_slot ORDER BY slot",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, i64>(4)?,
                    row.get::<_, String>(5)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows
            .into_iter()
            .map(|(slot, day, hour, minute, money, saved_at)| SlotSummary {
                slot,
                time: parse_time(day, hour, minute).unwrap_or_default(),
                money,
                saved_at,
            })
            .collect())
    }

    pub fn delete_slot(&self, slot: &str) -> GameResult<bool> {
        let removed = self
            .conn
            .execute("DELETE FROM save_slot WHERE slot = ?1", params![slot])?;
        Ok(removed > 0)
    }

    // ── Event log ──────────────────────────────────────────────

    pub fn append_event(&self, entry: &EventLogEntry) -> GameResult<()> {
        self.conn.execute(
            "INSERT INTO event_log (slot, tick, source, event_type, payload)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                entry.slot,
                entry.tick as i64,
                entry.source,
                entry.event_type,
                entry.payload,
            ],
        )?;
        Ok(())
    }

    pub fn events_for_tick(&self, slot: &str, tick: Tick) -> GameResult<Vec<EventLogEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, slot, tick, source, event_type, payload
             FROM event_log WHERE slot = ?1 AND tick = ?2
             ORDER BY id ASC",
        )?;
        let entries = stmt
            .query_map(params![slot, tick as i64], row_to_entry)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    /// Every event logged for `slot`, in insertion order.
    pub fn all_events(&self, slot: &str) -> GameResult<Vec<EventLogEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, slot, tick, source, event_type, payload
             FROM event_log WHERE slot = ?1
             ORDER BY id ASC",
        )?;
        let entries = stmt
            .query_map(params![slot], row_to_entry)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    pub fn events_of_type(&self, slot: &str, event_type: &str) -> GameResult<Vec<EventLogEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, slot, tick, source, event_type, payload
             FROM event_log WHERE slot = ?1 AND event_type = ?2
             ORDER BY id ASC",
        )?;
        let entries = stmt
            .query_map(params![slot, event_type], row_to_entry)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    pub fn event_count(&self, slot: &str) -> GameResult<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM event_log WHERE slot = ?1",
            params![slot],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

fn row_to_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<EventLogEntry> {
    Ok(EventLogEntry {
        id:         Some(row.get(0)?),
        slot:       row.get(1)?,
        tick:       row.get::<_, i64>(2)? as u64,
        source:     row.get(3)?,
        event_type: row.get(4)?,
        payload:    row.get(5)?,
    })
}

fn parse_time(day: i64, hour: i64, minute: i64) -> Option<TimeData> {
    let day = u32::try_from(day).ok()?;
    let hour = u32::try_from(hour).ok()?;
    let minute = u32::try_from(minute).ok()?;
    TimeData::new(day, hour, minute).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> GameStore {
        let store = GameStore::in_memory().unwrap();
        store.migrate().unwrap();
        store
    }

    #[test]
    fn opened_database_accepts_saves() {
        let store = GameStore::open(":memory:").unwrap();
        store.migrate().unwrap();
        store.write_save("s", &SaveData::default()).unwrap();
        assert_eq!(store.read_save("s").unwrap(), Some(SaveData::default()));
    }

    #[test]
    fn missing_slot_reads_as_none() {
        assert!(store().read_save("nope").unwrap().is_none());
    }

    #[test]
    fn corrupt_object_timestamp_is_dropped() {
        let store = store();
        store.write_save("s", &SaveData::default()).unwrap();
        store
            .conn
            .execute(
                "INSERT INTO object_data VALUES ('s', 'broken', 1, 99, 0, 0, 0, 0, 'town')",
                [],
            )
            .unwrap();
        let save = store.read_save("s").unwrap().unwrap();
        assert!(save.read_entity_timestamp("broken").is_none());
    }

    #[test]
    fn rewriting_a_slot_replaces_its_objects() {
        let store = store();
        let mut save = SaveData::default();
        save.write_entity(
            "a",
            ObjectRecord {
                last_update_time: TimeData::default(),
                position:         [1.0, 2.0, 3.0],
                scene:            "town".into(),
            },
        );
        store.write_save("s", &save).unwrap();
        save.remove_entity("a");
        store.write_save("s", &save).unwrap();
        assert!(store.read_save("s").unwrap().unwrap().objects.is_empty());
        assert_eq!(store.list_slots().unwrap().len(), 1);
    }
}
