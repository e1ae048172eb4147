//! Shared primitive types used across the gameplay core.

/// A clock tick. The engine driver calls `tick()` once per frame and the
/// clock advances by `ticks_per_update` of these.
pub type Tick = u64;

/// Stable identity used to look an entity up in the save data.
/// Derived from the object's display name, so it is NOT guaranteed unique.
pub type EntityId = String;

/// Name of a save slot.
pub type SlotId = String;

/// Item identifier from the shop catalog.
pub type ItemId = u32;

/// World-space position. Opaque to the core; only carried into the save.
pub type Position = [f32; 3];
