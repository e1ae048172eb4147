//! Broadcast registry of live time-affected entities.
//!
//! RULES:
//!   - The registry holds weak references only. Whoever owns the entity
//!     (normally a Scene) decides its lifetime; a dropped entity silently
//!     falls out of every later broadcast.
//!   - Registering the same entity twice is an error.
//!   - Broadcasts run in registration order. Callbacks get no access to the
//!     registry, so it cannot change while it is being iterated.

use crate::{
    error::{GameError, GameResult},
    time_affected::TimeAffected,
};
use std::{
    cell::RefCell,
    rc::{Rc, Weak},
};

/// Shared, type-erased handle to a live entity.
pub type EntityHandle = Rc<RefCell<dyn TimeAffected>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InstanceId(u64);

struct RegistryEntry {
    instance:  InstanceId,
    unique_id: String,
    entity:    Weak<RefCell<dyn TimeAffected>>,
}

impl RegistryEntry {
    fn points_to(&self, entity: &EntityHandle) -> bool {
        self.entity.as_ptr().cast::<()>() == Rc::as_ptr(entity).cast::<()>()
    }
}

#[derive(Default)]
pub struct EntityRegistry {
    entries:       Vec<RegistryEntry>,
    next_instance: u64,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, entity: &EntityHandle) -> GameResult<InstanceId> {
        self.prune();

        let unique_id = entity.borrow().unique_id().to_string();
        if self.entries.iter().any(|e| e.points_to(entity)) {
            return Err(GameError::AlreadyRegistered { unique_id });
        }
        if self.entries.iter().any(|e| e.unique_id == unique_id) {
            // Ids come from display names. Two live entities sharing one
            // will overwrite each other's save record.
            log::warn!("duplicate unique id '{unique_id}': save records will collide");
        }

        let instance = InstanceId(self.next_instance);
        self.next_instance += 1;
        self.entries.push(RegistryEntry {
            instance,
            unique_id,
            entity: Rc::downgrade(entity),
        });
        Ok(instance)
    }

    pub fn deregister(&mut self, instance: InstanceId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.instance != instance);
        self.entries.len() != before
    }

    /// Remove an entity by identity. Returns false if it was not registered.
    pub fn deregister_entity(&mut self, entity: &EntityHandle) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| !e.points_to(entity));
        self.entries.len() != before
    }

    pub fn contains(&self, entity: &EntityHandle) -> bool {
        self.entries.iter().any(|e| e.points_to(entity) && e.entity.strong_count() > 0)
    }

    /// Drop entries whose entity no longer exists. Returns how many went.
    pub fn prune(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| e.entity.strong_count() > 0);
        let removed = before - self.entries.len();
        if removed > 0 {
            log::debug!("registry pruned {removed} dropped entities");
        }
        removed
    }

    /// Number of live entities.
    pub fn len(&self) -> usize {
        self.entries.iter().filter(|e| e.entity.strong_count() > 0).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Strong handles to every live entity, in registration order.
    pub fn live(&self) -> Vec<EntityHandle> {
        self.entries.iter().filter_map(|e| e.entity.upgrade()).collect()
    }

    /// Run `f` on every live entity in registration order. Stops at the
    /// first error.
    pub fn for_each<F>(&self, mut f: F) -> GameResult<()>
    where
        F: FnMut(&mut dyn TimeAffected) -> GameResult<()>,
    {
        for entry in &self.entries {
            let Some(handle) = entry.entity.upgrade() else {
                continue;
            };
            let mut entity = handle.try_borrow_mut().map_err(|_| {
                anyhow::anyhow!("entity '{}' is borrowed during broadcast", entry.unique_id)
            })?;
            f(&mut *entity)?;
        }
        Ok(())
    }
}
