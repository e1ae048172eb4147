//! A loaded scene: the strong owner of its entities.
//!
//! Dropping a scene drops its entities, which removes them from every
//! later broadcast. Use `GameSession::leave_scene` to keep their state.

use crate::registry::EntityHandle;

pub struct Scene {
    name:     String,
    entities: Vec<EntityHandle>,
}

impl Scene {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), entities: Vec::new() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn entities(&self) -> &[EntityHandle] {
        &self.entities
    }

    pub(crate) fn hold(&mut self, entity: EntityHandle) {
        self.entities.push(entity);
    }

    pub(crate) fn into_entities(self) -> Vec<EntityHandle> {
        self.entities
    }
}
