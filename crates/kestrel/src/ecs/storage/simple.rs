//! Hash-map storage: one component map per entity plus a per-type index.
//!
//! ```text
//! entities: { 1: {Position, Velocity}, 2: {Position}, 3: {} }
//! by_type:  { Position: {1, 2}, Velocity: {1} }
//! ```
//!
//! `find_all` starts from the smallest index set among the required types and
//! filters it, so cost scales with the number of candidates rather than with
//! the total entity count.

use std::any::{Any, TypeId};
use std::collections::{HashMap, HashSet};

use super::EntityStorage;
use crate::ecs::component::{ComponentBox, ComponentKind};
use crate::ecs::entity::EntityId;

type ComponentMap = HashMap<TypeId, ComponentBox>;

/// The default storage engine.
#[derive(Default)]
pub struct SimpleStorage {
    entities: HashMap<EntityId, ComponentMap>,
    /// Which entities carry each component type. Never holds empty sets.
    by_type: HashMap<TypeId, HashSet<EntityId>>,
}

impl SimpleStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn index(&mut self, id: EntityId, type_id: TypeId) {
        self.by_type.entry(type_id).or_default().insert(id);
    }

    fn unindex(&mut self, id: EntityId, type_id: TypeId) {
        if let Some(set) = self.by_type.get_mut(&type_id) {
            set.remove(&id);
            if set.is_empty() {
                self.by_type.remove(&type_id);
            }
        }
    }

    fn carries(&self, id: EntityId, type_id: &TypeId) -> bool {
        self.by_type
            .get(type_id)
            .is_some_and(|set| set.contains(&id))
    }
}

impl EntityStorage for SimpleStorage {
    fn add(&mut self, id: EntityId, components: Vec<ComponentBox>) {
        if self.entities.contains_key(&id) {
            panic!("duplicate entity {} added to SimpleStorage", id);
        }
        let mut map = ComponentMap::with_capacity(components.len());
        for component in components {
            let type_id = component.type_id();
            self.index(id, type_id);
            map.insert(type_id, component);
        }
        self.entities.insert(id, map);
    }

    fn delete(&mut self, id: EntityId) {
        let Some(map) = self.entities.remove(&id) else {
            return;
        };
        for type_id in map.keys() {
            self.unindex(id, *type_id);
        }
    }

    fn has(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    fn get(&self, id: EntityId) -> Vec<&ComponentBox> {
        self.entities
            .get(&id)
            .map(|map| map.values().collect())
            .unwrap_or_default()
    }

    fn get_component(&self, id: EntityId, type_id: TypeId) -> Option<&dyn Any> {
        self.entities
            .get(&id)?
            .get(&type_id)
            .map(ComponentBox::as_any)
    }

    fn get_component_mut(&mut self, id: EntityId, type_id: TypeId) -> Option<&mut dyn Any> {
        self.entities
            .get_mut(&id)?
            .get_mut(&type_id)
            .map(ComponentBox::as_any_mut)
    }

    fn add_component(&mut self, id: EntityId, component: ComponentBox) {
        let Some(map) = self.entities.get_mut(&id) else {
            log::warn!(
                "add_component: entity {} does not exist, dropping `{}`",
                id,
                component.short_name()
            );
            return;
        };
        let type_id = component.type_id();
        if component.kind() == ComponentKind::Value && map.contains_key(&type_id) {
            log::trace!(
                "add_component: entity {} already has `{}`, keeping the existing value",
                id,
                component.short_name()
            );
            return;
        }
        map.insert(type_id, component);
        self.index(id, type_id);
    }

    fn remove_component(&mut self, id: EntityId, type_id: TypeId) {
        let removed = self
            .entities
            .get_mut(&id)
            .and_then(|map| map.remove(&type_id))
            .is_some();
        if removed {
            self.unindex(id, type_id);
        }
    }

    fn find_one(&self, type_id: TypeId) -> Option<(EntityId, &dyn Any)> {
        let id = *self.by_type.get(&type_id)?.iter().min()?;
        let component = self.entities.get(&id)?.get(&type_id)?;
        Some((id, component.as_any()))
    }

    fn find_all(&self, required: &[TypeId], excluded: &[TypeId]) -> Vec<EntityId> {
        let not_excluded = |id: &EntityId| !excluded.iter().any(|ty| self.carries(*id, ty));

        if required.is_empty() {
            return self.entities.keys().copied().filter(not_excluded).collect();
        }

        // Smallest candidate set first. A required type nobody carries means
        // nothing can match.
        let mut sets = Vec::with_capacity(required.len());
        for type_id in required {
            match self.by_type.get(type_id) {
                Some(set) => sets.push(set),
                None => return Vec::new(),
            }
        }
        sets.sort_by_key(|set| set.len());
        let (smallest, rest) = sets.split_at(1);

        smallest[0]
            .iter()
            .copied()
            .filter(|id| rest.iter().all(|set| set.contains(id)))
            .filter(not_excluded)
            .collect()
    }

    fn len(&self) -> usize {
        self.entities.len()
    }
}
