//! # Archetype Storage — Grouping Entities by Component Signature
//!
//! An archetype is a unique combination of component types. Every entity
//! with exactly the same set of types lives in the same archetype table.
//!
//! ## Memory Layout
//!
//! ```text
//! Archetype { key: [Position, Velocity] }
//!
//! columns:
//!   Position: [pos0, pos1, pos2]   ← one ComponentBox per row
//!   Velocity: [vel0, vel1, vel2]
//! entities:   [e4,   e9,   e12 ]   ← parallel array
//!
//! locations: { e4: (key, 0), e9: (key, 1), e12: (key, 2) }
//! ```
//!
//! All columns and the entity array have the same length; row `i` in each
//! refers to the same entity. Removal is swap-remove, so the last row moves
//! into the hole and its location is patched.
//!
//! ## Trade-off vs. [`SimpleStorage`](super::SimpleStorage)
//!
//! `find_all` checks each *table* once instead of each entity, which wins
//! when many entities share a signature. Attaching or detaching a component
//! moves the whole row to another table, which costs more than a map insert.

use std::any::{Any, TypeId};
use std::collections::HashMap;

use super::EntityStorage;
use crate::ecs::component::{ComponentBox, ComponentKind};
use crate::ecs::entity::EntityId;

/// A sorted list of [`TypeId`]s that uniquely identifies an archetype.
///
/// Sorted so that `(A, B)` and `(B, A)` produce the same key.
type ArchetypeKey = Vec<TypeId>;

fn archetype_key(mut type_ids: Vec<TypeId>) -> ArchetypeKey {
    type_ids.sort();
    type_ids.dedup();
    type_ids
}

/// Where an entity's row lives.
#[derive(Clone)]
struct EntityLocation {
    key: ArchetypeKey,
    row: usize,
}

/// A table of entities that all share the same component types.
struct Archetype {
    columns: HashMap<TypeId, Vec<ComponentBox>>,
    entities: Vec<EntityId>,
}

impl Archetype {
    fn new(key: &ArchetypeKey) -> Self {
        Self {
            columns: key.iter().map(|ty| (*ty, Vec::new())).collect(),
            entities: Vec::new(),
        }
    }

    fn has_component(&self, type_id: &TypeId) -> bool {
        self.columns.contains_key(type_id)
    }

    /// Swap-remove row `row`, returning the components that lived there.
    fn swap_remove(&mut self, row: usize) -> Vec<ComponentBox> {
        self.entities.swap_remove(row);
        self.columns
            .values_mut()
            .map(|column| column.swap_remove(row))
            .collect()
    }
}

/// Archetype-table storage engine.
#[derive(Default)]
pub struct ArchetypeStorage {
    archetypes: HashMap<ArchetypeKey, Archetype>,
    locations: HashMap<EntityId, EntityLocation>,
}

impl ArchetypeStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct component signatures seen so far (including
    /// tables that have since emptied out).
    pub fn archetype_count(&self) -> usize {
        self.archetypes.len()
    }

    /// Append a row for `id`. Every component must have a distinct type.
    fn push_row(&mut self, id: EntityId, components: Vec<ComponentBox>) {
        let key = archetype_key(components.iter().map(ComponentBox::type_id).collect());
        let arch = self
            .archetypes
            .entry(key.clone())
            .or_insert_with(|| Archetype::new(&key));
        let row = arch.entities.len();
        arch.entities.push(id);
        for component in components {
            arch.columns
                .entry(component.type_id())
                .or_default()
                .push(component);
        }
        self.locations.insert(id, EntityLocation { key, row });
    }

    /// Pull `id`'s row out of its table, patching the location of whichever
    /// entity got swapped into the hole.
    fn take_row(&mut self, id: EntityId) -> Option<Vec<ComponentBox>> {
        let loc = self.locations.remove(&id)?;
        let arch = self.archetypes.get_mut(&loc.key)?;
        let components = arch.swap_remove(loc.row);
        let swapped = arch.entities.get(loc.row).copied();

        if let Some(swapped) = swapped
            && let Some(swapped_loc) = self.locations.get_mut(&swapped)
        {
            swapped_loc.row = loc.row;
        }
        Some(components)
    }

    fn component_ref(&self, id: EntityId, type_id: &TypeId) -> Option<&ComponentBox> {
        let loc = self.locations.get(&id)?;
        self.archetypes
            .get(&loc.key)?
            .columns
            .get(type_id)?
            .get(loc.row)
    }

    fn component_mut(&mut self, id: EntityId, type_id: &TypeId) -> Option<&mut ComponentBox> {
        let loc = self.locations.get(&id)?;
        self.archetypes
            .get_mut(&loc.key)?
            .columns
            .get_mut(type_id)?
            .get_mut(loc.row)
    }
}

impl EntityStorage for ArchetypeStorage {
    fn add(&mut self, id: EntityId, components: Vec<ComponentBox>) {
        if self.locations.contains_key(&id) {
            panic!("duplicate entity {} added to ArchetypeStorage", id);
        }
        // Later instances of a type win, matching a map insert.
        let mut by_type: HashMap<TypeId, ComponentBox> = HashMap::with_capacity(components.len());
        for component in components {
            by_type.insert(component.type_id(), component);
        }
        self.push_row(id, by_type.into_values().collect());
    }

    fn delete(&mut self, id: EntityId) {
        self.take_row(id);
    }

    fn has(&self, id: EntityId) -> bool {
        self.locations.contains_key(&id)
    }

    fn get(&self, id: EntityId) -> Vec<&ComponentBox> {
        let Some(loc) = self.locations.get(&id) else {
            return Vec::new();
        };
        let Some(arch) = self.archetypes.get(&loc.key) else {
            return Vec::new();
        };
        arch.columns
            .values()
            .filter_map(|column| column.get(loc.row))
            .collect()
    }

    fn get_component(&self, id: EntityId, type_id: TypeId) -> Option<&dyn Any> {
        self.component_ref(id, &type_id).map(ComponentBox::as_any)
    }

    fn get_component_mut(&mut self, id: EntityId, type_id: TypeId) -> Option<&mut dyn Any> {
        self.component_mut(id, &type_id)
            .map(ComponentBox::as_any_mut)
    }

    fn add_component(&mut self, id: EntityId, component: ComponentBox) {
        if !self.locations.contains_key(&id) {
            log::warn!(
                "add_component: entity {} does not exist, dropping `{}`",
                id,
                component.short_name()
            );
            return;
        }
        let type_id = component.type_id();

        // Already has the type: replace in place or keep, no migration.
        if let Some(existing) = self.component_mut(id, &type_id) {
            if component.kind() == ComponentKind::Shared {
                *existing = component;
            } else {
                log::trace!(
                    "add_component: entity {} already has `{}`, keeping the existing value",
                    id,
                    component.short_name()
                );
            }
            return;
        }

        // Move the row to the table that also has this type.
        let Some(mut components) = self.take_row(id) else {
            return;
        };
        components.push(component);
        self.push_row(id, components);
    }

    fn remove_component(&mut self, id: EntityId, type_id: TypeId) {
        let carries = self
            .locations
            .get(&id)
            .is_some_and(|loc| loc.key.binary_search(&type_id).is_ok());
        if !carries {
            return;
        }
        let Some(mut components) = self.take_row(id) else {
            return;
        };
        // The detached component is dropped here.
        components.retain(|c| c.type_id() != type_id);
        self.push_row(id, components);
    }

    fn find_one(&self, type_id: TypeId) -> Option<(EntityId, &dyn Any)> {
        let id = self
            .archetypes
            .values()
            .filter(|arch| arch.has_component(&type_id))
            .flat_map(|arch| arch.entities.iter().copied())
            .min()?;
        self.get_component(id, type_id).map(|c| (id, c))
    }

    fn find_all(&self, required: &[TypeId], excluded: &[TypeId]) -> Vec<EntityId> {
        let mut result = Vec::new();
        for arch in self.archetypes.values() {
            if arch.entities.is_empty() {
                continue;
            }
            let matches = required.iter().all(|ty| arch.has_component(ty))
                && !excluded.iter().any(|ty| arch.has_component(ty));
            if matches {
                result.extend_from_slice(&arch.entities);
            }
        }
        result
    }

    fn len(&self) -> usize {
        self.locations.len()
    }
}
