//! # Storage — The Entity → Component Mapping
//!
//! [`EntityStorage`] is the contract every storage engine satisfies:
//!
//! ```text
//! EntityId ──► { TypeId ──► ComponentBox }
//! ```
//!
//! Two engines ship with the crate:
//!
//! - [`SimpleStorage`] — one hash map per entity plus a per-type index. O(1)
//!   attach/detach, the default.
//! - [`ArchetypeStorage`] — entities grouped into tables by their exact set of
//!   component types. Attach/detach moves the entity between tables; scans
//!   touch whole tables at once.
//!
//! ## Failure Semantics
//!
//! - Adding an id that already exists is a caller bug and **panics**.
//! - Deleting, detaching from, or reading an unknown id is a silent no-op /
//!   `None`. Storage does not distinguish "no such entity" from "entity lacks
//!   this component".
//! - Attaching to an unknown id logs a warning and does nothing.

use std::any::{Any, TypeId};

use super::component::ComponentBox;
use super::entity::EntityId;

mod archetype;
mod simple;

pub use archetype::ArchetypeStorage;
pub use simple::SimpleStorage;

/// Stores entities and their components.
pub trait EntityStorage {
    /// Register a brand-new entity with its initial components. If the set
    /// contains two instances of one type, the later one wins.
    ///
    /// # Panics
    ///
    /// Panics if `id` is already present.
    fn add(&mut self, id: EntityId, components: Vec<ComponentBox>);

    /// Remove an entity and all of its components. Unknown ids are ignored.
    fn delete(&mut self, id: EntityId);

    /// `true` if the entity exists, even with zero components.
    fn has(&self, id: EntityId) -> bool;

    /// All components attached to `id`, in no particular order.
    fn get(&self, id: EntityId) -> Vec<&ComponentBox>;

    fn get_component(&self, id: EntityId, type_id: TypeId) -> Option<&dyn Any>;

    fn get_component_mut(&mut self, id: EntityId, type_id: TypeId) -> Option<&mut dyn Any>;

    /// Attach a component to an existing entity.
    ///
    /// If the entity already carries this type, a
    /// [`Shared`](super::component::ComponentKind::Shared) component is
    /// replaced and a [`Value`](super::component::ComponentKind::Value)
    /// component is left untouched.
    fn add_component(&mut self, id: EntityId, component: ComponentBox);

    /// Detach one component type. Absent types and unknown ids are ignored.
    fn remove_component(&mut self, id: EntityId, type_id: TypeId);

    /// Any one entity's component of the given type. Engines return the
    /// lowest matching id so singleton lookups are stable.
    fn find_one(&self, type_id: TypeId) -> Option<(EntityId, &dyn Any)>;

    /// Every entity carrying all of `required` and none of `excluded`.
    /// An empty `required` matches every entity. Order is unspecified.
    fn find_all(&self, required: &[TypeId], excluded: &[TypeId]) -> Vec<EntityId>;

    /// Number of entities.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Type name of the engine, for logs and the inspector.
    fn engine_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Storage contract checks, run against every engine.
#[cfg(test)]
pub(crate) mod contract {
    use std::any::TypeId;

    use super::EntityStorage;
    use crate::ecs::component::{Component, ComponentBox, ComponentSet, Shared};
    use crate::ecs::entity::EntityId;

    #[derive(Debug, Clone, PartialEq)]
    pub struct Pair {
        pub a: i32,
        pub b: i32,
    }
    impl Component for Pair {}

    #[derive(Debug, Clone, PartialEq)]
    pub struct Other {
        pub x: i32,
    }
    impl Component for Other {}

    #[derive(Debug, Clone, PartialEq)]
    pub struct Tag;
    impl Component for Tag {}

    fn id(raw: u32) -> EntityId {
        EntityId::from_raw(raw)
    }

    fn fill(storage: &mut impl EntityStorage, count: u32) {
        for n in 1..=count {
            let n_i = n as i32;
            storage.add(id(n), (Pair { a: n_i, b: n_i + 1 },).into_boxes());
        }
    }

    fn pair(storage: &impl EntityStorage, raw: u32) -> Option<Pair> {
        storage
            .get_component(id(raw), TypeId::of::<Pair>())
            .and_then(|c| c.downcast_ref::<Pair>())
            .cloned()
    }

    pub fn add_many_unique(mut storage: impl EntityStorage) {
        fill(&mut storage, 10_000);
        assert_eq!(storage.len(), 10_000);
        assert!(storage.has(id(1)));
        assert!(storage.has(id(10_000)));
        assert!(!storage.has(id(10_001)));
    }

    pub fn duplicate_add_panics(mut storage: impl EntityStorage) {
        storage.add(id(1), Vec::new());
        storage.add(id(1), Vec::new());
    }

    pub fn empty_query_matches_all(mut storage: impl EntityStorage) {
        fill(&mut storage, 1000);
        storage.add(id(5000), Vec::new());
        assert_eq!(storage.find_all(&[], &[]).len(), 1001);
    }

    pub fn required_and_excluded(mut storage: impl EntityStorage) {
        fill(&mut storage, 100);
        storage.add(id(200), (Other { x: 5 },).into_boxes());
        storage.add(id(201), (Pair { a: 0, b: 1 }, Tag).into_boxes());

        let pair_ty = TypeId::of::<Pair>();
        let tag_ty = TypeId::of::<Tag>();
        let other_ty = TypeId::of::<Other>();

        assert_eq!(storage.find_all(&[pair_ty], &[]).len(), 101);
        assert_eq!(storage.find_all(&[pair_ty], &[tag_ty]).len(), 100);
        assert_eq!(storage.find_all(&[pair_ty, tag_ty], &[]), vec![id(201)]);
        assert_eq!(storage.find_all(&[other_ty], &[]), vec![id(200)]);
        assert!(storage.find_all(&[pair_ty, other_ty], &[]).is_empty());
        assert_eq!(storage.find_all(&[], &[pair_ty]), vec![id(200)]);
    }

    pub fn get_and_lookup(mut storage: impl EntityStorage) {
        storage.add(id(1), (Pair { a: 1, b: 2 }, Other { x: 3 }).into_boxes());

        let mut names: Vec<_> = storage.get(id(1)).iter().map(|c| c.short_name()).collect();
        names.sort();
        assert_eq!(names, vec!["Other", "Pair"]);
        assert!(storage.get(id(99)).is_empty());

        assert_eq!(pair(&storage, 1), Some(Pair { a: 1, b: 2 }));
        assert!(storage.get_component(id(1), TypeId::of::<Tag>()).is_none());
        assert!(storage.get_component(id(99), TypeId::of::<Pair>()).is_none());

        if let Some(p) = storage
            .get_component_mut(id(1), TypeId::of::<Pair>())
            .and_then(|c| c.downcast_mut::<Pair>())
        {
            p.a = 40;
        }
        assert_eq!(pair(&storage, 1), Some(Pair { a: 40, b: 2 }));
    }

    pub fn value_add_is_noop(mut storage: impl EntityStorage) {
        storage.add(id(1), (Pair { a: 1, b: 2 },).into_boxes());
        storage.add_component(id(1), ComponentBox::new(Pair { a: 9, b: 9 }));
        assert_eq!(pair(&storage, 1), Some(Pair { a: 1, b: 2 }));

        // First attach of a new value type still lands.
        storage.add_component(id(1), ComponentBox::new(Other { x: 7 }));
        assert!(storage.get_component(id(1), TypeId::of::<Other>()).is_some());
    }

    pub fn shared_add_replaces(mut storage: impl EntityStorage) {
        let first = Shared::new(Pair { a: 1, b: 2 });
        let second = Shared::new(Pair { a: 3, b: 4 });
        storage.add(id(1), (first.clone(),).into_boxes());
        storage.add_component(id(1), ComponentBox::new(second.clone()));

        let stored = storage
            .get_component(id(1), TypeId::of::<Shared<Pair>>())
            .and_then(|c| c.downcast_ref::<Shared<Pair>>())
            .cloned();
        assert!(stored.is_some_and(|s| s.ptr_eq(&second)));
    }

    pub fn remove_and_delete(mut storage: impl EntityStorage) {
        fill(&mut storage, 3);
        storage.add_component(id(2), ComponentBox::new(Tag));

        storage.remove_component(id(2), TypeId::of::<Tag>());
        storage.remove_component(id(2), TypeId::of::<Other>());
        storage.remove_component(id(99), TypeId::of::<Pair>());
        assert!(storage.get_component(id(2), TypeId::of::<Tag>()).is_none());
        assert_eq!(pair(&storage, 2), Some(Pair { a: 2, b: 3 }));
        assert!(storage.find_all(&[TypeId::of::<Tag>()], &[]).is_empty());

        storage.delete(id(2));
        storage.delete(id(99));
        assert!(!storage.has(id(2)));
        assert!(pair(&storage, 2).is_none());
        assert!(storage.get(id(2)).is_empty());
        assert_eq!(storage.len(), 2);

        // Remaining rows survive the delete intact.
        assert_eq!(pair(&storage, 1), Some(Pair { a: 1, b: 2 }));
        assert_eq!(pair(&storage, 3), Some(Pair { a: 3, b: 4 }));
        let mut ids = storage.find_all(&[TypeId::of::<Pair>()], &[]);
        ids.sort();
        assert_eq!(ids, vec![id(1), id(3)]);
    }

    pub fn attach_to_unknown_is_ignored(mut storage: impl EntityStorage) {
        storage.add_component(id(7), ComponentBox::new(Tag));
        assert!(!storage.has(id(7)));
        assert!(storage.is_empty());
    }

    pub fn find_one_singleton(mut storage: impl EntityStorage) {
        fill(&mut storage, 5);
        assert!(storage.find_one(TypeId::of::<Other>()).is_none());

        storage.add(id(10), (Other { x: 42 },).into_boxes());
        let (found, value) = storage
            .find_one(TypeId::of::<Other>())
            .expect("singleton present");
        assert_eq!(found, id(10));
        assert_eq!(value.downcast_ref::<Other>(), Some(&Other { x: 42 }));

        let (lowest, _) = storage.find_one(TypeId::of::<Pair>()).expect("pairs present");
        assert_eq!(lowest, id(1));
    }
}
