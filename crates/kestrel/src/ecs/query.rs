//! # Query — Iterating Over Entities by Shape
//!
//! A query shape is a tuple of *slots*. The tuple type declares what to match
//! and is also the record each matching entity is read into:
//!
//! ```text
//! type Movers = (EntityId, Shared<Position>, Velocity, Option<Mass>, Without<Frozen>);
//!
//!   EntityId          id slot        filled with the entity's own id
//!   Shared<Position>  required       must be present; handle to the live instance
//!   Velocity          required       must be present; copied out
//!   Option<Mass>      optional       Some if present, None otherwise
//!   Without<Frozen>   excluded       entity must NOT carry Frozen
//!   Skip<T>           ignored        never read, always T::default()
//! ```
//!
//! ## Two Phases
//!
//! ```text
//! Query::<Movers>::new()        compile once: required = [Shared<Position>, Velocity]
//!                                             excluded = [Frozen]
//! query.execute(storage)        find_all(required, excluded) → id snapshot
//! iter.next(storage)            read one id fresh from storage into Movers
//! ```
//!
//! The id list is frozen at `execute` time: entities added afterwards are never
//! visited, and entities deleted afterwards read as absent instead of failing.
//! Component *values* are read live on every `next`, so a system may mutate
//! storage between two `next` calls and the next read sees it.
//! Membership is not re-tested on read: an entity that picks up an excluded
//! component after `execute` is still visited.
//!
//! ## Why `next` Takes the Storage
//!
//! The iterator holds no borrow of storage. Items own their data (value
//! components are clones, shared components are handles), so the caller is free
//! to mutate the simulation between steps:
//!
//! ```ignore
//! let mut iter = Query::<(EntityId, Health)>::new().execute(sim.storage());
//! while iter.next(sim.storage()) {
//!     let Some(&(id, hp)) = iter.item() else { continue };
//!     if hp.0 == 0 {
//!         sim.delete_entity(id);
//!     }
//! }
//! ```
//!
//! ## Comparison
//!
//! - **hecs / bevy_ecs**: queries hand out borrowed `&T` / `&mut T` tied to
//!   the world's lifetime. No structural changes are possible mid-iteration.
//! - **kestrel**: owned items plus an id snapshot. Slower per item, but
//!   iteration and mutation interleave freely.

use std::any::{TypeId, type_name};
use std::collections::HashSet;
use std::fmt;
use std::marker::PhantomData;

use super::component::{Component, short_type_name};
use super::entity::EntityId;
use super::error::QueryError;
use super::storage::EntityStorage;

// ── Slots ───────────────────────────────────────────────────────────────

/// How a slot participates in matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotAccess {
    Required(TypeId),
    Optional(TypeId),
    Excluded(TypeId),
    Id,
    Ignored,
}

/// One element of a query tuple.
///
/// `fetch` returns `None` when a required component is gone. Membership is
/// decided once, by `execute`; reads never re-filter the snapshot.
pub trait QuerySlot: Sized + 'static {
    fn access() -> SlotAccess;

    fn type_name() -> &'static str {
        type_name::<Self>()
    }

    fn fetch(storage: &dyn EntityStorage, id: EntityId) -> Option<Self>;
}

fn read_component<T: Component + Clone>(storage: &dyn EntityStorage, id: EntityId) -> Option<T> {
    storage
        .get_component(id, TypeId::of::<T>())?
        .downcast_ref::<T>()
        .cloned()
}

/// A plain component type is a required slot.
impl<T: Component + Clone> QuerySlot for T {
    fn access() -> SlotAccess {
        SlotAccess::Required(TypeId::of::<T>())
    }

    fn fetch(storage: &dyn EntityStorage, id: EntityId) -> Option<Self> {
        read_component(storage, id)
    }
}

impl<T: Component + Clone> QuerySlot for Option<T> {
    fn access() -> SlotAccess {
        SlotAccess::Optional(TypeId::of::<T>())
    }

    fn type_name() -> &'static str {
        type_name::<T>()
    }

    fn fetch(storage: &dyn EntityStorage, id: EntityId) -> Option<Self> {
        Some(read_component(storage, id))
    }
}

impl QuerySlot for EntityId {
    fn access() -> SlotAccess {
        SlotAccess::Id
    }

    fn fetch(_storage: &dyn EntityStorage, id: EntityId) -> Option<Self> {
        Some(id)
    }
}

/// Excluded slot: [`Query::execute`] skips entities that carry `T`. Reads
/// never look at `T` again.
pub struct Without<T>(PhantomData<fn() -> T>);

impl<T> Default for Without<T> {
    fn default() -> Self {
        Self(PhantomData)
    }
}

impl<T> Clone for Without<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Without<T> {}

impl<T> fmt::Debug for Without<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Without<{}>", short_type_name(type_name::<T>()))
    }
}

impl<T: Component> QuerySlot for Without<T> {
    fn access() -> SlotAccess {
        SlotAccess::Excluded(TypeId::of::<T>())
    }

    fn type_name() -> &'static str {
        type_name::<T>()
    }

    fn fetch(_storage: &dyn EntityStorage, _id: EntityId) -> Option<Self> {
        Some(Self::default())
    }
}

/// Ignored slot: never read from storage, always `T::default()`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Skip<T>(pub T);

impl<T: Default + 'static> QuerySlot for Skip<T> {
    fn access() -> SlotAccess {
        SlotAccess::Ignored
    }

    fn fetch(_storage: &dyn EntityStorage, _id: EntityId) -> Option<Self> {
        Some(Self::default())
    }
}

// ── Shapes ──────────────────────────────────────────────────────────────

/// Static description of one slot, used to compile the plan.
#[derive(Debug, Clone, Copy)]
pub struct SlotInfo {
    pub access: SlotAccess,
    pub type_name: &'static str,
}

/// A flat tuple of [`QuerySlot`]s. Implemented for tuples of 1 to 8 slots.
pub trait QueryShape: Sized + 'static {
    fn slots() -> Vec<SlotInfo>;

    /// Read every slot for `id`, or `None` if any slot no longer matches.
    fn materialize(storage: &dyn EntityStorage, id: EntityId) -> Option<Self>;
}

macro_rules! impl_query_shape {
    ($($S:ident),+) => {
        impl<$($S: QuerySlot),+> QueryShape for ($($S,)+) {
            fn slots() -> Vec<SlotInfo> {
                vec![$(SlotInfo { access: $S::access(), type_name: $S::type_name() }),+]
            }

            fn materialize(storage: &dyn EntityStorage, id: EntityId) -> Option<Self> {
                Some(($($S::fetch(storage, id)?,)+))
            }
        }
    };
}

impl_query_shape!(A);
impl_query_shape!(A, B);
impl_query_shape!(A, B, C);
impl_query_shape!(A, B, C, D);
impl_query_shape!(A, B, C, D, E);
impl_query_shape!(A, B, C, D, E, F);
impl_query_shape!(A, B, C, D, E, F, G);
impl_query_shape!(A, B, C, D, E, F, G, H);

/// Matches every entity and yields only its id.
pub type AllEntities = (EntityId,);

// ── Query ───────────────────────────────────────────────────────────────

/// A compiled query plan for shape `Q`. Build once, execute many times.
pub struct Query<Q: QueryShape> {
    required: Vec<TypeId>,
    excluded: Vec<TypeId>,
    _shape: PhantomData<fn() -> Q>,
}

impl<Q: QueryShape> Query<Q> {
    /// Compile the plan for `Q`.
    ///
    /// # Panics
    ///
    /// Panics if the shape declares more than one `EntityId` slot or names the
    /// same component type in two slots. Use [`try_new`](Self::try_new) to get
    /// the error instead.
    pub fn new() -> Self {
        match Self::try_new() {
            Ok(query) => query,
            Err(err) => panic!(
                "invalid query shape `{}`: {}",
                short_type_name(type_name::<Q>()),
                err
            ),
        }
    }

    pub fn try_new() -> Result<Self, QueryError> {
        let mut required = Vec::new();
        let mut excluded = Vec::new();
        let mut seen = HashSet::new();
        let mut has_id = false;

        for slot in Q::slots() {
            let type_id = match slot.access {
                SlotAccess::Required(ty) => {
                    required.push(ty);
                    ty
                }
                SlotAccess::Optional(ty) => ty,
                SlotAccess::Excluded(ty) => {
                    excluded.push(ty);
                    ty
                }
                SlotAccess::Id => {
                    if has_id {
                        return Err(QueryError::MultipleIdSlots);
                    }
                    has_id = true;
                    continue;
                }
                SlotAccess::Ignored => continue,
            };
            if !seen.insert(type_id) {
                return Err(QueryError::ConflictingSlot {
                    type_name: short_type_name(slot.type_name),
                });
            }
        }

        Ok(Self {
            required,
            excluded,
            _shape: PhantomData,
        })
    }

    pub fn required(&self) -> &[TypeId] {
        &self.required
    }

    pub fn excluded(&self) -> &[TypeId] {
        &self.excluded
    }

    /// Snapshot the matching ids. Values are read later, one `next` at a time.
    pub fn execute(&self, storage: &dyn EntityStorage) -> QueryIter<Q> {
        let ids = storage.find_all(&self.required, &self.excluded);
        log::trace!(
            "query `{}` matched {} entities",
            short_type_name(type_name::<Q>()),
            ids.len()
        );
        QueryIter {
            ids,
            cursor: 0,
            current: None,
            item: None,
        }
    }

    /// Ad hoc read of one entity through the same path iteration uses.
    pub fn get(&self, storage: &dyn EntityStorage, id: EntityId) -> Option<Q> {
        Self::read(storage, id)
    }

    /// Materialize `id` into `Q`. `None` if the entity is gone or lacks a
    /// required component. Excluded types are not checked here.
    pub fn read(storage: &dyn EntityStorage, id: EntityId) -> Option<Q> {
        if !storage.has(id) {
            return None;
        }
        Q::materialize(storage, id)
    }
}

impl<Q: QueryShape> Default for Query<Q> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Q: QueryShape> Clone for Query<Q> {
    fn clone(&self) -> Self {
        Self {
            required: self.required.clone(),
            excluded: self.excluded.clone(),
            _shape: PhantomData,
        }
    }
}

impl<Q: QueryShape> fmt::Debug for Query<Q> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("shape", &short_type_name(type_name::<Q>()))
            .field("required", &self.required.len())
            .field("excluded", &self.excluded.len())
            .finish()
    }
}

// ── Iterator ────────────────────────────────────────────────────────────

/// Cursor over the ids matched by [`Query::execute`].
pub struct QueryIter<Q> {
    ids: Vec<EntityId>,
    /// Index of the next id `next` will read.
    cursor: usize,
    current: Option<EntityId>,
    item: Option<Q>,
}

impl<Q: QueryShape> QueryIter<Q> {
    /// Order the pending ids ascending. Call before the first `next` for a
    /// fully deterministic traversal.
    pub fn sort(&mut self) {
        self.ids[self.cursor..].sort_unstable();
    }

    /// Advance to the next id and read it fresh from storage.
    ///
    /// Returns `false` once the snapshot is exhausted. An id whose entity was
    /// deleted (or lost a required component) still advances and returns `true`, but
    /// leaves [`item`](Self::item) as `None`.
    pub fn next(&mut self, storage: &dyn EntityStorage) -> bool {
        let Some(&id) = self.ids.get(self.cursor) else {
            self.current = None;
            self.item = None;
            return false;
        };
        self.cursor += 1;
        self.current = Some(id);
        self.item = Query::<Q>::read(storage, id);
        true
    }

    /// The record read by the last `next`.
    pub fn item(&self) -> Option<&Q> {
        self.item.as_ref()
    }

    /// Move the current record out, leaving `item()` empty.
    pub fn take_item(&mut self) -> Option<Q> {
        self.item.take()
    }

    /// The id the last `next` landed on, stale or not.
    pub fn id(&self) -> Option<EntityId> {
        self.current
    }

    /// Read the id the next `next` would visit, without advancing.
    pub fn get(&self, storage: &dyn EntityStorage) -> Option<Q> {
        let id = *self.ids.get(self.cursor)?;
        Query::<Q>::read(storage, id)
    }

    /// First live match in the snapshot, regardless of the cursor.
    pub fn first(&self, storage: &dyn EntityStorage) -> Option<Q> {
        self.ids
            .iter()
            .find_map(|&id| Query::<Q>::read(storage, id))
    }

    /// Read every live match in the snapshot, regardless of the cursor.
    pub fn to_list(&self, storage: &dyn EntityStorage) -> Vec<Q> {
        self.ids
            .iter()
            .filter_map(|&id| Query::<Q>::read(storage, id))
            .collect()
    }

    /// Size of the id snapshot.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Ids not yet visited by `next`.
    pub fn remaining(&self) -> usize {
        self.ids.len() - self.cursor
    }

    pub fn ids(&self) -> &[EntityId] {
        &self.ids
    }

    /// Adapt into a standard iterator over the remaining live matches. The
    /// storage stays borrowed for the whole traversal.
    #[allow(clippy::should_implement_trait)]
    pub fn into_iter(self, storage: &dyn EntityStorage) -> QueryItems<'_, Q> {
        QueryItems {
            inner: self,
            storage,
        }
    }
}

/// Iterator returned by [`QueryIter::into_iter`]. Skips stale ids.
pub struct QueryItems<'s, Q> {
    inner: QueryIter<Q>,
    storage: &'s dyn EntityStorage,
}

impl<Q: QueryShape> Iterator for QueryItems<'_, Q> {
    type Item = Q;

    fn next(&mut self) -> Option<Q> {
        while self.inner.next(self.storage) {
            if let Some(item) = self.inner.take_item() {
                return Some(item);
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.inner.remaining()))
    }
}
