//! # Entity — Opaque Identifiers
//!
//! An [`EntityId`] is just a number. It doesn't "contain" anything; the
//! [`EntityStorage`](super::storage::EntityStorage) maps ids to components.
//!
//! ## Design: Monotonic, Never Recycled
//!
//! Ids are handed out 1, 2, 3, … by the owning
//! [`Simulation`](super::simulation::Simulation) and are never reused, not even
//! after the entity is deleted. A stale id therefore can never alias a newer
//! entity; lookups on it simply come back empty.
//!
//! ```text
//! add    → 1
//! add    → 2
//! delete 1
//! add    → 3   (1 is gone for good)
//! ```
//!
//! `0` is reserved as [`EntityId::INVALID`] and is never allocated.
//!
//! ## Comparison
//!
//! - **hecs / bevy_ecs**: recycle slots and pair them with a generation counter.
//! - **kestrel**: a plain `u32` counter. 4 billion entities per simulation is
//!   plenty for the workloads this runtime targets, and there is no
//!   generation to check on every lookup.

use std::fmt;

use serde::Serialize;

/// Handle to an entity inside one [`Simulation`](super::simulation::Simulation).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct EntityId(pub(crate) u32);

impl EntityId {
    /// The reserved id. Never produced by an allocator.
    pub const INVALID: EntityId = EntityId(0);

    /// Wrap a raw id. Mostly useful for tests and for driving a storage engine
    /// directly without a `Simulation`.
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw numeric id.
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// `false` only for [`EntityId::INVALID`].
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({})", self.0)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for EntityId {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

/// Hands out strictly increasing entity ids starting at 1.
///
/// ```text
/// next: 4      ← the id the next `allocate()` returns
/// ```
pub(crate) struct EntityIdAllocator {
    next: u32,
}

impl EntityIdAllocator {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    /// Allocate a fresh id.
    ///
    /// # Panics
    ///
    /// Panics if the `u32` id space is exhausted. Wrapping around would hand
    /// out `0` and then ids that may still be alive.
    pub fn allocate(&mut self) -> EntityId {
        let id = EntityId(self.next);
        self.next = self
            .next
            .checked_add(1)
            .unwrap_or_else(|| panic!("entity id space exhausted after {}", id));
        id
    }

    /// Total number of ids handed out so far.
    pub fn allocated(&self) -> u32 {
        self.next - 1
    }
}
