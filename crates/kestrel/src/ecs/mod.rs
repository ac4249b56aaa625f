//! # Entity Component System Core
//!
//! Entities are ids, components are plain data attached to them, and systems
//! are the logic that runs over them each pass.
//!
//! ## Module Overview
//!
//! - [`entity`] — Monotonic entity ids
//! - [`component`] — Component trait, `Shared<T>`, type-erased boxes
//! - [`storage`] — The `EntityStorage` contract and its two engines
//! - [`query`] — Shape-declared queries with snapshot iteration
//! - [`system`] — Capability traits, registration, executors
//! - [`stage`] — Stage tree and the `Scheduler`
//! - [`frame`] — The per-pass context systems receive
//! - [`simulation`] — The façade tying it all together
//! - [`error`] — Recoverable errors

pub mod component;
pub mod entity;
pub mod error;
pub mod frame;
pub mod query;
pub mod simulation;
pub mod stage;
pub mod storage;
pub mod system;

pub use component::{
    Component, ComponentBox, ComponentKind, ComponentSet, LabelComponent, NameComponent, Shared,
};
pub use entity::EntityId;
pub use error::{BoxError, QueryError, SetupError, SimulationError};
pub use frame::{FrameData, SimulationFrame};
pub use query::{AllEntities, Query, QueryIter, QueryShape, QuerySlot, Skip, Without};
pub use simulation::{Simulation, SimulationBuilder};
pub use stage::{Scheduler, Stage, StageTimer};
pub use storage::{ArchetypeStorage, EntityStorage, SimpleStorage};
pub use system::{
    IntoRegistration, Registration, Render, SequentialExecutor, Setup, System, SystemEntry,
    SystemExecutor,
};
