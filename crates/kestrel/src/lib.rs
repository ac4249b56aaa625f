//! # Kestrel — A Small, Single-Threaded ECS Runtime
//!
//! Entities with dynamically attached components, shape-declared queries, and
//! a tree of switchable stages driving setup, update, and render passes.
//!
//! Start with `use kestrel::prelude::*` and build a
//! [`Simulation`](ecs::Simulation).

pub mod ecs;
pub mod prelude;
pub mod time;

#[cfg(feature = "diagnostics")]
pub mod diag;

/// Initialise logging from `RUST_LOG`.
///
/// With the `diagnostics` feature, records are also captured for
/// [`diag::snapshot`].
pub fn init_logger() {
    #[cfg(feature = "diagnostics")]
    diag::init_logger();

    #[cfg(not(feature = "diagnostics"))]
    if env_logger::try_init().is_err() {
        eprintln!("[kestrel] Warning: a logger is already set.");
    }
}
