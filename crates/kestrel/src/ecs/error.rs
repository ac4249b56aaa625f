//! Error types surfaced to the host loop.
//!
//! Only recoverable conditions live here. Contract violations (duplicate
//! entity ids, malformed query shapes through [`Query::new`](super::query::Query::new))
//! panic at the point of misuse, and expected absence is an `Option`.

use thiserror::Error;

/// Boxed error returned by [`Setup::setup`](super::system::Setup::setup).
///
/// Any `std::error::Error + Send + Sync` converts into it with `?`.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A system's setup hook failed. Setup stops at the first failure.
#[derive(Debug, Error)]
#[error("setup of `{system}` in stage `{stage}` failed: {source}")]
pub struct SetupError {
    /// Label of the stage that owns the system, `<root>` for flat executors.
    pub stage: String,
    /// Short type name of the failing system.
    pub system: String,
    #[source]
    pub source: BoxError,
}

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error(transparent)]
    Setup(#[from] SetupError),

    /// A pass was started from inside a system while the executor was
    /// already running.
    #[error("the system executor is already running a pass")]
    ExecutorBusy,

    #[error("no system executor is installed")]
    MissingExecutor,
}

/// Why a query shape was rejected by [`Query::try_new`](super::query::Query::try_new).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("query shape declares more than one `EntityId` slot")]
    MultipleIdSlots,

    /// The same component type appears in more than one slot.
    #[error("component `{type_name}` appears in more than one slot")]
    ConflictingSlot { type_name: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setup_error_names_context() {
        let err = SetupError {
            stage: "physics".into(),
            system: "Gravity".into(),
            source: "no world bounds".into(),
        };
        assert_eq!(
            err.to_string(),
            "setup of `Gravity` in stage `physics` failed: no world bounds"
        );
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn simulation_error_is_transparent_over_setup() {
        let err: SimulationError = SetupError {
            stage: "<root>".into(),
            system: "Loader".into(),
            source: "missing".into(),
        }
        .into();
        assert!(err.to_string().starts_with("setup of `Loader`"));
    }
}
