//! Inspector boundary: read-only snapshots of a running simulation.
//!
//! Enabled by the `diagnostics` feature flag. A debug UI (or a test, or a log
//! line) calls [`snapshot`] with a [`ComponentRegistry`] and gets back a
//! serde-serialisable [`SimulationSnapshot`]:
//!
//! ```text
//! SimulationSnapshot
//! ├── tick / frame / delta_ms / last_render_us
//! ├── entities: [EntitySnapshot { id, name, components: [ComponentSnapshot] }]
//! ├── stages:   [StageSnapshot { label, enabled, timings, systems, sub_stages }]
//! ├── systems:  flat executors only
//! └── logs:     up to 50 records captured by `init_logger`
//! ```
//!
//! The registry is an explicit value the caller owns. Component types that
//! were never registered show up as `<opaque>`.

use std::any::{Any, TypeId};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::{Mutex, OnceLock};
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::ecs::component::{ComponentBox, ComponentKind, LabelComponent, NameComponent};
use crate::ecs::entity::EntityId;
use crate::ecs::query::AllEntities;
use crate::ecs::simulation::Simulation;
use crate::ecs::stage::Stage;
use crate::ecs::system::SystemEntry;

/// Extra inspector output, appended after the default `Debug` rendering.
///
/// ```ignore
/// impl Inspect for Spawner {
///     fn inspect(&self) -> String {
///         format!("{} spawned, next in {:.1}s", self.count, self.cooldown)
///     }
/// }
/// ```
pub trait Inspect {
    fn inspect(&self) -> String;
}

// ── ComponentRegistry ────────────────────────────────────────────────────

type FormatFn = Box<dyn Fn(&dyn Any) -> Option<String>>;

#[derive(Default)]
struct Formatters {
    debug: Option<FormatFn>,
    inspect: Option<FormatFn>,
}

/// Maps `TypeId` to formatter functions so component values can be rendered
/// by the inspector.
#[derive(Default)]
pub struct ComponentRegistry {
    formatters: HashMap<TypeId, Formatters>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry that already knows the built-in components.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register::<NameComponent>();
        registry.register::<LabelComponent>();
        registry
    }

    /// Render `T` with its `Debug` impl.
    pub fn register<T: fmt::Debug + 'static>(&mut self) -> &mut Self {
        self.register_with::<T>(|value| format!("{:?}", value))
    }

    /// Render `T` with a custom formatter.
    pub fn register_with<T: 'static>(&mut self, format: fn(&T) -> String) -> &mut Self {
        self.formatters.entry(TypeId::of::<T>()).or_default().debug =
            Some(Box::new(move |any: &dyn Any| any.downcast_ref::<T>().map(format)));
        self
    }

    /// Append `T`'s [`Inspect`] output after its default rendering.
    pub fn register_inspect<T: Inspect + 'static>(&mut self) -> &mut Self {
        self.formatters.entry(TypeId::of::<T>()).or_default().inspect =
            Some(Box::new(|any: &dyn Any| any.downcast_ref::<T>().map(T::inspect)));
        self
    }

    pub fn is_registered(&self, type_id: &TypeId) -> bool {
        self.formatters.contains_key(type_id)
    }

    /// Format a component value, or return `"<opaque>"` if unregistered.
    pub fn format(&self, type_id: &TypeId, value: &dyn Any) -> String {
        self.formatters
            .get(type_id)
            .and_then(|f| f.debug.as_ref())
            .and_then(|debug| debug(value))
            .unwrap_or_else(|| "<opaque>".to_string())
    }

    fn inspect(&self, type_id: &TypeId, value: &dyn Any) -> Option<String> {
        let inspect = self.formatters.get(type_id)?.inspect.as_ref()?;
        inspect(value)
    }
}

impl fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentRegistry")
            .field("types", &self.formatters.len())
            .finish()
    }
}

// ── Snapshot types ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct SimulationSnapshot {
    pub tick: u64,
    pub frame: u64,
    pub delta_ms: f32,
    pub last_render_us: f64,
    pub storage: String,
    pub entity_count: usize,
    pub entities: Vec<EntitySnapshot>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub stages: Vec<StageSnapshot>,
    /// Systems of a stage-less executor. Empty when a scheduler is installed.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub systems: Vec<SystemSnapshot>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub logs: Vec<LogEntrySnapshot>,
}

impl SimulationSnapshot {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EntitySnapshot {
    pub id: EntityId,
    /// From the entity's [`NameComponent`], if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub components: Vec<ComponentSnapshot>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComponentSnapshot {
    pub name: String,
    pub kind: ComponentKind,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inspect: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StageSnapshot {
    pub label: String,
    pub enabled: bool,
    pub update_us: f64,
    pub render_us: f64,
    pub systems: Vec<SystemSnapshot>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sub_stages: Vec<StageSnapshot>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SystemSnapshot {
    pub name: String,
    pub setup: bool,
    pub render: bool,
    pub update_us: f64,
    pub render_us: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inspect: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LogEntrySnapshot {
    pub level: String,
    pub target: String,
    pub message: String,
    pub timestamp_secs: f32,
}

fn micros(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1_000_000.0
}

// ── Snapshotting ─────────────────────────────────────────────────────────

/// Capture the whole simulation. Entities are ordered by id, components by
/// name. Takes up to 50 captured log records.
///
/// Returns a partial snapshot (no stages or systems) when called from inside
/// a pass, because the executor is out of the simulation then.
pub fn snapshot(sim: &Simulation, registry: &ComponentRegistry) -> SimulationSnapshot {
    let mut ids: Vec<EntityId> = sim
        .query::<AllEntities>()
        .ids()
        .to_vec();
    ids.sort_unstable();

    let entities = ids
        .into_iter()
        .filter_map(|id| inspect_entity(sim, registry, id))
        .collect();

    let (stages, systems) = match sim.scheduler() {
        Some(scheduler) => (
            scheduler.stages().iter().map(stage_snapshot).collect(),
            Vec::new(),
        ),
        None => (
            Vec::new(),
            sim.executor()
                .map(|executor| executor.systems().into_iter().map(system_snapshot).collect())
                .unwrap_or_default(),
        ),
    };

    let clock = sim.clock();
    SimulationSnapshot {
        tick: clock.tick(),
        frame: clock.frame(),
        delta_ms: clock.delta().as_secs_f32() * 1000.0,
        last_render_us: micros(clock.last_render_time()),
        storage: crate::ecs::component::short_type_name(sim.storage().engine_name()),
        entity_count: sim.entity_count(),
        entities,
        stages,
        systems,
        logs: take_captured_logs(LOGS_PER_SNAPSHOT),
    }
}

/// Capture one entity, `None` if it does not exist.
pub fn inspect_entity(
    sim: &Simulation,
    registry: &ComponentRegistry,
    id: EntityId,
) -> Option<EntitySnapshot> {
    let storage = sim.storage();
    if !storage.has(id) {
        return None;
    }
    let mut components: Vec<ComponentSnapshot> = storage
        .get(id)
        .into_iter()
        .map(|component| component_snapshot(registry, component))
        .collect();
    components.sort_by(|a, b| a.name.cmp(&b.name));

    Some(EntitySnapshot {
        id,
        name: sim.component::<NameComponent>(id).map(|n| n.name.clone()),
        components,
    })
}

fn component_snapshot(registry: &ComponentRegistry, component: &ComponentBox) -> ComponentSnapshot {
    let type_id = component.type_id();
    ComponentSnapshot {
        name: component.short_name(),
        kind: component.kind(),
        value: registry.format(&type_id, component.as_any()),
        inspect: registry.inspect(&type_id, component.as_any()),
    }
}

fn stage_snapshot(stage: &Stage) -> StageSnapshot {
    StageSnapshot {
        label: stage.label().to_string(),
        enabled: stage.is_enabled(),
        update_us: micros(stage.update_timer().last()),
        render_us: micros(stage.render_timer().last()),
        systems: stage.systems().iter().map(system_snapshot).collect(),
        sub_stages: stage.sub_stages().iter().map(stage_snapshot).collect(),
    }
}

fn system_snapshot(entry: &SystemEntry) -> SystemSnapshot {
    SystemSnapshot {
        name: entry.name().to_string(),
        setup: entry.has_setup(),
        render: entry.has_render(),
        update_us: micros(entry.last_update()),
        render_us: micros(entry.last_render()),
        debug: entry.debug(),
        inspect: entry.inspect(),
    }
}

// ── Log Capture ──────────────────────────────────────────────────────────

/// Records kept between snapshots. The oldest is dropped first.
const BACKLOG_CAPACITY: usize = 500;
/// Records handed to each snapshot.
const LOGS_PER_SNAPSHOT: usize = 50;

/// Log records waiting for the next snapshot, already in wire form.
struct LogBacklog {
    started: Instant,
    capacity: usize,
    records: Mutex<VecDeque<LogEntrySnapshot>>,
}

impl LogBacklog {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            started: Instant::now(),
            capacity,
            records: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    fn record(&self, record: &log::Record) {
        let entry = LogEntrySnapshot {
            level: record.level().to_string(),
            target: record.target().to_string(),
            message: record.args().to_string(),
            timestamp_secs: self.started.elapsed().as_secs_f32(),
        };
        let Ok(mut records) = self.records.lock() else {
            return;
        };
        if records.len() >= self.capacity {
            records.pop_front();
        }
        records.push_back(entry);
    }

    /// Remove and return the oldest `max` records.
    fn take(&self, max: usize) -> Vec<LogEntrySnapshot> {
        match self.records.lock() {
            Ok(mut records) => {
                let n = records.len().min(max);
                records.drain(..n).collect()
            }
            Err(_) => Vec::new(),
        }
    }
}

static BACKLOG: OnceLock<LogBacklog> = OnceLock::new();

/// env_logger for stderr, plus a copy of every `info`-or-louder record (and
/// whatever else `RUST_LOG` lets through) in the backlog.
struct CapturingLogger {
    stderr: env_logger::Logger,
    backlog: &'static LogBacklog,
}

impl log::Log for CapturingLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::Level::Info || self.stderr.enabled(metadata)
    }

    fn log(&self, record: &log::Record) {
        // env_logger applies its own RUST_LOG filter.
        self.stderr.log(record);
        self.backlog.record(record);
    }

    fn flush(&self) {
        self.stderr.flush();
    }
}

static LOGGER: OnceLock<CapturingLogger> = OnceLock::new();

/// Install the capturing logger. Call it before anything logs, or the early
/// records are lost.
pub fn init_logger() {
    let backlog = BACKLOG.get_or_init(|| LogBacklog::with_capacity(BACKLOG_CAPACITY));
    let stderr = env_logger::Builder::from_default_env().build();
    let level = stderr.filter().max(log::LevelFilter::Info);
    let logger = LOGGER.get_or_init(|| CapturingLogger { stderr, backlog });

    match log::set_logger(logger) {
        Ok(()) => log::set_max_level(level),
        Err(_) => eprintln!("[kestrel] Warning: a logger is already set. Log capture disabled."),
    }
}

/// Up to `max` captured records, oldest first. Empty unless
/// [`init_logger`] installed the capturing logger.
pub(crate) fn take_captured_logs(max: usize) -> Vec<LogEntrySnapshot> {
    BACKLOG
        .get()
        .map(|backlog| backlog.take(max))
        .unwrap_or_default()
}
