//! Sensor-node task scheduler.
//!
//! Three periodic tasks share one sensor bus, one transport and one mold
//! model.  Priorities follow rate-monotonic ordering: the shorter the
//! period, the higher the priority, so the health check that gates every
//! other reader always preempts.
//!
//! ```text
//!             settle_delay           stagger
//!   boot ───────────────────▶ Health ───────▶ Telemetry, MoldUpdate
//!
//!   ┌──────────┐   bus lock    ┌────────────┐   transport lock   ┌───────────┐
//!   │ Health   │──────────────▶│ SensorBus  │                    │ Transport │
//!   │ Telemetry│──────────────▶│ + flags    │ ─ ─ ─ then ─ ─ ─ ▶ │           │
//!   │ Mold     │──────────────▶│            │                    │           │
//!   └──────────┘               └────────────┘                    └───────────┘
//! ```
//!
//! Lock order: the sensor-bus lock is always released before the transport
//! lock is taken.  No task ever holds both, and none takes them in reverse.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use log::{debug, error, info, warn};

use crate::app::ports::{Delivery, SensorDriver, Transport};
use crate::app::report::{MessageKind, Report};
use crate::config::NodeConfig;
use crate::drivers::task_pin::{self, Core, TaskSpec};
use crate::error::{Error, Result};
use crate::health::Diagnosis;
use crate::mold::{MoldModel, RiskLevel};
use crate::sensors::{SensorBus, SensorSample, SharedSensorState};

/// Priority given to the longest-period task.  Shorter periods stack above it.
pub const BASE_PRIORITY: u8 = 5;

const TASK_STACK_KB: usize = 8;

// ═══════════════════════════════════════════════════════════════
//  Task identities
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    Health,
    Telemetry,
    MoldUpdate,
}

impl TaskKind {
    pub const ALL: [TaskKind; 3] = [Self::Health, Self::Telemetry, Self::MoldUpdate];

    pub fn period_ms(self, config: &NodeConfig) -> u64 {
        match self {
            Self::Health => config.health_period_ms,
            Self::Telemetry => config.telemetry_period_ms,
            Self::MoldUpdate => config.mold_period_ms,
        }
    }

    /// Delay before the first run.  Readers wait for the first health verdict.
    pub fn start_delay_ms(self, config: &NodeConfig) -> u64 {
        match self {
            Self::Health => config.settle_delay_ms,
            Self::Telemetry | Self::MoldUpdate => config.settle_delay_ms + config.stagger_ms,
        }
    }

    fn thread_name(self) -> &'static str {
        match self {
            Self::Health => "health\0",
            Self::Telemetry => "telemetry\0",
            Self::MoldUpdate => "mold\0",
        }
    }
}

/// Rate-monotonic priority assignment.
///
/// Sorted by period; the shortest period gets `BASE_PRIORITY + 2`, the
/// longest `BASE_PRIORITY`.  Ties keep declaration order, but a validated
/// config never has ties.
pub fn rate_monotonic(config: &NodeConfig) -> [(TaskKind, u8); 3] {
    let mut by_period = TaskKind::ALL;
    by_period.sort_by_key(|k| k.period_ms(config));

    let mut out = [(TaskKind::Health, 0); 3];
    for (rank, kind) in by_period.into_iter().enumerate() {
        out[rank] = (kind, BASE_PRIORITY + (2 - rank as u8));
    }
    out
}

// ═══════════════════════════════════════════════════════════════
//  Sensor node
// ═══════════════════════════════════════════════════════════════

/// One sensor node: shared resources plus the three task bodies.
pub struct SensorNode<D, T> {
    config: NodeConfig,
    bus: Mutex<SensorBus<D>>,
    transport: Mutex<T>,
    model: Mutex<MoldModel>,
    /// Cleared by [`SensorNode::stop`]; every task loop checks it once per period.
    running: AtomicBool,
}

impl<D, T> SensorNode<D, T>
where
    D: SensorDriver + 'static,
    T: Transport + 'static,
{
    pub fn new(config: NodeConfig, bus: SensorBus<D>, transport: T) -> Self {
        let model = MoldModel::new(config.material);
        info!(
            "NODE | '{}' material={:?} step={:.3}h",
            config.room_name,
            config.material,
            config.mold_time_step_hours()
        );
        Self {
            config,
            bus: Mutex::new(bus),
            transport: Mutex::new(transport),
            model: Mutex::new(model),
            running: AtomicBool::new(true),
        }
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    /// Current channel flags (takes the sensor-bus lock).
    pub fn sensor_state(&self) -> SharedSensorState {
        lock(&self.bus).state()
    }

    /// Copy of the model state.
    pub fn model(&self) -> MoldModel {
        lock(&self.model).clone()
    }

    // ── Task bodies ───────────────────────────────────────────

    /// Diagnose both channels, publish the flags, report the verdict.
    pub fn run_health_cycle(&self) -> Diagnosis {
        let diagnosis = {
            let mut bus = lock(&self.bus);
            bus.diagnose()
        };

        let report = Report::health(&self.config.room_name, diagnosis.status);
        if report.kind == MessageKind::Alert {
            warn!(
                "HEALTH | critical fault: A={:?} B={:?}",
                diagnosis.status[0], diagnosis.status[1]
            );
        }
        self.emit(&report);
        diagnosis
    }

    /// Read per the current flags and report the sample.  Skips when no
    /// channel is usable.
    pub fn run_telemetry_cycle(&self) -> Option<SensorSample> {
        let Some(sample) = self.read_sample() else {
            warn!("TELEMETRY | no usable sensor, cycle skipped");
            return None;
        };
        debug!(
            "TELEMETRY | T={:.2} H={:.2}",
            sample.temperature, sample.humidity
        );
        self.emit(&Report::telemetry(&self.config.room_name, sample));
        Some(sample)
    }

    /// Read, advance the model by one step, report the risk.  The model is
    /// left untouched when no channel is usable.
    pub fn run_mold_cycle(&self) -> Option<RiskLevel> {
        let Some(sample) = self.read_sample() else {
            warn!("MOLD | no usable sensor, step skipped");
            return None;
        };

        let (report, risk) = {
            let mut model = lock(&self.model);
            model.update(
                sample.temperature,
                sample.humidity,
                self.config.mold_time_step_hours(),
            );
            info!(
                "MOLD | index={:.2} risk={:?} growing={}",
                model.mold_index(),
                model.risk_level(),
                model.is_growing()
            );
            (
                Report::mold(&self.config.room_name, sample, &model),
                model.risk_level(),
            )
        };

        self.emit(&report);
        Some(risk)
    }

    fn read_sample(&self) -> Option<SensorSample> {
        let mut bus = lock(&self.bus);
        bus.read()
    }

    fn emit(&self, report: &Report) {
        let mut transport = lock(&self.transport);
        if let Err(e) = transport.send(report, log_delivery) {
            error!("NODE | report not sent: {}", e);
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Spawn the three periodic tasks with rate-monotonic priorities.
    ///
    /// Zero or tied periods leave the priority order undefined and are
    /// rejected before any task is spawned.
    pub fn start(self: &Arc<Self>) -> Result<Vec<JoinHandle<()>>> {
        let [h, t, m] = TaskKind::ALL.map(|k| k.period_ms(&self.config));
        if h == 0 || t == 0 || m == 0 {
            return Err(Error::Config("task periods must be non-zero"));
        }
        if h == t || t == m || h == m {
            return Err(Error::Config("task periods must be distinct"));
        }

        let mut handles = Vec::with_capacity(3);
        for (kind, priority) in rate_monotonic(&self.config) {
            let spec = TaskSpec {
                name: kind.thread_name(),
                core: Core::App,
                priority,
                stack_kb: TASK_STACK_KB,
            };
            let node = Arc::clone(self);
            handles.push(task_pin::spawn(spec, move || node.task_loop(kind))?);
        }
        Ok(handles)
    }

    /// Ask every task to exit after its current sleep.
    ///
    /// Shutdown hook for tests; on the device the tasks run until power-down.
    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    fn task_loop(&self, kind: TaskKind) {
        let period = Duration::from_millis(kind.period_ms(&self.config));
        std::thread::sleep(Duration::from_millis(kind.start_delay_ms(&self.config)));
        info!("{:?} task started, period {:?}", kind, period);

        let mut next = Instant::now();
        while self.is_running() {
            match kind {
                TaskKind::Health => {
                    self.run_health_cycle();
                }
                TaskKind::Telemetry => {
                    self.run_telemetry_cycle();
                }
                TaskKind::MoldUpdate => {
                    self.run_mold_cycle();
                }
            }
            next += period;
            let now = Instant::now();
            if next > now {
                std::thread::sleep(next - now);
            } else {
                warn!("{:?} task overran its period", kind);
                next = now;
            }
        }
        info!("{:?} task stopped", kind);
    }
}

/// Delivery observer handed to the transport.  Logs only, never resends.
pub fn log_delivery(outcome: Delivery) {
    match outcome {
        Delivery::Confirmed => debug!("NODE | delivery confirmed"),
        Delivery::Failed => warn!("NODE | delivery failed, no acknowledgment"),
    }
}

/// Take a lock; a panicked holder does not take the whole node down.
fn lock<V>(m: &Mutex<V>) -> MutexGuard<'_, V> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}
