//! Sensor subsystem: redundant channel access and the shared enable flags.
//!
//! [`SensorBus`] owns both physical channels *and* the [`SharedSensorState`]
//! they gate.  The scheduler wraps the bus in a single mutex (the sensor-bus
//! lock), so flag updates and reads are always observed whole.
//!
//! ```text
//!   Health task ──▶ diagnose() ──▶ writes {a_enabled, b_enabled}
//!                                          │
//!   Telemetry / Mold ──▶ read() ◀──────────┘  (read-only use of the flags)
//! ```

pub mod dht20;
pub mod simulated;

use log::{debug, warn};

use crate::app::ports::SensorDriver;
use crate::health::{self, Diagnosis};

/// A validated reading.  Never persisted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorSample {
    /// °C
    pub temperature: f32,
    /// % RH
    pub humidity: f32,
}

/// Driver output before validation.  `None` marks a field that failed to decode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawSample {
    pub temperature: Option<f32>,
    pub humidity: Option<f32>,
}

impl RawSample {
    pub fn new(temperature: f32, humidity: f32) -> Self {
        Self {
            temperature: Some(temperature),
            humidity: Some(humidity),
        }
    }
}

/// Channel gating flags.  Both start disabled until the first health verdict.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SharedSensorState {
    pub channel_a_enabled: bool,
    pub channel_b_enabled: bool,
}

/// Both redundant channels plus their gating flags.
pub struct SensorBus<D> {
    channels: [D; 2],
    state: SharedSensorState,
}

impl<D: SensorDriver> SensorBus<D> {
    pub fn new(channel_a: D, channel_b: D) -> Self {
        Self {
            channels: [channel_a, channel_b],
            state: SharedSensorState::default(),
        }
    }

    /// Run diagnostics and publish the resulting flags in one step.
    pub fn diagnose(&mut self) -> Diagnosis {
        let diagnosis = health::check_system_health(&mut self.channels);
        let [a, b] = diagnosis.enabled();
        self.state = SharedSensorState {
            channel_a_enabled: a,
            channel_b_enabled: b,
        };
        diagnosis
    }

    /// Current gating flags.
    pub fn state(&self) -> SharedSensorState {
        self.state
    }

    /// Read according to the current flags.
    pub fn read(&mut self) -> Option<SensorSample> {
        read_channels(&mut self.channels, self.state)
    }
}

/// Read policy:
///
/// - both enabled → read both, average each quantity;
/// - one enabled → read that channel only;
/// - none enabled → `None`, no bus traffic.
///
/// If one of two enabled channels fails mid-read, the other's reading is used.
pub fn read_channels<D: SensorDriver>(
    channels: &mut [D; 2],
    state: SharedSensorState,
) -> Option<SensorSample> {
    let [a, b] = channels;
    match (state.channel_a_enabled, state.channel_b_enabled) {
        (true, true) => {
            debug!("SENSORS | reading both channels");
            match (read_one(a), read_one(b)) {
                (Some(x), Some(y)) => Some(SensorSample {
                    temperature: (x.temperature + y.temperature) / 2.0,
                    humidity: (x.humidity + y.humidity) / 2.0,
                }),
                (Some(only), None) | (None, Some(only)) => {
                    warn!("SENSORS | one channel failed mid-read, using the other");
                    Some(only)
                }
                (None, None) => None,
            }
        }
        (true, false) => {
            warn!("SENSORS | failover: channel A only");
            read_one(a)
        }
        (false, true) => {
            warn!("SENSORS | failover: channel B only");
            read_one(b)
        }
        (false, false) => None,
    }
}

fn read_one<D: SensorDriver>(driver: &mut D) -> Option<SensorSample> {
    let raw = driver.read().ok()?;
    health::validate(raw).ok()
}
