//! Sensor health diagnostics.
//!
//! Validates the physical integrity of both redundant sensor channels once
//! per health cycle and converts raw driver failures into a [`HealthStatus`]
//! per channel.
//!
//! ## Per-channel pipeline
//!
//! Evaluation short-circuits on the first failing stage:
//!
//! ```text
//! detect ─▶ fetch ──▶ decode ──▶ range ──▶ Ok(sample)
//!   │         │          │          │
//!   ▼         ▼          ▼          ▼
//! BusFault  PowerFault  TempRead   BothOutOfRange
//! NotReady  FetchFault  HumRead    TempOutOfRange
//!                       BothRead   HumidityOutOfRange
//! ```
//!
//! When both channels come back `Ok`, a cross-check escalates both to
//! `ValueDrift` if they disagree by more than [`MAX_DRIFT`].

use core::ops::RangeInclusive;

use log::{debug, error, warn};

use crate::app::ports::SensorDriver;
use crate::error::DriverError;
use crate::sensors::{RawSample, SensorSample};

/// Maximum disagreement between channels, in °C and in % RH.
pub const MAX_DRIFT: f32 = 5.0;

/// Physically plausible temperature (°C).
pub const TEMP_VALID: RangeInclusive<f32> = -40.0..=80.0;

/// Physically plausible relative humidity (%).
pub const HUMIDITY_VALID: RangeInclusive<f32> = 0.0..=100.0;

/// Diagnostic verdict for one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HealthStatus {
    /// Channel healthy.
    Ok,
    /// Channels disagree by more than [`MAX_DRIFT`]; readings still usable.
    ValueDrift,
    /// No answer on the bus. Often swapped SDA/SCL.
    BusFault,
    /// Device present but not ready.
    NotReady,
    /// Device went silent mid-transfer. VCC or GND disconnected.
    PowerFault,
    /// Sample fetch failed.
    FetchFault,
    TempReadFault,
    HumidityReadFault,
    BothReadFault,
    TempOutOfRange,
    HumidityOutOfRange,
    BothOutOfRange,
}

/// Severity classes, ordered.  Gating only distinguishes these three.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Nominal,
    Flagged,
    Fault,
}

impl HealthStatus {
    pub fn severity(self) -> Severity {
        match self {
            Self::Ok => Severity::Nominal,
            Self::ValueDrift => Severity::Flagged,
            _ => Severity::Fault,
        }
    }

    /// Whether downstream tasks may read this channel.
    pub fn is_enabled(self) -> bool {
        self.severity() <= Severity::Flagged
    }

    /// Numeric code used on the wire.
    pub fn code(self) -> u8 {
        match self {
            Self::Ok => 0,
            Self::ValueDrift => 1,
            Self::BusFault => 2,
            Self::NotReady => 3,
            Self::PowerFault => 4,
            Self::FetchFault => 5,
            Self::TempReadFault => 6,
            Self::HumidityReadFault => 7,
            Self::BothReadFault => 8,
            Self::TempOutOfRange => 9,
            Self::HumidityOutOfRange => 10,
            Self::BothOutOfRange => 11,
        }
    }
}

/// Result of one full diagnostic cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Diagnosis {
    /// One status per physical channel (A, B).
    pub status: [HealthStatus; 2],
    /// Validated readings; `Some` only where the channel passed every stage.
    pub samples: [Option<SensorSample>; 2],
}

impl Diagnosis {
    /// `channel_enabled` flags derived from the statuses.
    pub fn enabled(&self) -> [bool; 2] {
        [self.status[0].is_enabled(), self.status[1].is_enabled()]
    }
}

const CHANNEL_NAMES: [&str; 2] = ["A", "B"];

/// Run the full pipeline on both channels, then the drift cross-check.
/// Caller must hold the sensor-bus lock.
pub fn check_system_health<D: SensorDriver>(channels: &mut [D; 2]) -> Diagnosis {
    let (status_a, sample_a) = check_channel(CHANNEL_NAMES[0], &mut channels[0]);
    let (status_b, sample_b) = check_channel(CHANNEL_NAMES[1], &mut channels[1]);

    let mut status = [status_a, status_b];
    if let (Some(a), Some(b)) = (sample_a, sample_b) {
        drift(&mut status, a, b);
    }

    Diagnosis {
        status,
        samples: [sample_a, sample_b],
    }
}

/// Validate a single channel.  Yields a sample only on `Ok`.
pub fn check_channel<D: SensorDriver>(
    name: &str,
    driver: &mut D,
) -> (HealthStatus, Option<SensorSample>) {
    if let Err(e) = driver.detect() {
        let status = match e {
            DriverError::NotReady => HealthStatus::NotReady,
            _ => HealthStatus::BusFault,
        };
        error!("HEALTH | sensor {} connectivity: {} ({:?})", name, e, status);
        return (status, None);
    }

    let raw = match driver.read() {
        Ok(raw) => raw,
        Err(e) => {
            let status = match e {
                DriverError::Power => HealthStatus::PowerFault,
                _ => HealthStatus::FetchFault,
            };
            error!("HEALTH | sensor {} fetch: {} ({:?})", name, e, status);
            return (status, None);
        }
    };

    match validate(raw) {
        Ok(sample) => {
            debug!(
                "HEALTH | sensor {}: T={:.2} H={:.2}",
                name, sample.temperature, sample.humidity
            );
            (HealthStatus::Ok, Some(sample))
        }
        Err(status) => {
            error!("HEALTH | sensor {} rejected sample: {:?}", name, status);
            (status, None)
        }
    }
}

/// Decode and range stages.  The combined out-of-range code is checked
/// before either single-field code.
pub fn validate(raw: RawSample) -> Result<SensorSample, HealthStatus> {
    let (temperature, humidity) = match (raw.temperature, raw.humidity) {
        (None, None) => return Err(HealthStatus::BothReadFault),
        (None, Some(_)) => return Err(HealthStatus::TempReadFault),
        (Some(_), None) => return Err(HealthStatus::HumidityReadFault),
        (Some(t), Some(h)) => (t, h),
    };

    let temp_bad = !TEMP_VALID.contains(&temperature);
    let hum_bad = !HUMIDITY_VALID.contains(&humidity);
    match (temp_bad, hum_bad) {
        (true, true) => Err(HealthStatus::BothOutOfRange),
        (true, false) => Err(HealthStatus::TempOutOfRange),
        (false, true) => Err(HealthStatus::HumidityOutOfRange),
        (false, false) => Ok(SensorSample {
            temperature,
            humidity,
        }),
    }
}

/// Cross-check two healthy channels.  Escalates only statuses that are
/// still `Ok`.  Returns `true` when drift was detected.
pub fn drift(status: &mut [HealthStatus; 2], a: SensorSample, b: SensorSample) -> bool {
    let temp_diff = (a.temperature - b.temperature).abs();
    let hum_diff = (a.humidity - b.humidity).abs();
    debug!("HEALTH | drift T={:.2} H={:.2}", temp_diff, hum_diff);

    if temp_diff > MAX_DRIFT || hum_diff > MAX_DRIFT {
        warn!(
            "HEALTH | sensor drift detected (T diff {:.1}, H diff {:.1})",
            temp_diff, hum_diff
        );
        for s in status.iter_mut() {
            if *s == HealthStatus::Ok {
                *s = HealthStatus::ValueDrift;
            }
        }
        return true;
    }
    false
}
