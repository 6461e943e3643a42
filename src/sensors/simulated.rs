//! Scripted weather for hardware-free nodes.
//!
//! Replays a 300-hour loop, one simulated hour per real minute of uptime:
//!
//! | hours     | phase          | T (°C) | RH (%) |
//! |-----------|----------------|--------|--------|
//! | 0–100     | tropical storm | 28     | 95     |
//! | 101–200   | dry spell      | 25     | 45     |
//! | 201–299   | freeze         | 5      | 90     |

use std::sync::Arc;

use crate::app::ports::{SensorDriver, TimePort};
use crate::error::DriverError;
use crate::sensors::RawSample;

/// Real milliseconds per simulated hour.
pub const MS_PER_SIM_HOUR: u64 = 60_000;
/// Length of the weather loop in simulated hours.
pub const CYCLE_HOURS: u64 = 300;

/// Climate phase of the weather loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Storm,
    DrySpell,
    Freeze,
}

impl Phase {
    pub fn at_hour(cycle_hour: u64) -> Self {
        match cycle_hour {
            0..=100 => Self::Storm,
            101..=200 => Self::DrySpell,
            _ => Self::Freeze,
        }
    }

    pub fn conditions(self) -> (f32, f32) {
        match self {
            Self::Storm => (28.0, 95.0),
            Self::DrySpell => (25.0, 45.0),
            Self::Freeze => (5.0, 90.0),
        }
    }
}

/// Weather-script channel.  Always present, always calibrated.
pub struct SimulatedWeather {
    clock: Arc<dyn TimePort>,
}

impl SimulatedWeather {
    pub fn new(clock: Arc<dyn TimePort>) -> Self {
        Self { clock }
    }

    /// Position inside the loop, in simulated hours.
    pub fn cycle_hour(&self) -> u64 {
        (self.clock.uptime_ms() / MS_PER_SIM_HOUR) % CYCLE_HOURS
    }
}

impl SensorDriver for SimulatedWeather {
    fn detect(&mut self) -> Result<(), DriverError> {
        Ok(())
    }

    fn read(&mut self) -> Result<RawSample, DriverError> {
        let (t, h) = Phase::at_hour(self.cycle_hour()).conditions();
        Ok(RawSample::new(t, h))
    }
}
