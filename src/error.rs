//! Unified error types for the Moldwatch firmware core.
//!
//! Hardware and transport failures are resolved close to where they happen
//! (diagnostics turn driver errors into health codes, the scheduler logs
//! transport errors), so these types rarely travel far.  All variants are
//! `Copy` so they can be passed between tasks without allocation.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Start-up failures.  Runtime faults never surface as this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Configuration cannot drive the tasks (e.g. tied or zero periods).
    Config(&'static str),
    /// A task or peripheral failed to start.
    Init(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Sensor driver errors
// ---------------------------------------------------------------------------

/// Failure classes reported by a [`SensorDriver`](crate::app::ports::SensorDriver).
///
/// Health diagnostics map each class onto a distinct
/// [`HealthStatus`](crate::health::HealthStatus).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverError {
    /// No response on the bus (absent device, swapped SDA/SCL).
    Bus,
    /// Device answered but is not calibrated / not ready.
    NotReady,
    /// Device acknowledged its address but went silent mid-transfer
    /// (VCC or GND lost).
    Power,
    /// Measurement could not be fetched.
    Fetch,
    /// Measurement arrived with a bad CRC.
    Checksum,
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bus => write!(f, "bus fault"),
            Self::NotReady => write!(f, "device not ready"),
            Self::Power => write!(f, "power fault"),
            Self::Fetch => write!(f, "sample fetch failed"),
            Self::Checksum => write!(f, "checksum mismatch"),
        }
    }
}

impl std::error::Error for DriverError {}

// ---------------------------------------------------------------------------
// Transport errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    /// Outbound buffer is full; the report was not queued.
    Busy,
    /// The report could not be encoded into a frame.
    Encode,
    /// The link is down.
    Closed,
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Busy => write!(f, "transport busy"),
            Self::Encode => write!(f, "report encoding failed"),
            Self::Closed => write!(f, "link closed"),
        }
    }
}

impl std::error::Error for TransportError {}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
