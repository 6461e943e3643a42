//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ domain (health · mold · scheduler · server)
//! ```
//!
//! Driven adapters (sensor drivers, transports, output sinks, config stores,
//! clocks) implement these traits.  The domain consumes them via generics, so
//! the core never touches hardware or the network directly.

use crate::config::SystemConfig;
use crate::error::{DriverError, TransportError};
use crate::sensors::RawSample;

use super::report::Report;

// ───────────────────────────────────────────────────────────────
// Sensor driver port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// One physical temperature/humidity channel.
///
/// Callers must hold the sensor-bus lock; drivers are not internally
/// synchronised.
pub trait SensorDriver: Send {
    /// Connectivity check.  `Err(Bus)` when the device does not answer,
    /// `Err(NotReady)` when it answers but cannot measure yet.
    fn detect(&mut self) -> Result<(), DriverError>;

    /// Fetch one measurement.  Per-field decode failures are reported as
    /// `None` inside the sample, transfer failures as `Err`.
    fn read(&mut self) -> Result<RawSample, DriverError>;
}

// ───────────────────────────────────────────────────────────────
// Transport port (driven adapter: domain → mesh network)
// ───────────────────────────────────────────────────────────────

/// Delivery outcome for a previously sent report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The server acknowledged the request.
    Confirmed,
    /// No acknowledgment arrived.
    Failed,
}

/// Observer invoked asynchronously once the outcome of a send is known.
/// Purely observational: it must not block and never triggers a resend.
pub type DeliveryCallback = fn(Delivery);

/// Outbound report channel.  Callers must hold the transport lock.
pub trait Transport: Send {
    /// Queue `report` for delivery.  Returns as soon as the report is queued;
    /// the outcome arrives later through `on_delivery`.
    fn send(&mut self, report: &Report, on_delivery: DeliveryCallback)
    -> Result<(), TransportError>;
}

// ───────────────────────────────────────────────────────────────
// Output sink port (driven adapter: server → console / log)
// ───────────────────────────────────────────────────────────────

/// Fire-and-forget line output used by the pipeline consumer.
pub trait OutputSink: Send {
    fn write_line(&mut self, text: &str);
}

// ───────────────────────────────────────────────────────────────
// Time port
// ───────────────────────────────────────────────────────────────

/// Monotonic clock.
pub trait TimePort: Send + Sync {
    /// Milliseconds since boot.
    fn uptime_ms(&self) -> u64;
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists system configuration.
///
/// Implementations MUST validate config values before persisting and after
/// loading.  Invalid ranges are rejected with
/// [`ConfigError::ValidationFailed`], not silently clamped.
pub trait ConfigPort {
    /// Load configuration from persistent storage.
    /// Returns [`SystemConfig::default()`] if no stored config exists.
    fn load(&self) -> Result<SystemConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&self, config: &SystemConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug)]
pub enum ConfigError {
    /// No config found in storage (first boot).
    NotFound,
    /// Stored config failed deserialization.
    Corrupted,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Generic I/O error from the storage backend.
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl std::error::Error for ConfigError {}
