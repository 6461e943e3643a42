//! System configuration parameters
//!
//! All tunable parameters for the sensor node and the server.  Values can be
//! overridden through a [`ConfigPort`](crate::app::ports::ConfigPort)
//! implementation; every load and save passes through [`SystemConfig::validate`].

use serde::{Deserialize, Serialize};

use crate::app::ports::ConfigError;
use crate::mold::Material;

/// Core system configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SystemConfig {
    pub node: NodeConfig,
    pub server: ServerConfig,
}

/// Sensor-node parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    // --- Identity ---
    /// Location label carried in every report
    pub room_name: heapless::String<32>,
    /// Mesh address of this node
    pub node_address: heapless::String<64>,
    /// Surface material simulated by the mold model
    pub material: Material,

    // --- Task periods ---
    /// Health diagnostic period (milliseconds)
    pub health_period_ms: u64,
    /// Telemetry report period (milliseconds)
    pub telemetry_period_ms: u64,
    /// Mold model step period (milliseconds)
    pub mold_period_ms: u64,

    // --- Start-up ---
    /// Wait after transport init before any task runs (milliseconds)
    pub settle_delay_ms: u64,
    /// Extra delay for Telemetry and MoldUpdate after Health starts (milliseconds)
    pub stagger_ms: u64,

    // --- Model ---
    /// Model hours per wall-clock hour (60.0 = one real minute per model hour)
    pub time_scale: f32,
}

impl NodeConfig {
    /// Model time covered by one MoldUpdate cycle, in hours.
    pub fn mold_time_step_hours(&self) -> f32 {
        self.mold_period_ms as f32 / 3_600_000.0 * self.time_scale
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            room_name: bounded("Office Room"),
            node_address: bounded("fdde:ad00:beef:0:0:0:0:2"),
            material: Material::Sensitive,

            health_period_ms: 10_000,    // 10 s
            telemetry_period_ms: 50_000, // 50 s
            mold_period_ms: 900_000,     // 15 min

            settle_delay_ms: 10_000,
            stagger_ms: 4_000,

            time_scale: 1.0,
        }
    }
}

/// Server-node parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Mesh address the server listens on
    pub server_address: heapless::String<64>,
    /// Silence (milliseconds) after which a node is declared lost
    pub liveness_timeout_ms: u64,
    /// Watchdog sweep period (milliseconds)
    pub sweep_period_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            server_address: bounded("fdde:ad00:beef:0:0:0:0:1"),
            liveness_timeout_ms: 15_000,
            sweep_period_ms: 5_000,
        }
    }
}

impl SystemConfig {
    /// Defaults for a hardware-free run against the scripted weather, where
    /// one real minute stands for one model hour.
    pub fn simulation() -> Self {
        let mut config = Self::default();
        config.node.time_scale = 60.0;
        config
    }

    /// Range-check every field.  Invalid values are rejected, never clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let n = &self.node;
        let s = &self.server;

        if n.room_name.is_empty() {
            return Err(ConfigError::ValidationFailed("room_name must not be empty"));
        }
        if n.node_address.is_empty() || s.server_address.is_empty() {
            return Err(ConfigError::ValidationFailed("addresses must not be empty"));
        }
        if !(100..=3_600_000).contains(&n.health_period_ms) {
            return Err(ConfigError::ValidationFailed(
                "health_period_ms must be 100–3600000",
            ));
        }
        if !(100..=3_600_000).contains(&n.telemetry_period_ms) {
            return Err(ConfigError::ValidationFailed(
                "telemetry_period_ms must be 100–3600000",
            ));
        }
        if !(100..=86_400_000).contains(&n.mold_period_ms) {
            return Err(ConfigError::ValidationFailed(
                "mold_period_ms must be 100–86400000",
            ));
        }
        // Rate-monotonic priorities need strictly distinct periods.
        if !(n.health_period_ms < n.telemetry_period_ms && n.telemetry_period_ms < n.mold_period_ms)
        {
            return Err(ConfigError::ValidationFailed(
                "periods must satisfy health < telemetry < mold",
            ));
        }
        if n.settle_delay_ms > 600_000 || n.stagger_ms > 600_000 {
            return Err(ConfigError::ValidationFailed(
                "settle_delay_ms and stagger_ms must be ≤ 600000",
            ));
        }
        if !(n.time_scale > 0.0 && n.time_scale <= 3600.0) {
            return Err(ConfigError::ValidationFailed("time_scale must be in (0, 3600]"));
        }
        if !(100..=3_600_000).contains(&s.liveness_timeout_ms) {
            return Err(ConfigError::ValidationFailed(
                "liveness_timeout_ms must be 100–3600000",
            ));
        }
        if s.sweep_period_ms == 0 || s.sweep_period_ms >= s.liveness_timeout_ms {
            return Err(ConfigError::ValidationFailed(
                "sweep_period_ms must be > 0 and < liveness_timeout_ms",
            ));
        }
        Ok(())
    }
}

/// Copy `text` into a bounded string, truncating on a char boundary.
pub fn bounded<const N: usize>(text: &str) -> heapless::String<N> {
    let mut out = heapless::String::new();
    for ch in text.chars() {
        if out.push(ch).is_err() {
            break;
        }
    }
    out
}
