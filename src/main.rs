//! Moldwatch main entry point.
//!
//! Boots one server and one sensor node in the same process, wired through
//! the loopback transport.  On the host the node reads the scripted
//! weather; on the device it reads two DHT20 sensors on separate I2C buses.
//!
//! ```text
//! ┌────────────────────────────── Node ───────────────────────────────┐
//! │  SensorBus [A, B] ─▶ Health · Telemetry · MoldUpdate ─▶ Loopback  │
//! └────────────────────────────────────────────────────────────┬──────┘
//!                                                              │ radio
//! ┌───────────────────────────── Server ───────────────────────▼──────┐
//! │  Ingest ─▶ NodeRegistry ◀─ Watchdog       MessagePipeline ─▶ stdout│
//! └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Usage: `moldwatch [config.json]`.  Without a path the host build uses
//! the simulation preset.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use log::info;

use moldwatch::adapters::config_file::JsonConfigFile;
use moldwatch::adapters::log_sink::ConsoleSink;
use moldwatch::adapters::loopback::LoopbackLink;
use moldwatch::adapters::time::UptimeClock;
use moldwatch::app::ports::{ConfigPort, SensorDriver, TimePort};
use moldwatch::config::SystemConfig;
use moldwatch::scheduler::SensorNode;
use moldwatch::sensors::SensorBus;
use moldwatch::server::Server;

const STATUS_INTERVAL: Duration = Duration::from_secs(60);

fn main() -> Result<()> {
    // ── 1. Logging ────────────────────────────────────────────
    #[cfg(target_os = "espidf")]
    {
        esp_idf_svc::sys::link_patches();
        esp_idf_logger::init()?;
    }
    #[cfg(not(target_os = "espidf"))]
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("╔══════════════════════════════════════╗");
    info!("║  Moldwatch v{}                    ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Configuration ──────────────────────────────────────
    let config = match std::env::args().nth(1) {
        Some(path) => JsonConfigFile::new(path)
            .load()
            .context("loading configuration")?,
        None => default_config(),
    };
    config.validate().context("validating configuration")?;

    let clock: Arc<dyn TimePort> = Arc::new(UptimeClock::new());

    // ── 3. Sensor channels ────────────────────────────────────
    let bus = sensor_bus(&clock)?;

    run(config, bus, clock)
}

#[cfg(not(target_os = "espidf"))]
fn default_config() -> SystemConfig {
    SystemConfig::simulation()
}

#[cfg(target_os = "espidf")]
fn default_config() -> SystemConfig {
    SystemConfig::default()
}

#[cfg(not(target_os = "espidf"))]
fn sensor_bus(
    clock: &Arc<dyn TimePort>,
) -> Result<SensorBus<moldwatch::sensors::simulated::SimulatedWeather>> {
    use moldwatch::sensors::simulated::SimulatedWeather;
    info!("Sensors: scripted weather (1 min = 1 h)");
    Ok(SensorBus::new(
        SimulatedWeather::new(Arc::clone(clock)),
        SimulatedWeather::new(Arc::clone(clock)),
    ))
}

#[cfg(target_os = "espidf")]
fn sensor_bus(
    _clock: &Arc<dyn TimePort>,
) -> Result<
    SensorBus<
        moldwatch::sensors::dht20::Dht20<
            esp_idf_hal::i2c::I2cDriver<'static>,
            esp_idf_hal::delay::FreeRtos,
        >,
    >,
> {
    use esp_idf_hal::delay::FreeRtos;
    use esp_idf_hal::i2c::{I2cConfig, I2cDriver};
    use esp_idf_hal::peripherals::Peripherals;
    use esp_idf_hal::units::FromValueType;
    use moldwatch::sensors::dht20::Dht20;

    let p = Peripherals::take()?;
    let i2c_config = I2cConfig::new().baudrate(100.kHz().into());
    // Both DHT20s answer at 0x38, so each needs its own bus.
    let bus_a = I2cDriver::new(p.i2c0, p.pins.gpio21, p.pins.gpio22, &i2c_config)?;
    let bus_b = I2cDriver::new(p.i2c1, p.pins.gpio18, p.pins.gpio19, &i2c_config)?;
    info!("Sensors: DHT20 on I2C0 (21/22) and I2C1 (18/19)");
    Ok(SensorBus::new(
        Dht20::new(bus_a, FreeRtos),
        Dht20::new(bus_b, FreeRtos),
    ))
}

fn run<D>(config: SystemConfig, bus: SensorBus<D>, clock: Arc<dyn TimePort>) -> Result<()>
where
    D: SensorDriver + 'static,
{
    // ── 4. Server ─────────────────────────────────────────────
    let server = Server::new(config.server.clone(), Arc::clone(&clock));
    let link = Arc::new(LoopbackLink::new());
    let _radio = link.spawn_radio(server.ingest())?;
    let _server_tasks = server.start(ConsoleSink::new())?;
    info!(
        "Server '{}' up (timeout {} ms, sweep {} ms)",
        config.server.server_address,
        config.server.liveness_timeout_ms,
        config.server.sweep_period_ms
    );

    // ── 5. Sensor node ────────────────────────────────────────
    let transport = link.endpoint(&config.node.node_address);
    let node = Arc::new(SensorNode::new(config.node, bus, transport));
    let _node_tasks = node.start()?;

    // ── 6. Status heartbeat ───────────────────────────────────
    loop {
        std::thread::sleep(STATUS_INTERVAL);
        let model = node.model();
        info!(
            "STATUS | nodes online={} | queue={} dropped={} | link ok={} lost={} | mold={:.2} {:?}",
            server.registry().online_count(),
            server.pipeline().len(),
            server.pipeline().dropped(),
            link.delivered(),
            link.lost(),
            model.mold_index(),
            model.risk_level()
        );
    }
}
