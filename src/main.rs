//! GarageWatch entry point
//!
//! Hexagonal architecture with a single cooperative event loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  I2cSensorBus / SimulatedBus   LogCamera   LogStatusReporter   │
//! │  (BusReader)                   (Camera)    (StatusReporter)    │
//! │  JsonConfigStore               LogParkingDisplay               │
//! │  (ConfigPort)                  (ParkingTelemetrySink)          │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │            GarageService (pure logic)                  │    │
//! │  │  RecordingController · SensorPoller · EventBus         │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  Scheduler (virtual time) · MonotonicClock (host time)         │
//! └────────────────────────────────────────────────────────────────┘
//! ```

use core::time::Duration;

use anyhow::{Context, Result};
use log::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use garagewatch::GarageService;
use garagewatch::adapters::config_file::JsonConfigStore;
use garagewatch::adapters::log_sink::{LogCamera, LogParkingDisplay, LogStatusReporter};
use garagewatch::adapters::time::MonotonicClock;
use garagewatch::app::ports::{BusReader, ConfigPort};
use garagewatch::config::SystemConfig;
use garagewatch::error::ConfigError;

/// Environment variable naming the config file when no argument is given.
const CONFIG_ENV: &str = "GARAGEWATCH_CONFIG";

/// Longest the loop sleeps, so a stalled clock cannot hang it.
const MAX_SLEEP: Duration = Duration::from_secs(1);

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("╔══════════════════════════════════════╗");
    info!("║  GarageWatch v{}                  ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 1. Configuration ──────────────────────────────────────
    let config = load_config()?;

    // ── 2. Sensor bus ─────────────────────────────────────────
    let reader = open_sensor_bus(&config)?;

    // ── 3. Service wiring ─────────────────────────────────────
    let mut service = GarageService::new(config, LogCamera::new(), reader)
        .context("invalid configuration")?;
    service.set_status_reporter(LogStatusReporter)?;
    service.add_telemetry_sink(LogParkingDisplay)?;
    service.start()?;

    info!("System ready. Entering event loop.");

    // ── 4. Event loop ─────────────────────────────────────────
    let clock = MonotonicClock::new();
    loop {
        service.run_until(clock.now());
        let deadline = service
            .next_deadline()
            .unwrap_or_else(|| clock.now() + MAX_SLEEP);
        clock.sleep_until(deadline, MAX_SLEEP);
    }
}

/// Config path from argv[1] or the environment; defaults when absent.
fn load_config() -> Result<SystemConfig> {
    let Some(path) = std::env::args().nth(1).or_else(|| std::env::var(CONFIG_ENV).ok()) else {
        info!("Config: no file given, using defaults");
        return Ok(SystemConfig::default());
    };

    let store = JsonConfigStore::new(path);
    match store.load() {
        Ok(config) => Ok(config),
        Err(ConfigError::NotFound) => {
            warn!("Config: {} not found, using defaults", store.path().display());
            Ok(SystemConfig::default())
        }
        Err(e) => Err(anyhow::anyhow!("{}: {}", store.path().display(), e)),
    }
}

#[cfg(feature = "rpi")]
fn open_sensor_bus(config: &SystemConfig) -> Result<Box<dyn BusReader>> {
    use garagewatch::adapters::i2c::I2cSensorBus;

    let i2c = rppal::i2c::I2c::new().context("opening I2C bus")?;
    info!("Sensor bus: I2C address {:#04x}", config.sensor_i2c_address);
    Ok(Box::new(I2cSensorBus::from_config(i2c, config)))
}

#[cfg(not(feature = "rpi"))]
fn open_sensor_bus(_config: &SystemConfig) -> Result<Box<dyn BusReader>> {
    use garagewatch::adapters::sim::SimulatedBus;

    info!("Sensor bus: simulated garage cycle");
    Ok(Box::new(SimulatedBus::garage_cycle()))
}
