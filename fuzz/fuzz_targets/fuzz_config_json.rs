//! Fuzz target: configuration decoding
//!
//! Any JSON document either fails to parse or yields a config that
//! validation accepts or rejects cleanly.  Accepted configs must build a
//! service.
//!
//! cargo fuzz run fuzz_config_json

#![no_main]

use garagewatch::GarageService;
use garagewatch::adapters::log_sink::LogCamera;
use garagewatch::adapters::sim::SimulatedBus;
use garagewatch::config::SystemConfig;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(config) = serde_json::from_slice::<SystemConfig>(data) else {
        return;
    };
    if config.validate().is_ok() {
        assert!(GarageService::new(config, LogCamera::new(), SimulatedBus::once(Vec::new())).is_ok());
    }
});
