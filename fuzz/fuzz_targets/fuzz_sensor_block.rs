//! Fuzz target: sensor blocks through the running service
//!
//! Splits the input into 8-byte blocks and serves them, one per poll, to a
//! started service.  Whatever the controller reports, the service must not
//! panic, the parking status it keeps must stay in range, and a
//! preparation timer must be pending exactly while the recorder prepares.
//!
//! cargo fuzz run fuzz_sensor_block

#![no_main]

use std::time::Duration;

use garagewatch::GarageService;
use garagewatch::adapters::log_sink::LogCamera;
use garagewatch::adapters::sim::{ScriptedRead, SimulatedBus};
use garagewatch::config::SystemConfig;
use garagewatch::fsm::RecordingState;
use garagewatch::sensors::BLOCK_LEN;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let script: Vec<ScriptedRead> = data
        .chunks_exact(BLOCK_LEN)
        .map(|chunk| {
            let mut block = [0u8; BLOCK_LEN];
            block.copy_from_slice(chunk);
            Ok(block)
        })
        .collect();
    let polls = script.len() as u64;

    let config = SystemConfig::default();
    let max_status = config.parking_status_max;
    let mut svc = GarageService::new(config, LogCamera::new(), SimulatedBus::once(script))
        .expect("default config is valid");
    svc.start().expect("fresh service starts");

    // Step at the fast cadence; enough steps to serve every block even at
    // the regular one.
    let mut now = Duration::ZERO;
    for _ in 0..=polls * 4 {
        svc.run_until(now);
        now += Duration::from_millis(500);

        assert!(svc.poller_state().last_parking_status <= max_status);
        let preparing = svc.recording_state() == RecordingState::Prepare;
        assert_eq!(svc.pending_prepare_timer().is_some(), preparing);
    }
});
