//! Mock hardware adapters for integration tests.
//!
//! Records every camera command and status report so tests can assert on
//! the full history, and serves scripted sensor blocks without touching a
//! real I2C bus.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

use garagewatch::app::ports::{BusReader, Camera, StatusReporter};
use garagewatch::config::SystemConfig;
use garagewatch::error::BusError;
use garagewatch::events::{Dispatch, Event, EventKind, PrepareAttempt, from_fn};
use garagewatch::fsm::RecordingState;
use garagewatch::sensors::RawBlock;
use garagewatch::GarageService;

// ── Camera call record ────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraCall {
    Prepare(PrepareAttempt),
    Start,
    Stop,
    Snapshot(RecordingState),
}

// ── MockCamera ────────────────────────────────────────────────

#[derive(Default)]
pub struct MockCamera {
    pub calls: Vec<CameraCall>,
}

#[allow(dead_code)]
impl MockCamera {
    pub fn count(&self, call: CameraCall) -> usize {
        self.calls.iter().filter(|c| **c == call).count()
    }

    pub fn starts(&self) -> usize {
        self.count(CameraCall::Start)
    }

    pub fn stops(&self) -> usize {
        self.count(CameraCall::Stop)
    }
}

impl Camera for MockCamera {
    fn prepare_recording(&mut self, attempt: PrepareAttempt) -> anyhow::Result<()> {
        self.calls.push(CameraCall::Prepare(attempt));
        Ok(())
    }

    fn start_recording(&mut self) -> anyhow::Result<()> {
        self.calls.push(CameraCall::Start);
        Ok(())
    }

    fn stop_recording(&mut self) -> anyhow::Result<()> {
        self.calls.push(CameraCall::Stop);
        Ok(())
    }

    fn capture_snapshot(&mut self, state: RecordingState) -> anyhow::Result<()> {
        self.calls.push(CameraCall::Snapshot(state));
        Ok(())
    }
}

// ── ScriptedBus ───────────────────────────────────────────────

/// Serves queued reads in order, then quiet blocks.
#[derive(Default)]
pub struct ScriptedBus {
    queue: VecDeque<Result<RawBlock, BusError>>,
    pub reads: usize,
}

#[allow(dead_code)]
impl ScriptedBus {
    pub fn push(&mut self, read: Result<RawBlock, BusError>) {
        self.queue.push_back(read);
    }

    pub fn push_block(&mut self, block: RawBlock) {
        self.push(Ok(block));
    }

    pub fn push_status(&mut self, status: u8) {
        self.push_block(status_block(status, 50, 80));
    }
}

impl BusReader for ScriptedBus {
    fn read_block(&mut self) -> Result<RawBlock, BusError> {
        self.reads += 1;
        self.queue.pop_front().unwrap_or(Ok([0; 8]))
    }
}

// ── Status reporter ───────────────────────────────────────────

#[derive(Clone, Default)]
pub struct RecordingReporter {
    pub reports: Rc<RefCell<Vec<bool>>>,
}

impl StatusReporter for RecordingReporter {
    fn report_door(&mut self, open: bool) -> anyhow::Result<()> {
        self.reports.borrow_mut().push(open);
        Ok(())
    }
}

// ── Helpers ───────────────────────────────────────────────────

pub type TestService = GarageService<MockCamera, ScriptedBus>;

pub const DOOR_OPEN: RawBlock = [0x01, 0, 0, 0, 0, 0, 0, 0];
pub const DOOR_CLOSED: RawBlock = [0x02, 0, 0, 0, 0, 0, 0, 0];
pub const OVERRIDE: RawBlock = [0x03, 0, 0, 0, 0, 0, 0, 0];

pub fn status_block(status: u8, near: u8, far: u8) -> RawBlock {
    [0, 0, 0, 0, 0, status, near, far]
}

pub fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

pub fn secs(n: u64) -> Duration {
    Duration::from_secs(n)
}

/// Service with housekeeping timers disabled, so only the poller and the
/// recorder schedule anything.
pub fn quiet_config() -> SystemConfig {
    SystemConfig {
        door_report_interval_secs: 0,
        snapshot_interval_secs: 0,
        ..SystemConfig::default()
    }
}

pub fn service(config: SystemConfig) -> TestService {
    GarageService::new(config, MockCamera::default(), ScriptedBus::default()).unwrap()
}

/// Subscribe a capture-everything handler (after the built-in ones).
pub fn capture_events(svc: &mut TestService) -> Rc<RefCell<Vec<Event>>> {
    let seen = Rc::new(RefCell::new(Vec::new()));
    for kind in EventKind::ALL {
        let seen = Rc::clone(&seen);
        svc.subscribe(
            kind,
            "capture",
            from_fn(move |ev: &Event, _cx: &mut Dispatch<'_>| {
                seen.borrow_mut().push(*ev);
                Ok(())
            }),
        )
        .unwrap();
    }
    seen
}

/// PendingTimer ⇔ Prepare, and the handle is live in the scheduler.
pub fn assert_timer_invariant(svc: &TestService) {
    let state = svc.recording_state();
    match svc.pending_prepare_timer() {
        Some(timer) => {
            assert_eq!(state, RecordingState::Prepare);
            assert!(svc.scheduler().is_pending(timer), "prepare timer not live");
        }
        None => assert_ne!(state, RecordingState::Prepare),
    }
}
