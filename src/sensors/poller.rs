//! Sensor poller.
//!
//! Each tick reads one raw block, publishes the edge events it contains,
//! feeds the parking-status byte to the [`ParkingTracker`] and, when a
//! parking manoeuvre starts or ends, retunes its own poll timer.
//!
//! ```text
//!  read ──▶ edges ──▶ publish door/override ──▶ status in range?
//!   │                                              │ no: skip parking
//!   │ Err: count, skip tick                        ▼
//!   │                                      tracker.observe()
//!   │                                              │
//!   │              switch? restart timer ◀─────────┤
//!   │                                              ▼
//!   │                               publish parking_status_changed
//!   │                                              ▼
//!   └──────────────────────────────────────▶ telemetry sinks
//! ```
//!
//! The poller never sleeps or spawns: it is driven by the `SensorPoll`
//! timer of the service's [`Scheduler`], so two ticks cannot overlap.

use core::time::Duration;

use log::{debug, info, warn};

use super::parking::{ModeSwitch, ParkingTracker};
use super::{ParkingDistance, RawBlock, SensorReading};
use crate::app::ports::{BusReader, ParkingTelemetrySink};
use crate::config::{EdgeCodeTable, SystemConfig};
use crate::events::{Event, EventBus};
use crate::scheduler::{Scheduler, TimerHandle, TimerTask};

/// Active poll cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PollInterval {
    #[default]
    Regular,
    /// A parking target is present.
    Fast,
}

/// Externally visible poller state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollerState {
    pub interval: PollInterval,
    pub last_parking_status: u8,
    pub parking_distance: ParkingDistance,
}

/// Poller counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollerStats {
    pub ticks: u32,
    pub read_failures: u32,
    pub invalid_status: u32,
    pub edges_published: u32,
}

/// What one tick did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickOutcome {
    pub read_failed: bool,
    /// Edge events published this tick.
    pub edges: usize,
    /// `(new, old)` if `parking_status_changed` was published.
    pub parking_changed: Option<(u8, u8)>,
    pub switch: Option<ModeSwitch>,
    pub telemetry: bool,
}

/// Periodic reader of the sensor status block.
pub struct SensorPoller {
    codes: EdgeCodeTable,
    scan_len: usize,
    status_min: u8,
    status_max: u8,
    regular: Duration,
    fast: Duration,

    tracker: ParkingTracker,
    interval: PollInterval,
    timer: Option<TimerHandle>,
    /// Last door edge seen, `None` until the first one.
    door_open: Option<bool>,
    sinks: Vec<Box<dyn ParkingTelemetrySink>>,
    stats: PollerStats,
}

impl SensorPoller {
    pub fn new(config: &SystemConfig) -> Self {
        Self {
            codes: config.edge_codes,
            scan_len: usize::from(config.edge_scan_len),
            status_min: config.parking_status_min,
            status_max: config.parking_status_max,
            regular: config.poll_regular(),
            fast: config.poll_fast(),
            tracker: ParkingTracker::new(),
            interval: PollInterval::Regular,
            timer: None,
            door_open: None,
            sinks: Vec::new(),
            stats: PollerStats::default(),
        }
    }

    /// Arm the poll timer at the current cadence, first tick immediately.
    /// Starting twice keeps the existing timer.
    pub fn start(&mut self, scheduler: &mut Scheduler) -> TimerHandle {
        if let Some(handle) = self.timer.filter(|h| scheduler.is_pending(*h)) {
            return handle;
        }
        let handle = scheduler.schedule_periodic(self.cadence(), TimerTask::SensorPoll, true);
        info!("Poller: started ({:?} cadence, {:?})", self.interval, self.cadence());
        self.timer = Some(handle);
        handle
    }

    pub fn stop(&mut self, scheduler: &mut Scheduler) {
        if let Some(handle) = self.timer.take() {
            scheduler.cancel(handle);
            info!("Poller: stopped");
        }
    }

    /// Live poll timer, if started.
    pub fn timer(&self) -> Option<TimerHandle> {
        self.timer
    }

    /// Register a telemetry callback.  Sinks run in registration order.
    pub fn add_telemetry_sink<S>(&mut self, sink: S)
    where
        S: ParkingTelemetrySink + 'static,
    {
        self.sinks.push(Box::new(sink));
    }

    pub fn state(&self) -> PollerState {
        PollerState {
            interval: self.interval,
            last_parking_status: self.tracker.last_status(),
            parking_distance: self.tracker.distance(),
        }
    }

    pub fn interval(&self) -> PollInterval {
        self.interval
    }

    /// Duration of the active cadence.
    pub fn cadence(&self) -> Duration {
        match self.interval {
            PollInterval::Regular => self.regular,
            PollInterval::Fast => self.fast,
        }
    }

    /// Last door edge seen.  `None` if no door edge arrived yet.
    pub fn is_door_open(&self) -> Option<bool> {
        self.door_open
    }

    pub fn stats(&self) -> PollerStats {
        self.stats
    }

    /// Run one poll tick.
    pub fn tick<R>(
        &mut self,
        reader: &mut R,
        bus: &mut EventBus,
        scheduler: &mut Scheduler,
    ) -> TickOutcome
    where
        R: BusReader + ?Sized,
    {
        self.stats.ticks = self.stats.ticks.wrapping_add(1);
        let mut outcome = TickOutcome::default();

        let block: RawBlock = match reader.read_block() {
            Ok(block) => block,
            Err(e) => {
                self.stats.read_failures = self.stats.read_failures.wrapping_add(1);
                debug!("Poller: read failed ({}), skipping tick", e);
                outcome.read_failed = true;
                return outcome;
            }
        };

        let reading = SensorReading::decode(&block, &self.codes, self.scan_len);

        // ── Edges, left to right ─────────────────────────────
        for edge in &reading.edges {
            let event = edge.event();
            match event {
                Event::DoorOpen => self.door_open = Some(true),
                Event::DoorClosed => self.door_open = Some(false),
                _ => {}
            }
            bus.publish(scheduler, event);
            outcome.edges += 1;
        }
        self.stats.edges_published = self
            .stats
            .edges_published
            .wrapping_add(outcome.edges as u32);

        // ── Parking telemetry ────────────────────────────────
        let status = reading.parking_status;
        if !(self.status_min..=self.status_max).contains(&status) {
            self.stats.invalid_status = self.stats.invalid_status.wrapping_add(1);
            warn!(
                "Poller: parking status {} outside {}..={}, ignoring",
                status, self.status_min, self.status_max
            );
            return outcome;
        }

        let obs = self.tracker.observe(status, reading.distance);
        outcome.switch = obs.switch;
        outcome.telemetry = obs.telemetry;

        if let Some(switch) = obs.switch {
            self.switch_mode(switch, scheduler);
        }
        if let Some((new, old)) = obs.changed {
            bus.publish(scheduler, Event::ParkingStatusChanged { new, old });
            outcome.parking_changed = Some((new, old));
        }

        if obs.telemetry {
            let distance = self.tracker.distance();
            for sink in &mut self.sinks {
                if let Err(e) = sink.on_parking_telemetry(status, distance) {
                    warn!("Poller: telemetry sink failed: {:#}", e);
                }
            }
        }

        outcome
    }

    /// Change cadence and restart the poll timer without an extra tick.
    fn switch_mode(&mut self, switch: ModeSwitch, scheduler: &mut Scheduler) {
        self.interval = match switch {
            ModeSwitch::Entered => {
                info!("Poller: Entering parking mode");
                PollInterval::Fast
            }
            ModeSwitch::Exited => {
                info!("Poller: Exiting parking mode");
                PollInterval::Regular
            }
        };

        let cadence = self.cadence();
        if let Some(handle) = self.timer {
            self.timer = scheduler.restart_periodic(handle, cadence, false);
            debug!("Poller: poll timer restarted at {:?}", cadence);
        }
    }
}
