//! Garage service: composition root of the core.
//!
//! [`GarageService`] composes the event bus, the timer service, the
//! recording controller and the sensor poller.  It is the only owner of
//! each of them; collaborators reach the core through port traits, the
//! bus, or the inbox.
//!
//! ```text
//!  BusReader ──▶ ┌───────────────────────────────┐ ──▶ Camera
//!                │         GarageService         │
//!  Inbox ──────▶ │ Scheduler · EventBus · Poller │ ──▶ StatusReporter
//!                │       RecordingController     │ ──▶ Telemetry sinks
//!                └───────────────────────────────┘
//! ```
//!
//! Everything runs on the thread that calls [`GarageService::run_until`]:
//! timers fire one at a time, and each handler completes before the next
//! timer or inbox event is looked at.

use core::cell::{Ref, RefCell};
use core::time::Duration;
use std::rc::Rc;

use log::{debug, info, warn};

use crate::config::SystemConfig;
use crate::error::{Error, Result};
use crate::events::{
    BusStats, Dispatch, Event, EventBus, EventKind, Subscriber, SubscriptionId, from_fn,
};
use crate::fsm::RecordingState;
use crate::fsm::controller::{RecorderStats, RecordingController};
use crate::scheduler::{Scheduler, TimerHandle, TimerTask};
use crate::sensors::parking::ParkingPhase;
use crate::sensors::poller::{PollerState, PollerStats, SensorPoller};

use super::inbox::{Inbox, InboxSender};
use super::ports::{AuditHooks, BusReader, Camera, ParkingTelemetrySink, StatusReporter};

/// Events the recording controller consumes.
const RECORDER_EVENTS: [EventKind; 4] = [
    EventKind::DoorOpen,
    EventKind::DoorClosed,
    EventKind::CancelRequested,
    EventKind::PrepareFinished,
];

// ───────────────────────────────────────────────────────────────
// Door relay
// ───────────────────────────────────────────────────────────────

/// Forwards door edges to the status reporter.
struct DoorRelay {
    reporter: Box<dyn StatusReporter>,
}

impl DoorRelay {
    fn report(&mut self, open: bool) {
        if let Err(e) = self.reporter.report_door(open) {
            warn!("Service: door report failed: {:#}", e);
        }
    }
}

impl Subscriber for DoorRelay {
    fn on_event(&mut self, event: &Event, _cx: &mut Dispatch<'_>) -> anyhow::Result<()> {
        match event {
            Event::DoorOpen => self.report(true),
            Event::DoorClosed => self.report(false),
            _ => {}
        }
        Ok(())
    }
}

// ───────────────────────────────────────────────────────────────
// Status snapshot
// ───────────────────────────────────────────────────────────────

/// Point-in-time view for status queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceStatus {
    pub recording: RecordingState,
    pub poller: PollerState,
    /// Last door edge, `None` until one was seen.
    pub door_open: Option<bool>,
    pub parking_phase: Option<ParkingPhase>,
    pub recorder_stats: RecorderStats,
    pub poller_stats: PollerStats,
    pub bus_stats: BusStats,
    pub uptime: Duration,
}

// ───────────────────────────────────────────────────────────────
// GarageService
// ───────────────────────────────────────────────────────────────

/// The application service orchestrates all domain logic.
pub struct GarageService<C: Camera + 'static, R: BusReader> {
    config: SystemConfig,
    bus: EventBus,
    scheduler: Scheduler,
    recorder: Rc<RefCell<RecordingController<C>>>,
    poller: SensorPoller,
    reader: R,
    inbox: Inbox,
    relay: Option<Rc<RefCell<DoorRelay>>>,
    door_report_timer: Option<TimerHandle>,
    snapshot_timer: Option<TimerHandle>,
    started: bool,
}

impl<C: Camera + 'static, R: BusReader> GarageService<C, R> {
    /// Construct the service from configuration.
    ///
    /// The recording controller and the override bridge are subscribed
    /// here, ahead of any external subscriber.  Does **not** start polling;
    /// call [`start`](Self::start) once all subscriptions are in place.
    pub fn new(config: SystemConfig, camera: C, reader: R) -> Result<Self> {
        config.validate()?;

        let mut bus = EventBus::new();
        let recorder = Rc::new(RefCell::new(RecordingController::new(camera, &config)));
        bus.subscribe_many(&RECORDER_EVENTS, "recorder", Rc::clone(&recorder));

        // The override button cancels whatever the recorder is doing.
        bus.subscribe(
            EventKind::OverrideButtonPressed,
            "override",
            from_fn(|_ev: &Event, cx: &mut Dispatch<'_>| {
                info!("Service: override pressed, requesting cancel");
                cx.publish(Event::CancelRequested);
                Ok(())
            }),
        );

        let poller = SensorPoller::new(&config);

        Ok(Self {
            config,
            bus,
            scheduler: Scheduler::new(),
            recorder,
            poller,
            reader,
            inbox: Inbox::new(),
            relay: None,
            door_report_timer: None,
            snapshot_timer: None,
            started: false,
        })
    }

    // ── Wiring (before start) ─────────────────────────────────

    /// Subscribe an external handler.  Handlers run after the built-in
    /// ones, in registration order.
    pub fn subscribe<S>(
        &mut self,
        kind: EventKind,
        label: &'static str,
        handler: S,
    ) -> Result<SubscriptionId>
    where
        S: Subscriber + 'static,
    {
        self.ensure_not_started("subscribe after start")?;
        Ok(self.bus.subscribe(kind, label, handler))
    }

    pub fn add_telemetry_sink<S>(&mut self, sink: S) -> Result<()>
    where
        S: ParkingTelemetrySink + 'static,
    {
        self.ensure_not_started("telemetry sink added after start")?;
        self.poller.add_telemetry_sink(sink);
        Ok(())
    }

    /// Report door edges and the periodic door status to `reporter`.
    pub fn set_status_reporter<S>(&mut self, reporter: S) -> Result<()>
    where
        S: StatusReporter + 'static,
    {
        self.ensure_not_started("status reporter set after start")?;
        if self.relay.is_some() {
            return Err(Error::Lifecycle("status reporter already set"));
        }
        let relay = Rc::new(RefCell::new(DoorRelay {
            reporter: Box::new(reporter),
        }));
        self.bus.subscribe_many(
            &[EventKind::DoorOpen, EventKind::DoorClosed],
            "door relay",
            Rc::clone(&relay),
        );
        self.relay = Some(relay);
        Ok(())
    }

    pub fn set_audit_hooks<H: AuditHooks + 'static>(&mut self, hooks: H) {
        self.recorder.borrow_mut().set_audit_hooks(hooks);
    }

    /// Producer handle for asynchronous collaborators.
    pub fn inbox_sender(&self) -> InboxSender {
        self.inbox.sender()
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Arm the poll timer (first tick immediately) and the housekeeping
    /// timers.
    pub fn start(&mut self) -> Result<()> {
        self.ensure_not_started("already started")?;
        self.started = true;

        self.poller.start(&mut self.scheduler);
        // Door reports need somewhere to go.
        self.door_report_timer = self
            .config
            .door_report_interval()
            .filter(|_| self.relay.is_some())
            .map(|every| self.scheduler.schedule_periodic(every, TimerTask::DoorReport, false));
        self.snapshot_timer = self
            .config
            .snapshot_interval()
            .map(|every| self.scheduler.schedule_periodic(every, TimerTask::Snapshot, false));

        info!(
            "Service: started (poll {:?}/{:?}, prepare delay {:?})",
            self.config.poll_regular(),
            self.config.poll_fast(),
            self.config.prepare_delay()
        );
        Ok(())
    }

    /// Cancel polling and housekeeping.  The recorder keeps its state.
    pub fn stop(&mut self) {
        self.poller.stop(&mut self.scheduler);
        for handle in [self.door_report_timer.take(), self.snapshot_timer.take()]
            .into_iter()
            .flatten()
        {
            self.scheduler.cancel(handle);
        }
        info!("Service: stopped");
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    // ── Cooperative step ──────────────────────────────────────

    /// Process everything due up to `now` (time since service start).
    ///
    /// Fires due timers one at a time in deadline order, moves the clock to
    /// `now`, then drains the inbox so posted events are handled at `now`.
    /// Repeats while the inbox produced work.  Returns the number of timers
    /// fired.
    pub fn run_until(&mut self, now: Duration) -> usize {
        let mut fired = 0;
        loop {
            while let Some((_, task)) = self.scheduler.pop_due(now) {
                self.dispatch_timer(task);
                fired += 1;
            }
            self.scheduler.advance_to(now);
            if self.drain_inbox() == 0 {
                return fired;
            }
        }
    }

    /// Publish an event from the service's own thread.
    pub fn publish(&mut self, event: Event) -> usize {
        self.bus.publish(&mut self.scheduler, event)
    }

    /// Earliest pending timer; the host may sleep until then.
    pub fn next_deadline(&self) -> Option<Duration> {
        self.scheduler.next_deadline()
    }

    pub fn now(&self) -> Duration {
        self.scheduler.now()
    }

    fn drain_inbox(&mut self) -> usize {
        let mut drained = 0;
        while let Some(event) = self.inbox.try_take() {
            debug!("Service: inbox {}", event);
            self.publish(event);
            drained += 1;
        }
        drained
    }

    fn dispatch_timer(&mut self, task: TimerTask) {
        match task {
            TimerTask::PrepareComplete(attempt) => {
                self.publish(Event::PrepareFinished(attempt));
            }
            TimerTask::SensorPoll => {
                self.poller
                    .tick(&mut self.reader, &mut self.bus, &mut self.scheduler);
            }
            TimerTask::DoorReport => {
                // Unknown counts as closed.
                let open = self.poller.is_door_open().unwrap_or(false);
                if let Some(relay) = &self.relay {
                    relay.borrow_mut().report(open);
                }
            }
            TimerTask::Snapshot => self.recorder.borrow_mut().capture_snapshot(),
        }
    }

    fn ensure_not_started(&self, msg: &'static str) -> Result<()> {
        if self.started {
            Err(Error::Lifecycle(msg))
        } else {
            Ok(())
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn recording_state(&self) -> RecordingState {
        self.recorder.borrow().state()
    }

    /// Live preparation timer; `Some` exactly when recording state is
    /// `Prepare`.
    pub fn pending_prepare_timer(&self) -> Option<TimerHandle> {
        self.recorder.borrow().pending_timer()
    }

    pub fn recorder(&self) -> Ref<'_, RecordingController<C>> {
        self.recorder.borrow()
    }

    pub fn poller(&self) -> &SensorPoller {
        &self.poller
    }

    pub fn poller_state(&self) -> PollerState {
        self.poller.state()
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn reader_mut(&mut self) -> &mut R {
        &mut self.reader
    }

    pub fn config(&self) -> &SystemConfig {
        &self.config
    }

    pub fn status(&self) -> ServiceStatus {
        let recorder = self.recorder.borrow();
        let poller = self.poller.state();
        ServiceStatus {
            recording: recorder.state(),
            poller,
            door_open: self.poller.is_door_open(),
            parking_phase: ParkingPhase::from_status(poller.last_parking_status),
            recorder_stats: recorder.stats(),
            poller_stats: self.poller.stats(),
            bus_stats: self.bus.stats(),
            uptime: self.scheduler.now(),
        }
    }
}
