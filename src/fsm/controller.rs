//! Recording controller: executes the transition table against the camera
//! and the timer service.
//!
//! The preparation timer handle lives inside the `Prepare` phase itself,
//! so "a pending timer exists iff the state is Prepare" holds by
//! construction.  Leaving `Prepare` by any path other than expiry cancels
//! the handle synchronously; a completion that still arrives afterwards
//! carries a stale [`PrepareAttempt`] and is dropped by the state guard.

use core::time::Duration;

use log::{debug, info, warn};

use super::{Effect, RecordingState, Trigger, transition};
use crate::adapters::log_sink::LogAuditHooks;
use crate::app::ports::{AuditHooks, Camera};
use crate::config::{AuditScope, SystemConfig};
use crate::events::{Dispatch, Event, PrepareAttempt, Subscriber};
use crate::scheduler::{Scheduler, TimerHandle, TimerTask};

/// Current phase with the data that only exists in that phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    OnHold,
    Prepare {
        timer: TimerHandle,
        attempt: PrepareAttempt,
    },
    Record,
}

impl Phase {
    const fn state(self) -> RecordingState {
        match self {
            Self::OnHold => RecordingState::OnHold,
            Self::Prepare { .. } => RecordingState::Prepare,
            Self::Record => RecordingState::Record,
        }
    }
}

/// Controller counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecorderStats {
    /// Events that matched a table row.
    pub accepted: u32,
    /// Events with no row for the current state.
    pub ignored: u32,
    /// `prepare_finished` for an attempt that is no longer live.
    pub stale_completions: u32,
    pub camera_failures: u32,
}

/// The recording state machine bound to a camera.
pub struct RecordingController<C: Camera> {
    camera: C,
    hooks: Box<dyn AuditHooks>,
    prepare_delay: Duration,
    audit_scope: AuditScope,
    phase: Phase,
    last_attempt: u32,
    stats: RecorderStats,
}

impl<C: Camera> RecordingController<C> {
    pub fn new(camera: C, config: &SystemConfig) -> Self {
        Self {
            camera,
            hooks: Box::new(LogAuditHooks),
            prepare_delay: config.prepare_delay(),
            audit_scope: config.audit_scope,
            phase: Phase::OnHold,
            last_attempt: 0,
            stats: RecorderStats::default(),
        }
    }

    /// Replace the audit hooks (default: log lines).
    pub fn with_audit_hooks<H: AuditHooks + 'static>(mut self, hooks: H) -> Self {
        self.set_audit_hooks(hooks);
        self
    }

    pub fn set_audit_hooks<H: AuditHooks + 'static>(&mut self, hooks: H) {
        self.hooks = Box::new(hooks);
    }

    pub fn state(&self) -> RecordingState {
        self.phase.state()
    }

    /// The live preparation timer.  `Some` exactly when in `Prepare`.
    pub fn pending_timer(&self) -> Option<TimerHandle> {
        match self.phase {
            Phase::Prepare { timer, .. } => Some(timer),
            _ => None,
        }
    }

    /// The live preparation attempt.  `Some` exactly when in `Prepare`.
    pub fn current_attempt(&self) -> Option<PrepareAttempt> {
        match self.phase {
            Phase::Prepare { attempt, .. } => Some(attempt),
            _ => None,
        }
    }

    pub fn camera(&self) -> &C {
        &self.camera
    }

    pub fn stats(&self) -> RecorderStats {
        self.stats
    }

    /// Ask the camera for a snapshot annotated with the current state.
    pub fn capture_snapshot(&mut self) {
        let state = self.state();
        if let Err(e) = self.camera.capture_snapshot(state) {
            self.stats.camera_failures = self.stats.camera_failures.wrapping_add(1);
            warn!("Recorder: snapshot failed: {:#}", e);
        }
    }

    /// Apply one event.  Returns the new state if a transition was taken.
    pub fn handle(&mut self, event: &Event, scheduler: &mut Scheduler) -> Option<RecordingState> {
        let trigger = Trigger::from_event(event)?;

        if let Event::PrepareFinished(attempt) = *event {
            if self.current_attempt() != Some(attempt) {
                self.stats.stale_completions = self.stats.stale_completions.wrapping_add(1);
                debug!(
                    "Recorder: ignoring prepare_finished {} in {}",
                    attempt,
                    self.state()
                );
                return None;
            }
        }

        let from = self.state();
        let Some(row) = transition(from, trigger) else {
            self.stats.ignored = self.stats.ignored.wrapping_add(1);
            debug!("Recorder: {} ignored in {}", event, from);
            return None;
        };
        self.stats.accepted = self.stats.accepted.wrapping_add(1);

        if self.audit_scope == AuditScope::EveryAccepted || from == RecordingState::Prepare {
            self.audit(event);
        }

        let previous = self.phase;
        let mut armed: Option<(TimerHandle, PrepareAttempt)> = None;

        for effect in row.effects {
            match *effect {
                Effect::ArmPrepareTimer => {
                    let attempt = self.allocate_attempt();
                    let timer = scheduler
                        .schedule_once(self.prepare_delay, TimerTask::PrepareComplete(attempt));
                    armed = Some((timer, attempt));
                }
                Effect::PrepareRecording => {
                    let attempt = match armed {
                        Some((_, attempt)) => attempt,
                        None => self.allocate_attempt(),
                    };
                    info!("Recorder: Preparing to record");
                    let result = self.camera.prepare_recording(attempt);
                    self.check_camera("prepare_recording", result);
                }
                Effect::CancelPrepareTimer => {
                    if let Phase::Prepare { timer, .. } = previous {
                        scheduler.cancel(timer);
                    }
                }
                Effect::StartRecording => {
                    info!("Recorder: Recording started");
                    let result = self.camera.start_recording();
                    self.check_camera("start_recording", result);
                }
                Effect::StopRecording => {
                    let result = self.camera.stop_recording();
                    self.check_camera("stop_recording", result);
                    info!("Recorder: Recording finished");
                }
                Effect::Log(notice) => info!("Recorder: {}", notice.message()),
            }
        }

        self.phase = match row.to {
            RecordingState::OnHold => Phase::OnHold,
            RecordingState::Record => Phase::Record,
            RecordingState::Prepare => match armed {
                Some((timer, attempt)) => Phase::Prepare { timer, attempt },
                None => previous,
            },
        };
        debug_assert_eq!(self.phase.state(), row.to);

        if from != row.to {
            debug!("Recorder: {} -> {} on {}", from, row.to, event);
        }
        Some(row.to)
    }

    fn audit(&mut self, event: &Event) {
        match *event {
            Event::DoorOpen => self.hooks.on_door_open(),
            Event::DoorClosed => self.hooks.on_door_closed(),
            Event::CancelRequested => self.hooks.on_cancel_requested(),
            Event::PrepareFinished(attempt) => self.hooks.on_prepare_finished(attempt),
            Event::OverrideButtonPressed | Event::ParkingStatusChanged { .. } => {}
        }
    }

    fn allocate_attempt(&mut self) -> PrepareAttempt {
        self.last_attempt = self.last_attempt.wrapping_add(1);
        PrepareAttempt(self.last_attempt)
    }

    fn check_camera(&mut self, command: &str, result: anyhow::Result<()>) {
        if let Err(e) = result {
            self.stats.camera_failures = self.stats.camera_failures.wrapping_add(1);
            warn!("Recorder: camera {} failed: {:#}", command, e);
        }
    }
}

impl<C: Camera> Subscriber for RecordingController<C> {
    fn on_event(&mut self, event: &Event, cx: &mut Dispatch<'_>) -> anyhow::Result<()> {
        self.handle(event, cx.scheduler());
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
