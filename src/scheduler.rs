//! Timer service.
//!
//! One-shot and periodic timers on a monotonic virtual clock.  The
//! scheduler never calls back into the system: the service pops due
//! timers one at a time and dispatches them itself, so a timer cancelled
//! by an earlier callback in the same step can never fire.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        Timer sources                         │
//! │                                                              │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────┐           │
//! │  │ Prepare     │  │ Sensor poll │  │ Door report │  ...      │
//! │  │ (one-shot)  │  │ (periodic)  │  │ (periodic)  │           │
//! │  └──────┬──────┘  └──────┬──────┘  └──────┬──────┘           │
//! │         │                │                │                  │
//! │         ▼                ▼                ▼                  │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │           Scheduler::pop_due(now) - one at a time      │  │
//! │  └───────────────────────┬────────────────────────────────┘  │
//! │                          ▼                                   │
//! │                GarageService::run_until()                    │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Time is a `Duration` since service start.  The host loop maps a real
//! monotonic clock onto it; tests drive it directly.

use core::time::Duration;

use log::{debug, warn};

use crate::events::PrepareAttempt;

/// Shortest accepted period.  A zero period would make `pop_due` spin.
const MIN_PERIOD: Duration = Duration::from_millis(1);

// ═══════════════════════════════════════════════════════════════
//  Timer types
// ═══════════════════════════════════════════════════════════════

/// Cancellable handle to a scheduled timer.
///
/// Handles are never reused, so cancelling an already-fired or
/// already-cancelled handle is a safe no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

/// What a timer does when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerTask {
    /// Recording preparation delay elapsed for the given attempt.
    PrepareComplete(PrepareAttempt),
    /// Read the sensor block.
    SensorPoll,
    /// Re-report the last known door status.
    DoorReport,
    /// Ask the camera for a periodic snapshot.
    Snapshot,
}

/// Internal bookkeeping for a live timer.
#[derive(Debug, Clone, Copy)]
struct TimerEntry {
    handle: TimerHandle,
    task: TimerTask,
    deadline: Duration,
    period: Option<Duration>,
    /// Insertion order, breaks ties between equal deadlines (FIFO).
    seq: u64,
}

// ═══════════════════════════════════════════════════════════════
//  Scheduler engine
// ═══════════════════════════════════════════════════════════════

/// The timer service.
#[derive(Debug, Default)]
pub struct Scheduler {
    /// Current virtual time.
    now: Duration,
    next_id: u64,
    next_seq: u64,
    entries: Vec<TimerEntry>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current virtual time.
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Fire `task` once, `delay` from now.
    pub fn schedule_once(&mut self, delay: Duration, task: TimerTask) -> TimerHandle {
        let handle = self.allocate_handle();
        self.insert(handle, task, self.now + delay, None);
        debug!("Scheduler: {:?} once in {:?} ({:?})", task, delay, handle);
        handle
    }

    /// Fire `task` every `interval`.  With `run_immediately` the first
    /// firing is due now, otherwise one interval from now.
    pub fn schedule_periodic(
        &mut self,
        interval: Duration,
        task: TimerTask,
        run_immediately: bool,
    ) -> TimerHandle {
        let interval = if interval < MIN_PERIOD {
            warn!("Scheduler: period {:?} too short, using {:?}", interval, MIN_PERIOD);
            MIN_PERIOD
        } else {
            interval
        };
        let first = if run_immediately { self.now } else { self.now + interval };
        let handle = self.allocate_handle();
        self.insert(handle, task, first, Some(interval));
        debug!("Scheduler: {:?} every {:?} ({:?})", task, interval, handle);
        handle
    }

    /// Restart a periodic timer with a new interval.
    ///
    /// This is a cancel followed by a fresh schedule, never an in-place
    /// mutation, so the new cadence is measured from now.  Returns the new
    /// handle, or `None` if `handle` was not live.
    pub fn restart_periodic(
        &mut self,
        handle: TimerHandle,
        interval: Duration,
        run_immediately: bool,
    ) -> Option<TimerHandle> {
        let task = self.task(handle)?;
        self.cancel(handle);
        Some(self.schedule_periodic(interval, task, run_immediately))
    }

    /// Cancel a timer.  Once this returns the timer is guaranteed not to
    /// fire.  Returns `false` if it had already fired or been cancelled.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        match self.entries.iter().position(|e| e.handle == handle) {
            Some(idx) => {
                let entry = self.entries.swap_remove(idx);
                debug!("Scheduler: cancelled {:?} ({:?})", entry.task, handle);
                true
            }
            None => false,
        }
    }

    /// Whether `handle` is scheduled and has not fired (one-shot) or been
    /// cancelled.
    pub fn is_pending(&self, handle: TimerHandle) -> bool {
        self.entry(handle).is_some()
    }

    pub fn task(&self, handle: TimerHandle) -> Option<TimerTask> {
        self.entry(handle).map(|e| e.task)
    }

    /// Period of a live periodic timer.
    pub fn period(&self, handle: TimerHandle) -> Option<Duration> {
        self.entry(handle).and_then(|e| e.period)
    }

    /// Next due time of a live timer.
    pub fn deadline(&self, handle: TimerHandle) -> Option<Duration> {
        self.entry(handle).map(|e| e.deadline)
    }

    /// Earliest deadline across all live timers.
    pub fn next_deadline(&self) -> Option<Duration> {
        self.entries.iter().map(|e| e.deadline).min()
    }

    /// Number of live timers.
    pub fn pending_count(&self) -> usize {
        self.entries.len()
    }

    /// Remove and return the earliest timer due at or before `until`.
    ///
    /// The clock moves to that timer's deadline, so anything scheduled by
    /// its callback is measured from the firing time.  One-shot timers are
    /// consumed; periodic timers are re-armed at `deadline + period`,
    /// skipping periods the host slept through.
    pub fn pop_due(&mut self, until: Duration) -> Option<(TimerHandle, TimerTask)> {
        let idx = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.deadline <= until)
            .min_by_key(|(_, e)| (e.deadline, e.seq))
            .map(|(i, _)| i)?;

        let entry = self.entries.swap_remove(idx);
        self.now = self.now.max(entry.deadline);

        if let Some(period) = entry.period {
            let mut next = entry.deadline.saturating_add(period);
            if next <= until {
                let elapsed = (until - entry.deadline).as_nanos();
                let period_ns = period.as_nanos();
                debug!(
                    "Scheduler: {:?} skipped {} period(s)",
                    entry.task,
                    elapsed / period_ns
                );
                // Next period boundary strictly after `until`.
                let to_boundary = period_ns - elapsed % period_ns;
                next = until.saturating_add(Duration::from_nanos(
                    u64::try_from(to_boundary).unwrap_or(u64::MAX),
                ));
            }
            self.insert(entry.handle, entry.task, next, Some(period));
        }

        Some((entry.handle, entry.task))
    }

    /// Move the clock forward to `until` (never backwards).
    pub fn advance_to(&mut self, until: Duration) {
        self.now = self.now.max(until);
    }

    // ── Internal ──────────────────────────────────────────────

    fn allocate_handle(&mut self) -> TimerHandle {
        self.next_id += 1;
        TimerHandle(self.next_id)
    }

    fn insert(
        &mut self,
        handle: TimerHandle,
        task: TimerTask,
        deadline: Duration,
        period: Option<Duration>,
    ) {
        self.next_seq += 1;
        self.entries.push(TimerEntry {
            handle,
            task,
            deadline,
            period,
            seq: self.next_seq,
        });
    }

    fn entry(&self, handle: TimerHandle) -> Option<&TimerEntry> {
        self.entries.iter().find(|e| e.handle == handle)
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
