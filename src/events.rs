//! Named-event publish/subscribe bus.
//!
//! Events are produced by:
//! - The sensor poller (door edges, override button, parking status)
//! - Timer expiry (preparation finished)
//! - Subscribers themselves (the override bridge republishes a cancel)
//! - Asynchronous collaborators, through the service inbox
//!
//! Delivery is synchronous and strictly sequential: `publish` invokes every
//! subscriber of the event's kind in registration order and returns only
//! after all of them (and any chain reaction they publish) have run.
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌──────────────────┐
//! │ Poller      │────▶│              │────▶│ RecordingCtrl    │
//! │ Timers      │────▶│   EventBus   │────▶│ Override bridge  │
//! │ Inbox       │────▶│ (in-order)   │────▶│ Door relay       │
//! │ Subscribers │────▶│              │────▶│ external subs    │
//! └─────────────┘     └──────────────┘     └──────────────────┘
//! ```
//!
//! A subscriber that fails (returns `Err`) or panics is logged and skipped;
//! the remaining subscribers still receive the event.

use core::fmt;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::Rc;

use log::{debug, error, warn};

use crate::scheduler::Scheduler;

/// Bound on chain reactions: nested publish depth, and re-deliveries to a
/// busy subscriber within one publish.  Only reachable through a subscriber
/// cycle (A publishes B publishes A ...).
const MAX_CHAIN: usize = 16;

// ═══════════════════════════════════════════════════════════════
//  Event types
// ═══════════════════════════════════════════════════════════════

/// Identifies one entry into the `Prepare` state.
///
/// Every preparation gets a fresh id; a `prepare_finished` carrying an
/// id other than the live one is stale and ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PrepareAttempt(pub u32);

impl fmt::Display for PrepareAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Event name, the subscription key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    DoorOpen,
    DoorClosed,
    OverrideButtonPressed,
    CancelRequested,
    PrepareFinished,
    ParkingStatusChanged,
}

impl EventKind {
    pub const ALL: [Self; 6] = [
        Self::DoorOpen,
        Self::DoorClosed,
        Self::OverrideButtonPressed,
        Self::CancelRequested,
        Self::PrepareFinished,
        Self::ParkingStatusChanged,
    ];

    /// Wire name of the event.
    pub const fn name(self) -> &'static str {
        match self {
            Self::DoorOpen => "door_open",
            Self::DoorClosed => "door_closed",
            Self::OverrideButtonPressed => "override_button_pressed",
            Self::CancelRequested => "cancel_requested",
            Self::PrepareFinished => "prepare_finished",
            Self::ParkingStatusChanged => "parking_status_changed",
        }
    }

    const fn bit(self) -> u8 {
        1 << self as u8
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An event with its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    DoorOpen,
    DoorClosed,
    OverrideButtonPressed,
    CancelRequested,
    /// The preparation delay for `attempt` elapsed (or the camera finished
    /// its own setup early).
    PrepareFinished(PrepareAttempt),
    /// Parking status byte changed from `old` to `new`.
    ParkingStatusChanged { new: u8, old: u8 },
}

impl Event {
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::DoorOpen => EventKind::DoorOpen,
            Self::DoorClosed => EventKind::DoorClosed,
            Self::OverrideButtonPressed => EventKind::OverrideButtonPressed,
            Self::CancelRequested => EventKind::CancelRequested,
            Self::PrepareFinished(_) => EventKind::PrepareFinished,
            Self::ParkingStatusChanged { .. } => EventKind::ParkingStatusChanged,
        }
    }

    pub const fn name(&self) -> &'static str {
        self.kind().name()
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PrepareFinished(attempt) => write!(f, "prepare_finished({attempt})"),
            Self::ParkingStatusChanged { new, old } => {
                write!(f, "parking_status_changed({new}, {old})")
            }
            other => f.write_str(other.name()),
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Subscribers
// ═══════════════════════════════════════════════════════════════

/// Handler invoked for every event of the kinds it subscribed to.
///
/// The [`Dispatch`] context lets a handler publish follow-up events and
/// schedule or cancel timers.  Errors are logged by the bus and never
/// reach the publisher.
pub trait Subscriber {
    fn on_event(&mut self, event: &Event, cx: &mut Dispatch<'_>) -> anyhow::Result<()>;
}

/// Shared subscribers: the owner keeps a clone to query state.
impl<S: Subscriber> Subscriber for Rc<RefCell<S>> {
    fn on_event(&mut self, event: &Event, cx: &mut Dispatch<'_>) -> anyhow::Result<()> {
        let mut inner = self
            .try_borrow_mut()
            .map_err(|_| anyhow::anyhow!("subscriber is borrowed elsewhere"))?;
        inner.on_event(event, cx)
    }
}

/// Subscriber backed by a closure.  See [`from_fn`].
pub struct FromFn<F>(F);

impl<F> Subscriber for FromFn<F>
where
    F: FnMut(&Event, &mut Dispatch<'_>) -> anyhow::Result<()>,
{
    fn on_event(&mut self, event: &Event, cx: &mut Dispatch<'_>) -> anyhow::Result<()> {
        (self.0)(event, cx)
    }
}

/// Wrap a closure as a [`Subscriber`].
pub fn from_fn<F>(f: F) -> FromFn<F>
where
    F: FnMut(&Event, &mut Dispatch<'_>) -> anyhow::Result<()>,
{
    FromFn(f)
}

/// Context handed to a subscriber for the duration of one delivery.
pub struct Dispatch<'a> {
    bus: &'a mut EventBus,
    scheduler: &'a mut Scheduler,
}

impl Dispatch<'_> {
    /// Publish a follow-up event.  It is fully dispatched before this call
    /// returns.
    pub fn publish(&mut self, event: Event) -> usize {
        self.bus.publish(self.scheduler, event)
    }

    pub fn scheduler(&mut self) -> &mut Scheduler {
        self.scheduler
    }
}

// ═══════════════════════════════════════════════════════════════
//  Bus
// ═══════════════════════════════════════════════════════════════

/// Token returned by [`EventBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Delivery counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BusStats {
    pub published: u32,
    pub delivered: u32,
    pub failed: u32,
}

/// Set of event kinds one subscription listens to.
#[derive(Clone, Copy, PartialEq, Eq)]
struct KindSet(u8);

impl KindSet {
    fn of(kinds: &[EventKind]) -> Self {
        Self(kinds.iter().fold(0, |bits, k| bits | k.bit()))
    }

    const fn contains(self, kind: EventKind) -> bool {
        self.0 & kind.bit() != 0
    }
}

impl fmt::Debug for KindSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set()
            .entries(EventKind::ALL.into_iter().filter(|k| self.contains(*k)).map(EventKind::name))
            .finish()
    }
}

struct Slot {
    id: SubscriptionId,
    kinds: KindSet,
    label: &'static str,
    /// `None` while the handler is running further up the stack.
    handler: Option<Box<dyn Subscriber>>,
    /// Events that arrived while the handler was running.
    deferred: VecDeque<Event>,
    removed: bool,
}

/// Synchronous, ordered pub/sub register.
#[derive(Default)]
pub struct EventBus {
    slots: Vec<Slot>,
    next_id: u64,
    depth: usize,
    stats: BusStats,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for events of `kind`.  `label` appears in logs.
    pub fn subscribe<S>(&mut self, kind: EventKind, label: &'static str, handler: S) -> SubscriptionId
    where
        S: Subscriber + 'static,
    {
        self.subscribe_many(&[kind], label, handler)
    }

    /// Register one handler for several kinds under a single subscription.
    /// The handler is invoked once per event, and events it publishes to
    /// itself are deferred like any other re-entrant delivery.
    pub fn subscribe_many<S>(
        &mut self,
        kinds: &[EventKind],
        label: &'static str,
        handler: S,
    ) -> SubscriptionId
    where
        S: Subscriber + 'static,
    {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        let kinds = KindSet::of(kinds);
        self.slots.push(Slot {
            id,
            kinds,
            label,
            handler: Some(Box::new(handler)),
            deferred: VecDeque::new(),
            removed: false,
        });
        debug!("EventBus: '{}' subscribed to {:?}", label, kinds);
        id
    }

    /// Remove a subscription.  Takes effect immediately, also for an event
    /// currently being dispatched.  Returns `false` for an unknown id.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let Some(slot) = self.slots.iter_mut().find(|s| s.id == id && !s.removed) else {
            return false;
        };
        slot.removed = true;
        slot.deferred.clear();
        debug!("EventBus: '{}' unsubscribed from {:?}", slot.label, slot.kinds);
        if self.depth == 0 {
            self.slots.retain(|s| !s.removed);
        }
        true
    }

    /// Live subscriptions for `kind`.
    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.slots
            .iter()
            .filter(|s| s.kinds.contains(kind) && !s.removed)
            .count()
    }

    pub fn stats(&self) -> BusStats {
        self.stats
    }

    /// Deliver `event` to every current subscriber of its kind, in
    /// registration order.  Returns the number of successful deliveries.
    ///
    /// Subscriptions added while the event is in flight do not receive it.
    /// A subscriber already running further up the stack (it published an
    /// event it also listens to) receives the event right after its current
    /// invocation returns.
    pub fn publish(&mut self, scheduler: &mut Scheduler, event: Event) -> usize {
        if self.depth >= MAX_CHAIN {
            error!("EventBus: dropping {} (publish depth {} exceeded)", event, MAX_CHAIN);
            return 0;
        }

        self.stats.published = self.stats.published.wrapping_add(1);
        debug!("EventBus: publish {}", event);

        self.depth += 1;
        let kind = event.kind();
        let end = self.slots.len();
        let mut delivered = 0;

        for idx in 0..end {
            let slot = &mut self.slots[idx];
            if slot.removed || !slot.kinds.contains(kind) {
                continue;
            }
            let Some(handler) = slot.handler.take() else {
                slot.deferred.push_back(event);
                continue;
            };

            let mut handler = handler;
            if self.deliver(idx, &mut handler, scheduler, &event) {
                delivered += 1;
            }
            // Drain whatever arrived for this slot while it was running.
            let mut redelivered = 0;
            while let Some(next) = self.slots[idx].deferred.pop_front() {
                if self.slots[idx].removed {
                    break;
                }
                if redelivered == MAX_CHAIN {
                    let dropped = self.slots[idx].deferred.len() + 1;
                    error!(
                        "EventBus: '{}' dropped {} re-entrant event(s)",
                        self.slots[idx].label, dropped
                    );
                    self.slots[idx].deferred.clear();
                    break;
                }
                redelivered += 1;
                self.deliver(idx, &mut handler, scheduler, &next);
            }
            if !self.slots[idx].removed {
                self.slots[idx].handler = Some(handler);
            }
        }

        self.depth -= 1;
        if self.depth == 0 {
            self.slots.retain(|s| !s.removed);
        }
        delivered
    }

    /// Invoke one handler, isolating failures and panics.
    fn deliver(
        &mut self,
        idx: usize,
        handler: &mut Box<dyn Subscriber>,
        scheduler: &mut Scheduler,
        event: &Event,
    ) -> bool {
        let label = self.slots[idx].label;
        let outcome = {
            let mut cx = Dispatch {
                bus: &mut *self,
                scheduler: &mut *scheduler,
            };
            catch_unwind(AssertUnwindSafe(|| handler.on_event(event, &mut cx)))
        };

        match outcome {
            Ok(Ok(())) => {
                self.stats.delivered = self.stats.delivered.wrapping_add(1);
                true
            }
            Ok(Err(e)) => {
                self.stats.failed = self.stats.failed.wrapping_add(1);
                warn!("EventBus: '{}' failed on {}: {:#}", label, event, e);
                false
            }
            Err(_) => {
                self.stats.failed = self.stats.failed.wrapping_add(1);
                error!("EventBus: '{}' panicked on {}", label, event);
                false
            }
        }
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriptions", &self.slots.len())
            .field("depth", &self.depth)
            .field("stats", &self.stats)
            .finish()
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
