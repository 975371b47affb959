//! Table-driven recording state machine.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │  TRANSITIONS                                                     │
//! │  ┌─────────┬──────────────────┬─────────┬──────────────────────┐ │
//! │  │ from    │ trigger          │ to      │ effects (in order)   │ │
//! │  ├─────────┼──────────────────┼─────────┼──────────────────────┤ │
//! │  │ OnHold  │ door_open        │ Prepare │ arm timer, prepare   │ │
//! │  │ OnHold  │ door_closed      │ OnHold  │ -                    │ │
//! │  │ Prepare │ prepare_finished │ Record  │ cancel timer, start  │ │
//! │  │ Prepare │ door_closed      │ OnHold  │ log, cancel timer    │ │
//! │  │ Prepare │ cancel_requested │ OnHold  │ log, cancel timer    │ │
//! │  │ Record  │ door_closed      │ OnHold  │ stop                 │ │
//! │  │ Record  │ cancel_requested │ OnHold  │ log, stop            │ │
//! │  └─────────┴──────────────────┴─────────┴──────────────────────┘ │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! [`transition`] is a pure lookup; every (state, trigger) pair missing
//! from the table is a no-op.  [`controller::RecordingController`] executes
//! the effect lists against the camera and the timer service.

pub mod controller;
mod table;

use core::fmt;

use crate::events::Event;

pub use table::TRANSITIONS;

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

/// Recording lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RecordingState {
    #[default]
    OnHold,
    Prepare,
    Record,
}

impl RecordingState {
    pub const fn name(self) -> &'static str {
        match self {
            Self::OnHold => "on_hold",
            Self::Prepare => "prepare",
            Self::Record => "record",
        }
    }
}

impl fmt::Display for RecordingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Triggers and effects
// ---------------------------------------------------------------------------

/// Events the recorder reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trigger {
    DoorOpen,
    DoorClosed,
    CancelRequested,
    PrepareFinished,
}

impl Trigger {
    /// `None` for events the recorder does not consume.
    pub const fn from_event(event: &Event) -> Option<Self> {
        match event {
            Event::DoorOpen => Some(Self::DoorOpen),
            Event::DoorClosed => Some(Self::DoorClosed),
            Event::CancelRequested => Some(Self::CancelRequested),
            Event::PrepareFinished(_) => Some(Self::PrepareFinished),
            Event::OverrideButtonPressed | Event::ParkingStatusChanged { .. } => None,
        }
    }
}

/// Informational log line emitted by a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    PreparationCancelled,
    RecordingCancelled,
}

impl Notice {
    pub const fn message(self) -> &'static str {
        match self {
            Self::PreparationCancelled => "Preparations for recording cancelled",
            Self::RecordingCancelled => "Recording cancelled",
        }
    }
}

/// Side effect of a transition, executed in table order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Schedule the one-shot "prepare complete" timer.
    ArmPrepareTimer,
    /// Call `Camera::prepare_recording`.
    PrepareRecording,
    /// Cancel the pending preparation timer (no-op if it already fired).
    CancelPrepareTimer,
    StartRecording,
    StopRecording,
    Log(Notice),
}

/// One row of the transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: RecordingState,
    pub trigger: Trigger,
    pub to: RecordingState,
    pub effects: &'static [Effect],
}

// ---------------------------------------------------------------------------
// Pure evaluation
// ---------------------------------------------------------------------------

/// Look up the row for `(state, trigger)`.  `None` means "ignore".
pub fn transition(state: RecordingState, trigger: Trigger) -> Option<&'static Transition> {
    TRANSITIONS
        .iter()
        .find(|t| t.from == state && t.trigger == trigger)
}

/// Next state after `trigger`; unknown pairs leave the state unchanged.
pub fn next_state(state: RecordingState, trigger: Trigger) -> RecordingState {
    transition(state, trigger).map_or(state, |t| t.to)
}

/// Fold the table over a trigger sequence.
pub fn replay<I>(initial: RecordingState, triggers: I) -> RecordingState
where
    I: IntoIterator<Item = Trigger>,
{
    triggers.into_iter().fold(initial, next_state)
}
