//! The static transition table.
//!
//! Row order is irrelevant; each (from, trigger) pair appears at most once.
//! Effects run in the listed order.

use super::{Effect, Notice, Transition, Trigger};

use super::RecordingState::{OnHold, Prepare, Record};

pub static TRANSITIONS: &[Transition] = &[
    // ── OnHold ────────────────────────────────────────────────
    Transition {
        from: OnHold,
        trigger: Trigger::DoorOpen,
        to: Prepare,
        effects: &[Effect::ArmPrepareTimer, Effect::PrepareRecording],
    },
    // Self-loop so audit hooks see the door closing while idle.
    Transition {
        from: OnHold,
        trigger: Trigger::DoorClosed,
        to: OnHold,
        effects: &[],
    },
    // ── Prepare ───────────────────────────────────────────────
    Transition {
        from: Prepare,
        trigger: Trigger::PrepareFinished,
        to: Record,
        effects: &[Effect::CancelPrepareTimer, Effect::StartRecording],
    },
    Transition {
        from: Prepare,
        trigger: Trigger::DoorClosed,
        to: OnHold,
        effects: &[Effect::Log(Notice::PreparationCancelled), Effect::CancelPrepareTimer],
    },
    Transition {
        from: Prepare,
        trigger: Trigger::CancelRequested,
        to: OnHold,
        effects: &[Effect::Log(Notice::PreparationCancelled), Effect::CancelPrepareTimer],
    },
    // ── Record ────────────────────────────────────────────────
    Transition {
        from: Record,
        trigger: Trigger::DoorClosed,
        to: OnHold,
        effects: &[Effect::StopRecording],
    },
    Transition {
        from: Record,
        trigger: Trigger::CancelRequested,
        to: OnHold,
        effects: &[Effect::Log(Notice::RecordingCancelled), Effect::StopRecording],
    },
];
