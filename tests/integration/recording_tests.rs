//! Recording state machine driven end-to-end through the service:
//! sensor blocks in, camera commands out.

use std::cell::RefCell;
use std::rc::Rc;

use garagewatch::app::ports::AuditHooks;
use garagewatch::events::{Event, PrepareAttempt};
use garagewatch::fsm::RecordingState;

use crate::mock_hw::*;

#[derive(Clone, Default)]
struct CancelCounter(Rc<RefCell<u32>>);

impl AuditHooks for CancelCounter {
    fn on_cancel_requested(&mut self) {
        *self.0.borrow_mut() += 1;
    }
}

#[test]
fn open_prepare_record_close() {
    let mut svc = service(quiet_config());
    svc.reader_mut().push_block(DOOR_OPEN);
    svc.start().unwrap();

    svc.run_until(ms(0));
    assert_eq!(svc.recording_state(), RecordingState::Prepare);
    assert_timer_invariant(&svc);

    svc.run_until(ms(9_999));
    assert_eq!(svc.recording_state(), RecordingState::Prepare);

    svc.run_until(secs(10));
    assert_eq!(svc.recording_state(), RecordingState::Record);
    assert_timer_invariant(&svc);

    svc.reader_mut().push_block(DOOR_CLOSED);
    svc.run_until(secs(12));
    assert_eq!(svc.recording_state(), RecordingState::OnHold);
    assert_timer_invariant(&svc);

    assert_eq!(
        svc.recorder().camera().calls,
        vec![
            CameraCall::Prepare(PrepareAttempt(1)),
            CameraCall::Start,
            CameraCall::Stop,
        ]
    );
}

#[test]
fn override_cancels_preparation() {
    let mut svc = service(quiet_config());
    let cancels = CancelCounter::default();
    svc.set_audit_hooks(cancels.clone());
    let seen = capture_events(&mut svc);

    svc.reader_mut().push_block(DOOR_OPEN);
    svc.reader_mut().push_block(OVERRIDE);
    svc.start().unwrap();

    svc.run_until(ms(0));
    let timer = svc.pending_prepare_timer().unwrap();

    svc.run_until(secs(2));
    assert_eq!(svc.recording_state(), RecordingState::OnHold);
    assert!(!svc.scheduler().is_pending(timer));
    assert_timer_invariant(&svc);

    // Long past the preparation delay: nothing starts.
    svc.run_until(secs(30));
    assert_eq!(svc.recording_state(), RecordingState::OnHold);
    assert_eq!(svc.recorder().camera().starts(), 0);
    assert_eq!(*cancels.0.borrow(), 1);

    // The bridge's cancel is fully dispatched before later subscribers
    // see the override itself.
    assert_eq!(
        *seen.borrow(),
        vec![
            Event::DoorOpen,
            Event::CancelRequested,
            Event::OverrideButtonPressed,
        ]
    );
}

#[test]
fn door_closed_while_idle_is_a_no_op() {
    let mut svc = service(quiet_config());
    svc.publish(Event::DoorClosed);
    svc.publish(Event::DoorClosed);
    assert_eq!(svc.recording_state(), RecordingState::OnHold);
    assert!(svc.recorder().camera().calls.is_empty());
    assert_eq!(svc.scheduler().pending_count(), 0);
}

#[test]
fn delayed_completion_after_cancel_is_ignored() {
    let mut svc = service(quiet_config());
    let tx = svc.inbox_sender();

    svc.publish(Event::DoorOpen);
    let attempt = svc.recorder().current_attempt().unwrap();
    svc.publish(Event::CancelRequested);

    tx.post(Event::PrepareFinished(attempt)).unwrap();
    svc.run_until(secs(1));

    assert_eq!(svc.recording_state(), RecordingState::OnHold);
    assert_eq!(svc.recorder().camera().starts(), 0);
    assert_eq!(svc.recorder().stats().stale_completions, 1);
    assert_timer_invariant(&svc);
}

#[test]
fn completion_from_earlier_attempt_is_ignored() {
    let mut svc = service(quiet_config());
    let tx = svc.inbox_sender();

    svc.publish(Event::DoorOpen);
    let first = svc.recorder().current_attempt().unwrap();
    svc.publish(Event::DoorClosed);
    svc.run_until(secs(4));
    svc.publish(Event::DoorOpen);

    tx.post(Event::PrepareFinished(first)).unwrap();
    svc.run_until(secs(5));
    assert_eq!(svc.recording_state(), RecordingState::Prepare);

    // The second preparation started at 4s and finishes at 14s.
    svc.run_until(ms(13_999));
    assert_eq!(svc.recording_state(), RecordingState::Prepare);
    svc.run_until(secs(14));
    assert_eq!(svc.recording_state(), RecordingState::Record);
    assert_eq!(svc.recorder().camera().starts(), 1);
}

#[test]
fn camera_may_finish_preparation_early() {
    let mut svc = service(quiet_config());
    let tx = svc.inbox_sender();

    svc.publish(Event::DoorOpen);
    let attempt = svc.recorder().current_attempt().unwrap();
    let timer = svc.pending_prepare_timer().unwrap();

    svc.run_until(secs(3));
    tx.post(Event::PrepareFinished(attempt)).unwrap();
    svc.run_until(secs(3));

    assert_eq!(svc.recording_state(), RecordingState::Record);
    assert!(!svc.scheduler().is_pending(timer));

    // The cancelled timer never produces a second start.
    svc.run_until(secs(20));
    assert_eq!(svc.recorder().camera().starts(), 1);
}

#[test]
fn inbox_door_open_is_timed_from_its_step() {
    let mut svc = service(quiet_config());
    let seen = capture_events(&mut svc);
    let tx = svc.inbox_sender();
    svc.reader_mut().push_block(status_block(0, 0, 0));
    svc.reader_mut().push_block(DOOR_CLOSED);
    svc.start().unwrap();
    svc.run_until(ms(0));

    tx.post(Event::DoorOpen).unwrap();
    tx.post(Event::DoorClosed).unwrap();
    tx.post(Event::DoorOpen).unwrap();
    svc.run_until(ms(2_100));

    // The poll due at 2s is handled before the posted events.
    assert_eq!(
        *seen.borrow(),
        vec![
            Event::DoorClosed,
            Event::DoorOpen,
            Event::DoorClosed,
            Event::DoorOpen,
        ]
    );
    assert_eq!(svc.now(), ms(2_100));
    let timer = svc.pending_prepare_timer().unwrap();
    assert_eq!(svc.scheduler().deadline(timer), Some(ms(12_100)));
}

#[test]
fn cancel_while_recording_stops_once() {
    let mut svc = service(quiet_config());
    svc.publish(Event::DoorOpen);
    svc.run_until(secs(10));
    assert_eq!(svc.recording_state(), RecordingState::Record);

    svc.publish(Event::OverrideButtonPressed);
    assert_eq!(svc.recording_state(), RecordingState::OnHold);
    svc.publish(Event::CancelRequested);
    svc.publish(Event::DoorClosed);

    let camera_stops = svc.recorder().camera().stops();
    assert_eq!(camera_stops, 1);
}

#[test]
fn door_open_while_preparing_keeps_first_attempt() {
    let mut svc = service(quiet_config());
    svc.publish(Event::DoorOpen);
    let timer = svc.pending_prepare_timer().unwrap();

    svc.publish(Event::DoorOpen);
    assert_eq!(svc.pending_prepare_timer(), Some(timer));
    assert_eq!(svc.recorder().current_attempt(), Some(PrepareAttempt(1)));
    assert_eq!(svc.recorder().stats().ignored, 1);
}
