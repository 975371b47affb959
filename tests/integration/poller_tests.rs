//! Sensor poller: edge decoding, parking mode and cadence switching,
//! failure isolation.

use std::cell::RefCell;
use std::rc::Rc;

use garagewatch::error::BusError;
use garagewatch::events::Event;
use garagewatch::fsm::RecordingState;
use garagewatch::sensors::ParkingDistance;
use garagewatch::sensors::poller::PollInterval;

use crate::mock_hw::*;

fn parking_changes(events: &[Event]) -> Vec<(u8, u8)> {
    events
        .iter()
        .filter_map(|e| match *e {
            Event::ParkingStatusChanged { new, old } => Some((new, old)),
            _ => None,
        })
        .collect()
}

fn poll_deadline(svc: &TestService) -> std::time::Duration {
    let timer = svc.poller().timer().unwrap();
    svc.scheduler().deadline(timer).unwrap()
}

#[test]
fn parking_sequence_switches_cadence_twice() {
    let mut svc = service(quiet_config());
    let seen = capture_events(&mut svc);
    for status in [0, 0, 5, 5, 0] {
        svc.reader_mut().push_status(status);
    }
    svc.start().unwrap();

    svc.run_until(ms(0)); // status 0
    svc.run_until(ms(2_000)); // status 0
    assert_eq!(svc.poller_state().interval, PollInterval::Regular);
    assert!(parking_changes(&seen.borrow()).is_empty());

    svc.run_until(ms(4_000)); // status 5
    assert_eq!(svc.poller_state().interval, PollInterval::Fast);
    assert_eq!(parking_changes(&seen.borrow()), vec![(5, 0)]);
    // Restarted without an extra tick: next read one fast period later.
    assert_eq!(poll_deadline(&svc), ms(4_500));

    svc.run_until(ms(4_500)); // status 5
    assert_eq!(svc.poller_state().interval, PollInterval::Fast);

    svc.run_until(ms(5_000)); // status 0
    assert_eq!(svc.poller_state().interval, PollInterval::Regular);
    assert_eq!(parking_changes(&seen.borrow()), vec![(5, 0), (0, 5)]);
    assert_eq!(poll_deadline(&svc), ms(7_000));

    assert_eq!(svc.reader_mut().reads, 5);
}

#[test]
fn edges_in_one_block_publish_left_to_right() {
    let mut svc = service(quiet_config());
    let seen = capture_events(&mut svc);
    svc.reader_mut().push_block([0x01, 0x02, 0, 0, 0, 0, 0, 0]);
    svc.start().unwrap();

    svc.run_until(ms(0));

    assert_eq!(*seen.borrow(), vec![Event::DoorOpen, Event::DoorClosed]);
    // Open then closed within one dispatch cycle: preparation cancelled.
    assert_eq!(svc.recording_state(), RecordingState::OnHold);
    assert_eq!(svc.pending_prepare_timer(), None);
    assert_eq!(svc.poller().is_door_open(), Some(false));
}

#[test]
fn read_failure_skips_tick_only() {
    let mut svc = service(quiet_config());
    let seen = capture_events(&mut svc);
    svc.reader_mut().push_block(DOOR_OPEN);
    svc.reader_mut().push(Err(BusError::Timeout));
    svc.reader_mut().push_block(DOOR_CLOSED);
    svc.start().unwrap();

    svc.run_until(ms(0));
    assert_eq!(seen.borrow().len(), 1);

    svc.run_until(ms(2_000));
    assert_eq!(seen.borrow().len(), 1, "failed read publishes nothing");
    assert_eq!(svc.poller().stats().read_failures, 1);
    assert_eq!(poll_deadline(&svc), ms(4_000));
    assert_eq!(svc.poller_state().interval, PollInterval::Regular);

    svc.run_until(ms(4_000));
    assert_eq!(*seen.borrow(), vec![Event::DoorOpen, Event::DoorClosed]);
}

#[test]
fn out_of_range_status_keeps_edges_drops_telemetry() {
    let mut svc = service(quiet_config());
    let seen = capture_events(&mut svc);
    let telemetry = Rc::new(RefCell::new(0u32));
    let t = Rc::clone(&telemetry);
    svc.add_telemetry_sink(move |_status: u8, _d: ParkingDistance| -> anyhow::Result<()> {
        *t.borrow_mut() += 1;
        Ok(())
    })
    .unwrap();

    svc.reader_mut().push_block([0x01, 0, 0, 0, 0, 10, 5, 5]);
    svc.start().unwrap();
    svc.run_until(ms(0));

    assert_eq!(*seen.borrow(), vec![Event::DoorOpen]);
    assert_eq!(*telemetry.borrow(), 0);
    assert_eq!(svc.poller_state().last_parking_status, 0);
    assert_eq!(svc.poller().stats().invalid_status, 1);
}

#[test]
fn telemetry_follows_the_manoeuvre() {
    let mut svc = service(quiet_config());
    let got = Rc::new(RefCell::new(Vec::new()));
    let g = Rc::clone(&got);
    svc.add_telemetry_sink(move |status: u8, d: ParkingDistance| -> anyhow::Result<()> {
        g.borrow_mut().push((status, d.near));
        Ok(())
    })
    .unwrap();

    svc.reader_mut().push_block(status_block(0, 0, 0));
    svc.reader_mut().push_block(status_block(2, 120, 140));
    svc.reader_mut().push_block(status_block(2, 90, 110));
    svc.reader_mut().push_block(status_block(4, 30, 50));
    svc.reader_mut().push_block(status_block(0, 0, 0));
    svc.reader_mut().push_block(status_block(0, 0, 0));
    svc.start().unwrap();

    // 0s regular, then fast 0.5s cadence after the target appears at 2s.
    for t in [0, 2_000, 2_500, 3_000, 3_500, 5_500] {
        svc.run_until(ms(t));
    }

    assert_eq!(
        *got.borrow(),
        vec![(2, 120), (2, 90), (4, 30), (0, 0)],
        "smooth updates while active, one final reading, then silence"
    );
    assert_eq!(
        svc.poller_state().parking_distance,
        ParkingDistance { near: 0, far: 0 }
    );
}

#[test]
fn failing_telemetry_sink_does_not_stop_polling() {
    let mut svc = service(quiet_config());
    svc.add_telemetry_sink(|_status: u8, _d: ParkingDistance| -> anyhow::Result<()> {
        anyhow::bail!("display gone")
    })
    .unwrap();
    svc.reader_mut().push_status(3);
    svc.reader_mut().push_status(3);
    svc.start().unwrap();

    svc.run_until(ms(0));
    svc.run_until(ms(500));
    assert_eq!(svc.poller().stats().ticks, 2);
    assert_eq!(svc.poller_state().interval, PollInterval::Fast);
}
