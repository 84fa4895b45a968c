//! Integration tests for the lock controller against scripted and simulated
//! boards.

use std::sync::Arc;
use std::time::Duration;

use locker_controller::{LockController, PollOptions, PollOutcome, StatusReporter, wait_for_state};
use locker_core::{Bay, FramingVariant, LockState};
use locker_hardware::{AnyTransport, BoardOptions, MockTransport, SimulatedBoard};
use locker_protocol::{AnyCodec, Command, FrameCodec};
use rstest::rstest;

fn bay(id: u8) -> Bay {
    Bay::new(id).unwrap()
}

fn simulated(variant: FramingVariant) -> (Arc<LockController<AnyTransport>>, locker_hardware::SimulatedBoardHandle) {
    let codec = AnyCodec::new(variant, 0x01);
    let (board, handle) = SimulatedBoard::new(codec.clone(), BoardOptions::default());
    (Arc::new(LockController::new(AnyTransport::from(board), codec)), handle)
}

#[rstest]
#[case(FramingVariant::LengthPrefixed)]
#[case(FramingVariant::Fixed)]
#[tokio::test]
async fn test_open_then_query_round_trip(#[case] variant: FramingVariant) {
    let (controller, handle) = simulated(variant);

    controller.open(bay(6)).await.unwrap();

    assert_eq!(handle.opened(), vec![bay(6)]);
    assert_eq!(controller.query_status(bay(6)).await, LockState::Unlocked);
    assert_eq!(controller.query_status(bay(5)).await, LockState::Locked);
}

#[tokio::test]
async fn test_query_all_reports_every_bay() {
    let (controller, handle) = simulated(FramingVariant::LengthPrefixed);
    handle.set_state(bay(3), LockState::Unlocked);
    handle.set_state(bay(7), LockState::Unknown);

    let statuses = controller.query_all().await;

    let states: Vec<LockState> = statuses.iter().map(|s| s.state).collect();
    assert_eq!(
        states,
        vec![
            LockState::Locked,
            LockState::Locked,
            LockState::Unlocked,
            LockState::Locked,
            LockState::Locked,
            LockState::Locked,
            LockState::Unknown,
            LockState::Locked,
        ]
    );
}

#[tokio::test]
async fn test_unplugged_board() {
    let (controller, handle) = simulated(FramingVariant::LengthPrefixed);
    handle.set_offline(true);

    let err = controller.open(bay(1)).await.unwrap_err();
    assert!(err.is_transport());
    assert_eq!(controller.query_status(bay(1)).await, LockState::Unknown);
    assert!(
        controller
            .query_all()
            .await
            .iter()
            .all(|s| s.state == LockState::Unknown)
    );

    handle.set_offline(false);
    assert_eq!(controller.query_status(bay(1)).await, LockState::Locked);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_callers_never_interleave() {
    let codec = AnyCodec::default();
    let (transport, handle) = MockTransport::new();
    let transport = transport.with_latency(Duration::from_millis(100));
    for b in Bay::all() {
        handle.push_reply(codec.encode_reply(Command::QueryStatus, b, 0x01).as_bytes());
    }
    let controller = Arc::new(LockController::new(transport, codec.clone()));

    let sweep = tokio::spawn({
        let controller = Arc::clone(&controller);
        async move { controller.query_all().await }
    });
    while handle.exchange_count() == 0 {
        tokio::task::yield_now().await;
    }
    let open = tokio::spawn({
        let controller = Arc::clone(&controller);
        async move { controller.open(bay(2)).await }
    });

    let statuses = sweep.await.unwrap();
    open.await.unwrap().unwrap();

    assert!(statuses.iter().all(|s| s.state == LockState::Locked));

    let sent = handle.sent_frames();
    assert_eq!(sent.len(), 9);
    for (frame, b) in sent.iter().zip(Bay::all()) {
        assert_eq!(frame, &codec.encode(Command::QueryStatus, b, &[]));
    }
    assert_eq!(sent[8], codec.encode(Command::Open, bay(2), &[]));
}

#[tokio::test(start_paused = true)]
async fn test_open_and_wait_for_door() {
    let (controller, handle) = simulated(FramingVariant::Fixed);
    let reporter = StatusReporter::new(Arc::clone(&controller));

    controller.open(bay(8)).await.unwrap();
    assert_eq!(handle.state(bay(8)), LockState::Unlocked);

    let outcome = wait_for_state(
        &reporter,
        bay(8),
        LockState::Locked,
        PollOptions {
            interval: Duration::from_secs(2),
            timeout: Duration::from_secs(30),
        },
    )
    .await;

    assert!(matches!(outcome, PollOutcome::Reached { .. }));
    assert_eq!(
        reporter.last_known(bay(8)).await.map(|obs| obs.state),
        Some(LockState::Locked)
    );
}
