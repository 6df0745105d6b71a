use std::sync::Arc;
use std::time::Duration;

use watchparty_session::{
    ManualClock, MemoryNetwork, SessionConfig, SessionError, SessionNotice, SessionPhase,
};

use crate::integration::{init_tracing, spawn_peer_with, test_config, wait_until};

const SIX_HOURS: Duration = Duration::from_secs(6 * 60 * 60);

#[tokio::test]
async fn test_host_accepts_at_exactly_six_hours_and_rejects_after() {
    init_tracing();

    let network = MemoryNetwork::new();
    let host_clock = ManualClock::new(1_000_000);
    let host = spawn_peer_with(&network, test_config(), Arc::new(host_clock.clone()));
    let room = host
        .handle
        .create_room("alice", "pw")
        .await
        .expect("Failed to create room");

    host_clock.advance(SIX_HOURS);
    let on_time = spawn_peer_with(
        &network,
        test_config(),
        Arc::new(ManualClock::new(1_000_000)),
    );
    on_time
        .handle
        .join_room(room.room_id.clone(), "bob", "pw")
        .await
        .expect("A room exactly six hours old is still open");

    host_clock.advance(Duration::from_millis(1));
    let late = spawn_peer_with(
        &network,
        test_config(),
        Arc::new(ManualClock::new(1_000_000)),
    );
    let err = late
        .handle
        .join_room(room.room_id.clone(), "carol", "pw")
        .await
        .expect_err("The host should refuse an expired room");
    assert_eq!(err, SessionError::RoomExpired(room.room_id.clone()));
}

#[tokio::test]
async fn test_guest_checks_expiry_against_its_own_clock() {
    init_tracing();

    let network = MemoryNetwork::new();
    let host = spawn_peer_with(&network, test_config(), Arc::new(ManualClock::new(5_000)));
    let room = host
        .handle
        .create_room("alice", "pw")
        .await
        .expect("Failed to create room");

    // the guest's clock runs six hours and a millisecond ahead of the host's
    let guest_clock = ManualClock::new(5_000);
    guest_clock.advance(SIX_HOURS + Duration::from_millis(1));
    let guest = spawn_peer_with(&network, test_config(), Arc::new(guest_clock));

    let err = guest
        .handle
        .join_room(room.room_id.clone(), "bob", "pw")
        .await
        .expect_err("The guest should treat the room as expired");
    assert_eq!(err, SessionError::RoomExpired(room.room_id.clone()));
    assert_eq!(guest.snapshot().await.phase, SessionPhase::Idle);

    // the host admitted the guest first, then saw it go away
    assert!(
        wait_until(
            &host.handle,
            |s| s.participants.is_empty() && s.open_connections == 0,
            2000
        )
        .await
    );
}

#[tokio::test(start_paused = true)]
async fn test_expiry_timer_closes_the_room() {
    init_tracing();

    let network = MemoryNetwork::new();
    let config = SessionConfig {
        join_timeout_secs: None,
        ..SessionConfig::default()
    };
    let clock = ManualClock::new(0);
    let host = spawn_peer_with(&network, config.clone(), Arc::new(clock.clone()));
    let room = host
        .handle
        .create_room("alice", "pw")
        .await
        .expect("Failed to create room");

    let guest = spawn_peer_with(&network, config, Arc::new(clock.clone()));
    guest
        .handle
        .join_room(room.room_id.clone(), "bob", "pw")
        .await
        .expect("Failed to join");

    tokio::time::sleep(SIX_HOURS - Duration::from_secs(1)).await;
    assert_eq!(host.snapshot().await.phase, SessionPhase::Hosting);

    clock.advance(SIX_HOURS + Duration::from_secs(2));
    tokio::time::sleep(Duration::from_secs(2)).await;

    assert!(wait_until(&host.handle, |s| s.phase == SessionPhase::Idle, 1000).await);
    assert!(wait_until(&guest.handle, |s| s.phase == SessionPhase::Idle, 1000).await);

    let notices = host.observer.get_notices().await;
    assert!(notices.iter().any(
        |n| matches!(n, SessionNotice::RoomExpired { room_id } if *room_id == room.room_id)
    ));
    assert_eq!(network.endpoint_count(), 0);
}
