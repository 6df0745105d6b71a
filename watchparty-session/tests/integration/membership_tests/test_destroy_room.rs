use watchparty_session::{MemoryNetwork, SessionNotice, SessionPhase};

use crate::integration::{create_party, init_tracing, wait_until};

#[tokio::test]
async fn test_destroy_room_is_idempotent() {
    init_tracing();

    let network = MemoryNetwork::new();
    let (host, room, guests) = create_party(&network, 2).await;

    host.handle
        .destroy_room()
        .await
        .expect("First destroy failed");
    host.handle
        .destroy_room()
        .await
        .expect("Second destroy should be a no-op");

    assert_eq!(host.snapshot().await.phase, SessionPhase::Idle);
    assert_eq!(
        host.observer
            .count(|n| matches!(n, SessionNotice::RoomDestroyed { .. }))
            .await,
        1
    );

    for guest in &guests {
        assert!(
            guest
                .observer
                .wait_for(
                    |n| matches!(n, SessionNotice::RoomDestroyed { room_id } if *room_id == room.room_id),
                    2000
                )
                .await
        );
        assert!(wait_until(&guest.handle, |s| s.phase == SessionPhase::Idle, 2000).await);
    }

    assert!(!network.is_bound(&room.room_id.as_peer_id()));
}

#[tokio::test]
async fn test_room_id_is_reusable_only_after_destroy() {
    init_tracing();

    let network = MemoryNetwork::new();
    let (host, room, _guests) = create_party(&network, 0).await;
    assert!(network.is_bound(&room.room_id.as_peer_id()));

    host.handle.destroy_room().await.expect("Destroy failed");
    assert!(!network.is_bound(&room.room_id.as_peer_id()));

    // a fresh room from the same session gets a fresh id
    let again = host
        .handle
        .create_room("host", "secret")
        .await
        .expect("Failed to create a second room");
    assert_ne!(again.room_id, room.room_id);
}

#[tokio::test]
async fn test_guest_leave_is_seen_by_everyone() {
    init_tracing();

    let network = MemoryNetwork::new();
    let (host, room, guests) = create_party(&network, 2).await;
    let leaver = guests[0].id().await;

    guests[0].handle.leave_room().await.expect("Leave failed");
    assert_eq!(guests[0].snapshot().await.phase, SessionPhase::Idle);

    assert!(host.observer.wait_for(
        |n| matches!(n, SessionNotice::ParticipantLeft { peer } if *peer == leaver),
        2000
    ).await);
    assert!(guests[1].observer.wait_for(
        |n| matches!(n, SessionNotice::ParticipantLeft { peer } if *peer == leaver),
        2000
    ).await);
    assert!(guests[1].observer.has_left(&leaver).await);
    assert!(!guests[1].observer.has_left(&room.host).await);

    assert!(wait_until(&host.handle, |s| s.participants.len() == 1 && s.open_connections == 1, 2000).await);
    assert!(wait_until(&guests[1].handle, |s| s.participants.len() == 1 && s.open_connections == 1, 2000).await);
}
