use watchparty_session::{MemoryNetwork, SessionError, SessionNotice, SessionPhase};

use crate::integration::{init_tracing, spawn_peer, wait_until};

#[tokio::test]
async fn test_wrong_password_is_rejected() {
    init_tracing();

    let network = MemoryNetwork::new();
    let host = spawn_peer(&network);
    let room = host
        .handle
        .create_room("alice", "hunter2")
        .await
        .expect("Failed to create room");

    let intruder = spawn_peer(&network);
    let err = intruder
        .handle
        .join_room(room.room_id.clone(), "mallory", "letmein")
        .await
        .expect_err("Join with a wrong password should fail");
    assert_eq!(err, SessionError::AuthRejected);

    assert!(
        intruder
            .observer
            .wait_for(
                |n| matches!(
                    n,
                    SessionNotice::JoinFailed {
                        error: SessionError::AuthRejected
                    }
                ),
                2000
            )
            .await
    );
    assert_eq!(intruder.snapshot().await.phase, SessionPhase::Idle);

    // the host dropped the connection and admitted nobody
    assert!(wait_until(&host.handle, |s| s.open_connections == 0, 2000).await);
    assert!(host.snapshot().await.participants.is_empty());
    assert_eq!(host.snapshot().await.phase, SessionPhase::Hosting);
}

#[tokio::test]
async fn test_correct_password_is_admitted() {
    init_tracing();

    let network = MemoryNetwork::new();
    let host = spawn_peer(&network);
    let room = host
        .handle
        .create_room("alice", "hunter2")
        .await
        .expect("Failed to create room");
    assert_eq!(room.host, room.room_id.as_peer_id());

    let guest = spawn_peer(&network);
    let joined = guest
        .handle
        .join_room(room.room_id.clone(), "bob", "hunter2")
        .await
        .expect("Failed to join");

    assert_eq!(joined.host, room.host);
    assert_eq!(joined.created_at, room.created_at);
    assert!(joined.peers.is_empty());

    assert!(
        wait_until(
            &host.handle,
            |s| s.participants.len() == 1 && s.open_connections == 1,
            2000
        )
        .await
    );
    let host_view = host.snapshot().await;
    assert_eq!(host_view.participants[0].identity, joined.local_id);
    assert_eq!(host_view.participants[0].username, "bob");
    assert!(!host_view.participants[0].is_host);
    assert!(host.observer.has_joined(&joined.local_id).await);

    assert!(
        wait_until(
            &guest.handle,
            |s| s.participants.first().is_some_and(|p| p.username == "alice"),
            2000
        )
        .await
    );
    let guest_view = guest.snapshot().await;
    assert_eq!(guest_view.phase, SessionPhase::Joined);
    assert!(guest_view.participants[0].is_host);
    assert_eq!(guest_view.room.map(|r| r.host), Some(room.host));
}

#[tokio::test]
async fn test_rejected_guest_can_retry() {
    init_tracing();

    let network = MemoryNetwork::new();
    let host = spawn_peer(&network);
    let room = host
        .handle
        .create_room("alice", "hunter2")
        .await
        .expect("Failed to create room");

    let guest = spawn_peer(&network);
    guest
        .handle
        .join_room(room.room_id.clone(), "bob", "typo")
        .await
        .expect_err("First attempt should fail");

    guest
        .handle
        .join_room(room.room_id.clone(), "bob", "hunter2")
        .await
        .expect("Second attempt should succeed");

    assert!(wait_until(&host.handle, |s| s.participants.len() == 1, 2000).await);
}
