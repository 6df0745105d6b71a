use watchparty_core::{InputDescriptor, InputKind, WireMessage};
use watchparty_session::MemoryNetwork;

use crate::integration::{init_tracing, spawn_peer, wait_until};
use crate::utils::RawPeer;

fn click_at(x: f64, y: f64) -> WireMessage {
    WireMessage::ControlEvent {
        event: InputDescriptor {
            kind: InputKind::Click,
            abs_x: x,
            abs_y: y,
            button: Some(0),
            key: None,
            code: None,
            modifiers: None,
        },
    }
}

#[tokio::test]
async fn test_control_event_without_grant_is_ignored() {
    init_tracing();

    let network = MemoryNetwork::new();
    let host = spawn_peer(&network);
    let room = host
        .handle
        .create_room("alice", "pw")
        .await
        .expect("Failed to create room");

    let mut raw = RawPeer::open(&network, None).await;
    let channel = raw.dial(&room.host).await;

    // before admission
    raw.send(&channel, &click_at(10.0, 10.0)).await;

    raw.send(
        &channel,
        &WireMessage::JoinRequest {
            password: "pw".into(),
            username: "mallory".into(),
            peer_identity: raw.id(),
        },
    )
    .await;
    assert!(matches!(
        raw.next_message(2000).await,
        Some(WireMessage::JoinAccepted { .. })
    ));

    // admitted, but nobody granted anything
    raw.send(&channel, &click_at(100.0, 100.0)).await;
    raw.send(&channel, &click_at(200.0, 200.0)).await;

    assert!(wait_until(&host.handle, |s| s.ignored_events == 3, 2000).await);
    let snapshot = host.snapshot().await;
    assert_eq!(snapshot.replayed_events, 0);
    assert!(host.surface.events().is_empty());

    raw.close().await;
}

#[tokio::test]
async fn test_malformed_payloads_are_dropped_and_counted() {
    init_tracing();

    let network = MemoryNetwork::new();
    let host = spawn_peer(&network);
    let room = host
        .handle
        .create_room("alice", "pw")
        .await
        .expect("Failed to create room");

    let mut raw = RawPeer::open(&network, None).await;
    let channel = raw.dial(&room.host).await;

    channel
        .send(bytes::Bytes::from_static(b"not json"))
        .await
        .expect("Send failed");
    channel
        .send(bytes::Bytes::from_static(br#"{"type":"seek","position":42}"#))
        .await
        .expect("Send failed");
    channel
        .send(bytes::Bytes::from_static(br#"{"type":"chat"}"#))
        .await
        .expect("Send failed");

    assert!(wait_until(&host.handle, |s| s.dropped_messages == 3, 2000).await);
    // the connection survives bad input
    assert_eq!(host.snapshot().await.open_connections, 1);

    raw.close().await;
}

#[tokio::test]
async fn test_events_after_revoke_are_not_replayed() {
    init_tracing();

    let network = MemoryNetwork::new();
    let host = spawn_peer(&network);
    let room = host
        .handle
        .create_room("alice", "pw")
        .await
        .expect("Failed to create room");

    let mut raw = RawPeer::open(&network, None).await;
    let channel = raw.dial(&room.host).await;
    raw.send(
        &channel,
        &WireMessage::JoinRequest {
            password: "pw".into(),
            username: "mallory".into(),
            peer_identity: raw.id(),
        },
    )
    .await;
    assert!(matches!(
        raw.next_message(2000).await,
        Some(WireMessage::JoinAccepted { .. })
    ));

    let grant = host
        .handle
        .grant_control(&raw.id())
        .await
        .expect("Grant failed");
    assert!(grant.is_some());
    assert!(wait_for_message(&mut raw, |m| matches!(m, WireMessage::ControlGrant { .. })).await);

    raw.send(&channel, &click_at(100.0, 100.0)).await;
    assert!(wait_until(&host.handle, |s| s.replayed_events == 1, 2000).await);

    assert!(
        host.handle
            .revoke_control(&raw.id())
            .await
            .expect("Revoke failed")
    );
    assert!(wait_for_message(&mut raw, |m| matches!(m, WireMessage::ControlRevoke)).await);

    // a modified client keeps driving after the revoke
    raw.send(&channel, &click_at(200.0, 200.0)).await;
    raw.send(&channel, &click_at(300.0, 300.0)).await;

    assert!(wait_until(&host.handle, |s| s.ignored_events == 2, 2000).await);
    let snapshot = host.snapshot().await;
    assert_eq!(snapshot.replayed_events, 1);
    assert!(snapshot.granted_control.is_empty());
    assert_eq!(host.surface.events().len(), 1);

    raw.close().await;
}

async fn wait_for_message(raw: &mut RawPeer, pred: impl Fn(&WireMessage) -> bool) -> bool {
    while let Some(message) = raw.next_message(2000).await {
        if pred(&message) {
            return true;
        }
    }
    false
}
