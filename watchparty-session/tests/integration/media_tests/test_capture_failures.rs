use watchparty_core::CaptureKind;
use watchparty_session::{MemoryNetwork, SessionError, SessionNotice};

use crate::integration::{create_party, init_tracing, spawn_peer};

#[tokio::test]
async fn test_denied_capture_is_reported() {
    init_tracing();

    let network = MemoryNetwork::new();
    let (host, _room, _guests) = create_party(&network, 1).await;
    host.devices.set_display_denied(true);

    let err = host
        .handle
        .start_screen_share()
        .await
        .expect_err("Capture should be denied");
    assert!(matches!(
        err,
        SessionError::CaptureDenied {
            kind: CaptureKind::Display,
            ..
        }
    ));
    assert!(host.observer.wait_for(
        |n| matches!(n, SessionNotice::CaptureDenied { kind: CaptureKind::Display, .. }),
        2000
    ).await);
    assert!(!host.snapshot().await.sharing_screen);

    // the user changes their mind
    host.devices.set_display_denied(false);
    host.handle
        .start_screen_share()
        .await
        .expect("Second attempt should succeed");
}

#[tokio::test]
async fn test_system_stop_ends_the_share() {
    init_tracing();

    let network = MemoryNetwork::new();
    let (host, room, guests) = create_party(&network, 1).await;
    host.handle
        .start_screen_share()
        .await
        .expect("Failed to share screen");
    assert!(guests[0].observer.wait_for(
        |n| matches!(n, SessionNotice::RemoteStreamAttached { .. }),
        2000
    ).await);

    assert_eq!(host.devices.end_display(), 1);

    assert!(host.observer.wait_for(
        |n| matches!(n, SessionNotice::ScreenShareEnded),
        2000
    ).await);
    assert!(!host.snapshot().await.sharing_screen);
    assert!(guests[0].observer.wait_for(
        |n| matches!(n, SessionNotice::RemoteStreamDetached { peer } if *peer == room.host),
        2000
    ).await);
}

#[tokio::test]
async fn test_capture_outside_a_room_is_refused() {
    init_tracing();

    let network = MemoryNetwork::new();
    let lonely = spawn_peer(&network);

    let err = lonely
        .handle
        .start_screen_share()
        .await
        .expect_err("Sharing needs a room");
    assert!(matches!(err, SessionError::InvalidState(_)));
    assert_eq!(lonely.devices.live_tracks(), 0);
}
