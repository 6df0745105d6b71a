use watchparty_core::TrackKind;
use watchparty_session::{MemoryNetwork, SessionNotice};

use crate::integration::{create_party, init_tracing, spawn_peer, wait_for_mesh, wait_until};

#[tokio::test]
async fn test_screen_share_reaches_every_member() {
    init_tracing();

    let network = MemoryNetwork::new();
    let (host, room, guests) = create_party(&network, 2).await;

    let stream = host
        .handle
        .start_screen_share()
        .await
        .expect("Failed to share screen");
    assert!(stream.has_kind(TrackKind::Video));
    assert!(host.snapshot().await.sharing_screen);

    for guest in &guests {
        assert!(guest.observer.wait_for(
            |n| matches!(n, SessionNotice::RemoteStreamAttached { peer } if *peer == room.host),
            2000
        ).await);
        let playing = guest.playback.stream_of(&room.host).expect("No stream attached");
        assert_eq!(playing.id, stream.id);

        assert!(
            wait_until(
                &guest.handle,
                |s| s.participant(&room.host).is_some_and(|p| p.video_enabled),
                2000
            )
            .await
        );
    }

    assert!(host
        .handle
        .stop_screen_share()
        .await
        .expect("Failed to stop sharing"));
    assert_eq!(host.devices.live_tracks(), 0);

    for guest in &guests {
        assert!(guest.observer.wait_for(
            |n| matches!(n, SessionNotice::RemoteStreamDetached { peer } if *peer == room.host),
            2000
        ).await);
        assert!(guest.playback.stream_of(&room.host).is_none());
        assert_eq!(guest.playback.len(), 0);
    }

    // stopping again is a no-op
    assert!(!host
        .handle
        .stop_screen_share()
        .await
        .expect("Failed to stop sharing"));
}

#[tokio::test]
async fn test_late_joiner_receives_active_share() {
    init_tracing();

    let network = MemoryNetwork::new();
    let (host, room, _guests) = create_party(&network, 1).await;
    host.handle
        .start_screen_share()
        .await
        .expect("Failed to share screen");

    let late = spawn_peer(&network);
    late.handle
        .join_room(room.room_id.clone(), "late", "secret")
        .await
        .expect("Failed to join");
    assert!(wait_for_mesh(&late, 2).await);

    assert!(late.observer.wait_for(
        |n| matches!(n, SessionNotice::RemoteStreamAttached { peer } if *peer == room.host),
        2000
    ).await);
    assert!(
        wait_until(
            &late.handle,
            |s| s.participant(&room.host).is_some_and(|p| p.video_enabled),
            2000
        )
        .await
    );
}

#[tokio::test]
async fn test_voice_and_screen_travel_as_one_stream() {
    init_tracing();

    let network = MemoryNetwork::new();
    let (host, room, guests) = create_party(&network, 1).await;

    host.handle
        .start_screen_share()
        .await
        .expect("Failed to share screen");
    let merged = host
        .handle
        .enable_voice()
        .await
        .expect("Failed to enable voice");
    assert!(merged.has_kind(TrackKind::Audio));
    assert!(merged.has_kind(TrackKind::Video));

    assert!(
        wait_until(
            &guests[0].handle,
            |s| s
                .participant(&room.host)
                .is_some_and(|p| p.audio_enabled && p.video_enabled),
            2000
        )
        .await
    );

    let mut attached = false;
    for _ in 0..200 {
        if guests[0]
            .playback
            .stream_of(&room.host)
            .is_some_and(|s| s.tracks.len() == 2)
        {
            attached = true;
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    assert!(attached, "Guest never played the merged stream");

    // enabling voice twice hands back the live stream
    let again = host
        .handle
        .enable_voice()
        .await
        .expect("Failed to enable voice");
    assert_eq!(again.tracks.len(), 2);
    assert_eq!(host.devices.live_tracks(), 2);
}

#[tokio::test]
async fn test_destroying_the_room_releases_capture() {
    init_tracing();

    let network = MemoryNetwork::new();
    let (host, _room, _guests) = create_party(&network, 1).await;
    host.handle
        .start_screen_share()
        .await
        .expect("Failed to share screen");
    host.handle
        .enable_voice()
        .await
        .expect("Failed to enable voice");
    assert_eq!(host.devices.live_tracks(), 2);

    host.handle.destroy_room().await.expect("Destroy failed");
    assert_eq!(host.devices.live_tracks(), 0);
    let snapshot = host.snapshot().await;
    assert!(!snapshot.sharing_screen && !snapshot.voice_enabled);
}
