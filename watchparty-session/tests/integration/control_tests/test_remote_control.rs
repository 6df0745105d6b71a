use watchparty_core::{
    CapturedInput, InputKind, Modifiers, NormalizedPoint, StreamDimensions,
};
use watchparty_session::{DispatchTarget, ElementRef, MemoryNetwork, SessionNotice};

use crate::integration::{create_party, init_tracing, wait_until};

#[tokio::test]
async fn test_granted_input_lands_scaled_on_the_grantor() {
    init_tracing();

    let network = MemoryNetwork::new();
    let (host, room, guests) = create_party(&network, 1).await;
    let guest = &guests[0];
    let guest_id = guest.id().await;

    // the shared screen is 1920x1080, the host's own page 1280x720
    host.handle
        .start_screen_share()
        .await
        .expect("Failed to share screen");

    assert!(guest
        .handle
        .request_control(&room.host)
        .await
        .expect("Request failed"));
    assert!(host.observer.wait_for(
        |n| matches!(n, SessionNotice::ControlRequested { peer } if *peer == guest_id),
        2000
    ).await);
    assert_eq!(host.snapshot().await.pending_control_requests, vec![guest_id.clone()]);

    let dims = host
        .handle
        .grant_control(&guest_id)
        .await
        .expect("Grant failed");
    assert_eq!(dims, Some(StreamDimensions::new(1920, 1080)));
    assert!(guest.observer.wait_for(
        |n| matches!(n, SessionNotice::ControlGranted { by, dims } if *by == room.host && dims.width == 1920),
        2000
    ).await);

    let delivered = guest
        .handle
        .forward_input(CapturedInput::pointer_move(NormalizedPoint::new(0.5, 0.5)))
        .await
        .expect("Forward failed");
    assert_eq!(delivered, 1);

    assert!(host.surface.wait_for_events(1, 2000).await);
    let event = &host.surface.events()[0];
    assert_eq!(event.kind, InputKind::MouseMove);
    assert_eq!((event.stream_x, event.stream_y), (960.0, 540.0));
    assert_eq!((event.client_x, event.client_y), (640.0, 360.0));
    assert_eq!(host.surface.targets()[0], DispatchTarget::DocumentRoot);

    // keys reuse the last pointer position; clicks on the left half hit the player
    guest
        .handle
        .forward_input(CapturedInput::key_down(" ", "Space").with_modifiers(Modifiers {
            shift: true,
            ..Modifiers::default()
        }))
        .await
        .expect("Forward failed");
    guest
        .handle
        .forward_input(CapturedInput::click(NormalizedPoint::new(0.25, 0.5), 0))
        .await
        .expect("Forward failed");

    assert!(host.surface.wait_for_events(3, 2000).await);
    let events = host.surface.events();
    assert_eq!(events[1].kind, InputKind::KeyDown);
    assert_eq!(events[1].code.as_deref(), Some("Space"));
    assert!(events[1].modifiers.shift);
    assert_eq!((events[1].client_x, events[1].client_y), (640.0, 360.0));
    assert_eq!(events[2].client_x, 320.0);
    assert_eq!(
        host.surface.targets()[2],
        DispatchTarget::Element(ElementRef("player".to_owned()))
    );
    assert_eq!(host.snapshot().await.replayed_events, 3);
}

#[tokio::test]
async fn test_revoked_grantee_stops_forwarding() {
    init_tracing();

    let network = MemoryNetwork::new();
    let (host, room, guests) = create_party(&network, 1).await;
    let guest = &guests[0];
    let guest_id = guest.id().await;

    guest
        .handle
        .request_control(&room.host)
        .await
        .expect("Request failed");
    assert!(wait_until(&host.handle, |s| !s.pending_control_requests.is_empty(), 2000).await);

    // no screen share: the grant announces the page size
    let dims = host
        .handle
        .grant_control(&guest_id)
        .await
        .expect("Grant failed");
    assert_eq!(dims, Some(StreamDimensions::new(1280, 720)));
    assert!(wait_until(&guest.handle, |s| s.held_control == vec![room.host.clone()], 2000).await);

    assert!(host
        .handle
        .revoke_control(&guest_id)
        .await
        .expect("Revoke failed"));
    assert!(guest.observer.wait_for(
        |n| matches!(n, SessionNotice::ControlRevoked { by } if *by == room.host),
        2000
    ).await);

    let delivered = guest
        .handle
        .forward_input(CapturedInput::pointer_move(NormalizedPoint::new(0.1, 0.1)))
        .await
        .expect("Forward failed");
    assert_eq!(delivered, 0);
    assert!(host.surface.events().is_empty());

    // revoking twice is a no-op
    assert!(!host
        .handle
        .revoke_control(&guest_id)
        .await
        .expect("Revoke failed"));
}

#[tokio::test]
async fn test_denied_request_clears_on_both_sides() {
    init_tracing();

    let network = MemoryNetwork::new();
    let (host, room, guests) = create_party(&network, 1).await;
    let guest_id = guests[0].id().await;

    guests[0]
        .handle
        .request_control(&room.host)
        .await
        .expect("Request failed");
    assert!(wait_until(&host.handle, |s| s.pending_control_requests == vec![guest_id.clone()], 2000).await);

    assert!(host.handle.deny_control(&guest_id).await.expect("Deny failed"));
    assert!(host.snapshot().await.pending_control_requests.is_empty());
    assert!(guests[0].observer.wait_for(
        |n| matches!(n, SessionNotice::ControlRevoked { .. }),
        2000
    ).await);
    assert!(guests[0].snapshot().await.held_control.is_empty());
}

#[tokio::test]
async fn test_grant_ends_when_the_grantee_leaves() {
    init_tracing();

    let network = MemoryNetwork::new();
    let (host, _room, guests) = create_party(&network, 1).await;
    let guest_id = guests[0].id().await;

    host.handle
        .grant_control(&guest_id)
        .await
        .expect("Grant failed");
    assert_eq!(host.snapshot().await.granted_control, vec![guest_id.clone()]);

    guests[0].handle.leave_room().await.expect("Leave failed");
    assert!(wait_until(&host.handle, |s| s.granted_control.is_empty(), 2000).await);
}
