use std::collections::BTreeSet;

use watchparty_session::MemoryNetwork;

use crate::integration::{create_party, init_tracing, spawn_peer, wait_for_mesh};

#[tokio::test]
async fn test_three_members_form_a_full_mesh() {
    init_tracing();

    let network = MemoryNetwork::new();
    let (host, room, guests) = create_party(&network, 2).await;

    let mut everyone = BTreeSet::new();
    everyone.insert(room.host.clone());
    for guest in &guests {
        everyone.insert(guest.id().await);
    }
    assert_eq!(everyone.len(), 3);

    for peer in std::iter::once(&host).chain(&guests) {
        let snapshot = peer.snapshot().await;
        let members: BTreeSet<_> = snapshot.members().into_iter().collect();
        assert_eq!(members, everyone);
        // one channel per remote member, never a duplicate
        assert_eq!(snapshot.open_connections, snapshot.participants.len());

        let hosts: Vec<_> = snapshot.participants.iter().filter(|p| p.is_host).collect();
        if snapshot.local_id.as_ref() == Some(&room.host) {
            assert!(hosts.is_empty());
        } else {
            assert_eq!(hosts.len(), 1);
            assert_eq!(hosts[0].identity, room.host);
            assert_eq!(hosts[0].username, "host");
        }
    }
}

#[tokio::test]
async fn test_late_joiner_meshes_with_everyone() {
    init_tracing();

    let network = MemoryNetwork::new();
    let (_host, _room, guests) = create_party(&network, 4).await;

    let names: BTreeSet<String> = guests[3]
        .snapshot()
        .await
        .participants
        .into_iter()
        .map(|p| p.username)
        .collect();
    let expected: BTreeSet<String> = ["host", "guest0", "guest1", "guest2"]
        .into_iter()
        .map(String::from)
        .collect();
    assert_eq!(names, expected);
}

#[tokio::test]
async fn test_join_accepted_lists_only_the_other_guests() {
    init_tracing();

    let network = MemoryNetwork::new();
    let (_host, room, guests) = create_party(&network, 1).await;
    let first = guests[0].id().await;

    let late = spawn_peer(&network);
    let joined = late
        .handle
        .join_room(room.room_id.clone(), "late", "secret")
        .await
        .expect("Failed to join");

    assert_eq!(joined.peers, vec![first]);
    assert!(!joined.peers.contains(&joined.local_id));
    assert!(!joined.peers.contains(&room.host));
    assert!(wait_for_mesh(&late, 2).await);
}
