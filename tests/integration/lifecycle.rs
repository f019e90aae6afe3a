use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use xchain_pool::{
    Bootstrapper, ConnectionRegistry, PeerRef, PeriodicReporter, RegistryEvent, ReportSchedule,
};

use crate::*;

#[tokio::test]
async fn bootstrap_registers_reachable_seeds_only() {
    let registry = Arc::new(ConnectionRegistry::new());
    let (net, mut connected) = LoopbackNetwork::new(registry.clone(), &["10.0.0.3:18888"]);
    let seeds = vec![seed(1, 0xa), seed(2, 0xb), seed(3, 0xa)];

    let boot = Bootstrapper::new(seeds, net);
    assert_eq!(boot.init(), 3);

    let mut names = vec![
        connected.recv().await.unwrap().name.clone(),
        connected.recv().await.unwrap().name.clone(),
    ];
    names.sort();
    assert_eq!(names, ["10.0.0.1:18888", "10.0.0.2:18888"]);

    assert_eq!(registry.peer_count(&chain(0xa)), 1);
    assert_eq!(registry.peer_count(&chain(0xb)), 1);
}

#[tokio::test]
async fn events_announce_bootstrapped_peers() {
    let registry = Arc::new(ConnectionRegistry::new());
    let mut events = registry.subscribe();
    let (net, mut connected) = LoopbackNetwork::new(registry.clone(), &[]);

    Bootstrapper::new(vec![seed(1, 0xa)], net).init();
    let peer = connected.recv().await.unwrap();

    match events.recv().await.unwrap() {
        RegistryEvent::Connected { chain_id, connection } => {
            assert_eq!(chain_id, chain(0xa));
            assert_eq!(connection.describe(), peer.name);
        }
        RegistryEvent::Disconnected { .. } => panic!("unexpected disconnect"),
    }

    let peer_ref: PeerRef = peer.clone();
    registry.unregister(&peer_ref);
    match events.recv().await.unwrap() {
        RegistryEvent::Disconnected { chain_ids, .. } => assert_eq!(chain_ids, vec![chain(0xa)]),
        RegistryEvent::Connected { .. } => panic!("unexpected connect"),
    }
    assert_eq!(peer.disconnects(), 1);
}

#[tokio::test(start_paused = true)]
async fn reports_track_registry_changes() {
    let registry = Arc::new(ConnectionRegistry::new());
    let (net, mut connected) = LoopbackNetwork::new(registry.clone(), &[]);
    let sink = Arc::new(CapturingSink::default());
    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    let reporter = PeriodicReporter::new(
        registry.clone(),
        sink.clone(),
        ReportSchedule {
            initial_delay: Duration::from_secs(30),
            period: Duration::from_secs(10),
        },
    )
    .spawn(shutdown_tx.subscribe());

    Bootstrapper::new(vec![seed(1, 0xa), seed(2, 0xb)], net).init();
    let first = connected.recv().await.unwrap();
    let _second = connected.recv().await.unwrap();

    tokio::time::sleep(Duration::from_secs(31)).await;
    let batches = sink.batches();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].len(), 2);
    assert!(batches[0].iter().all(|r| r.peers.len() == 1));

    let first_ref: PeerRef = first.clone();
    registry.unregister(&first_ref);

    tokio::time::sleep(Duration::from_secs(10)).await;
    let batches = sink.batches();
    assert_eq!(batches.len(), 2);
    assert_eq!(batches[1].len(), 1);
    assert_ne!(batches[1][0].peers[0], first.name);

    let _ = shutdown_tx.send(());
    reporter.await.unwrap();
}
