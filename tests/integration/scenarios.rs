use std::sync::Arc;

use xchain_pool::{ConnectionRegistry, PeerRef};

use crate::*;

fn names(peers: &[PeerRef]) -> Vec<String> {
    peers.iter().map(|p| p.describe()).collect()
}

#[test]
fn multi_chain_peer_disconnects_once() {
    let registry = ConnectionRegistry::new();
    let p1 = FakePeer::new("p1");
    let p2 = FakePeer::new("p2");

    registry.register(chain(0xa), p1.clone());
    registry.register(chain(0xa), p2.clone());
    registry.register(chain(0xb), p1.clone());

    let p1_ref: PeerRef = p1.clone();
    registry.unregister(&p1_ref);

    assert_eq!(names(&registry.lookup(&chain(0xa))), ["p2"]);
    assert!(registry.lookup(&chain(0xb)).is_empty());
    assert_eq!(p1.disconnects(), 1);
    assert_eq!(p2.disconnects(), 0);
}

#[test]
fn double_register_keeps_single_entry() {
    let registry = ConnectionRegistry::new();
    let p1 = FakePeer::new("p1");

    assert!(registry.register(chain(0xa), p1.clone()));
    assert!(!registry.register(chain(0xa), p1.clone()));

    assert_eq!(names(&registry.lookup(&chain(0xa))), ["p1"]);
}

#[test]
fn never_registered_chain_is_empty() {
    let registry = ConnectionRegistry::new();
    registry.register(chain(1), FakePeer::new("p1"));
    assert!(registry.lookup(&chain(2)).is_empty());
}

/// Threads race register/unregister over shared peers and chains. Whatever the
/// interleaving, the end state must match some sequential order: every bucket
/// duplicate-free, every peer either fully gone or present where registered,
/// and one disconnect per unregister that actually removed something.
#[test]
fn interleaved_writers_leave_a_serializable_state() {
    let registry = Arc::new(ConnectionRegistry::new());
    let peers: Vec<Arc<FakePeer>> = (0..16).map(|i| FakePeer::new(&format!("p{i}"))).collect();

    let threads: Vec<_> = (0..4u8)
        .map(|t| {
            let registry = registry.clone();
            let peers = peers.clone();
            std::thread::spawn(move || {
                let mut removals = vec![0usize; peers.len()];
                for round in 0..100usize {
                    let idx = (round * 7 + t as usize) % peers.len();
                    let peer = &peers[idx];
                    registry.register(chain(t % 2), peer.clone());
                    registry.register(chain(2), peer.clone());
                    if round % 5 == 0 {
                        let r: PeerRef = peer.clone();
                        if registry.unregister(&r) > 0 {
                            removals[idx] += 1;
                        }
                    }
                }
                removals
            })
        })
        .collect();
    let mut removals = vec![0usize; peers.len()];
    for t in threads {
        for (idx, n) in t.join().unwrap().into_iter().enumerate() {
            removals[idx] += n;
        }
    }
    for (peer, expected) in peers.iter().zip(&removals) {
        assert_eq!(peer.disconnects(), *expected, "{}", peer.name);
    }

    for (chain_id, bucket) in registry.snapshot() {
        assert!(!bucket.is_empty(), "empty bucket left for {chain_id}");
        let mut seen = names(&bucket);
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), bucket.len(), "duplicate entry on {chain_id}");
    }

    // Chain 2 receives every registration, so any peer still present on
    // chains 0/1 must also be present on chain 2.
    let on_shared: Vec<String> = names(&registry.lookup(&chain(2)));
    for c in [0, 1] {
        for name in names(&registry.lookup(&chain(c))) {
            assert!(on_shared.contains(&name), "{name} on chain {c} but not chain 2");
        }
    }
}
