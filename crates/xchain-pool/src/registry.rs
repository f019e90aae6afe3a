//! Connection registry: which peers are connected for which chain.
//!
//! One mutex guards the whole chain → bucket map. Every operation is a single
//! critical section, so readers never see a bucket mid-mutation and a
//! multi-chain removal is never partially visible.
//!
//! Buckets keep insertion order and hold each connection at most once
//! (identity, not value). A connection may sit in several buckets at once.
//! Empty buckets are pruned on removal.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use tokio::sync::broadcast;
use xchain_core::ChainId;

use crate::connection::{same_connection, PeerRef};

/// Capacity of the lifecycle event channel. Slow subscribers lag, they
/// never block the registry.
const EVENT_CAPACITY: usize = 256;

/// Lifecycle notifications, emitted in registry order.
#[derive(Clone)]
pub enum RegistryEvent {
    /// A connection was added to a chain's bucket.
    Connected { chain_id: ChainId, connection: PeerRef },
    /// A connection was removed from every bucket it was in.
    Disconnected {
        chain_ids: Vec<ChainId>,
        connection: PeerRef,
    },
}

type Buckets = BTreeMap<ChainId, Vec<PeerRef>>;

/// Thread-safe map from chain id to its live connections.
pub struct ConnectionRegistry {
    buckets: Mutex<Buckets>,
    events: broadcast::Sender<RegistryEvent>,
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            buckets: Mutex::new(BTreeMap::new()),
            events,
        }
    }

    /// Lock the map, ignoring poison: every mutation is a single push or
    /// retain, so the map is never left half-edited.
    fn lock(&self) -> MutexGuard<'_, Buckets> {
        self.buckets.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Add `connection` to `chain_id`'s bucket.
    ///
    /// Returns false if it was already there; the bucket is left unchanged.
    pub fn register(&self, chain_id: ChainId, connection: PeerRef) -> bool {
        let mut buckets = self.lock();
        let bucket = buckets.entry(chain_id).or_default();
        if bucket.iter().any(|c| same_connection(c, &connection)) {
            return false;
        }
        bucket.push(connection.clone());
        let peers = bucket.len();

        let _ = self.events.send(RegistryEvent::Connected {
            chain_id,
            connection: connection.clone(),
        });
        drop(buckets);

        tracing::debug!(
            chain = %chain_id.short(),
            peer = %connection.describe(),
            peers,
            "cross-chain peer registered"
        );
        true
    }

    /// Remove `connection` from every bucket that holds it.
    ///
    /// The removal is one critical section. If the connection was in at
    /// least one bucket its `on_disconnect` runs exactly once, after the lock
    /// is released. Returns the number of buckets it was removed from.
    pub fn unregister(&self, connection: &PeerRef) -> usize {
        let mut buckets = self.lock();
        let mut removed_from = Vec::new();
        for (chain_id, bucket) in buckets.iter_mut() {
            let before = bucket.len();
            bucket.retain(|c| !same_connection(c, connection));
            if bucket.len() != before {
                removed_from.push(*chain_id);
            }
        }
        if removed_from.is_empty() {
            return 0;
        }
        buckets.retain(|_, bucket| !bucket.is_empty());

        let _ = self.events.send(RegistryEvent::Disconnected {
            chain_ids: removed_from.clone(),
            connection: connection.clone(),
        });
        drop(buckets);

        tracing::info!(
            peer = %connection.describe(),
            chains = removed_from.len(),
            "disconnect the cross-chain peer"
        );
        connection.on_disconnect();
        removed_from.len()
    }

    /// Snapshot of `chain_id`'s connections in registration order.
    /// Unknown chains yield an empty list.
    pub fn lookup(&self, chain_id: &ChainId) -> Vec<PeerRef> {
        self.lock().get(chain_id).cloned().unwrap_or_default()
    }

    /// Consistent copy of the whole map, ordered by chain id.
    pub fn snapshot(&self) -> Vec<(ChainId, Vec<PeerRef>)> {
        self.lock()
            .iter()
            .map(|(chain_id, bucket)| (*chain_id, bucket.clone()))
            .collect()
    }

    /// Chains that currently have at least one connection.
    pub fn chains(&self) -> Vec<ChainId> {
        self.lock().keys().copied().collect()
    }

    pub fn peer_count(&self, chain_id: &ChainId) -> usize {
        self.lock().get(chain_id).map(Vec::len).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Subscribe to connect/disconnect events from this point on.
    pub fn subscribe(&self) -> broadcast::Receiver<RegistryEvent> {
        self.events.subscribe()
    }
}
