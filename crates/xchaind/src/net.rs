//! Outbound TCP connections to cross-chain seeds.
//!
//! Stands in for the networking layer: dials a seed, registers the live
//! connection under the seed's chain, and unregisters it when the remote
//! goes away. Dropping a peer from the registry closes its socket.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use futures::future::{BoxFuture, FutureExt};
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio::sync::Notify;

use xchain_core::{ChainId, SeedNode};
use xchain_pool::{ConnectionRegistry, Connector, PeerConnection, PeerRef};

/// A dialed seed connection.
pub struct TcpPeer {
    remote: SocketAddr,
    chain_id: ChainId,
    connected_at: Instant,
    closed: Notify,
}

impl TcpPeer {
    fn new(remote: SocketAddr, chain_id: ChainId) -> Arc<Self> {
        Arc::new(Self {
            remote,
            chain_id,
            connected_at: Instant::now(),
            closed: Notify::new(),
        })
    }
}

impl PeerConnection for TcpPeer {
    fn on_disconnect(&self) {
        // Stored as a permit if the reader is busy; it picks it up next loop.
        self.closed.notify_one();
    }

    fn describe(&self) -> String {
        format!(
            "{} chain={} age={}s",
            self.remote,
            self.chain_id.short(),
            self.connected_at.elapsed().as_secs()
        )
    }
}

pub struct TcpConnector {
    registry: Arc<ConnectionRegistry>,
    connect_timeout: Duration,
}

impl TcpConnector {
    pub fn new(registry: Arc<ConnectionRegistry>, connect_timeout: Duration) -> Self {
        Self {
            registry,
            connect_timeout,
        }
    }
}

impl Connector for TcpConnector {
    fn connect(&self, seed: SeedNode) -> BoxFuture<'static, anyhow::Result<()>> {
        let registry = self.registry.clone();
        let connect_timeout = self.connect_timeout;
        async move {
            let result = dial(registry, &seed, connect_timeout).await;
            if let Err(e) = &result {
                tracing::warn!(seed = %seed, error = %e, "cross-chain seed unreachable");
            }
            result
        }
        .boxed()
    }
}

async fn dial(
    registry: Arc<ConnectionRegistry>,
    seed: &SeedNode,
    connect_timeout: Duration,
) -> anyhow::Result<()> {
    let stream = tokio::time::timeout(connect_timeout, TcpStream::connect(&seed.address))
        .await
        .with_context(|| format!("timed out dialing {}", seed.address))?
        .with_context(|| format!("failed to dial {}", seed.address))?;
    let remote = stream.peer_addr().context("connected socket has no peer address")?;

    let peer = TcpPeer::new(remote, seed.chain_id);
    let peer_ref: PeerRef = peer.clone();
    registry.register(seed.chain_id, peer_ref.clone());
    tracing::info!(remote = %remote, chain = %seed.chain_id.short(), "cross-chain seed connected");

    tokio::spawn(watch(stream, peer, peer_ref, registry));
    Ok(())
}

/// Hold the socket until either side closes it.
///
/// Inbound bytes belong to the protocol layer and are discarded here.
async fn watch(
    mut stream: TcpStream,
    peer: Arc<TcpPeer>,
    peer_ref: PeerRef,
    registry: Arc<ConnectionRegistry>,
) {
    let mut buf = [0u8; 4096];
    loop {
        tokio::select! {
            _ = peer.closed.notified() => {
                tracing::debug!(remote = %peer.remote, "closing socket of dropped peer");
                return;
            }

            read = stream.read(&mut buf) => match read {
                Ok(0) => {
                    tracing::debug!(remote = %peer.remote, "remote closed connection");
                    break;
                }
                Ok(_) => continue,
                Err(e) => {
                    tracing::debug!(remote = %peer.remote, error = %e, "read failed");
                    break;
                }
            },
        }
    }
    registry.unregister(&peer_ref);
}
