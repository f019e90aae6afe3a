//! Seed bootstrap: dial every configured cross-chain seed at startup.
//!
//! Fire-and-forget: each dial runs on its own task and `init` returns as soon
//! as they are spawned. Nothing is registered here. A successful dial ends up
//! in the registry through the connector's own `register` call, and failures,
//! retries and timeouts belong to the connector.

use std::sync::Arc;

use futures::future::BoxFuture;
use xchain_core::SeedNode;

/// Connection-establishment collaborator.
pub trait Connector: Send + Sync {
    /// Start an outbound connection to `seed`.
    ///
    /// Must not block; the returned future does the work.
    fn connect(&self, seed: SeedNode) -> BoxFuture<'static, anyhow::Result<()>>;
}

pub struct Bootstrapper {
    seeds: Vec<SeedNode>,
    connector: Arc<dyn Connector>,
}

impl Bootstrapper {
    pub fn new(seeds: Vec<SeedNode>, connector: Arc<dyn Connector>) -> Self {
        Self { seeds, connector }
    }

    /// Dispatch one connection attempt per seed. Returns how many were
    /// dispatched. Must be called from within a tokio runtime.
    pub fn init(&self) -> usize {
        if self.seeds.is_empty() {
            tracing::info!("no cross-chain seeds configured");
            return 0;
        }

        for seed in &self.seeds {
            tracing::debug!(seed = %seed, "dialing cross-chain seed");
            let attempt = self.connector.connect(seed.clone());
            let seed = seed.to_string();
            tokio::spawn(async move {
                if let Err(e) = attempt.await {
                    tracing::debug!(seed, error = %e, "seed connection attempt ended");
                }
            });
        }

        tracing::info!(seeds = self.seeds.len(), "cross-chain bootstrap dispatched");
        self.seeds.len()
    }
}
