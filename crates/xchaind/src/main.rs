//! xchaind: cross-chain connection pool daemon.

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::broadcast;

use xchain_core::XchainConfig;
use xchain_pool::{
    Bootstrapper, ConnectionRegistry, PeriodicReporter, RegistryEvent, ReportSchedule,
    TracingSink,
};

mod net;

use net::TcpConnector;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Load config
    if let Err(e) = XchainConfig::write_default_if_missing() {
        tracing::warn!(error = %e, "failed to write default config");
    }
    let config = XchainConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to load config, using defaults");
        XchainConfig::default()
    });
    tracing::info!(
        seeds = config.cross_chain.seeds.len(),
        report_period_secs = config.report.period_secs,
        "xchaind starting"
    );

    // Shared state
    let registry = Arc::new(ConnectionRegistry::new());

    // ── Shutdown channel ─────────────────────────────────────────────────────
    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    {
        let shutdown = shutdown_tx.clone();
        tokio::spawn(async move {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("shutdown signal received");
            let _ = shutdown.send(());
        });
    }

    // ── Spawn tasks ──────────────────────────────────────────────────────────

    let events_task = tokio::spawn(event_loop(registry.subscribe(), shutdown_tx.subscribe()));

    let reporter_task = PeriodicReporter::new(
        registry.clone(),
        Arc::new(TracingSink),
        ReportSchedule::from(&config.report),
    )
    .spawn(shutdown_tx.subscribe());

    let connector = Arc::new(TcpConnector::new(
        registry.clone(),
        config.network.connect_timeout(),
    ));
    Bootstrapper::new(config.cross_chain.seeds.clone(), connector).init();

    // ── Wait for exit ────────────────────────────────────────────────────────

    let mut shutdown_rx = shutdown_tx.subscribe();

    tokio::select! {
        biased;
        _ = shutdown_rx.recv() => tracing::info!("shutting down"),
        r = reporter_task      => tracing::error!("peer reporter exited: {:?}", r),
        r = events_task        => tracing::error!("registry event loop exited: {:?}", r),
    }

    // Drop every remaining connection so each peer gets its disconnect.
    for (_, bucket) in registry.snapshot() {
        for peer in bucket {
            registry.unregister(&peer);
        }
    }

    Ok(())
}

/// Follow registry lifecycle events. A newly connected chain is where header
/// sync for that chain would be kicked off.
async fn event_loop(
    mut events: broadcast::Receiver<RegistryEvent>,
    mut shutdown: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            _ = shutdown.recv() => return,

            event = events.recv() => match event {
                Ok(RegistryEvent::Connected { chain_id, connection }) => {
                    tracing::info!(
                        chain = %chain_id.short(),
                        peer = %connection.describe(),
                        "cross-chain peer available for header sync"
                    );
                }
                Ok(RegistryEvent::Disconnected { chain_ids, connection }) => {
                    tracing::debug!(
                        chains = chain_ids.len(),
                        peer = %connection.describe(),
                        "cross-chain peer gone"
                    );
                }
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    tracing::warn!(missed, "registry event loop lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return,
            },
        }
    }
}
