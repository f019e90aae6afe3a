//! Periodic peer report.
//!
//! On a fixed schedule, copy the registry and log one block per chain: chain
//! id, peer count, one line per peer, then a separator. The registry lock is
//! held only while copying; formatting and output happen on the copy.
//!
//! A cycle that fails or panics is logged and the schedule carries on.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use xchain_core::config::ReportConfig;
use xchain_core::ChainId;

use crate::registry::ConnectionRegistry;

const SEPARATOR: &str = "===========================================================";

/// Shortest period the schedule will run at; `interval_at` rejects zero.
const MIN_PERIOD: Duration = Duration::from_millis(1);

/// When the reporter fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportSchedule {
    /// Delay before the first report.
    pub initial_delay: Duration,
    /// Interval between reports. Zero is treated as one millisecond.
    pub period: Duration,
}

impl Default for ReportSchedule {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(30),
            period: Duration::from_secs(10),
        }
    }
}

impl From<&ReportConfig> for ReportSchedule {
    fn from(config: &ReportConfig) -> Self {
        Self {
            initial_delay: config.initial_delay(),
            period: config.period(),
        }
    }
}

/// Formatted state of one chain's bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainReport {
    pub chain_id: ChainId,
    /// One `describe()` line per peer, in registration order.
    pub peers: Vec<String>,
}

impl ChainReport {
    pub fn render(&self) -> String {
        let mut out = format!(
            "============ Cross Chain {} Peer stats: all {}\n",
            self.chain_id,
            self.peers.len()
        );
        for peer in &self.peers {
            out.push_str(peer);
            out.push('\n');
        }
        out.push_str(SEPARATOR);
        out.push('\n');
        out
    }
}

/// Where finished reports go.
pub trait ReportSink: Send + Sync {
    fn emit(&self, reports: &[ChainReport]) -> anyhow::Result<()>;
}

/// Writes each report to the `xchain::report` tracing target at info level.
pub struct TracingSink;

impl ReportSink for TracingSink {
    fn emit(&self, reports: &[ChainReport]) -> anyhow::Result<()> {
        for report in reports {
            tracing::info!(
                target: "xchain::report",
                chain = %report.chain_id.short(),
                peers = report.peers.len(),
                "\n{}",
                report.render()
            );
        }
        Ok(())
    }
}

pub struct PeriodicReporter {
    registry: Arc<ConnectionRegistry>,
    sink: Arc<dyn ReportSink>,
    schedule: ReportSchedule,
}

impl PeriodicReporter {
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        sink: Arc<dyn ReportSink>,
        schedule: ReportSchedule,
    ) -> Self {
        Self {
            registry,
            sink,
            schedule,
        }
    }

    /// Snapshot the registry and format one report per chain.
    pub fn collect(&self) -> Vec<ChainReport> {
        self.registry
            .snapshot()
            .into_iter()
            .map(|(chain_id, bucket)| ChainReport {
                chain_id,
                peers: bucket.iter().map(|peer| peer.describe()).collect(),
            })
            .collect()
    }

    /// One report cycle. Returns the number of chains reported.
    pub fn run_cycle(&self) -> anyhow::Result<usize> {
        let reports = self.collect();
        self.sink.emit(&reports)?;
        Ok(reports.len())
    }

    /// Run until `shutdown` fires or its sender is dropped.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        let period = self.schedule.period.max(MIN_PERIOD);
        let start = tokio::time::Instant::now() + self.schedule.initial_delay;
        let mut interval = tokio::time::interval_at(start, period);

        tracing::debug!(
            initial_delay = ?self.schedule.initial_delay,
            ?period,
            "peer reporter scheduled"
        );

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    tracing::info!("peer reporter shutting down");
                    return;
                }

                _ = interval.tick() => self.tick(),
            }
        }
    }

    pub fn spawn(self, shutdown: broadcast::Receiver<()>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    fn tick(&self) {
        match catch_unwind(AssertUnwindSafe(|| self.run_cycle())) {
            Ok(Ok(chains)) => tracing::trace!(chains, "peer report emitted"),
            Ok(Err(e)) => tracing::error!(error = %e, "peer report cycle failed"),
            Err(_) => tracing::error!("peer report cycle panicked"),
        }
    }
}
