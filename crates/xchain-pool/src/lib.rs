//! xchain-pool: cross-chain connection registry, seed bootstrap and
//! periodic peer reporting.

pub mod bootstrap;
pub mod connection;
pub mod registry;
pub mod reporter;

pub use bootstrap::{Bootstrapper, Connector};
pub use connection::{same_connection, PeerConnection, PeerRef};
pub use registry::{ConnectionRegistry, RegistryEvent};
pub use reporter::{ChainReport, PeriodicReporter, ReportSchedule, ReportSink, TracingSink};
