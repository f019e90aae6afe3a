//! xchain-core: shared types and configuration.
//! All other xchain crates depend on this one.

pub mod chain;
pub mod config;

pub use chain::{ChainId, ChainIdError, SeedNode};
pub use config::{ConfigError, XchainConfig};
