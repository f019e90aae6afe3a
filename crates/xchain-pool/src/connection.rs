//! The live-connection handle the pool tracks.
//!
//! Connections belong to the networking layer. The pool only keeps shared
//! references to them and compares them by identity, never by value: two
//! handles to the same remote are still different connections.

use std::sync::Arc;

/// A live connection to a remote peer, owned by the networking layer.
pub trait PeerConnection: Send + Sync {
    /// Called once when the connection is dropped from the pool.
    ///
    /// Runs on the caller's thread after the pool lock is released, so it may
    /// call back into the registry.
    fn on_disconnect(&self);

    /// One-line human-readable summary for diagnostics.
    fn describe(&self) -> String;
}

/// Shared handle to a connection, as stored in the pool.
pub type PeerRef = Arc<dyn PeerConnection>;

/// Identity comparison: true iff both handles point at the same allocation.
///
/// Compares data addresses only, so two handles created through different
/// unsizing sites still match.
pub fn same_connection(a: &PeerRef, b: &PeerRef) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}
