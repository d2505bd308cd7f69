// Errors - Failure taxonomy for the discovery walk
// Principle: benign mismatches are not errors; only unrecoverable walk
// conditions surface as DiscoveryError

use crate::types::PeerId;
use std::time::Duration;

/// Errors raised by the walk engine itself.
///
/// Correlation mismatches and individual probe failures never appear here:
/// the former are dropped, the latter are absorbed by marking the neighbour
/// unresponsive and continuing.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DiscoveryError {
    /// The rollback stack holds no memento at all. Unreachable once the
    /// root memento is seeded at startup.
    #[error("discovery history is empty")]
    EmptyHistory,

    /// The walk popped its whole history back to the root and still found no
    /// responsive ancestor to continue from. Fatal for the run.
    #[error("walk exhausted its history with no responsive ancestor")]
    NoResponsiveAncestor,

    /// Waiting for the current step to settle exceeded the configured bound.
    #[error("no valid candidate within {waited:?}")]
    CandidateTimeout { waited: Duration },
}

/// A fire-and-forget send that the peer client could not complete.
#[derive(Debug, Clone, thiserror::Error)]
#[error("send to {peer} failed: {reason}")]
pub struct SendError {
    pub peer: PeerId,
    pub reason: String,
}

impl SendError {
    pub fn new(peer: PeerId, reason: impl Into<String>) -> Self {
        SendError {
            peer,
            reason: reason.into(),
        }
    }
}
