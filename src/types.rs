// Primitives - Identity and correlation tokens for the discovery walk
// Principle: opaque, equality-comparable keys; no transport semantics here

use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque peer identity (32 bytes, derived by the transport layer)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PeerId([u8; 32]);

impl PeerId {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        PeerId(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", hex::encode(&self.0[..8]))
    }
}

impl From<[u8; 32]> for PeerId {
    fn from(bytes: [u8; 32]) -> Self {
        PeerId(bytes)
    }
}

/// Correlation token identifying one outstanding request.
///
/// Generated fresh for every outbound request and never reused, so a response
/// or eviction can be matched back to the request that produced it. Tokens
/// are drawn from the OS RNG to keep them unpredictable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CorrelationId([u8; 16]);

impl CorrelationId {
    /// Produce a fresh correlation id.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 16];
        OsRng.fill_bytes(&mut bytes);
        CorrelationId(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", hex::encode(&self.0[..8]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_correlation_ids_are_unique() {
        let a = CorrelationId::generate();
        let b = CorrelationId::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn test_correlation_id_equality_by_value() {
        let a = CorrelationId::generate();
        let b = a;
        assert_eq!(a, b);
    }

    #[test]
    fn test_peer_id_roundtrip() {
        let id = PeerId::from_bytes([7; 32]);
        assert_eq!(id.as_bytes(), &[7; 32]);
        assert_eq!(id, PeerId::from([7; 32]));
    }

    #[test]
    fn test_display_is_short_hex() {
        let id = PeerId::from_bytes([0xab; 32]);
        assert_eq!(id.to_string(), "abababababababab");
    }
}
