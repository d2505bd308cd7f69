// Protocol - Discovery messages and inbound events
// Principle: semantic fields only; framing and transport belong to the peer client

use crate::types::{CorrelationId, PeerId};
use serde::{Deserialize, Serialize};

// =============================================================================
// CONSTANTS
// =============================================================================

/// Maximum allowed message size for deserialization.
/// A neighbour response carries at most a handful of peer ids, so anything
/// near this bound is garbage or hostile.
pub const MAX_MESSAGE_SIZE: usize = 64 * 1024;

/// Error type for message encoding and decoding
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("Message too large: {size} bytes (max: {max})")]
    MessageTooLarge { size: usize, max: usize },

    #[error("Deserialization failed: {0}")]
    DeserializationFailed(String),

    #[error("Serialization failed: {0}")]
    SerializationFailed(String),
}

// =============================================================================
// MESSAGE SCHEMAS
// =============================================================================

/// Reachability probe sent to a candidate neighbour
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PingRequest {
    pub correlation_id: CorrelationId,
}

/// Answer to a reachability probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PingResponse {
    pub correlation_id: CorrelationId,
}

/// Ask a peer for the neighbours it knows about (PNR)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerNeighborsRequest {
    pub correlation_id: CorrelationId,
}

/// A peer's answer with its known neighbours
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerNeighborsResponse {
    pub correlation_id: CorrelationId,
    pub peers: Vec<PeerId>,
}

/// Outbound discovery messages handed to the peer client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiscoveryMessage {
    PingRequest(PingRequest),
    PingResponse(PingResponse),
    PeerNeighborsRequest(PeerNeighborsRequest),
    PeerNeighborsResponse(PeerNeighborsResponse),
}

impl DiscoveryMessage {
    /// Correlation id carried by any message variant.
    ///
    /// The transport registers outbound ids with its correlation cache so the
    /// eviction stream can report the ones that go unanswered.
    pub fn correlation_id(&self) -> CorrelationId {
        match self {
            DiscoveryMessage::PingRequest(m) => m.correlation_id,
            DiscoveryMessage::PingResponse(m) => m.correlation_id,
            DiscoveryMessage::PeerNeighborsRequest(m) => m.correlation_id,
            DiscoveryMessage::PeerNeighborsResponse(m) => m.correlation_id,
        }
    }

    /// Encode the message to bytes
    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        bincode::serialize(self).map_err(|e| ProtocolError::SerializationFailed(e.to_string()))
    }

    /// Decode a message from bytes, rejecting oversized payloads first
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        if bytes.len() > MAX_MESSAGE_SIZE {
            return Err(ProtocolError::MessageTooLarge {
                size: bytes.len(),
                max: MAX_MESSAGE_SIZE,
            });
        }

        bincode::deserialize(bytes).map_err(|e| ProtocolError::DeserializationFailed(e.to_string()))
    }
}

// =============================================================================
// INBOUND EVENTS
// =============================================================================

/// Everything the engine reacts to, merged into one stream.
///
/// Responses come from the transport's inbound message stream; evictions come
/// from the correlation cache when a request's response window expires. The
/// engine dispatches on this sum type in a single match.
#[derive(Debug, Clone)]
pub enum DiscoveryEvent {
    PingResponse {
        sender: PeerId,
        correlation_id: CorrelationId,
    },
    PeerNeighborsResponse {
        sender: PeerId,
        correlation_id: CorrelationId,
        peers: Vec<PeerId>,
    },
    Evicted {
        correlation_id: CorrelationId,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_encode_decode() {
        let msg = DiscoveryMessage::PeerNeighborsResponse(PeerNeighborsResponse {
            correlation_id: CorrelationId::generate(),
            peers: vec![PeerId::from_bytes([1; 32]), PeerId::from_bytes([2; 32])],
        });

        let encoded = msg.encode().unwrap();
        let decoded = DiscoveryMessage::decode(&encoded).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn test_decode_rejects_oversized() {
        let bytes = vec![0u8; MAX_MESSAGE_SIZE + 1];
        match DiscoveryMessage::decode(&bytes) {
            Err(ProtocolError::MessageTooLarge { size, max }) => {
                assert_eq!(size, MAX_MESSAGE_SIZE + 1);
                assert_eq!(max, MAX_MESSAGE_SIZE);
            }
            other => panic!("expected MessageTooLarge, got {:?}", other),
        }
    }

    #[test]
    fn test_correlation_id_accessor_covers_all_variants() {
        let id = CorrelationId::generate();
        let variants = [
            DiscoveryMessage::PingRequest(PingRequest { correlation_id: id }),
            DiscoveryMessage::PingResponse(PingResponse { correlation_id: id }),
            DiscoveryMessage::PeerNeighborsRequest(PeerNeighborsRequest { correlation_id: id }),
            DiscoveryMessage::PeerNeighborsResponse(PeerNeighborsResponse {
                correlation_id: id,
                peers: vec![],
            }),
        ];
        for msg in variants {
            assert_eq!(msg.correlation_id(), id);
        }
    }
}
