// Hastings Discovery - Randomized peer-discovery walk engine
// Principle: explore the network one degree at a time; every step is
// committed to history and every failure rewinds through it

pub mod config;
pub mod engine;
pub mod error;
pub mod memento;
pub mod neighbour;
pub mod proposal;
pub mod protocol;
pub mod seeds;
pub mod types;

#[cfg(test)]
mod tests;

pub use config::DiscoveryConfig;
pub use engine::{DiscoveredPeer, DiscoveryEngine, PeerClient, PeerRepository};
pub use error::{DiscoveryError, SendError};
pub use protocol::{DiscoveryEvent, DiscoveryMessage};
pub use seeds::{SeedSource, StaticSeedList};
pub use types::{CorrelationId, PeerId};
