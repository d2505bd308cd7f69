// Seeds - Bootstrap peers for the first walk step
// Principle: where the seeds come from is the caller's business

use crate::types::PeerId;
use tracing::warn;

/// Source of bootstrap peers.
///
/// The engine asks once at startup; implementations may read a config file,
/// resolve DNS records, or hand back a hardcoded list.
pub trait SeedSource: Send + Sync {
    fn seed_peers(&self) -> Vec<PeerId>;
}

/// Fixed list of seed peers, deduplicated in order of first appearance
#[derive(Debug, Clone)]
pub struct StaticSeedList {
    peers: Vec<PeerId>,
}

impl StaticSeedList {
    pub fn new(peers: impl IntoIterator<Item = PeerId>) -> Self {
        let mut unique = Vec::new();
        for peer in peers {
            if !unique.contains(&peer) {
                unique.push(peer);
            }
        }
        if unique.is_empty() {
            warn!("Seed list is empty, discovery cannot leave the local node");
        }
        StaticSeedList { peers: unique }
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}

impl SeedSource for StaticSeedList {
    fn seed_peers(&self) -> Vec<PeerId> {
        self.peers.clone()
    }
}
