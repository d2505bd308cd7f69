// Neighbours - Candidate peers under test during one walk step
// Principle: pure data; reachability outcomes are monotonic once settled

use crate::types::{CorrelationId, PeerId};
use serde::{Deserialize, Serialize};

// =============================================================================
// NEIGHBOUR STATE
// =============================================================================

/// Discovery state of a single neighbour within the current step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NeighbourState {
    /// Known but not yet probed
    NotContacted,
    /// Ping sent, outcome pending
    Contacted,
    /// Ping answered before the response window closed
    Responsive,
    /// Ping went unanswered (evicted) or could not be sent
    UnResponsive,
}

impl NeighbourState {
    /// Terminal outcomes absorb any later, contradictory message.
    pub fn is_terminal(&self) -> bool {
        matches!(self, NeighbourState::Responsive | NeighbourState::UnResponsive)
    }
}

// =============================================================================
// NEIGHBOUR
// =============================================================================

/// A candidate peer together with the correlation id of its outstanding ping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Neighbour {
    peer_id: PeerId,
    state: NeighbourState,
    ping_correlation_id: CorrelationId,
}

impl Neighbour {
    /// Create a neighbour in `NotContacted` with the given ping correlation id
    pub fn new(peer_id: PeerId, ping_correlation_id: CorrelationId) -> Self {
        Neighbour {
            peer_id,
            state: NeighbourState::NotContacted,
            ping_correlation_id,
        }
    }

    /// Create a neighbour with a freshly generated ping correlation id
    pub fn fresh(peer_id: PeerId) -> Self {
        Self::new(peer_id, CorrelationId::generate())
    }

    pub fn peer_id(&self) -> PeerId {
        self.peer_id
    }

    pub fn state(&self) -> NeighbourState {
        self.state
    }

    pub fn ping_correlation_id(&self) -> CorrelationId {
        self.ping_correlation_id
    }

    /// Move to a new state unless the current one is already terminal.
    ///
    /// Returns whether the transition was applied. Ping responses and
    /// evictions race in from independent collaborators, so whichever
    /// settles the neighbour first wins and the loser becomes a no-op.
    pub fn transition_to(&mut self, state: NeighbourState) -> bool {
        if self.state.is_terminal() {
            return false;
        }
        self.state = state;
        true
    }
}

// =============================================================================
// NEIGHBOUR SET
// =============================================================================

/// Ordered set of neighbours for one step, unique by peer id.
///
/// Insertion order is kept so iteration is deterministic; inserting a peer
/// that is already present replaces the earlier entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Neighbours(Vec<Neighbour>);

impl Neighbours {
    pub fn new() -> Self {
        Neighbours(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Insert a neighbour, replacing any existing entry for the same peer
    pub fn insert(&mut self, neighbour: Neighbour) {
        match self.0.iter_mut().find(|n| n.peer_id == neighbour.peer_id) {
            Some(existing) => *existing = neighbour,
            None => self.0.push(neighbour),
        }
    }

    pub fn contains_peer(&self, peer_id: &PeerId) -> bool {
        self.0.iter().any(|n| n.peer_id == *peer_id)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Neighbour> {
        self.0.iter()
    }

    /// Neighbours that answered their ping
    pub fn responsive(&self) -> impl Iterator<Item = &Neighbour> + '_ {
        self.0
            .iter()
            .filter(|n| n.state == NeighbourState::Responsive)
    }

    pub fn count_in_state(&self, state: NeighbourState) -> usize {
        self.0.iter().filter(|n| n.state == state).count()
    }

    pub fn find_by_ping_id(&self, correlation_id: &CorrelationId) -> Option<&Neighbour> {
        self.0
            .iter()
            .find(|n| n.ping_correlation_id == *correlation_id)
    }

    pub fn find_by_ping_id_mut(&mut self, correlation_id: &CorrelationId) -> Option<&mut Neighbour> {
        self.0
            .iter_mut()
            .find(|n| n.ping_correlation_id == *correlation_id)
    }
}

impl FromIterator<Neighbour> for Neighbours {
    fn from_iter<I: IntoIterator<Item = Neighbour>>(iter: I) -> Self {
        let mut set = Neighbours::new();
        for neighbour in iter {
            set.insert(neighbour);
        }
        set
    }
}

impl From<Vec<Neighbour>> for Neighbours {
    fn from(neighbours: Vec<Neighbour>) -> Self {
        neighbours.into_iter().collect()
    }
}

impl<'a> IntoIterator for &'a Neighbours {
    type Item = &'a Neighbour;
    type IntoIter = std::slice::Iter<'a, Neighbour>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

// =============================================================================
// TESTS
// =============================================================================
