// Mementos - Immutable step snapshots and the rollback history
// Principle: each snapshot is an independent deep copy; the root is never lost

use crate::error::DiscoveryError;
use crate::neighbour::Neighbours;
use crate::types::PeerId;

// =============================================================================
// MEMENTO
// =============================================================================

/// Immutable snapshot of one committed walk step: the peer that was explored
/// and the neighbours worth keeping from that step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Memento {
    peer: PeerId,
    neighbours: Neighbours,
}

impl Memento {
    pub fn new(peer: PeerId, neighbours: Neighbours) -> Self {
        Memento { peer, neighbours }
    }

    pub fn peer(&self) -> PeerId {
        self.peer
    }

    pub fn neighbours(&self) -> &Neighbours {
        &self.neighbours
    }

    /// Consume the snapshot into its parts
    pub fn into_parts(self) -> (PeerId, Neighbours) {
        (self.peer, self.neighbours)
    }
}

// =============================================================================
// CARETAKER
// =============================================================================

/// LIFO history of committed steps, used to rewind the walk on failure.
///
/// Seeded with a root memento at startup and floored at one entry from then
/// on: popping never discards the root, so the walk can always fall back to
/// where it started.
#[derive(Debug, Default)]
pub struct CareTaker {
    mementos: Vec<Memento>,
}

impl CareTaker {
    pub fn new() -> Self {
        CareTaker {
            mementos: Vec::new(),
        }
    }

    /// Push a committed step onto the history
    pub fn add(&mut self, memento: Memento) {
        self.mementos.push(memento);
    }

    /// Most recent memento, without removing it
    pub fn peek(&self) -> Result<Memento, DiscoveryError> {
        self.mementos
            .last()
            .cloned()
            .ok_or(DiscoveryError::EmptyHistory)
    }

    /// Pop the most recent memento, flooring at the root.
    ///
    /// With two or more entries this removes and returns the top; with
    /// exactly one it returns a copy of the root and leaves it in place.
    pub fn get(&mut self) -> Result<Memento, DiscoveryError> {
        if self.mementos.len() > 1 {
            self.mementos.pop().ok_or(DiscoveryError::EmptyHistory)
        } else {
            self.peek()
        }
    }

    pub fn len(&self) -> usize {
        self.mementos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mementos.is_empty()
    }
}

// =============================================================================
// TESTS
// =============================================================================
