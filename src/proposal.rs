// Step proposal - The mutable in-flight state of the walk
// Principle: one candidate peer under evaluation, its neighbours under test,
// and the correlation id of the outstanding neighbour request

use crate::memento::Memento;
use crate::neighbour::{Neighbour, NeighbourState, Neighbours};
use crate::types::{CorrelationId, PeerId};

/// Work-in-progress state for the next walk step.
///
/// Built from a committed memento, mutated by the response and eviction
/// handlers as probe outcomes arrive, and either committed into a new
/// memento (walk forward) or overwritten from history (walk back).
#[derive(Debug)]
pub struct StepProposal {
    peer: PeerId,
    neighbours: Neighbours,
    pnr_correlation_id: CorrelationId,
    fan_out: usize,
}

impl StepProposal {
    /// Seed a proposal from a committed step.
    ///
    /// A fresh neighbour-request correlation id is generated, so any response
    /// still in flight for a previous proposal is ignored from here on.
    pub fn from_memento(memento: Memento, fan_out: usize) -> Self {
        let (peer, neighbours) = memento.into_parts();
        StepProposal {
            peer,
            neighbours,
            pnr_correlation_id: CorrelationId::generate(),
            fan_out,
        }
    }

    /// Overwrite the proposal in place from a memento.
    ///
    /// Rotates the neighbour-request correlation id, invalidating whatever
    /// neighbour request was outstanding for the previous state.
    pub fn restore_memento(&mut self, memento: Memento) {
        let (peer, neighbours) = memento.into_parts();
        self.peer = peer;
        self.neighbours = neighbours;
        self.pnr_correlation_id = CorrelationId::generate();
    }

    /// Snapshot the proposal, keeping only neighbours worth remembering.
    ///
    /// Unresponsive neighbours are dropped: rolling back to a step should
    /// never re-suggest a peer that already failed to answer.
    pub fn create_memento(&self) -> Memento {
        let worthy: Neighbours = self
            .neighbours
            .iter()
            .filter(|n| n.state() != NeighbourState::UnResponsive)
            .cloned()
            .collect();
        Memento::new(self.peer, worthy)
    }

    /// Walk-termination gate polled by the driving loop.
    ///
    /// False while nothing has happened yet (every probed slot still
    /// `NotContacted`); true once every probed neighbour reached a terminal
    /// outcome, i.e. responsive + unresponsive counts add up to the fan-out.
    pub fn has_valid_candidate(&self) -> bool {
        if self.neighbours.count_in_state(NeighbourState::NotContacted) == self.fan_out {
            return false;
        }

        let settled = self.neighbours.count_in_state(NeighbourState::Responsive)
            + self.neighbours.count_in_state(NeighbourState::UnResponsive);
        settled == self.fan_out
    }

    pub fn peer(&self) -> PeerId {
        self.peer
    }

    pub fn neighbours(&self) -> &Neighbours {
        &self.neighbours
    }

    pub fn neighbour_by_ping_id_mut(
        &mut self,
        correlation_id: &CorrelationId,
    ) -> Option<&mut Neighbour> {
        self.neighbours.find_by_ping_id_mut(correlation_id)
    }

    pub fn pnr_correlation_id(&self) -> CorrelationId {
        self.pnr_correlation_id
    }

    pub fn fan_out(&self) -> usize {
        self.fan_out
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const FAN_OUT: usize = 5;

    fn peer(seed: u8) -> PeerId {
        PeerId::from_bytes([seed; 32])
    }

    fn proposal_with_states(states: &[NeighbourState]) -> StepProposal {
        let neighbours: Neighbours = states
            .iter()
            .enumerate()
            .map(|(i, state)| {
                let mut n = Neighbour::fresh(peer(i as u8 + 1));
                if *state != NeighbourState::NotContacted {
                    n.transition_to(NeighbourState::Contacted);
                    if state.is_terminal() {
                        n.transition_to(*state);
                    }
                }
                n
            })
            .collect();
        StepProposal::from_memento(Memento::new(peer(0), neighbours), FAN_OUT)
    }

    #[test]
    fn test_gate_false_when_all_not_contacted() {
        let p = proposal_with_states(&[NeighbourState::NotContacted; FAN_OUT]);
        assert!(!p.has_valid_candidate());
    }

    #[test]
    fn test_gate_false_while_probes_outstanding() {
        let p = proposal_with_states(&[
            NeighbourState::Responsive,
            NeighbourState::Responsive,
            NeighbourState::Contacted,
            NeighbourState::Contacted,
            NeighbourState::Contacted,
        ]);
        assert!(!p.has_valid_candidate());
    }

    #[test]
    fn test_gate_true_when_every_probe_settled() {
        let p = proposal_with_states(&[
            NeighbourState::Responsive,
            NeighbourState::Responsive,
            NeighbourState::Responsive,
            NeighbourState::UnResponsive,
            NeighbourState::UnResponsive,
        ]);
        assert!(p.has_valid_candidate());
    }

    #[test]
    fn test_gate_counts_immediate_send_failures() {
        // one probe failed at send time, the other four answered
        let p = proposal_with_states(&[
            NeighbourState::UnResponsive,
            NeighbourState::Responsive,
            NeighbourState::Responsive,
            NeighbourState::Responsive,
            NeighbourState::Responsive,
        ]);
        assert!(p.has_valid_candidate());
    }

    #[test]
    fn test_gate_false_with_fewer_neighbours_than_fan_out() {
        let p = proposal_with_states(&[
            NeighbourState::Responsive,
            NeighbourState::UnResponsive,
            NeighbourState::Responsive,
        ]);
        assert!(!p.has_valid_candidate());
    }

    #[test]
    fn test_gate_false_with_no_neighbours() {
        let p = StepProposal::from_memento(Memento::new(peer(0), Neighbours::new()), FAN_OUT);
        assert!(!p.has_valid_candidate());
    }

    #[test]
    fn test_create_memento_drops_unresponsive() {
        let p = proposal_with_states(&[
            NeighbourState::Responsive,
            NeighbourState::UnResponsive,
            NeighbourState::Contacted,
            NeighbourState::NotContacted,
            NeighbourState::UnResponsive,
        ]);

        let memento = p.create_memento();
        assert_eq!(memento.neighbours().len(), 3);
        assert_eq!(
            memento
                .neighbours()
                .count_in_state(NeighbourState::UnResponsive),
            0
        );
    }

    #[test]
    fn test_restore_rotates_the_pnr_correlation_id() {
        let mut p = proposal_with_states(&[NeighbourState::NotContacted; FAN_OUT]);
        let before = p.pnr_correlation_id();

        p.restore_memento(Memento::new(peer(9), Neighbours::new()));

        assert_ne!(p.pnr_correlation_id(), before);
        assert_eq!(p.peer(), peer(9));
        assert!(p.neighbours().is_empty());
    }

    #[test]
    fn test_from_memento_keeps_snapshot_contents() {
        let neighbours: Neighbours = vec![Neighbour::fresh(peer(1)), Neighbour::fresh(peer(2))].into();
        let p = StepProposal::from_memento(Memento::new(peer(0), neighbours.clone()), FAN_OUT);

        assert_eq!(p.peer(), peer(0));
        assert_eq!(p.neighbours(), &neighbours);
    }
}
