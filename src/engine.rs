// Engine - Correlation-driven random walk over the peer network
// Principle: handlers settle neighbour outcomes, the driving loop commits or
// rewinds; all shared state mutates under one lock

use crate::config::DiscoveryConfig;
use crate::error::{DiscoveryError, SendError};
use crate::memento::{CareTaker, Memento};
use crate::neighbour::{Neighbour, NeighbourState, Neighbours};
use crate::proposal::StepProposal;
use crate::protocol::{DiscoveryEvent, DiscoveryMessage, PeerNeighborsRequest, PingRequest};
use crate::seeds::SeedSource;
use crate::types::{CorrelationId, PeerId};
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

// =============================================================================
// COLLABORATOR TRAITS
// =============================================================================

/// Fire-and-forget message transport towards a peer.
///
/// The engine only cares whether the send itself failed; delivery outcomes
/// come back later through the event stream (responses) or the transport's
/// correlation cache (evictions).
pub trait PeerClient: Send + Sync {
    fn send(&self, recipient: PeerId, message: DiscoveryMessage) -> Result<(), SendError>;
}

/// Sink for peers the walk has confirmed reachable.
///
/// Deduplication, if any, is the repository's business.
pub trait PeerRepository: Send + Sync {
    fn add(&self, peer: DiscoveredPeer);
}

/// A peer record as handed to the repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredPeer {
    pub peer_id: PeerId,
    pub reputation: i32,
    pub last_seen: DateTime<Utc>,
}

impl DiscoveredPeer {
    pub fn new(peer_id: PeerId) -> Self {
        DiscoveredPeer {
            peer_id,
            reputation: 0,
            last_seen: Utc::now(),
        }
    }
}

// =============================================================================
// WALK STATE
// =============================================================================

/// Proposal and history live behind one lock so every logical operation
/// (commit, rewind, handler) sees and leaves a consistent pair.
struct WalkState {
    proposal: StepProposal,
    history: CareTaker,
}

// =============================================================================
// DISCOVERY ENGINE
// =============================================================================

/// Drives the discovery walk: probes a peer's neighbours, waits for every
/// probe to settle, then either commits the step and advances to a random
/// responsive neighbour, or rewinds through history to a responsive ancestor.
pub struct DiscoveryEngine {
    own_id: PeerId,
    config: DiscoveryConfig,

    client: Arc<dyn PeerClient>,
    repository: Arc<dyn PeerRepository>,

    state: Mutex<WalkState>,

    /// One loop iteration (wait + commit-or-rewind) at a time
    run_guard: tokio::sync::Mutex<()>,

    /// Candidate selection RNG, seedable for reproducible runs
    rng: Mutex<StdRng>,

    /// Responsive peers seen across the whole run, drives the burn-in gate
    discovered_in_walk: AtomicUsize,

    cancelled: AtomicBool,

    /// First unrecoverable error, set by whichever path hits it
    fatal: Mutex<Option<DiscoveryError>>,
}

impl DiscoveryEngine {
    /// Build an engine seeded from the given seed source.
    ///
    /// The root memento (own identity plus the seed peers, all not yet
    /// contacted) is pushed into history immediately, so rollback always has
    /// a floor to land on.
    pub fn new(
        own_id: PeerId,
        config: DiscoveryConfig,
        seeds: &dyn SeedSource,
        client: Arc<dyn PeerClient>,
        repository: Arc<dyn PeerRepository>,
    ) -> Self {
        let seed_neighbours: Neighbours = seeds
            .seed_peers()
            .into_iter()
            .filter(|p| *p != own_id)
            .map(Neighbour::fresh)
            .collect();

        info!(
            "Discovery engine seeded with {} peers (fan-out {}, burn-in {})",
            seed_neighbours.len(),
            config.fan_out,
            config.burn_in
        );

        let root = Memento::new(own_id, seed_neighbours);
        let mut history = CareTaker::new();
        history.add(root.clone());

        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        DiscoveryEngine {
            own_id,
            client,
            repository,
            state: Mutex::new(WalkState {
                proposal: StepProposal::from_memento(root, config.fan_out),
                history,
            }),
            run_guard: tokio::sync::Mutex::new(()),
            rng: Mutex::new(rng),
            discovered_in_walk: AtomicUsize::new(0),
            cancelled: AtomicBool::new(false),
            fatal: Mutex::new(None),
            config,
        }
    }

    // =========================================================================
    // STARTUP
    // =========================================================================

    /// Probe every seed neighbour, then run the startup commit attempt.
    ///
    /// The commit is a no-op until probe outcomes arrive; the walk proper
    /// begins once [`run`](Self::run) is driving the loop.
    pub fn bootstrap(&self) -> Result<(), DiscoveryError> {
        let mut state = self.walk_state();

        let pending: Vec<(PeerId, CorrelationId)> = state
            .proposal
            .neighbours()
            .iter()
            .filter(|n| n.state() == NeighbourState::NotContacted)
            .map(|n| (n.peer_id(), n.ping_correlation_id()))
            .collect();

        for (peer, correlation_id) in pending {
            let outcome = match self.send_ping(peer, correlation_id) {
                Ok(()) => NeighbourState::Contacted,
                Err(e) => {
                    warn!("Failed to ping seed {}: {}", peer, e);
                    NeighbourState::UnResponsive
                }
            };
            if let Some(n) = state.proposal.neighbour_by_ping_id_mut(&correlation_id) {
                n.transition_to(outcome);
            }
        }

        self.walk_forward(&mut state)
    }

    // =========================================================================
    // DRIVING LOOP
    // =========================================================================

    /// Run the walk until cancelled or a fatal error.
    ///
    /// Spawns a dispatcher for the inbound event stream and loops: wait for
    /// the current step to settle (bounded), then commit or rewind. A wait
    /// timeout takes the same branch, so a silent network degrades into a
    /// rewind instead of a hang.
    pub async fn run(
        self: Arc<Self>,
        mut events: mpsc::UnboundedReceiver<DiscoveryEvent>,
    ) -> Result<(), DiscoveryError> {
        let dispatcher = {
            let engine = Arc::clone(&self);
            tokio::spawn(async move {
                while let Some(event) = events.recv().await {
                    engine.handle_event(event);
                    if engine.is_cancelled() {
                        break;
                    }
                }
            })
        };

        while !self.is_cancelled() {
            let _iteration = self.run_guard.lock().await;

            if let Err(e) = self.wait_for_valid_candidate().await {
                warn!("Walk step did not settle: {}", e);
            }
            if self.is_cancelled() {
                break;
            }

            if let Err(e) = self.step() {
                error!("Discovery walk cannot continue: {}", e);
                self.record_fatal(e);
                break;
            }
        }

        dispatcher.abort();

        let fatal = self.fatal_lock().take();
        match fatal {
            Some(e) => Err(e),
            None => {
                info!("Discovery run stopped");
                Ok(())
            }
        }
    }

    /// Request cancellation; the loop observes it at the next check.
    pub fn shutdown(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Poll until the current step has settled or the configured bound passes
    async fn wait_for_valid_candidate(&self) -> Result<(), DiscoveryError> {
        let started = Instant::now();
        loop {
            if self.is_cancelled() || self.has_valid_candidate() {
                return Ok(());
            }
            if started.elapsed() >= self.config.candidate_wait_timeout {
                return Err(DiscoveryError::CandidateTimeout {
                    waited: started.elapsed(),
                });
            }
            tokio::time::sleep(self.config.candidate_poll_interval).await;
        }
    }

    /// One commit-or-rewind decision over the current proposal
    pub(crate) fn step(&self) -> Result<(), DiscoveryError> {
        let mut state = self.walk_state();
        if state.proposal.neighbours().responsive().next().is_some() {
            self.walk_forward(&mut state)
        } else {
            self.walk_back(&mut state)
        }
    }

    // =========================================================================
    // WALK TRANSITIONS
    // =========================================================================

    /// Commit the settled step and advance to a random responsive neighbour
    fn walk_forward(&self, state: &mut WalkState) -> Result<(), DiscoveryError> {
        if !state.proposal.has_valid_candidate() {
            return Ok(());
        }

        let responsive: Vec<PeerId> = state
            .proposal
            .neighbours()
            .responsive()
            .map(|n| n.peer_id())
            .collect();
        for peer in &responsive {
            self.store_peer(*peer);
        }

        let memento = state.proposal.create_memento();
        let candidates: Vec<PeerId> = memento.neighbours().responsive().map(|n| n.peer_id()).collect();
        state.history.add(memento);

        // the gate should make this unreachable, but a raced eviction could
        // have settled the last responsive neighbour since step() looked
        let Some(next) = self.pick_random(&candidates) else {
            return self.walk_back(state);
        };

        debug!(
            "Walking forward to {} (history depth {})",
            next,
            state.history.len()
        );

        state
            .proposal
            .restore_memento(Memento::new(next, Neighbours::new()));
        self.send_neighbour_request(next, state.proposal.pnr_correlation_id());
        Ok(())
    }

    /// Rewind through history to a responsive ancestor and re-propose from it.
    ///
    /// Searches the top memento for a responsive neighbour other than the
    /// peer that just failed; pops a level and retries while more than the
    /// root remains. An exhausted history is fatal for the run.
    fn walk_back(&self, state: &mut WalkState) -> Result<(), DiscoveryError> {
        let failed = state.proposal.peer();

        loop {
            let top = state.history.peek()?;
            let candidates: Vec<PeerId> = top
                .neighbours()
                .responsive()
                .map(|n| n.peer_id())
                .filter(|p| *p != failed)
                .collect();

            if let Some(candidate) = self.pick_random(&candidates) {
                debug!(
                    "Walking back from {} to {} (history depth {})",
                    failed,
                    candidate,
                    state.history.len()
                );
                state
                    .proposal
                    .restore_memento(Memento::new(candidate, Neighbours::new()));
                self.send_neighbour_request(candidate, state.proposal.pnr_correlation_id());
                return Ok(());
            }

            if state.history.len() > 1 {
                // discard the dead step and search the next one down
                state.history.get()?;
            } else {
                return Err(DiscoveryError::NoResponsiveAncestor);
            }
        }
    }

    // =========================================================================
    // EVENT HANDLERS
    // =========================================================================

    /// Dispatch one inbound event to its handler
    pub fn handle_event(&self, event: DiscoveryEvent) {
        if self.is_cancelled() {
            return;
        }

        match event {
            DiscoveryEvent::PingResponse {
                sender,
                correlation_id,
            } => self.on_ping_response(sender, correlation_id),
            DiscoveryEvent::PeerNeighborsResponse {
                sender,
                correlation_id,
                peers,
            } => self.on_peer_neighbours_response(sender, correlation_id, peers),
            DiscoveryEvent::Evicted { correlation_id } => self.on_eviction(correlation_id),
        }
    }

    /// A neighbour answered its reachability probe
    fn on_ping_response(&self, sender: PeerId, correlation_id: CorrelationId) {
        let mut state = self.walk_state();

        match state.proposal.neighbour_by_ping_id_mut(&correlation_id) {
            Some(neighbour) => {
                if !neighbour.transition_to(NeighbourState::Responsive) {
                    debug!(
                        "Ping response {} from {} arrived after the neighbour settled",
                        correlation_id, sender
                    );
                }
            }
            None => {
                // stale or foreign; responses for superseded steps end up here
                debug!(
                    "Ignoring ping response {} from unknown correlation ({})",
                    correlation_id, sender
                );
            }
        }
    }

    /// The current candidate answered our neighbour request: probe its peers
    fn on_peer_neighbours_response(
        &self,
        sender: PeerId,
        correlation_id: CorrelationId,
        peers: Vec<PeerId>,
    ) {
        let mut state = self.walk_state();

        if correlation_id != state.proposal.pnr_correlation_id() {
            // the proposal rotated under us (rollback or commit); not an error
            debug!(
                "Ignoring stale neighbour response {} from {}",
                correlation_id, sender
            );
            return;
        }

        if peers.is_empty() {
            debug!("{} returned no neighbours", sender);
            return;
        }

        let fan_out = state.proposal.fan_out();
        let mut probed = Neighbours::new();
        for peer in peers {
            if probed.len() == fan_out {
                break;
            }
            if peer == self.own_id || probed.contains_peer(&peer) {
                continue;
            }

            let mut neighbour = Neighbour::fresh(peer);
            match self.send_ping(peer, neighbour.ping_correlation_id()) {
                Ok(()) => {
                    neighbour.transition_to(NeighbourState::Contacted);
                }
                Err(e) => {
                    // one dead neighbour must not stop the rest being probed
                    warn!("Failed to ping {}: {}", peer, e);
                    neighbour.transition_to(NeighbourState::UnResponsive);
                }
            }
            probed.insert(neighbour);
        }

        debug!("Probing {} neighbours of {}", probed.len(), sender);

        // same peer, new neighbour set; the rotation retires this response's
        // correlation id so a duplicate delivery is ignored
        let peer = state.proposal.peer();
        state.proposal.restore_memento(Memento::new(peer, probed));
    }

    /// The correlation cache reported a request that went unanswered
    fn on_eviction(&self, correlation_id: CorrelationId) {
        let mut state = self.walk_state();

        if correlation_id == state.proposal.pnr_correlation_id() {
            debug!(
                "Neighbour request {} to {} went unanswered",
                correlation_id,
                state.proposal.peer()
            );
            if let Err(e) = self.walk_back(&mut state) {
                error!("Discovery walk cannot continue: {}", e);
                self.record_fatal(e);
            }
            return;
        }

        match state.proposal.neighbour_by_ping_id_mut(&correlation_id) {
            Some(neighbour) => {
                neighbour.transition_to(NeighbourState::UnResponsive);
            }
            None => {
                debug!("Ignoring eviction for unknown correlation {}", correlation_id);
            }
        }
    }

    // =========================================================================
    // OUTBOUND & PERSISTENCE
    // =========================================================================

    fn send_ping(&self, recipient: PeerId, correlation_id: CorrelationId) -> Result<(), SendError> {
        self.client.send(
            recipient,
            DiscoveryMessage::PingRequest(PingRequest { correlation_id }),
        )
    }

    /// Send a neighbour request; a failed send is only logged, the bounded
    /// candidate wait turns the silence into a rewind
    fn send_neighbour_request(&self, recipient: PeerId, correlation_id: CorrelationId) {
        let msg = DiscoveryMessage::PeerNeighborsRequest(PeerNeighborsRequest { correlation_id });
        if let Err(e) = self.client.send(recipient, msg) {
            warn!("Failed to request neighbours from {}: {}", recipient, e);
        }
    }

    /// Persist a responsive peer once the burn-in phase has passed
    fn store_peer(&self, peer: PeerId) {
        let seen = self.discovered_in_walk.fetch_add(1, Ordering::Relaxed);
        if seen < self.config.burn_in {
            debug!("Burn-in: not persisting {}", peer);
            return;
        }

        self.repository.add(DiscoveredPeer::new(peer));
    }

    fn record_fatal(&self, error: DiscoveryError) {
        let mut fatal = self.fatal_lock();
        if fatal.is_none() {
            *fatal = Some(error);
        }
        self.cancelled.store(true, Ordering::SeqCst);
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    pub fn has_valid_candidate(&self) -> bool {
        self.walk_state().proposal.has_valid_candidate()
    }

    pub fn current_peer(&self) -> PeerId {
        self.walk_state().proposal.peer()
    }

    pub fn history_depth(&self) -> usize {
        self.walk_state().history.len()
    }

    pub fn neighbour_states(&self) -> Vec<(PeerId, NeighbourState)> {
        self.walk_state()
            .proposal
            .neighbours()
            .iter()
            .map(|n| (n.peer_id(), n.state()))
            .collect()
    }

    /// Responsive peers seen so far, burn-in phase included
    pub fn discovered_count(&self) -> usize {
        self.discovered_in_walk.load(Ordering::Relaxed)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    // =========================================================================
    // INTERNALS
    // =========================================================================

    fn walk_state(&self) -> MutexGuard<'_, WalkState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn fatal_lock(&self) -> MutexGuard<'_, Option<DiscoveryError>> {
        self.fatal.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn pick_random(&self, candidates: &[PeerId]) -> Option<PeerId> {
        if candidates.is_empty() {
            return None;
        }
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let index = rng.gen_range(0..candidates.len());
        Some(candidates[index])
    }
}
