// Configuration - Tunables for the discovery walk
// Principle: constants give the production defaults; tests shrink them

use std::time::Duration;

// =============================================================================
// DEFAULTS
// =============================================================================

/// How many neighbours are probed per walk step
pub const DEFAULT_FAN_OUT: usize = 5;

/// Responsive peers discarded before discoveries start being persisted.
/// The first contacts of a walk are always the seeds and their immediate
/// surroundings, which skews sampling toward the bootstrap set.
pub const DEFAULT_BURN_IN: usize = 10;

/// How often the loop re-checks whether the current step has settled
pub const DEFAULT_CANDIDATE_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Upper bound on waiting for a step to settle before the walk falls back
pub const DEFAULT_CANDIDATE_WAIT_TIMEOUT: Duration = Duration::from_secs(10);

// =============================================================================
// CONFIG
// =============================================================================

/// Runtime configuration for a [`DiscoveryEngine`](crate::engine::DiscoveryEngine)
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// Neighbours probed per step
    pub fan_out: usize,
    /// Responsive peers skipped before persistence begins
    pub burn_in: usize,
    /// Poll interval while waiting for the step to settle
    pub candidate_poll_interval: Duration,
    /// Give-up bound while waiting for the step to settle
    pub candidate_wait_timeout: Duration,
    /// Fixed RNG seed for the candidate selection, for reproducible runs
    pub rng_seed: Option<u64>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        DiscoveryConfig {
            fan_out: DEFAULT_FAN_OUT,
            burn_in: DEFAULT_BURN_IN,
            candidate_poll_interval: DEFAULT_CANDIDATE_POLL_INTERVAL,
            candidate_wait_timeout: DEFAULT_CANDIDATE_WAIT_TIMEOUT,
            rng_seed: None,
        }
    }
}
