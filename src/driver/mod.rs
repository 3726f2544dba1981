//! Evolution drivers: the loops that advance a population (or an
//! archipelago of populations) across generations or iterations.
pub mod archipelago;
pub mod generational;
pub mod steady_state;

use crate::error::Outcome;

/// Result of a bounded driver run: how far it got, and why it stopped.
#[derive(Debug, Clone, Copy)]
pub struct DriverOutcome {
    /// Generations (or iterations, for the steady-state driver) completed.
    pub completed: u64,
    pub outcome: Outcome,
}

pub(crate) fn bernoulli(rng: &mut rand::rngs::SmallRng, p: f64) -> bool {
    use rand::Rng;
    p >= 1.0 || (p > 0.0 && rng.gen_bool(p))
}
