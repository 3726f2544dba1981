//! Seeded, thread-local PRNG plumbing.
//!
//! The source crate's `global_rand` module wraps a thread-local `SmallRng`
//! behind free functions so operator implementations never have to thread an
//! `Rng` through every call. The engine needs the same property for
//! determinism (see §9 PRNG): a caller who seeds the process-global source
//! and runs single-threaded gets a reproducible fitness trajectory.
use rand::rngs::SmallRng;
use rand::SeedableRng;
use std::cell::RefCell;

thread_local!(static RNG: RefCell<SmallRng> = RefCell::new(SmallRng::from_entropy()));

/// Seed the calling thread's PRNG. Each deme worker thread in the
/// archipelago driver must call this explicitly if reproducibility across
/// runs is required; the engine does not propagate a seed across thread
/// spawns implicitly.
pub fn seed(seed: u64) {
    RNG.with(|rng| *rng.borrow_mut() = SmallRng::seed_from_u64(seed));
}

/// Run `f` with exclusive access to this thread's PRNG.
pub fn with_rng<R>(f: impl FnOnce(&mut SmallRng) -> R) -> R {
    RNG.with(|rng| f(&mut rng.borrow_mut()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn seeding_is_deterministic_within_a_thread() {
        seed(42);
        let a: u32 = with_rng(|r| r.gen());
        seed(42);
        let b: u32 = with_rng(|r| r.gen());
        assert_eq!(a, b);
    }
}
