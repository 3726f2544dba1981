//! Per-population tunables and archipelago worker configuration (§4.9, §6).
use crate::scheme::{Elitism, Scheme};
use std::env;

/// Tunables layered over the structural parameters fixed at construction
/// (`Population::new`). Mirrors the source crate's habit of collecting
/// rates/scheme/elitism into one value before handing it to a strategy
/// builder, rather than threading five separate arguments everywhere.
#[derive(Clone, Debug, Default)]
pub struct Config {
    pub crossover_ratio: f64,
    pub mutation_ratio: f64,
    pub migration_ratio: f64,
    pub scheme: Scheme,
    pub elitism: Elitism,
}

impl Config {
    pub fn apply<O: crate::operators::Operators>(&self, population: &mut crate::population::Population<O>) {
        population.set_rates(self.crossover_ratio, self.mutation_ratio, self.migration_ratio);
        population.scheme = self.scheme;
        population.elitism = self.elitism;
    }
}

/// Resolve the archipelago worker thread count: `override_threads` wins if
/// given, otherwise the `NUM_THREADS` environment variable, otherwise `None`
/// (rayon picks its own default). Reading `std::env` straight from library
/// code with no override hook is untestable, so the override always takes
/// priority and tests never depend on the process environment.
pub fn resolve_num_threads(override_threads: Option<usize>) -> Option<usize> {
    override_threads.or_else(|| env::var("NUM_THREADS").ok().and_then(|v| v.parse().ok()))
}

/// Build a `rayon` thread pool sized per `resolve_num_threads`, or `None` to
/// fall back to the global pool when no count was configured.
pub fn build_thread_pool(override_threads: Option<usize>) -> Result<Option<rayon::ThreadPool>, rayon::ThreadPoolBuildError> {
    match resolve_num_threads(override_threads) {
        Some(threads) => rayon::ThreadPoolBuilder::new().num_threads(threads).build().map(Some),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn override_wins_over_environment() {
        env::set_var("NUM_THREADS", "2");
        assert_eq!(resolve_num_threads(Some(4)), Some(4));
        env::remove_var("NUM_THREADS");
    }

    #[test]
    fn environment_is_used_when_no_override_is_given() {
        env::set_var("NUM_THREADS", "3");
        assert_eq!(resolve_num_threads(None), Some(3));
        env::remove_var("NUM_THREADS");
    }

    #[test]
    fn no_override_and_no_environment_resolves_to_none() {
        env::remove_var("NUM_THREADS");
        assert_eq!(resolve_num_threads(None), None);
    }

    #[test]
    fn config_apply_sets_rates_scheme_and_elitism_on_a_population() {
        use crate::builtin::IntVectorOperators;
        use crate::population::Population;

        let config = Config {
            crossover_ratio: 0.6,
            mutation_ratio: 0.1,
            migration_ratio: 0.2,
            scheme: Scheme::LamarckAll,
            elitism: Elitism::ParentsSurvive,
        };
        let mut population: Population<IntVectorOperators> = Population::new(10, 1, 5);
        config.apply(&mut population);
        assert_eq!(population.rates().crossover, 0.6);
        assert_eq!(population.scheme, Scheme::LamarckAll);
        assert_eq!(population.elitism, Elitism::ParentsSurvive);
    }
}
