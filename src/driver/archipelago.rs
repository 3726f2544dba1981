//! The archipelago driver (§4.5): one generation of the generational driver
//! per deme, then a ring-topology migration round, then a shared hook check.
use super::{generational, DriverOutcome};
use crate::error::Outcome;
use crate::operators::Operators;
use crate::population::Population;
use crate::transport;
use rand::rngs::SmallRng;

/// One deme: its population, its operators, and its own PRNG stream.
pub struct Deme<O: Operators> {
    pub population: Population<O>,
    pub ops: O,
    pub rng: SmallRng,
}

/// Run up to `max_generations` generations across all `demes`. When
/// `parallel` is set, each deme's per-generation work runs on a `rayon`
/// scoped task, mirroring how the source crate's `call_for_population`
/// switches between a sequential loop and a `rayon` parallel iterator based
/// on whether a thread pool is supplied; the migration round is always a
/// barrier, run after every worker has returned.
/// Like [`run`], but installs a `rayon` thread pool sized per
/// [`crate::config::resolve_num_threads`] (an explicit override, falling
/// back to the `NUM_THREADS` environment variable) for the duration of the
/// run. Only meaningful when `parallel` is set; with no pool configured it
/// falls back to `rayon`'s global pool, i.e. behaves exactly like `run`.
pub fn run_with_config<O: Operators>(
    demes: &mut [Deme<O>],
    max_generations: u64,
    parallel: bool,
    num_threads_override: Option<usize>,
) -> Result<DriverOutcome, rayon::ThreadPoolBuildError> {
    match crate::config::build_thread_pool(num_threads_override)? {
        Some(pool) => Ok(pool.install(|| run(demes, max_generations, parallel))),
        None => Ok(run(demes, max_generations, parallel)),
    }
}

pub fn run<O: Operators>(demes: &mut [Deme<O>], max_generations: u64, parallel: bool) -> DriverOutcome {
    for g in 1..=max_generations {
        if parallel {
            rayon::scope(|scope| {
                for deme in demes.iter_mut() {
                    scope.spawn(move |_| {
                        generational::run_one_generation(&mut deme.population, &mut deme.ops, &mut deme.rng);
                    });
                }
            });
        } else {
            for deme in demes.iter_mut() {
                generational::run_one_generation(&mut deme.population, &mut deme.ops, &mut deme.rng);
            }
        }
        for deme in demes.iter_mut() {
            deme.population.increment_generation();
        }

        migrate_ring(demes);

        let mut stop = false;
        for deme in demes.iter_mut() {
            let generation = deme.population.generation();
            log::debug!(
                "archipelago generation {generation} island {}: head fitness {:?}, size {}",
                deme.population.island,
                deme.population.head().map(|e| e.fitness),
                deme.population.size()
            );
            if !deme.ops.generation_hook(generation, &deme.population) {
                stop = true;
            }
        }
        if stop {
            return DriverOutcome {
                completed: g,
                outcome: Outcome::HookStopped,
            };
        }
    }
    DriverOutcome {
        completed: max_generations,
        outcome: Outcome::BudgetExhausted,
    }
}

/// Directed ring: deme `d` sends to deme `(d+1) mod n`. Migration moves
/// bytes (via `chromosome_to_bytes`/`chromosome_from_bytes`), not pointers,
/// even though every deme lives in this one process.
fn migrate_ring<O: Operators>(demes: &mut [Deme<O>]) {
    let n = demes.len();
    if n < 2 {
        return;
    }

    let batches: Vec<Vec<(f64, Vec<O::Chromosome>)>> = demes
        .iter_mut()
        .map(|deme| {
            deme.population.sort();
            let stable_size = deme.population.stable_size();
            let rate = deme.population.rates().migration;
            let count = (rate * stable_size as f64).round() as usize;
            let emigrants: Vec<_> = deme
                .population
                .ranked_ids()
                .iter()
                .take(count)
                .filter_map(|&id| deme.population.entity(id).map(|e| (e.fitness, e.chromosomes.clone())))
                .collect();
            log::debug!("migration: island {} sends {} emigrants", deme.population.island, emigrants.len());
            emigrants
        })
        .collect();

    for d in 0..n {
        let recipient = (d + 1) % n;
        let (sender, receiver) = index_two_mut(demes, d, recipient);
        let meta = receiver.population.meta();
        let messages = transport::encode_emigrants(&sender.ops, &meta, &batches[d]);
        let decoded = match transport::decode_immigrants(&receiver.ops, &meta, &messages) {
            Ok(decoded) => decoded,
            Err(err) => {
                log::error!("migration from island {} to island {}: {err}", sender.population.island, receiver.population.island);
                continue;
            }
        };
        if decoded.is_empty() {
            continue;
        }
        let target_size = receiver.population.size() + decoded.len();
        if target_size > receiver.population.max_size() {
            log::warn!("migration: island {} growing to receive {} immigrants", receiver.population.island, decoded.len());
        }
        receiver.population.ensure_capacity(target_size);
        for (fitness, chromosomes) in decoded {
            let id = receiver.population.insert_entity(chromosomes);
            if let Some(entity) = receiver.population.entity_mut(id) {
                entity.fitness = fitness;
            }
        }
    }

    for deme in demes.iter_mut() {
        deme.population.sort();
        let stable_size = deme.population.stable_size();
        deme.population.genocide(&mut deme.ops, stable_size);
    }
}

fn index_two_mut<T>(slice: &mut [T], i: usize, j: usize) -> (&mut T, &mut T) {
    assert_ne!(i, j, "index_two_mut requires distinct indices");
    if i < j {
        let (left, right) = slice.split_at_mut(j);
        (&mut left[i], &mut right[0])
    } else {
        let (left, right) = slice.split_at_mut(i);
        (&mut right[0], &mut left[j])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::IntVectorOperators;
    use crate::scheme::{Elitism, Scheme};
    use rand::SeedableRng;

    fn deme(island: i32, seed: u64) -> Deme<IntVectorOperators> {
        let ops = IntVectorOperators::new(6, 0, 20, |g| g.iter().sum::<i64>() as f64);
        let mut population = Population::new(10, 1, 6);
        population.island = island;
        population.scheme = Scheme::Darwin;
        population.elitism = Elitism::None;
        population.set_rates(0.8, 0.2, 0.5);
        Deme { population, ops, rng: SmallRng::seed_from_u64(seed) }
    }

    #[test]
    fn migration_preserves_total_population_modulo_culling() {
        let mut demes = vec![deme(0, 1), deme(1, 2), deme(2, 3), deme(3, 4)];
        for d in demes.iter_mut() {
            let mut rng = d.rng.clone();
            d.population.seed(&mut d.ops, &mut rng).unwrap();
            d.population.evaluate_unscored(&mut d.ops);
            d.rng = rng;
        }
        let total_before: usize = demes.iter().map(|d| d.population.size()).sum();
        migrate_ring(&mut demes);
        let total_after: usize = demes.iter().map(|d| d.population.size()).sum();
        assert_eq!(total_before, total_after);
        for d in &demes {
            assert_eq!(d.population.size(), d.population.stable_size());
        }
    }

    #[test]
    fn run_with_config_honours_a_thread_count_override() {
        let mut demes = vec![deme(0, 1), deme(1, 2)];
        for d in demes.iter_mut() {
            let mut rng = d.rng.clone();
            d.population.seed(&mut d.ops, &mut rng).unwrap();
            d.population.evaluate_unscored(&mut d.ops);
            d.rng = rng;
        }
        let outcome = run_with_config(&mut demes, 3, true, Some(2)).unwrap();
        assert_eq!(outcome.completed, 3);
    }

    #[test]
    fn single_deme_migration_is_a_noop() {
        let mut demes = vec![deme(0, 1)];
        let mut ops = demes[0].ops.clone();
        let mut rng = demes[0].rng.clone();
        demes[0].population.seed(&mut ops, &mut rng).unwrap();
        let before = demes[0].population.size();
        migrate_ring(&mut demes);
        assert_eq!(demes[0].population.size(), before);
    }
}
