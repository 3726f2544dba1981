//! The steady-state driver (§4.4): one parent/child turnover per iteration,
//! no generation-wide sort.
use super::{bernoulli, DriverOutcome};
use crate::entity::Entity;
use crate::error::Outcome;
use crate::operators::Operators;
use crate::population::Population;
use rand::rngs::SmallRng;

/// Replace the entity currently at rank `size - 1` iff `child`'s fitness
/// strictly exceeds it. Used when an [`Operators`] impl does not override
/// [`Operators::replace`]. This is a positional lookup, not a scan for the
/// minimum-fitness entity: §4.4 explicitly requires no generation-level sort
/// in the steady-state driver, so the last rank is not guaranteed to hold
/// the worst-fitness entity once the population has drifted out of sorted
/// order — callers who want "replace the true worst" must supply their own
/// `replace` override.
pub fn default_replace<O: Operators>(ops: &mut O, population: &mut Population<O>, child: Entity<O>) {
    let last_rank = population.size().saturating_sub(1);
    let target = population.id_at_rank(last_rank).and_then(|id| population.entity(id).map(|e| (id, e.fitness)));

    let should_replace = match target {
        Some((_, target_fitness)) => child.fitness > target_fitness,
        None => true,
    };

    if should_replace {
        if let Some((target_id, _)) = target {
            log::trace!("steady-state replace: dereferencing rank {last_rank} entity {target_id}");
            population.dereference(ops, target_id);
        }
        let id = population.insert_entity(child.chromosomes);
        if let Some(entity) = population.entity_mut(id) {
            entity.fitness = child.fitness;
        }
    } else {
        let meta = population.meta();
        for (i, chromosome) in child.chromosomes.into_iter().enumerate() {
            ops.chromosome_destructor(&meta, i, chromosome);
        }
        for phenome in child.phenome.into_iter().flatten() {
            ops.data_destructor(phenome);
        }
    }
}

/// Run up to `max_iterations` steady-state turnovers on a seeded, scored
/// population. See §4.4: select parent(s), cross/clone, mutate, score,
/// replace, hook.
pub fn run<O: Operators>(
    population: &mut Population<O>,
    ops: &mut O,
    max_iterations: u64,
    rng: &mut SmallRng,
) -> DriverOutcome {
    let rates = population.rates();

    for i in 1..=max_iterations {
        let meta = population.meta();
        let mut select_two_cursor = O::SelectTwoCursor::default();

        let (child_a, child_b) = match ops.select_two(&meta, &mut select_two_cursor, population, rng) {
            Some((rank_a, rank_b)) => {
                let id_a = population.id_at_rank(rank_a);
                let id_b = population.id_at_rank(rank_b);
                let (Some(id_a), Some(id_b)) = (id_a, id_b) else {
                    log::warn!("steady-state: select_two returned stale ranks");
                    continue;
                };
                let genes_a = population.entity(id_a).map(|e| e.chromosomes.clone());
                let genes_b = population.entity(id_b).map(|e| e.chromosomes.clone());
                let (Some(genes_a), Some(genes_b)) = (genes_a, genes_b) else {
                    continue;
                };
                if bernoulli(rng, rates.crossover) {
                    ops.crossover(&meta, &genes_a, &genes_b, rng)
                } else {
                    (genes_a, genes_b)
                }
            }
            None => {
                log::warn!("steady-state iteration {i}: select_two exhausted with no pair");
                continue;
            }
        };

        for genes in [child_a, child_b] {
            let genes = if bernoulli(rng, rates.mutation) {
                ops.mutate(&meta, &genes, rng)
            } else {
                genes
            };
            let fitness = ops.evaluate(&meta, &genes);
            let mut child = Entity::new(0, genes);
            child.fitness = fitness;
            ops.replace(population, child);
        }

        log::debug!(
            "steady-state iteration {i}: size {}, head fitness {:?}",
            population.size(),
            population.head().map(|e| e.fitness)
        );

        // The hook contract names a single entity per call; with two children
        // turned over per iteration we report the current head as the most
        // useful stable proxy rather than picking one child arbitrarily.
        if !ops.iteration_hook(i, population.head().expect("population non-empty after replace")) {
            return DriverOutcome {
                completed: i,
                outcome: Outcome::HookStopped,
            };
        }
    }

    DriverOutcome {
        completed: max_iterations,
        outcome: Outcome::BudgetExhausted,
    }
}
