//! The generational driver (§4.3): sort, adapt, crossover, mutate, score,
//! adapt, sort, elitism, dereference, hook.
use super::{bernoulli, DriverOutcome};
use crate::entity::EntityId;
use crate::error::Outcome;
use crate::operators::Operators;
use crate::population::Population;
use crate::scheme::Elitism;
use itertools::Itertools;
use rand::rngs::SmallRng;
use std::collections::{HashMap, HashSet};

/// Run up to `max_generations` generations on a seeded, scored population.
pub fn run<O: Operators>(
    population: &mut Population<O>,
    ops: &mut O,
    max_generations: u64,
    rng: &mut SmallRng,
) -> DriverOutcome {
    for g in 1..=max_generations {
        run_one_generation(population, ops, rng);
        population.increment_generation();
        let generation = population.generation();
        log::debug!(
            "generation {generation}: head fitness {:?}, size {}",
            population.head().map(|e| e.fitness),
            population.size()
        );
        if !ops.generation_hook(generation, population) {
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

/// One generation's worth of work (§4.3 steps 1-8), without the generation
/// counter increment or hook call — those are the caller's responsibility
/// so the archipelago driver can run them once per deme before a shared
/// migration barrier.
pub(crate) fn run_one_generation<O: Operators>(population: &mut Population<O>, ops: &mut O, rng: &mut SmallRng) {
    population.sort();
    let scheme = population.scheme;
    let rates = population.rates();
    let parent_ids: Vec<EntityId> = population.ranked_ids().to_vec();
    let orig_size = parent_ids.len();
    log::trace!("generation body: sorted, orig_size {orig_size}, scheme {scheme:?}");

    if scheme.adapts_parents() {
        apply_adaptation(population, ops, scheme.is_lamarckian_for_parents(), &parent_ids, rng);
    }

    run_crossover_phase(population, ops, rates.crossover, rng);
    run_mutation_phase(population, ops, rates.mutation, rng);

    let child_ids: Vec<EntityId> = population.ranked_ids()[orig_size..].to_vec();
    log::trace!("generation body: {} children produced", child_ids.len());
    for &id in &child_ids {
        population.evaluate_entity(ops, id);
    }

    if scheme.adapts_children() {
        apply_adaptation(population, ops, scheme.is_lamarckian_for_children(), &child_ids, rng);
    }

    apply_elitism(population, ops, &parent_ids);
    log::trace!("generation body: elitism applied, size now {}", population.size());
}

fn run_crossover_phase<O: Operators>(population: &mut Population<O>, ops: &mut O, crossover_rate: f64, rng: &mut SmallRng) {
    let mut cursor = O::SelectTwoCursor::default();
    loop {
        let meta = population.meta();
        let Some((rank_a, rank_b)) = ops.select_two(&meta, &mut cursor, population, rng) else {
            break;
        };
        if !bernoulli(rng, crossover_rate) {
            continue;
        }
        let (Some(id_a), Some(id_b)) = (population.id_at_rank(rank_a), population.id_at_rank(rank_b)) else {
            log::warn!("crossover phase: select_two returned a stale rank");
            break;
        };
        let (Some(genes_a), Some(genes_b)) = (
            population.entity(id_a).map(|e| e.chromosomes.clone()),
            population.entity(id_b).map(|e| e.chromosomes.clone()),
        ) else {
            break;
        };
        let (child_a, child_b) = ops.crossover(&meta, &genes_a, &genes_b, rng);
        population.insert_entity(child_a);
        population.insert_entity(child_b);
    }
}

fn run_mutation_phase<O: Operators>(population: &mut Population<O>, ops: &mut O, mutation_rate: f64, rng: &mut SmallRng) {
    let mut cursor = O::SelectOneCursor::default();
    loop {
        let meta = population.meta();
        let Some(rank) = ops.select_one(&meta, &mut cursor, population, rng) else {
            break;
        };
        if !bernoulli(rng, mutation_rate) {
            continue;
        }
        let Some(id) = population.id_at_rank(rank) else {
            log::warn!("mutation phase: select_one returned a stale rank");
            break;
        };
        let Some(genes) = population.entity(id).map(|e| e.chromosomes.clone()) else {
            break;
        };
        let child = ops.mutate(&meta, &genes, rng);
        population.insert_entity(child);
    }
}

/// Apply `adapt` to each entity in `ids`: Lamarckian schemes write the
/// adapted chromosomes and fitness back to the entity; Baldwinian schemes
/// keep the original chromosomes and only take the adapted fitness.
fn apply_adaptation<O: Operators>(
    population: &mut Population<O>,
    ops: &mut O,
    lamarckian: bool,
    ids: &[EntityId],
    rng: &mut SmallRng,
) {
    let meta = population.meta();
    for &id in ids {
        let Some(genes) = population.entity(id).map(|e| e.chromosomes.clone()) else {
            continue;
        };
        let Some(adapted) = ops.adapt(&meta, &genes, rng) else {
            continue;
        };
        let adapted_fitness = ops.evaluate(&meta, &adapted);
        if let Some(entity) = population.entity_mut(id) {
            if lamarckian {
                entity.chromosomes = adapted;
            }
            entity.fitness = adapted_fitness;
        }
    }
}

/// Select survivors down to `stable_size` per the population's elitism mode
/// (§4.3 step 7) and dereference the rest.
fn apply_elitism<O: Operators>(population: &mut Population<O>, ops: &mut O, parent_ids: &[EntityId]) {
    let elitism = population.elitism;
    let stable_size = population.stable_size();
    let parent_set: HashSet<EntityId> = parent_ids.iter().copied().collect();

    if elitism == Elitism::RescoreParents {
        for &id in parent_ids {
            population.evaluate_entity(ops, id);
        }
    }

    if elitism == Elitism::PurebredOnly {
        // Lineage tracking beyond parent/child status is out of scope; a
        // "purebred" child would need two same-lineage parents, which this
        // engine does not record, so every child is treated as not purebred.
        let to_remove: Vec<_> = population.ranked_ids().iter().copied().filter(|id| !parent_set.contains(id)).collect();
        for id in to_remove {
            population.dereference(ops, id);
        }
    }

    population.sort();

    let mut survivors: Vec<EntityId> = if elitism == Elitism::ParentsSurvive {
        let fitness: HashMap<EntityId, f64> = population.ranked_ids().iter().map(|&id| (id, population.entity(id).unwrap().fitness)).collect();
        population
            .ranked_ids()
            .iter()
            .copied()
            .sorted_by(|&a, &b| {
                fitness[&b]
                    .total_cmp(&fitness[&a])
                    .then_with(|| parent_set.contains(&b).cmp(&parent_set.contains(&a)))
            })
            .take(stable_size)
            .collect()
    } else {
        population.ranked_ids().iter().take(stable_size).copied().collect()
    };

    if elitism == Elitism::OneParentSurvives {
        if let Some(&best_parent) = parent_ids.first() {
            if !survivors.contains(&best_parent) {
                survivors.pop();
                survivors.push(best_parent);
            }
        }
    }

    let survivor_set: HashSet<EntityId> = survivors.into_iter().collect();
    let to_remove: Vec<_> = population.ranked_ids().iter().copied().filter(|id| !survivor_set.contains(id)).collect();
    for id in to_remove {
        population.dereference(ops, id);
    }

    population.sort();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::IntVectorOperators;
    use crate::scheme::Scheme;
    use rand::SeedableRng;

    /// Scenario B: small integer maximise. Population 20, chromosome length
    /// 10 over [0, 100), Darwin scheme, no elitism, 200 generations.
    #[test]
    fn small_integer_maximise_reaches_a_high_fitness() {
        let _ = env_logger::builder().is_test(true).try_init();

        let mut ops = IntVectorOperators::new(10, 0, 100, |g| g.iter().sum::<i64>() as f64);
        let mut population = Population::new(20, 1, 10);
        population.scheme = Scheme::Darwin;
        population.elitism = Elitism::None;
        population.set_rates(0.5, 1.0, 1.0);
        let mut rng = SmallRng::seed_from_u64(42);

        population.seed(&mut ops, &mut rng).unwrap();
        population.evaluate_unscored(&mut ops);

        let outcome = run(&mut population, &mut ops, 200, &mut rng);
        assert_eq!(outcome.completed, 200);
        assert_eq!(outcome.outcome, Outcome::BudgetExhausted);

        population.sort();
        let best = population.head().unwrap().fitness;
        let max_possible = 10.0 * 99.0;
        approx::assert_relative_eq!(best, max_possible, max_relative = 0.05);
    }
}
