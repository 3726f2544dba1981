//! Allele search (§4.7): a systematic single-locus local search, used both
//! as a caller convenience and as a canonical example of the operator
//! contract in use.
use crate::chromosome::LocusAccess;
use crate::entity::EntityId;
use crate::operators::Operators;
use crate::population::Population;

/// Scan the inclusive-exclusive range `[min, max)` at `locus` of chromosome
/// `chromosome_idx` belonging to entity `start`, evaluating each candidate
/// with every other locus held fixed. Leaves `start` holding whichever
/// variant scored best (including its original value, if nothing beat it)
/// and returns that fitness, or `None` if `start` is not live.
pub fn allele_search<O>(
    population: &mut Population<O>,
    ops: &mut O,
    chromosome_idx: usize,
    locus: usize,
    min: i64,
    max: i64,
    start: EntityId,
) -> Option<f64>
where
    O: Operators,
    O::Chromosome: LocusAccess + Clone,
{
    let meta = population.meta();
    let original = population.entity(start)?.chromosomes.clone();
    let original_fitness = population.entity(start)?.fitness;

    let mut best_chromosomes = original.clone();
    let mut best_fitness = original_fitness;

    for candidate in min..max {
        let mut trial = original.clone();
        trial[chromosome_idx].set_locus(locus, candidate);
        let fitness = ops.evaluate(&meta, &trial);
        if fitness > best_fitness {
            best_fitness = fitness;
            best_chromosomes = trial;
        }
    }

    let entity = population.entity_mut(start)?;
    entity.chromosomes = best_chromosomes;
    entity.fitness = best_fitness;
    Some(best_fitness)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::IntVectorOperators;
    use rand::SeedableRng;

    #[test]
    fn finds_the_best_value_at_one_locus_leaving_others_untouched() {
        let mut ops = IntVectorOperators::new(5, 0, 10, |g| g.iter().sum::<i64>() as f64);
        let mut population = Population::new(1, 1, 5);
        let mut rng = rand::rngs::SmallRng::seed_from_u64(3);
        population.seed(&mut ops, &mut rng).unwrap();
        let id = population.ranked_ids()[0];
        let original_genes = population.entity(id).unwrap().chromosomes[0].clone();
        population.evaluate_unscored(&mut ops);

        let best = allele_search(&mut population, &mut ops, 0, 2, 0, 10, id).unwrap();

        let genes = &population.entity(id).unwrap().chromosomes[0];
        for (i, (&before, &after)) in original_genes.iter().zip(genes.iter()).enumerate() {
            if i != 2 {
                assert_eq!(before, after, "locus {i} should be untouched by a search at locus 2");
            }
        }
        assert_eq!(genes[2], 9, "sum-of-alleles fitness is maximised by the largest allowed value");
        assert_eq!(best, genes.iter().sum::<i64>() as f64);
    }
}
