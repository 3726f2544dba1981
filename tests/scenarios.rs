//! Black-box scenario coverage (see SPEC_FULL.md §8) exercised from outside
//! `src/`, the way the source crate's `tests/centralized/strategy/evolve_test.rs`
//! and friends exercise a whole strategy run rather than one function.
use gaul_engine::builtin::{IntVectorOperators, PairCursor, RankCursor};
use gaul_engine::driver::archipelago::{self, Deme};
use gaul_engine::driver::generational;
use gaul_engine::error::{GaulError, Outcome};
use gaul_engine::operators::{Operators, PopulationMeta};
use gaul_engine::population::Population;
use gaul_engine::scheme::{Elitism, Scheme};
use gaul_engine::snapshot;
use rand::rngs::SmallRng;
use rand::SeedableRng;

fn sum_of_alleles(genes: &[i64]) -> f64 {
    genes.iter().sum::<i64>() as f64
}

/// Scenario D: build with built-in integer operators, evolve 5 generations,
/// snapshot, read into a fresh handle, compare structural fields and every
/// rank's fitness/chromosome bytes.
#[test]
fn snapshot_round_trips_after_evolving_five_generations() {
    let mut ops = IntVectorOperators::new(8, 0, 40, sum_of_alleles);
    let mut population = Population::new(15, 1, 8);
    population.scheme = Scheme::Darwin;
    population.elitism = Elitism::None;
    population.set_rates(0.7, 0.3, 1.0);
    let mut rng = SmallRng::seed_from_u64(9);

    population.seed(&mut ops, &mut rng).unwrap();
    population.evaluate_unscored(&mut ops);
    let outcome = generational::run(&mut population, &mut ops, 5, &mut rng);
    assert_eq!(outcome.completed, 5);

    let bytes = snapshot::write_population(&ops, &population);
    let restored = snapshot::read_population(&ops, &bytes).unwrap();

    assert_eq!(restored.size(), population.size());
    assert_eq!(restored.stable_size(), population.stable_size());
    assert_eq!(restored.num_chromosomes(), population.num_chromosomes());
    assert_eq!(restored.len_chromosomes(), population.len_chromosomes());
    assert_eq!(restored.scheme, population.scheme);
    assert_eq!(restored.elitism, population.elitism);
    assert_eq!(restored.island, population.island);

    let meta = population.meta();
    for (&original_id, &restored_id) in population.ranked_ids().iter().zip(restored.ranked_ids()) {
        let original = population.entity(original_id).unwrap();
        let copy = restored.entity(restored_id).unwrap();
        assert_eq!(original.fitness, copy.fitness);

        let mut original_bytes = Vec::new();
        ops.chromosome_to_bytes(&meta, 0, &original.chromosomes[0], &mut original_bytes);
        let mut copy_bytes = Vec::new();
        ops.chromosome_to_bytes(&meta, 0, &copy.chromosomes[0], &mut copy_bytes);
        assert_eq!(original_bytes, copy_bytes);
    }
}

/// Scenario E: ring topology, 4 demes, 100 generations; total entity count
/// stable at `4 * stable_size` after each migration round.
#[test]
fn archipelago_keeps_total_population_stable_across_generations() {
    let stable_size = 12;
    let mut demes: Vec<Deme<IntVectorOperators>> = (0..4)
        .map(|island| {
            let mut ops = IntVectorOperators::new(6, 0, 30, sum_of_alleles);
            let mut population = Population::new(stable_size, 1, 6);
            population.island = island;
            population.scheme = Scheme::Darwin;
            population.elitism = Elitism::None;
            population.set_rates(0.8, 0.3, 0.1);
            let mut rng = SmallRng::seed_from_u64(100 + island as u64);
            population.seed(&mut ops, &mut rng).unwrap();
            population.evaluate_unscored(&mut ops);
            Deme { population, ops, rng }
        })
        .collect();

    let outcome = archipelago::run(&mut demes, 100, false);
    assert_eq!(outcome.completed, 100);
    assert_eq!(outcome.outcome, Outcome::BudgetExhausted);

    let total: usize = demes.iter().map(|d| d.population.size()).sum();
    assert_eq!(total, 4 * stable_size);
    for deme in &demes {
        assert_eq!(deme.population.size(), deme.population.stable_size());
    }
}

/// Scenario F: a hook that returns `false` at generation 10 stops the driver
/// with exactly 10 completed generations and a `HookStopped` outcome.
#[test]
fn generation_hook_stops_the_driver_at_the_requested_generation() {
    let mut ops = StopAtGeneration { inner: IntVectorOperators::new(6, 0, 20, sum_of_alleles), stop_at: 10 };
    let mut population = Population::new(10, 1, 6);
    population.scheme = Scheme::Darwin;
    population.elitism = Elitism::None;
    let mut rng = SmallRng::seed_from_u64(5);
    population.seed(&mut ops, &mut rng).unwrap();
    population.evaluate_unscored(&mut ops);

    let outcome = generational::run(&mut population, &mut ops, 200, &mut rng);
    assert_eq!(outcome.completed, 10);
    assert_eq!(outcome.outcome, Outcome::HookStopped);
}

/// Wraps [`IntVectorOperators`] to add a `generation_hook` that halts the
/// driver at a fixed generation, since the builtin operator sets have no
/// configurable hook of their own.
#[derive(Clone, Debug)]
struct StopAtGeneration {
    inner: IntVectorOperators,
    stop_at: u64,
}

impl Operators for StopAtGeneration {
    type Chromosome = Vec<i64>;
    type Phenome = ();
    type SelectOneCursor = RankCursor;
    type SelectTwoCursor = PairCursor;

    fn chromosome_constructor(&mut self, meta: &PopulationMeta, index: usize, rng: &mut SmallRng) -> Self::Chromosome {
        self.inner.chromosome_constructor(meta, index, rng)
    }

    fn chromosome_to_bytes(&self, meta: &PopulationMeta, index: usize, chromosome: &Self::Chromosome, buf: &mut Vec<u8>) {
        self.inner.chromosome_to_bytes(meta, index, chromosome, buf)
    }

    fn chromosome_from_bytes(&self, meta: &PopulationMeta, index: usize, buf: &[u8]) -> Result<Self::Chromosome, GaulError> {
        self.inner.chromosome_from_bytes(meta, index, buf)
    }

    fn evaluate(&mut self, meta: &PopulationMeta, chromosomes: &[Self::Chromosome]) -> f64 {
        self.inner.evaluate(meta, chromosomes)
    }

    fn seed(&mut self, meta: &PopulationMeta, rng: &mut SmallRng) -> Option<Vec<Self::Chromosome>> {
        self.inner.seed(meta, rng)
    }

    // Population<Self> differs from Population<IntVectorOperators>, so the
    // selection cursors are reimplemented against `Self` directly rather
    // than delegated; the logic is the same frozen-limit rank/pair walk
    // IntVectorOperators uses.
    fn select_two(
        &mut self,
        _meta: &PopulationMeta,
        cursor: &mut Self::SelectTwoCursor,
        population: &Population<Self>,
        _rng: &mut SmallRng,
    ) -> Option<(usize, usize)> {
        let limit = *cursor_limit_two(cursor, population.size());
        let i = cursor.next_pair() * 2;
        if i + 1 >= limit {
            return None;
        }
        cursor.advance_pair();
        Some((i, i + 1))
    }

    fn select_one(
        &mut self,
        _meta: &PopulationMeta,
        cursor: &mut Self::SelectOneCursor,
        population: &Population<Self>,
        _rng: &mut SmallRng,
    ) -> Option<usize> {
        let limit = *cursor_limit_one(cursor, population.size());
        if cursor.next_rank() >= limit {
            return None;
        }
        let rank = cursor.next_rank();
        cursor.advance_rank();
        Some(rank)
    }

    fn mutate(&mut self, meta: &PopulationMeta, source: &[Self::Chromosome], rng: &mut SmallRng) -> Vec<Self::Chromosome> {
        self.inner.mutate(meta, source, rng)
    }

    fn crossover(
        &mut self,
        meta: &PopulationMeta,
        a: &[Self::Chromosome],
        b: &[Self::Chromosome],
        rng: &mut SmallRng,
    ) -> (Vec<Self::Chromosome>, Vec<Self::Chromosome>) {
        self.inner.crossover(meta, a, b, rng)
    }

    fn generation_hook(&mut self, generation: u64, _population: &Population<Self>) -> bool {
        generation < self.stop_at
    }
}

fn cursor_limit_two(cursor: &mut PairCursor, size: usize) -> &usize {
    cursor.limit_or_insert(size)
}
fn cursor_limit_one(cursor: &mut RankCursor, size: usize) -> &usize {
    cursor.limit_or_insert(size)
}
