//! The population: a container of entities plus the configuration vector
//! that parametrises the driver loops over it.
//!
//! Holds two parallel indices over the entity pool (see the data model):
//! an **id index**, a slot array of `max_size` entries addressed by stable
//! entity id, and a **rank index**, a dense permutation of the live ids in
//! fitness order once [`Population::sort`] has been called. Rank is only
//! meaningful between mutations of this index; between sorts it just
//! reflects allocation/dereference order.
//!
//! A population owns no [`Operators`] instance of its own: every method
//! that needs to call an operator takes one as an explicit `&mut O`
//! parameter, the way the source crate passes `Fitness`/`Select`/`Mutate`/
//! `Crossover` into `Strategy::call` rather than storing them on the
//! population. Embedding the operators in the struct would make
//! `generation_hook(gen, &population)` a self-borrow the borrow checker
//! cannot express without unsafe code.
use crate::entity::{Entity, EntityId, MIN_FITNESS};
use crate::error::GaulError;
use crate::operators::{Operators, PopulationMeta};
use crate::scheme::{Elitism, Scheme};
use rand::rngs::SmallRng;

/// Crossover/mutation/migration rates, each clamped to `[0, 1]` on write.
#[derive(Debug, Clone, Copy)]
pub struct Rates {
    pub crossover: f64,
    pub mutation: f64,
    pub migration: f64,
}

impl Default for Rates {
    fn default() -> Self {
        Self {
            crossover: 1.0,
            mutation: 1.0,
            migration: 1.0,
        }
    }
}

fn clamp01(v: f64) -> f64 {
    v.clamp(0.0, 1.0)
}

pub struct Population<O: Operators> {
    num_chromosomes: usize,
    len_chromosomes: usize,

    stable_size: usize,
    max_size: usize,
    size: usize,

    id_index: Vec<Option<Entity<O>>>,
    rank_index: Vec<EntityId>,
    free_cursor: usize,

    rates: Rates,
    pub scheme: Scheme,
    pub elitism: Elitism,
    generation: u64,
    pub island: i32,
}

impl<O: Operators> Population<O> {
    /// Structural parameters are fixed for the population's lifetime;
    /// `max_size` starts at `4 * stable_size` and grows geometrically.
    pub fn new(stable_size: usize, num_chromosomes: usize, len_chromosomes: usize) -> Self {
        let max_size = (stable_size * 4).max(1);
        Self {
            num_chromosomes,
            len_chromosomes,
            stable_size,
            max_size,
            size: 0,
            id_index: (0..max_size).map(|_| None).collect(),
            rank_index: Vec::with_capacity(stable_size),
            free_cursor: 0,
            rates: Rates::default(),
            scheme: Scheme::default(),
            elitism: Elitism::default(),
            generation: 0,
            island: -1,
        }
    }

    pub fn meta(&self) -> PopulationMeta {
        PopulationMeta {
            num_chromosomes: self.num_chromosomes,
            len_chromosomes: self.len_chromosomes,
            generation: self.generation,
            island: self.island,
        }
    }

    pub fn num_chromosomes(&self) -> usize {
        self.num_chromosomes
    }
    pub fn len_chromosomes(&self) -> usize {
        self.len_chromosomes
    }
    pub fn stable_size(&self) -> usize {
        self.stable_size
    }
    pub fn max_size(&self) -> usize {
        self.max_size
    }
    pub fn size(&self) -> usize {
        self.size
    }
    pub fn generation(&self) -> u64 {
        self.generation
    }
    pub fn rates(&self) -> Rates {
        self.rates
    }
    pub fn set_rates(&mut self, crossover: f64, mutation: f64, migration: f64) {
        self.rates = Rates {
            crossover: clamp01(crossover),
            mutation: clamp01(mutation),
            migration: clamp01(migration),
        };
    }

    pub fn increment_generation(&mut self) {
        self.generation += 1;
    }

    /// Rank of `id` in the current rank index, or `None` if `id` is not
    /// currently live in the rank index (invariant 5: `rank(e) = -1` iff `e`
    /// is not in the rank index).
    pub fn rank_of(&self, id: EntityId) -> Option<usize> {
        self.rank_index.iter().position(|&rid| rid == id)
    }

    pub fn id_at_rank(&self, rank: usize) -> Option<EntityId> {
        self.rank_index.get(rank).copied()
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity<O>> {
        self.id_index.get(id as usize).and_then(|slot| slot.as_ref())
    }
    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity<O>> {
        self.id_index.get_mut(id as usize).and_then(|slot| slot.as_mut())
    }

    pub fn entity_at_rank(&self, rank: usize) -> Option<&Entity<O>> {
        self.id_at_rank(rank).and_then(|id| self.entity(id))
    }

    /// Rank-0 entity, only meaningful after [`Population::sort`].
    pub fn head(&self) -> Option<&Entity<O>> {
        self.entity_at_rank(0)
    }

    /// All live ids in rank order (empty before the first sort beyond
    /// allocation order).
    pub fn ranked_ids(&self) -> &[EntityId] {
        &self.rank_index
    }

    fn grow(&mut self) {
        let new_max = ((self.max_size as f64 * 1.5).ceil() as usize).max(self.max_size + 1);
        self.id_index.resize_with(new_max, || None);
        self.max_size = new_max;
    }

    /// Grow capacity to at least `target`, used when an archipelago neighbour
    /// overflows `max_size` on immigration.
    pub fn ensure_capacity(&mut self, target: usize) {
        while self.max_size < target {
            self.grow();
        }
    }

    /// Reserve a slot without populating it, returning the fresh id.
    /// Amortised O(1): the free cursor remembers the last freed slot, and
    /// only falls back to a full backward scan when that slot has been
    /// reused.
    fn alloc_slot(&mut self) -> EntityId {
        if self.size == self.max_size {
            self.grow();
        }
        let mut idx = self.free_cursor % self.max_size;
        while self.id_index[idx].is_some() {
            idx = (idx + self.max_size - 1) % self.max_size;
        }
        let id = idx as EntityId;
        self.id_index[idx] = Some(Entity::new(id, Vec::new()));
        self.rank_index.push(id);
        self.size += 1;
        self.free_cursor = if idx == 0 { self.max_size - 1 } else { idx - 1 };
        id
    }

    /// Allocate a fresh entity, calling `chromosome_constructor` for each
    /// chromosome slot.
    pub fn get_free_entity(&mut self, ops: &mut O, rng: &mut SmallRng) -> EntityId {
        let meta = self.meta();
        let num_chromosomes = self.num_chromosomes;
        let id = self.alloc_slot();
        let chromosomes: Vec<_> = (0..num_chromosomes).map(|i| ops.chromosome_constructor(&meta, i, rng)).collect();
        if let Some(entity) = self.entity_mut(id) {
            entity.chromosomes = chromosomes;
        }
        id
    }

    /// Insert a fully-formed chromosome set (e.g. a crossover/mutation
    /// child) without calling `chromosome_constructor`, returning the fresh
    /// id. Callers still need to score it.
    pub fn insert_entity(&mut self, chromosomes: Vec<O::Chromosome>) -> EntityId {
        let id = self.alloc_slot();
        if let Some(entity) = self.entity_mut(id) {
            entity.chromosomes = chromosomes;
            debug_assert!(entity.check_phenome_invariant(), "phenome length must be 0 or num_chromosomes");
        }
        id
    }

    /// Destroy phenome and chromosomes, compact the rank index, and return
    /// the id slot to the pool. A no-op if `id` is not currently live.
    pub fn dereference(&mut self, ops: &mut O, id: EntityId) {
        let idx = id as usize;
        if idx >= self.max_size {
            return;
        }
        let Some(entity) = self.id_index[idx].take() else {
            return;
        };
        debug_assert!(entity.check_phenome_invariant(), "phenome length must be 0 or num_chromosomes");
        for phenome in entity.phenome.into_iter().flatten() {
            ops.data_destructor(phenome);
        }
        let meta = self.meta();
        for (i, chromosome) in entity.chromosomes.into_iter().enumerate() {
            ops.chromosome_destructor(&meta, i, chromosome);
        }
        if let Some(rank) = self.rank_index.iter().position(|&rid| rid == id) {
            self.rank_index.remove(rank);
        }
        self.size -= 1;
        self.free_cursor = idx;
    }

    /// Dereference entities at rank `size - 1` repeatedly until
    /// `size <= target`. Assumes the population is sorted if the intent is
    /// "kill the worst".
    pub fn genocide(&mut self, ops: &mut O, target: usize) {
        while self.size > target {
            match self.rank_index.last().copied() {
                Some(worst) => self.dereference(ops, worst),
                None => break,
            }
        }
    }

    /// Sort the rank index by fitness, descending; afterwards rank 0 is the
    /// fittest live entity.
    pub fn sort(&mut self) {
        let id_index = &self.id_index;
        self.rank_index.sort_by(|&a, &b| {
            let fa = id_index[a as usize].as_ref().map_or(MIN_FITNESS, |e| e.fitness);
            let fb = id_index[b as usize].as_ref().map_or(MIN_FITNESS, |e| e.fitness);
            fb.total_cmp(&fa)
        });
    }

    /// Fill the population with `stable_size` freshly seeded entities.
    /// Returns an operator-reported failure if `seed` ever returns `None`.
    pub fn seed(&mut self, ops: &mut O, rng: &mut SmallRng) -> Result<(), GaulError> {
        while self.size < self.stable_size {
            let id = self.alloc_slot();
            let meta = self.meta();
            match ops.seed(&meta, rng) {
                Some(chromosomes) => {
                    if let Some(entity) = self.entity_mut(id) {
                        entity.chromosomes = chromosomes;
                    }
                }
                None => {
                    self.dereference(ops, id);
                    return Err(GaulError::OperatorFailure("seed operator returned false"));
                }
            }
        }
        Ok(())
    }

    /// Evaluate every entity whose fitness is still the sentinel
    /// [`MIN_FITNESS`].
    pub fn evaluate_unscored(&mut self, ops: &mut O) {
        let meta = self.meta();
        for id in 0..self.max_size as EntityId {
            if let Some(entity) = self.id_index[id as usize].as_mut() {
                if !entity.is_scored() {
                    entity.fitness = ops.evaluate(&meta, &entity.chromosomes);
                }
            }
        }
    }

    pub fn evaluate_entity(&mut self, ops: &mut O, id: EntityId) {
        let meta = self.meta();
        if let Some(entity) = self.entity_mut(id) {
            entity.fitness = ops.evaluate(&meta, &entity.chromosomes);
        }
    }

    /// Copies configuration but no entities.
    pub fn clone_empty(&self) -> Self {
        let mut out = Self::new(self.stable_size, self.num_chromosomes, self.len_chromosomes);
        out.rates = self.rates;
        out.scheme = self.scheme;
        out.elitism = self.elitism;
        out.island = self.island;
        out
    }

    /// `clone_empty` followed by an entity-by-entity copy preserving rank
    /// order via `chromosome_replicate`; entity ids are **not** preserved
    /// across the clone.
    pub fn deep_clone(&self, ops: &mut O) -> Self {
        let mut out = self.clone_empty();
        out.generation = self.generation;
        let meta = self.meta();
        for &id in &self.rank_index {
            let Some(source) = self.entity(id) else { continue };
            let chromosomes: Vec<_> = source
                .chromosomes
                .iter()
                .enumerate()
                .map(|(i, c)| ops.chromosome_replicate(&meta, i, c))
                .collect();
            let new_id = out.insert_entity(chromosomes);
            if let Some(entity) = out.entity_mut(new_id) {
                entity.fitness = source.fitness;
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::IntVectorOperators;
    use rand::SeedableRng;

    fn rng() -> SmallRng {
        SmallRng::seed_from_u64(7)
    }

    fn small_pop() -> (Population<IntVectorOperators>, IntVectorOperators) {
        let mut ops = IntVectorOperators::new(5, 0, 100, |genes| genes.iter().sum::<i64>() as f64);
        let mut pop = Population::new(8, 1, 5);
        pop.seed(&mut ops, &mut rng()).unwrap();
        (pop, ops)
    }

    #[test]
    fn size_matches_live_id_slots() {
        let (pop, _ops) = small_pop();
        let live = (0..pop.max_size() as EntityId).filter(|&id| pop.entity(id).is_some()).count();
        assert_eq!(pop.size(), live);
        assert_eq!(pop.size(), pop.stable_size());
    }

    #[test]
    fn rank_index_is_gapless_permutation_of_live_entities() {
        let (pop, _ops) = small_pop();
        assert_eq!(pop.ranked_ids().len(), pop.size());
        let mut ids: Vec<_> = pop.ranked_ids().to_vec();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), pop.size());
    }

    #[test]
    fn sort_is_descending_by_fitness() {
        let (mut pop, mut ops) = small_pop();
        pop.evaluate_unscored(&mut ops);
        pop.sort();
        let fitnesses: Vec<f64> = pop.ranked_ids().iter().map(|&id| pop.entity(id).unwrap().fitness).collect();
        for w in fitnesses.windows(2) {
            assert!(w[0] >= w[1]);
        }
    }

    #[test]
    fn dereference_removes_from_both_indices() {
        let (mut pop, mut ops) = small_pop();
        let id = pop.ranked_ids()[0];
        pop.dereference(&mut ops, id);
        assert!(pop.entity(id).is_none());
        assert_eq!(pop.rank_of(id), None);
        assert_eq!(pop.size(), 7);
    }

    #[test]
    fn genocide_keeps_best_when_sorted() {
        let (mut pop, mut ops) = small_pop();
        pop.evaluate_unscored(&mut ops);
        pop.sort();
        let best = pop.head().unwrap().fitness;
        pop.genocide(&mut ops, 1);
        assert_eq!(pop.size(), 1);
        assert_eq!(pop.head().unwrap().fitness, best);
    }

    #[test]
    fn get_free_entity_reuses_a_dereferenced_slot() {
        let (mut pop, mut ops) = small_pop();
        let max_before = pop.max_size();
        let id = pop.ranked_ids()[0];
        pop.dereference(&mut ops, id);
        let new_id = pop.get_free_entity(&mut ops, &mut rng());
        assert_eq!(pop.max_size(), max_before);
        assert!(pop.entity(new_id).is_some());
    }

    #[test]
    fn deep_clone_preserves_rank_order_but_not_ids() {
        let (mut pop, mut ops) = small_pop();
        pop.evaluate_unscored(&mut ops);
        pop.sort();
        let cloned = pop.deep_clone(&mut ops);
        assert_eq!(cloned.size(), pop.size());
        let original_fitnesses: Vec<f64> = pop.ranked_ids().iter().map(|&id| pop.entity(id).unwrap().fitness).collect();
        let cloned_fitnesses: Vec<f64> = cloned.ranked_ids().iter().map(|&id| cloned.entity(id).unwrap().fitness).collect();
        assert_eq!(original_fitnesses, cloned_fitnesses);
    }
}
