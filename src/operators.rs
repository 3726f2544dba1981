//! The operator contract: the fixed set of callback slots the engine invokes
//! at well-defined points in the driver loops.
//!
//! Concrete operator implementations (integer/boolean/char allocators,
//! mutators, crossovers...) are out of scope for this crate; [`crate::builtin`]
//! ships a handful of minimal ones for testing and documentation. Callers
//! implement this trait themselves for their own solution space, the way the
//! source crate's users implement `Fitness`/`Mutate`/`Crossover` for their own
//! [`Genotype`](https://docs.rs/genetic_algorithm/latest/genetic_algorithm/genotype).
use crate::entity::Entity;
use crate::error::GaulError;
use crate::population::Population;
use rand::rngs::SmallRng;

/// Read-only structural context passed to most operator calls: the
/// parameters a population fixes at construction time plus its current
/// generation/island label. Never mutated by an operator.
#[derive(Debug, Clone, Copy)]
pub struct PopulationMeta {
    pub num_chromosomes: usize,
    pub len_chromosomes: usize,
    pub generation: u64,
    pub island: i32,
}

/// The capability abstraction that replaces a void-pointer chromosome plus a
/// parallel callback array (see the heterogeneous-chromosomes design note):
/// a single value type bundles the chromosome representation with every
/// operation the engine needs to perform on it.
///
/// A population is generic over exactly one `Operators` implementation; the
/// `Chromosome`/`Phenome` associated types are therefore always matched to
/// the right operator set, which removes the "wrong operator for this
/// population" class of bug the design notes call out.
pub trait Operators: Send + Sync + std::fmt::Debug {
    /// Opaque genome unit. The engine never looks inside this type.
    type Chromosome: Clone + Send + std::fmt::Debug;
    /// Opaque cached decoded data, shareable between entities via
    /// [`Operators::data_ref_incrementor`]/[`Operators::data_destructor`].
    type Phenome: Clone + Send + std::fmt::Debug;
    /// Cursor driving one generation's worth of `select_one` calls. Reset
    /// (via `Default`) at the start of each phase that uses it, per the
    /// explicit-iterator-state redesign note.
    type SelectOneCursor: Default + Send;
    /// Cursor driving one generation's worth of `select_two` calls.
    type SelectTwoCursor: Default + Send;

    /// Allocate chromosome slot `index` for a brand new entity.
    fn chromosome_constructor(
        &mut self,
        meta: &PopulationMeta,
        index: usize,
        rng: &mut SmallRng,
    ) -> Self::Chromosome;

    /// Release chromosome slot `index`. Most `Clone`-only chromosome types
    /// need no teardown; the default is a no-op.
    fn chromosome_destructor(&mut self, _meta: &PopulationMeta, _index: usize, _chromosome: Self::Chromosome) {}

    /// Deep-copy chromosome slot `index`.
    fn chromosome_replicate(
        &mut self,
        _meta: &PopulationMeta,
        index: usize,
        source: &Self::Chromosome,
    ) -> Self::Chromosome {
        let _ = index;
        source.clone()
    }

    /// Serialise chromosome slot `index` into `buf` (appended, not replaced).
    /// Used for migration and snapshotting; required whenever either is used.
    fn chromosome_to_bytes(&self, meta: &PopulationMeta, index: usize, chromosome: &Self::Chromosome, buf: &mut Vec<u8>);

    /// Reconstruct chromosome slot `index` from bytes written by
    /// [`Operators::chromosome_to_bytes`].
    fn chromosome_from_bytes(
        &self,
        meta: &PopulationMeta,
        index: usize,
        buf: &[u8],
    ) -> Result<Self::Chromosome, GaulError>;

    /// Printable form, for diagnostics only.
    fn chromosome_to_string(&self, _meta: &PopulationMeta, _index: usize, chromosome: &Self::Chromosome) -> String {
        format!("{chromosome:?}")
    }

    /// Compute and return the fitness for a full chromosome set. The engine
    /// stores the result on the entity; it never calls this speculatively.
    fn evaluate(&mut self, meta: &PopulationMeta, chromosomes: &[Self::Chromosome]) -> f64;

    /// Fill a fresh entity's chromosomes with initial content. Returning
    /// `None` is an operator-reported seeding failure (propagated to the
    /// caller of `population_seed`).
    fn seed(&mut self, meta: &PopulationMeta, rng: &mut SmallRng) -> Option<Vec<Self::Chromosome>>;

    /// Local-search step used by Lamarckian/Baldwinian schemes. `None` means
    /// "no improvement found"; the caller keeps the original.
    fn adapt(
        &mut self,
        _meta: &PopulationMeta,
        _chromosomes: &[Self::Chromosome],
        _rng: &mut SmallRng,
    ) -> Option<Vec<Self::Chromosome>> {
        None
    }

    /// Advance the crossover-pair selector by one. `None` means the
    /// generation's selection phase is exhausted.
    fn select_two(
        &mut self,
        meta: &PopulationMeta,
        cursor: &mut Self::SelectTwoCursor,
        population: &Population<Self>,
        rng: &mut SmallRng,
    ) -> Option<(usize, usize)>
    where
        Self: Sized;

    /// Advance the single-parent selector by one. `None` means the
    /// generation's selection phase is exhausted.
    fn select_one(
        &mut self,
        meta: &PopulationMeta,
        cursor: &mut Self::SelectOneCursor,
        population: &Population<Self>,
        rng: &mut SmallRng,
    ) -> Option<usize>
    where
        Self: Sized;

    /// Produce a mutated copy of a full chromosome set.
    fn mutate(&mut self, meta: &PopulationMeta, source: &[Self::Chromosome], rng: &mut SmallRng) -> Vec<Self::Chromosome>;

    /// Produce two children from two parents' chromosome sets.
    fn crossover(
        &mut self,
        meta: &PopulationMeta,
        a: &[Self::Chromosome],
        b: &[Self::Chromosome],
        rng: &mut SmallRng,
    ) -> (Vec<Self::Chromosome>, Vec<Self::Chromosome>);

    /// Insert `child` into `population` under a user-defined replacement
    /// policy. Required only when the driver is configured for user
    /// replacement; the steady-state driver falls back to a default
    /// (replace the current worst entity iff strictly improved) otherwise.
    fn replace(&mut self, population: &mut Population<Self>, child: Entity<Self>)
    where
        Self: Sized,
    {
        crate::driver::steady_state::default_replace(self, population, child);
    }

    /// Called once per generation; returning `false` ends the generational
    /// or archipelago driver at the next boundary.
    fn generation_hook(&mut self, _generation: u64, _population: &Population<Self>) -> bool
    where
        Self: Sized,
    {
        true
    }

    /// Called once per steady-state iteration; returning `false` ends the
    /// steady-state driver at the next boundary.
    fn iteration_hook(&mut self, _iteration: u64, _entity: &Entity<Self>) -> bool
    where
        Self: Sized,
    {
        true
    }

    /// Release a phenome value. Default assumes ownership is exclusive (no
    /// sharing), so there is nothing to do beyond letting it drop.
    fn data_destructor(&mut self, _phenome: Self::Phenome) {}

    /// Retain a phenome value that is about to be shared by a second entity.
    /// Default clones; override for reference-counted phenome types where a
    /// clone should be a cheap retain rather than a deep copy.
    fn data_ref_incrementor(&mut self, phenome: &Self::Phenome) -> Self::Phenome {
        phenome.clone()
    }

    /// Stable small-integer id this operator set round-trips through in the
    /// snapshot function lookup table. `None` ("external/unknown") is
    /// written as `-1`; a snapshot of a non-builtin operator set is lossy,
    /// as the format only has built-in operators to name.
    fn builtin_id(&self) -> Option<i32> {
        None
    }
}
