//! A handful of minimal, built-in operator sets.
//!
//! These exist for testing and documentation only (see the purpose and
//! scope notes on [`crate::operators::Operators`]) — they are not meant to
//! be a usable operator library. Each one overrides
//! [`Operators::builtin_id`](crate::operators::Operators::builtin_id) to
//! return one of the stable ids below, so populations built from them
//! round-trip through [`crate::snapshot`]'s function lookup table.
use crate::operators::{Operators, PopulationMeta};
use crate::population::Population;
use crate::error::GaulError;
use rand::rngs::SmallRng;
use rand::Rng;

/// Stable small-integer id for the snapshot function lookup table (§6).
/// `0` is reserved for "null" and negative ids for "external/unknown".
pub const INT_VECTOR_OPERATORS_ID: i32 = 1;
pub const STRING_MATCH_OPERATORS_ID: i32 = 2;

/// Maximises (or targets) a fixed-length vector of bounded integers held as
/// the entity's single chromosome.
#[derive(Clone)]
pub struct IntVectorOperators {
    pub len: usize,
    pub min: i64,
    pub max: i64,
    goal: Goal,
}

#[derive(Clone, Debug)]
enum Goal {
    MaximiseSum,
    Target(Vec<i64>),
}

impl std::fmt::Debug for IntVectorOperators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntVectorOperators")
            .field("len", &self.len)
            .field("min", &self.min)
            .field("max", &self.max)
            .field("goal", &self.goal)
            .finish()
    }
}

impl IntVectorOperators {
    /// Fitness is the sum of the alleles (Scenario B: small integer maximise).
    pub fn new(len: usize, min: i64, max: i64, _fitness: fn(&[i64]) -> f64) -> Self {
        crate::registry::register_builtin_operator("int_vector", INT_VECTOR_OPERATORS_ID);
        Self { len, min, max, goal: Goal::MaximiseSum }
    }

    /// Fitness is the negative Hamming distance to `target` (0 is a perfect match).
    pub fn targeting(target: Vec<i64>, min: i64, max: i64) -> Self {
        crate::registry::register_builtin_operator("int_vector", INT_VECTOR_OPERATORS_ID);
        Self { len: target.len(), min, max, goal: Goal::Target(target) }
    }

    fn random_allele(&self, rng: &mut SmallRng) -> i64 {
        rng.gen_range(self.min..self.max)
    }
}

/// Rank-order cursor: offers ranks `0, 1, 2, ...` once each per phase.
///
/// `limit` is captured from the population's size on the first call of the
/// phase, so entities appended mid-phase (crossover/mutation children) are
/// never themselves offered as parents within that same phase.
#[derive(Default)]
pub struct RankCursor {
    next: usize,
    limit: Option<usize>,
}

impl RankCursor {
    /// Capture `size` as the phase limit on first use, otherwise return the
    /// already-captured one. Exposed so a caller implementing [`Operators`]
    /// for a wrapper type can reuse this cursor's frozen-limit behaviour
    /// without access to its private fields.
    pub fn limit_or_insert(&mut self, size: usize) -> &usize {
        self.limit.get_or_insert(size)
    }
    pub fn next_rank(&self) -> usize {
        self.next
    }
    pub fn advance_rank(&mut self) {
        self.next += 1;
    }
}

/// Consecutive-pair cursor: offers `(0,1), (2,3), ...` once each per phase,
/// with the same first-call size capture as [`RankCursor`].
#[derive(Default)]
pub struct PairCursor {
    next: usize,
    limit: Option<usize>,
}

impl PairCursor {
    pub fn limit_or_insert(&mut self, size: usize) -> &usize {
        self.limit.get_or_insert(size)
    }
    pub fn next_pair(&self) -> usize {
        self.next
    }
    pub fn advance_pair(&mut self) {
        self.next += 1;
    }
}

impl Operators for IntVectorOperators {
    type Chromosome = Vec<i64>;
    type Phenome = ();
    type SelectOneCursor = RankCursor;
    type SelectTwoCursor = PairCursor;

    fn chromosome_constructor(&mut self, _meta: &PopulationMeta, _index: usize, rng: &mut SmallRng) -> Self::Chromosome {
        (0..self.len).map(|_| self.random_allele(rng)).collect()
    }

    fn chromosome_to_bytes(&self, _meta: &PopulationMeta, _index: usize, chromosome: &Self::Chromosome, buf: &mut Vec<u8>) {
        for allele in chromosome {
            buf.extend_from_slice(&allele.to_le_bytes());
        }
    }

    fn chromosome_from_bytes(&self, _meta: &PopulationMeta, _index: usize, buf: &[u8]) -> Result<Self::Chromosome, GaulError> {
        if buf.len() != self.len * 8 {
            return Err(GaulError::SnapshotCorruption(format!(
                "expected {} bytes for {} i64 alleles, got {}",
                self.len * 8,
                self.len,
                buf.len()
            )));
        }
        Ok(buf.chunks_exact(8).map(|c| i64::from_le_bytes(c.try_into().unwrap())).collect())
    }

    fn evaluate(&mut self, _meta: &PopulationMeta, chromosomes: &[Self::Chromosome]) -> f64 {
        let genes = &chromosomes[0];
        match &self.goal {
            Goal::MaximiseSum => genes.iter().sum::<i64>() as f64,
            Goal::Target(target) => {
                let mismatches = genes.iter().zip(target).filter(|(a, b)| a != b).count();
                -(mismatches as f64)
            }
        }
    }

    fn seed(&mut self, meta: &PopulationMeta, rng: &mut SmallRng) -> Option<Vec<Self::Chromosome>> {
        Some(vec![self.chromosome_constructor(meta, 0, rng)])
    }

    fn select_two(
        &mut self,
        _meta: &PopulationMeta,
        cursor: &mut Self::SelectTwoCursor,
        population: &Population<Self>,
        _rng: &mut SmallRng,
    ) -> Option<(usize, usize)> {
        let limit = *cursor.limit.get_or_insert(population.size());
        let i = cursor.next * 2;
        if i + 1 >= limit {
            return None;
        }
        cursor.next += 1;
        Some((i, i + 1))
    }

    fn select_one(
        &mut self,
        _meta: &PopulationMeta,
        cursor: &mut Self::SelectOneCursor,
        population: &Population<Self>,
        _rng: &mut SmallRng,
    ) -> Option<usize> {
        let limit = *cursor.limit.get_or_insert(population.size());
        if cursor.next >= limit {
            return None;
        }
        let rank = cursor.next;
        cursor.next += 1;
        Some(rank)
    }

    fn mutate(&mut self, _meta: &PopulationMeta, source: &[Self::Chromosome], rng: &mut SmallRng) -> Vec<Self::Chromosome> {
        let mut genes = source[0].clone();
        let locus = rng.gen_range(0..genes.len());
        genes[locus] = self.random_allele(rng);
        vec![genes]
    }

    fn crossover(
        &mut self,
        _meta: &PopulationMeta,
        a: &[Self::Chromosome],
        b: &[Self::Chromosome],
        rng: &mut SmallRng,
    ) -> (Vec<Self::Chromosome>, Vec<Self::Chromosome>) {
        let (ga, gb) = (&a[0], &b[0]);
        let point = rng.gen_range(1..ga.len().max(2));
        let mut child_a = ga[..point].to_vec();
        child_a.extend_from_slice(&gb[point..]);
        let mut child_b = gb[..point].to_vec();
        child_b.extend_from_slice(&ga[point..]);
        (vec![child_a], vec![child_b])
    }

    fn builtin_id(&self) -> Option<i32> {
        Some(INT_VECTOR_OPERATORS_ID)
    }
}

/// Evolves a fixed-length character chromosome towards a target string
/// (Scenario A: sentence match), scoring per-locus equality plus a smooth
/// distance term so near-misses are distinguishable from each other.
#[derive(Clone, Debug)]
pub struct StringMatchOperators {
    pub target: Vec<u8>,
    pub alphabet: (u8, u8),
}

impl StringMatchOperators {
    pub fn new(target: impl AsRef<str>) -> Self {
        crate::registry::register_builtin_operator("string_match", STRING_MATCH_OPERATORS_ID);
        let target = target.as_ref().as_bytes().to_vec();
        Self { target, alphabet: (0x20, 0x7e) }
    }

    fn random_char(&self, rng: &mut SmallRng) -> u8 {
        rng.gen_range(self.alphabet.0..=self.alphabet.1)
    }
}

impl Operators for StringMatchOperators {
    type Chromosome = Vec<u8>;
    type Phenome = ();
    type SelectOneCursor = RankCursor;
    type SelectTwoCursor = PairCursor;

    fn chromosome_constructor(&mut self, _meta: &PopulationMeta, _index: usize, rng: &mut SmallRng) -> Self::Chromosome {
        (0..self.target.len()).map(|_| self.random_char(rng)).collect()
    }

    fn chromosome_to_bytes(&self, _meta: &PopulationMeta, _index: usize, chromosome: &Self::Chromosome, buf: &mut Vec<u8>) {
        buf.extend_from_slice(chromosome);
    }

    fn chromosome_from_bytes(&self, _meta: &PopulationMeta, _index: usize, buf: &[u8]) -> Result<Self::Chromosome, GaulError> {
        if buf.len() != self.target.len() {
            return Err(GaulError::SnapshotCorruption(format!(
                "expected {} bytes, got {}",
                self.target.len(),
                buf.len()
            )));
        }
        Ok(buf.to_vec())
    }

    fn chromosome_to_string(&self, _meta: &PopulationMeta, _index: usize, chromosome: &Self::Chromosome) -> String {
        String::from_utf8_lossy(chromosome).into_owned()
    }

    /// Per-locus equality count, plus a smooth distance term averaged over
    /// the mismatched loci so two chromosomes with the same match count are
    /// distinguishable by how close their mismatches are in character code.
    /// A chromosome with zero mismatches scores exactly `target.len()`.
    fn evaluate(&mut self, _meta: &PopulationMeta, chromosomes: &[Self::Chromosome]) -> f64 {
        let genes = &chromosomes[0];
        let range = (self.alphabet.1 - self.alphabet.0) as f64;
        let len = genes.len().max(1) as f64;
        let mut matches = 0.0;
        let mut smooth_distance = 0.0;
        for (&a, &b) in genes.iter().zip(&self.target) {
            if a == b {
                matches += 1.0;
            } else {
                smooth_distance += 1.0 - (a as f64 - b as f64).abs() / range;
            }
        }
        matches + smooth_distance / len
    }

    fn seed(&mut self, meta: &PopulationMeta, rng: &mut SmallRng) -> Option<Vec<Self::Chromosome>> {
        Some(vec![self.chromosome_constructor(meta, 0, rng)])
    }

    fn select_two(
        &mut self,
        _meta: &PopulationMeta,
        cursor: &mut Self::SelectTwoCursor,
        population: &Population<Self>,
        _rng: &mut SmallRng,
    ) -> Option<(usize, usize)> {
        let limit = *cursor.limit.get_or_insert(population.size());
        let i = cursor.next * 2;
        if i + 1 >= limit {
            return None;
        }
        cursor.next += 1;
        Some((i, i + 1))
    }

    fn select_one(
        &mut self,
        _meta: &PopulationMeta,
        cursor: &mut Self::SelectOneCursor,
        population: &Population<Self>,
        _rng: &mut SmallRng,
    ) -> Option<usize> {
        let limit = *cursor.limit.get_or_insert(population.size());
        if cursor.next >= limit {
            return None;
        }
        let rank = cursor.next;
        cursor.next += 1;
        Some(rank)
    }

    fn mutate(&mut self, _meta: &PopulationMeta, source: &[Self::Chromosome], rng: &mut SmallRng) -> Vec<Self::Chromosome> {
        let mut genes = source[0].clone();
        let locus = rng.gen_range(0..genes.len());
        genes[locus] = self.random_char(rng);
        vec![genes]
    }

    fn crossover(
        &mut self,
        _meta: &PopulationMeta,
        a: &[Self::Chromosome],
        b: &[Self::Chromosome],
        rng: &mut SmallRng,
    ) -> (Vec<Self::Chromosome>, Vec<Self::Chromosome>) {
        let (ga, gb) = (&a[0], &b[0]);
        let point = rng.gen_range(1..ga.len().max(2));
        let mut child_a = ga[..point].to_vec();
        child_a.extend_from_slice(&gb[point..]);
        let mut child_b = gb[..point].to_vec();
        child_b.extend_from_slice(&ga[point..]);
        (vec![child_a], vec![child_b])
    }

    fn builtin_id(&self) -> Option<i32> {
        Some(STRING_MATCH_OPERATORS_ID)
    }
}

impl crate::chromosome::LocusAccess for Vec<i64> {
    fn get_locus(&self, locus: usize) -> i64 {
        self[locus]
    }
    fn set_locus(&mut self, locus: usize, value: i64) {
        self[locus] = value;
    }
}
