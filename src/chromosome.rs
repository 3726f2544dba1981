//! Chromosomes are opaque to the engine: it never inspects their contents,
//! only manipulates them through the [`crate::operators::Operators`] capability.
//! A chromosome type only needs `Clone + Send + Debug` to participate in a
//! population; this module adds one optional capability for callers that
//! want to use [`crate::allele_search::allele_search`].

/// Hash of a chromosome's byte representation, used for cardinality/dedup
/// bookkeeping (mirrors the source crate's `GenesHash` on `Chromosome`).
pub type GenesHash = u64;

/// Optional capability for chromosome types that expose a single integer
/// locus for [`crate::allele_search::allele_search`]. A chromosome never has
/// to implement this to be used by the engine proper.
pub trait LocusAccess {
    /// Read the allele at `locus` as a signed integer.
    fn get_locus(&self, locus: usize) -> i64;
    /// Write the allele at `locus`, leaving every other locus untouched.
    fn set_locus(&mut self, locus: usize, value: i64);
}
