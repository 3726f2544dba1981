//! Evolutionary scheme (adaptation) and elitism policy.
//!
//! Both enums carry the stable small-integer id used by the snapshot function
//! lookup table (§6 of the spec): the discriminant order below is part of the
//! wire format and must not be reordered once released.

/// When and how local-search adaptation feeds back into the genome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    /// No adaptation; selection operates on the original genomes.
    Darwin,
    /// Adapted fitness is written back to the parents' genomes, pre-crossover.
    LamarckParents,
    /// Adapted fitness is written back to the children's genomes, post-crossover.
    LamarckChildren,
    /// Lamarckian write-back applied to both parents and children.
    LamarckAll,
    /// Adapted fitness affects parent selection but is not written back.
    BaldwinParents,
    /// Adapted fitness affects child survival but is not written back.
    BaldwinChildren,
    /// Baldwinian adaptation applied to both parents and children.
    BaldwinAll,
}

impl Scheme {
    pub(crate) fn adapts_parents(self) -> bool {
        matches!(
            self,
            Scheme::LamarckParents | Scheme::LamarckAll | Scheme::BaldwinParents | Scheme::BaldwinAll
        )
    }
    pub(crate) fn adapts_children(self) -> bool {
        matches!(
            self,
            Scheme::LamarckChildren
                | Scheme::LamarckAll
                | Scheme::BaldwinChildren
                | Scheme::BaldwinAll
        )
    }
    pub(crate) fn is_lamarckian_for_parents(self) -> bool {
        matches!(self, Scheme::LamarckParents | Scheme::LamarckAll)
    }
    pub(crate) fn is_lamarckian_for_children(self) -> bool {
        matches!(self, Scheme::LamarckChildren | Scheme::LamarckAll)
    }

    /// Stable small-integer id used by the snapshot function lookup table.
    pub fn builtin_id(self) -> i32 {
        match self {
            Scheme::Darwin => 1,
            Scheme::LamarckParents => 2,
            Scheme::LamarckChildren => 3,
            Scheme::LamarckAll => 4,
            Scheme::BaldwinParents => 5,
            Scheme::BaldwinChildren => 6,
            Scheme::BaldwinAll => 7,
        }
    }
    pub fn from_builtin_id(id: i32) -> Option<Self> {
        Some(match id {
            1 => Scheme::Darwin,
            2 => Scheme::LamarckParents,
            3 => Scheme::LamarckChildren,
            4 => Scheme::LamarckAll,
            5 => Scheme::BaldwinParents,
            6 => Scheme::BaldwinChildren,
            7 => Scheme::BaldwinAll,
            _ => return None,
        })
    }
}

/// Policy for preserving individuals across a generation boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Elitism {
    /// No special carry-over; survivors are simply the sorted head.
    None,
    /// Survivors are the top-`stable_size` of parents+children combined,
    /// ties broken in favour of parents.
    ParentsSurvive,
    /// Rank 0 of the parent set is guaranteed to appear in the survivor set.
    OneParentSurvives,
    /// Parents are re-evaluated before ranking (for stochastic fitness).
    RescoreParents,
    /// Children not produced from two parents of identical lineage are
    /// discarded before ranking.
    PurebredOnly,
    /// Unrecognised/unbound elitism mode; behaves like `None`.
    UnknownDefault,
}

impl Elitism {
    pub fn builtin_id(self) -> i32 {
        match self {
            Elitism::None => 1,
            Elitism::ParentsSurvive => 2,
            Elitism::OneParentSurvives => 3,
            Elitism::RescoreParents => 4,
            Elitism::PurebredOnly => 5,
            Elitism::UnknownDefault => 0,
        }
    }
    pub fn from_builtin_id(id: i32) -> Self {
        match id {
            1 => Elitism::None,
            2 => Elitism::ParentsSurvive,
            3 => Elitism::OneParentSurvives,
            4 => Elitism::RescoreParents,
            5 => Elitism::PurebredOnly,
            _ => Elitism::UnknownDefault,
        }
    }
}

impl Default for Scheme {
    fn default() -> Self {
        Scheme::Darwin
    }
}
impl Default for Elitism {
    fn default() -> Self {
        Elitism::UnknownDefault
    }
}
