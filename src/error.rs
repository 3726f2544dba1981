//! Error taxonomy for the engine.
//!
//! Contract violations and allocation failures are routed through the
//! [`FatalErrorHook`] rather than returned, matching the source crate's habit
//! of hand-rolling small `Display`-only error structs (`TryFromStrategyBuilderError`,
//! `TryFromGenotypeBuilderError`) instead of depending on a derive-macro error crate.
use std::fmt;

/// Everything that can go wrong in the engine, grouped by the recovery policy
/// that applies to it (see the error handling design).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GaulError {
    /// Missing callback, invalid chromosome index, rank out of range, or a
    /// population handle that no longer exists. Always a programming bug.
    ContractViolation(&'static str),
    /// The pool or a transfer buffer could not be grown.
    AllocationFailure(&'static str),
    /// A population or entity snapshot is malformed.
    SnapshotCorruption(String),
    /// A migration send/receive primitive failed.
    TransportFailure(String),
    /// An operator reported failure where a boolean result is defined (e.g. `seed`).
    OperatorFailure(&'static str),
}

impl fmt::Display for GaulError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GaulError::ContractViolation(msg) => write!(f, "contract violation: {msg}"),
            GaulError::AllocationFailure(msg) => write!(f, "allocation failure: {msg}"),
            GaulError::SnapshotCorruption(msg) => write!(f, "snapshot corruption: {msg}"),
            GaulError::TransportFailure(msg) => write!(f, "transport failure: {msg}"),
            GaulError::OperatorFailure(msg) => write!(f, "operator failure: {msg}"),
        }
    }
}

impl std::error::Error for GaulError {}

/// Distinguishes why a driver loop returned, as opposed to an error: this is
/// not a failure, it is the normal "converged" vs. "budget exhausted" split.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The configured generation/iteration budget ran out.
    BudgetExhausted,
    /// A `generation_hook`/`iteration_hook` returned `false`.
    HookStopped,
}

/// Overridable reaction to a [`GaulError::ContractViolation`] or
/// [`GaulError::AllocationFailure`]. The default hook logs at `error` level
/// and aborts, matching the recovery policy ("fatal, via a fatal-error hook
/// that callers may override").
pub trait FatalErrorHook: Send + Sync {
    fn fatal(&self, error: &GaulError) -> ! {
        log::error!("fatal: {error}");
        panic!("fatal: {error}");
    }
}

/// The hook used when the caller has not installed a custom one.
#[derive(Debug, Clone, Copy, Default)]
pub struct AbortOnFatal;
impl FatalErrorHook for AbortOnFatal {}

pub(crate) fn fatal(hook: &dyn FatalErrorHook, error: GaulError) -> ! {
    hook.fatal(&error)
}
