//! An evolutionary optimisation engine over user-defined solution spaces.
//!
//! A caller implements [`operators::Operators`] for their own chromosome
//! representation (seeding, mutation, crossover, evaluation, selection),
//! builds a [`population::Population`], and runs one of the drivers in
//! [`driver`]: generational, steady-state, or an island-model archipelago
//! that exchanges individuals between demes by migration.
//!
//! [`builtin`] ships a couple of minimal operator sets for testing and
//! documentation; they are not a usable operator library. [`snapshot`] and
//! [`transport`] cover binary persistence and the archipelago's migration
//! wire protocol. [`allele_search`] is a small local-search convenience
//! built on top of the same operator contract.
pub mod allele_search;
pub mod builtin;
pub mod chromosome;
pub mod config;
pub mod driver;
pub mod entity;
pub mod error;
pub mod operators;
pub mod population;
pub mod rand_source;
pub mod registry;
pub mod scheme;
pub mod snapshot;
pub mod transport;
pub mod wire;

pub use config::Config;
pub use entity::{Entity, EntityId};
pub use error::{FatalErrorHook, GaulError, Outcome};
pub use operators::{Operators, PopulationMeta};
pub use population::{Population, Rates};
pub use registry::PopulationId;
pub use scheme::{Elitism, Scheme};
