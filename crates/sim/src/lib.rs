//! # Co-evolution Crate
//!
//! The `coevo_sim` crate provides a cooperative co-evolutionary genetic
//! algorithm. Several species evolve side by side; every individual is scored
//! together with partner individuals drawn from the other species.
//!
//! It includes modules for defining chromosomes, evolutionary operators
//! (selection, synapsing crossover, variable-length mutation, reinsertion),
//! a bounded task executor, and the engine that drives the generations.

pub mod base;
pub mod errors;
pub mod evolution;
pub mod executor;
pub mod prelude;
pub mod simulation;

pub use base::{Chromosome, VecChromosome};
pub use errors::EngineError as Error;
pub use simulation::{CoevolutionBuilder, CoevolutionEngine, RunState};
