//! Base types for candidate solutions.
//!
//! This module provides the chromosome capability shared by every operator
//! and the engine, plus a generic vector-backed implementation.

mod chromosome;

pub use chromosome::{
    alphabet_generator, by_fitness_desc, Chromosome, GeneGenerator, VecChromosome,
};
