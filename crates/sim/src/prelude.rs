//! Commonly used imports for convenience.
//!
//! # Example
//!
//! ```
//! use coevo_sim::prelude::*;
//!
//! let chr = VecChromosome::new(b"ACGT".to_vec(), alphabet_generator(b"ACGT".to_vec()));
//! assert_eq!(chr.len(), 4);
//! ```

pub use crate::base::{alphabet_generator, Chromosome, GeneGenerator, VecChromosome};
pub use crate::errors::{self, EngineError, FitnessError};
pub use crate::evolution::{
    CoevolutionFitness, Crossover, ElitistReinsertion, EliteSelection, Fitness, Mutation,
    PointMutationLarge, Reinsertion, Selection, SumFitness, SvlcCrossover, TournamentSelection,
};
pub use crate::simulation::{
    CoevolutionBuilder, CoevolutionEngine, EngineConfig, FitnessThresholdTermination,
    GenerationNumberTermination, OrTermination, Population, RunState, RunStatus, Species,
    SpeciesConfig, Termination, TimeEvolvingTermination,
};
pub use coevo_align::SegmentMatcher;
