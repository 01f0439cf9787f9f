//! Co-evolution engine and population management.
//!
//! The most commonly used types are re-exported here:
//!
//! - `CoevolutionEngine`: runs generations across species and owns the run
//!   state machine.
//! - `CoevolutionBuilder`: fluent builder for engines with validation.
//! - `Species` / `Population`: one co-evolving sub-population and its
//!   generation container.
//! - Terminations and the `RunStatus` they inspect.

pub mod builder;
pub mod configs;
pub mod engine;
pub mod population;
pub mod species;
pub mod termination;

pub use builder::CoevolutionBuilder;
pub use configs::{EngineConfig, ExecutionConfig, SpeciesConfig};
pub use engine::{sample_partner_index, CoevolutionEngine, Listener, RunState};
pub use population::{Generation, Population};
pub use species::{Species, DEFAULT_CROSSOVER_PROBABILITY, DEFAULT_MUTATION_PROBABILITY};
pub use termination::{
    FitnessThresholdTermination, GenerationNumberTermination, OrTermination, RunStatus,
    Termination, TimeEvolvingTermination,
};
