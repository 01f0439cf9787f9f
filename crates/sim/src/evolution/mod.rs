//! Evolutionary operators.
//!
//! - **Selection**: tournament and elite parent selection
//! - **Crossover**: synapsing variable-length crossover (SVLC)
//! - **Mutation**: point, insertion, deletion, replication and slip mutations
//! - **Reinsertion**: elitist and pure reinsertion
//! - **Fitness**: single and cooperative fitness functions

pub mod crossover;
pub mod fitness;
pub mod mutation;
pub mod reinsertion;
pub mod selection;

pub use crossover::{Crossover, SvlcCrossover, MAX_SYNAPSING_SEGMENTS};
pub use fitness::{cooperative_score, CoevolutionFitness, Fitness, SumFitness};
pub use mutation::{
    BlockSize, DeletionMutation, InsertionMutation, MultipleMutations, Mutation,
    PointMutationLarge, ReplicationMutation, SlipMutation,
};
pub use reinsertion::{ElitistReinsertion, PureReinsertion, Reinsertion};
pub use selection::{EliteSelection, Selection, TournamentSelection};
