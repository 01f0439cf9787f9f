//! Common-segment matching between gene sequences.
//!
//! Builds a longest-common-substring table for two sequences and extracts an
//! ordered list of disjoint matching runs ("synapsing segments") that a
//! crossover can use as fixed anchor points.

mod error;
mod segments;
mod table;

pub use error::AlignError as Error;
pub use error::AlignError;
pub use segments::{find_common_segments, CommonSegment, SegmentMatcher};
pub use table::LcsTable;

/// Segments must be strictly longer than this to be reported.
pub const DEFAULT_MINIMUM_COMMON_LENGTH: usize = 4;
