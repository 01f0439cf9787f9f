use thiserror::Error;

/// Error type for segment matching.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AlignError {
    #[error("LCS table of {rows}x{cols} cells does not fit in memory")]
    TableTooLarge { rows: usize, cols: usize },
}
