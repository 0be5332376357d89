use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ScoringError {
    #[error("cannot average an empty set of vectors")]
    EmptyVectorSet,

    #[error("vectors have mismatched dimensions: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("cannot compute cosine similarity of a zero-magnitude vector")]
    ZeroMagnitude,

    #[error("cosine similarity score is out of range [-1, 1]: {score}")]
    ScoreOutOfRange { score: f32 },
}
