//! Pure numeric scoring: vector averaging and cosine similarity.
//!
//! Generated completions and reference completions are each embedded,
//! averaged element-wise into a single vector, and compared with cosine
//! similarity. The score always lies in `[-1, 1]`; anything outside that
//! range (including NaN from degenerate inputs) is a computation error for
//! the unit being scored, never a retry case.

mod error;


pub use error::ScoringError;

/// Element-wise mean of a set of equal-length vectors.
pub fn average_of_vectors(vectors: &[Vec<f32>]) -> Result<Vec<f32>, ScoringError> {
    let Some(first) = vectors.first() else {
        return Err(ScoringError::EmptyVectorSet);
    };
    let dim = first.len();

    let mut sum = vec![0.0f32; dim];
    for vector in vectors {
        if vector.len() != dim {
            return Err(ScoringError::DimensionMismatch {
                expected: dim,
                actual: vector.len(),
            });
        }
        for (acc, value) in sum.iter_mut().zip(vector) {
            *acc += value;
        }
    }

    let count = vectors.len() as f32;
    for value in &mut sum {
        *value /= count;
    }
    Ok(sum)
}

/// Cosine similarity between two vectors: dot product over the product of
/// magnitudes. Output is in `[-1, 1]`.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32, ScoringError> {
    if a.len() != b.len() {
        return Err(ScoringError::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }
    if a.is_empty() {
        return Err(ScoringError::EmptyVectorSet);
    }

    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let magnitude_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let magnitude_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if magnitude_a == 0.0 || magnitude_b == 0.0 {
        return Err(ScoringError::ZeroMagnitude);
    }

    Ok(dot / (magnitude_a * magnitude_b))
}

/// Validates that a similarity score lies in `[-1, 1]`.
///
/// NaN fails the check: the comparison below is written so that a NaN score
/// cannot slip through as valid.
pub fn ensure_score_in_range(score: f32) -> Result<(), ScoringError> {
    if score >= -1.0 && score <= 1.0 {
        Ok(())
    } else {
        Err(ScoringError::ScoreOutOfRange { score })
    }
}
