//! Modalities, dimension constants, and vector math.
//!
//! Pure functions over `f32` slices. Accumulation happens in `f64` so long
//! vectors do not drift when normalized or averaged.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Default dimensionality of visual (CLIP image projection) vectors.
pub const DEFAULT_VISUAL_DIMENSION: usize = 512;

/// Default dimensionality of audio (CLAP audio projection) vectors.
pub const DEFAULT_AUDIO_DIMENSION: usize = 512;

/// Tolerance used when asserting that a vector has unit length.
pub const UNIT_NORM_TOLERANCE: f64 = 1e-4;

// ---------------------------------------------------------------------------
// Modality
// ---------------------------------------------------------------------------

/// One embedding space, each backed by its own vector collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    Text,
    Visual,
    Audio,
}

impl Modality {
    pub const ALL: [Modality; 3] = [Modality::Text, Modality::Visual, Modality::Audio];

    /// Collection name used in the vector store.
    pub fn collection_name(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Visual => "visual",
            Self::Audio => "audio",
        }
    }

    /// Whether every vector in this modality must match a fixed dimension.
    ///
    /// Text vectors only need to agree with each other; their length is
    /// whatever the configured text encoder produces.
    pub fn has_fixed_dimension(self) -> bool {
        !matches!(self, Self::Text)
    }
}

impl std::fmt::Display for Modality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.collection_name())
    }
}

// ---------------------------------------------------------------------------
// Norms and normalization
// ---------------------------------------------------------------------------

/// Euclidean length of a vector.
pub fn l2_norm(v: &[f32]) -> f64 {
    v.iter().map(|x| (*x as f64) * (*x as f64)).sum::<f64>().sqrt()
}

/// Scale a vector to unit length in place.
///
/// Returns `false` (leaving the vector untouched) when the norm is zero or
/// not finite, since such a vector has no direction to preserve.
pub fn l2_normalize(v: &mut [f32]) -> bool {
    let norm = l2_norm(v);
    if norm == 0.0 || !norm.is_finite() {
        return false;
    }
    for x in v.iter_mut() {
        *x = (*x as f64 / norm) as f32;
    }
    true
}

/// Whether a vector has unit length within [`UNIT_NORM_TOLERANCE`].
pub fn is_unit_norm(v: &[f32]) -> bool {
    (l2_norm(v) - 1.0).abs() <= UNIT_NORM_TOLERANCE
}

/// Index of the first NaN or infinite component, if any.
pub fn first_non_finite(v: &[f32]) -> Option<usize> {
    v.iter().position(|x| !x.is_finite())
}

/// A zero vector of the given dimension (neutral fallback embedding).
pub fn zero_vector(dimension: usize) -> Vec<f32> {
    vec![0.0; dimension]
}

/// Element-wise mean of equally sized vectors.
///
/// Returns `None` when the input is empty or the vectors disagree on length.
pub fn mean_vector(vectors: &[Vec<f32>]) -> Option<Vec<f32>> {
    let first = vectors.first()?;
    let dim = first.len();
    if vectors.iter().any(|v| v.len() != dim) {
        return None;
    }

    let mut acc = vec![0.0f64; dim];
    for v in vectors {
        for (slot, x) in acc.iter_mut().zip(v) {
            *slot += *x as f64;
        }
    }
    let n = vectors.len() as f64;
    Some(acc.into_iter().map(|x| (x / n) as f32).collect())
}

// ---------------------------------------------------------------------------
// Similarity
// ---------------------------------------------------------------------------

/// Compute cosine similarity between two embedding vectors.
///
/// Returns a value in `[-1.0, 1.0]`. Returns `0.0` if vectors have different
/// lengths, are empty, or either has zero magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f64 = a
        .iter()
        .zip(b)
        .map(|(x, y)| (*x as f64) * (*y as f64))
        .sum();

    let norm_a = l2_norm(a);
    let norm_b = l2_norm(b);

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

/// Cosine distance as reported by cosine-space vector stores (`1 - cos`).
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f64 {
    1.0 - cosine_similarity(a, b)
}

/// Convert a store distance into the similarity score used for ranking.
pub fn similarity_from_distance(distance: f64) -> f64 {
    1.0 - distance
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
