use std::path::PathBuf;

use reelsearch_core::error::CoreError;
use reelsearch_core::fusion::{FusionWeights, DEFAULT_IMAGE_WEIGHT, DEFAULT_TEXT_WEIGHT, DEFAULT_VISUAL_THRESHOLD};
use reelsearch_core::search::DEFAULT_STRICT_SIMILARITY;
use reelsearch_core::threshold_validation::validate_unit_range;
use reelsearch_core::vector::{DEFAULT_AUDIO_DIMENSION, DEFAULT_VISUAL_DIMENSION};
use reelsearch_vectors::writer::DEFAULT_WRITE_CHUNK_SIZE;
use reelsearch_vectors::WriterConfig;

/// Retrieval engine configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Weights for videos found by both visual and text search.
    pub weights: FusionWeights,
    /// Default minimum similarity for visual hits (inclusive).
    pub similarity_threshold: f64,
    /// Minimum similarity for semantic hits when `strict` is requested.
    pub strict_similarity: f64,
    /// Dimensions and chunk size for vector writes.
    pub writer: WriterConfig,
    /// Root of the per-scene keyframe/audio sidecar directories.
    pub media_root: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            weights: FusionWeights::default(),
            similarity_threshold: DEFAULT_VISUAL_THRESHOLD,
            strict_similarity: DEFAULT_STRICT_SIMILARITY,
            writer: WriterConfig::default(),
            media_root: PathBuf::from("./media"),
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                       | Default   |
    /// |-------------------------------|-----------|
    /// | `IMAGE_WEIGHT`                | `0.7`     |
    /// | `TEXT_WEIGHT`                 | `0.3`     |
    /// | `SIMILARITY_THRESHOLD`        | `0.7`     |
    /// | `STRICT_SIMILARITY_THRESHOLD` | `0.5`     |
    /// | `VISUAL_DIMENSION`            | `512`     |
    /// | `AUDIO_DIMENSION`             | `512`     |
    /// | `WRITE_CHUNK_SIZE`            | `100`     |
    /// | `MEDIA_ROOT`                  | `./media` |
    pub fn from_env() -> Self {
        Self {
            weights: FusionWeights {
                image: env_parse("IMAGE_WEIGHT", DEFAULT_IMAGE_WEIGHT),
                text: env_parse("TEXT_WEIGHT", DEFAULT_TEXT_WEIGHT),
            },
            similarity_threshold: env_parse("SIMILARITY_THRESHOLD", DEFAULT_VISUAL_THRESHOLD),
            strict_similarity: env_parse("STRICT_SIMILARITY_THRESHOLD", DEFAULT_STRICT_SIMILARITY),
            writer: WriterConfig {
                visual_dimension: env_parse("VISUAL_DIMENSION", DEFAULT_VISUAL_DIMENSION),
                audio_dimension: env_parse("AUDIO_DIMENSION", DEFAULT_AUDIO_DIMENSION),
                chunk_size: env_parse("WRITE_CHUNK_SIZE", DEFAULT_WRITE_CHUNK_SIZE),
            },
            media_root: std::env::var("MEDIA_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./media")),
        }
    }

    /// Check that weights and thresholds lie in `[0, 1]` and sizes are positive.
    pub fn validate(&self) -> Result<(), CoreError> {
        validate_unit_range(self.weights.image, "IMAGE_WEIGHT")?;
        validate_unit_range(self.weights.text, "TEXT_WEIGHT")?;
        validate_unit_range(self.similarity_threshold, "SIMILARITY_THRESHOLD")?;
        validate_unit_range(self.strict_similarity, "STRICT_SIMILARITY_THRESHOLD")?;
        if self.writer.visual_dimension == 0 || self.writer.audio_dimension == 0 {
            return Err(CoreError::Validation(
                "VISUAL_DIMENSION and AUDIO_DIMENSION must be positive".into(),
            ));
        }
        if self.writer.chunk_size == 0 {
            return Err(CoreError::Validation(
                "WRITE_CHUNK_SIZE must be positive".into(),
            ));
        }
        Ok(())
    }
}

fn env_parse<T>(var: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    match std::env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse()
            .unwrap_or_else(|_| panic!("{var} must be a valid number, got '{raw}'")),
        Err(_) => default,
    }
}
