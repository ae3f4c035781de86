//! Feature-extractor seam.
//!
//! A [`FeatureExtractor`] turns one preprocessed input into a raw vector.
//! An [`ExtractorLoader`] produces extractors for a model id; the
//! [`crate::cache::ExtractorCache`] makes sure each role is loaded once.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::EmbedError;

// ---------------------------------------------------------------------------
// Roles
// ---------------------------------------------------------------------------

/// The five models the engine uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelRole {
    /// Scene descriptions and text queries into the text space.
    TextEncoder,
    /// Keyframes and query images into the visual space.
    ImageEncoder,
    /// Scene audio into the audio space.
    AudioEncoder,
    /// Text projected into the visual space.
    TextToVisual,
    /// Text projected into the audio space.
    TextToAudio,
}

pub(crate) const ROLE_COUNT: usize = 5;

impl ModelRole {
    pub const ALL: [ModelRole; ROLE_COUNT] = [
        ModelRole::TextEncoder,
        ModelRole::ImageEncoder,
        ModelRole::AudioEncoder,
        ModelRole::TextToVisual,
        ModelRole::TextToAudio,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::TextEncoder => "text_encoder",
            Self::ImageEncoder => "image_encoder",
            Self::AudioEncoder => "audio_encoder",
            Self::TextToVisual => "text_to_visual",
            Self::TextToAudio => "text_to_audio",
        }
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl std::fmt::Display for ModelRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// A preprocessed extractor input.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractorInput {
    /// Raw text. Text encoders mean-pool and normalize themselves.
    Text(String),
    /// A `[channels, height, width]` float tensor, already normalized.
    Image { pixels: Vec<f32>, shape: [usize; 3] },
    /// Mono samples at `sample_rate`.
    Audio { samples: Vec<f32>, sample_rate: u32 },
}

impl ExtractorInput {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Image { .. } => "image",
            Self::Audio { .. } => "audio",
        }
    }
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// A loaded model.
#[async_trait]
pub trait FeatureExtractor: Send + Sync {
    /// Model id this extractor was loaded from.
    fn model(&self) -> &str;

    /// Length of every vector this extractor returns.
    fn dimension(&self) -> usize;

    async fn extract(&self, input: &ExtractorInput) -> Result<Vec<f32>, EmbedError>;
}

/// Loads extractors by model id.
#[async_trait]
pub trait ExtractorLoader: Send + Sync {
    async fn load(
        &self,
        role: ModelRole,
        model: &str,
    ) -> Result<Arc<dyn FeatureExtractor>, EmbedError>;
}
