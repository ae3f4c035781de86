use std::time::Duration;

use crate::extractor::ModelRole;

pub const DEFAULT_TEXT_MODEL: &str = "Xenova/all-MiniLM-L6-v2";
pub const DEFAULT_IMAGE_MODEL: &str = "Xenova/clip-vit-base-patch32";
pub const DEFAULT_AUDIO_MODEL: &str = "Xenova/clap-htsat-unfused";

pub const DEFAULT_TEXT_BATCH_SIZE: usize = 32;
pub const DEFAULT_VISUAL_BATCH_SIZE: usize = 8;
pub const DEFAULT_AUDIO_BATCH_SIZE: usize = 8;
pub const DEFAULT_EMBED_TIMEOUT_SECS: u64 = 30;

/// Model id per [`ModelRole`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelIds {
    pub text_encoder: String,
    pub image_encoder: String,
    pub audio_encoder: String,
    pub text_to_visual: String,
    pub text_to_audio: String,
}

impl Default for ModelIds {
    fn default() -> Self {
        Self {
            text_encoder: DEFAULT_TEXT_MODEL.into(),
            image_encoder: DEFAULT_IMAGE_MODEL.into(),
            audio_encoder: DEFAULT_AUDIO_MODEL.into(),
            // The projection models share weights with the encoders of the
            // space they project into.
            text_to_visual: DEFAULT_IMAGE_MODEL.into(),
            text_to_audio: DEFAULT_AUDIO_MODEL.into(),
        }
    }
}

impl ModelIds {
    pub fn for_role(&self, role: ModelRole) -> &str {
        match role {
            ModelRole::TextEncoder => &self.text_encoder,
            ModelRole::ImageEncoder => &self.image_encoder,
            ModelRole::AudioEncoder => &self.audio_encoder,
            ModelRole::TextToVisual => &self.text_to_visual,
            ModelRole::TextToAudio => &self.text_to_audio,
        }
    }
}

/// Embedding configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingConfig {
    pub models: ModelIds,
    /// Base URL of the feature-extraction inference server.
    pub inference_url: String,
    /// Per-item embedding timeout.
    pub timeout: Duration,
    pub text_batch_size: usize,
    pub visual_batch_size: usize,
    pub audio_batch_size: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            models: ModelIds::default(),
            inference_url: "http://localhost:8080".into(),
            timeout: Duration::from_secs(DEFAULT_EMBED_TIMEOUT_SECS),
            text_batch_size: DEFAULT_TEXT_BATCH_SIZE,
            visual_batch_size: DEFAULT_VISUAL_BATCH_SIZE,
            audio_batch_size: DEFAULT_AUDIO_BATCH_SIZE,
        }
    }
}

impl EmbeddingConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                          |
    /// |------------------------|----------------------------------|
    /// | `INFERENCE_URL`        | `http://localhost:8080`          |
    /// | `TEXT_MODEL`           | `Xenova/all-MiniLM-L6-v2`        |
    /// | `IMAGE_MODEL`          | `Xenova/clip-vit-base-patch32`   |
    /// | `AUDIO_MODEL`          | `Xenova/clap-htsat-unfused`      |
    /// | `TEXT_TO_VISUAL_MODEL` | `IMAGE_MODEL`                    |
    /// | `TEXT_TO_AUDIO_MODEL`  | `AUDIO_MODEL`                    |
    /// | `EMBED_TIMEOUT_SECS`   | `30`                             |
    /// | `TEXT_BATCH_SIZE`      | `32`                             |
    /// | `VISUAL_BATCH_SIZE`    | `8`                              |
    /// | `AUDIO_BATCH_SIZE`     | `8`                              |
    pub fn from_env() -> Self {
        let inference_url =
            std::env::var("INFERENCE_URL").unwrap_or_else(|_| "http://localhost:8080".into());

        let text_encoder = std::env::var("TEXT_MODEL").unwrap_or_else(|_| DEFAULT_TEXT_MODEL.into());
        let image_encoder =
            std::env::var("IMAGE_MODEL").unwrap_or_else(|_| DEFAULT_IMAGE_MODEL.into());
        let audio_encoder =
            std::env::var("AUDIO_MODEL").unwrap_or_else(|_| DEFAULT_AUDIO_MODEL.into());
        let text_to_visual =
            std::env::var("TEXT_TO_VISUAL_MODEL").unwrap_or_else(|_| image_encoder.clone());
        let text_to_audio =
            std::env::var("TEXT_TO_AUDIO_MODEL").unwrap_or_else(|_| audio_encoder.clone());

        let timeout_secs: u64 = std::env::var("EMBED_TIMEOUT_SECS")
            .unwrap_or_else(|_| DEFAULT_EMBED_TIMEOUT_SECS.to_string())
            .parse()
            .expect("EMBED_TIMEOUT_SECS must be a valid u64");

        Self {
            models: ModelIds {
                text_encoder,
                image_encoder,
                audio_encoder,
                text_to_visual,
                text_to_audio,
            },
            inference_url,
            timeout: Duration::from_secs(timeout_secs),
            text_batch_size: batch_size("TEXT_BATCH_SIZE", DEFAULT_TEXT_BATCH_SIZE),
            visual_batch_size: batch_size("VISUAL_BATCH_SIZE", DEFAULT_VISUAL_BATCH_SIZE),
            audio_batch_size: batch_size("AUDIO_BATCH_SIZE", DEFAULT_AUDIO_BATCH_SIZE),
        }
    }
}

fn batch_size(var: &str, default: usize) -> usize {
    let size: usize = std::env::var(var)
        .map(|v| v.parse().unwrap_or_else(|_| panic!("{var} must be a valid usize")))
        .unwrap_or(default);
    assert!(size > 0, "{var} must be greater than zero");
    size
}
