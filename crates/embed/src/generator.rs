//! Embedding generation for every modality.
//!
//! Each model call is wrapped in the configured timeout. Text batches
//! degrade per item (zero vector), frame sets degrade per frame (skip), and
//! single-input calls return the error. Model load failures always
//! propagate.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use reelsearch_core::vector::{first_non_finite, l2_normalize, mean_vector, zero_vector};

use crate::cache::ExtractorCache;
use crate::config::EmbeddingConfig;
use crate::error::EmbedError;
use crate::extractor::{ExtractorInput, FeatureExtractor};
use crate::preprocess;

// ---------------------------------------------------------------------------
// Text batch aggregation
// ---------------------------------------------------------------------------

/// Per-item text results folded into one vector list.
#[derive(Debug, Clone, PartialEq)]
pub struct TextBatch {
    pub vectors: Vec<Vec<f32>>,
    /// Number of items replaced by the zero vector.
    pub fallbacks: usize,
}

impl TextBatch {
    /// Replace every failed item with a zero vector of `dimension`.
    pub fn with_fallback(results: Vec<Result<Vec<f32>, EmbedError>>, dimension: usize) -> Self {
        let mut fallbacks = 0;
        let vectors = results
            .into_iter()
            .enumerate()
            .map(|(index, result)| match result {
                Ok(v) => v,
                Err(e) => {
                    tracing::warn!(index, error = %e, "Text embedding failed, using zero vector");
                    fallbacks += 1;
                    zero_vector(dimension)
                }
            })
            .collect();
        Self { vectors, fallbacks }
    }
}

// ---------------------------------------------------------------------------
// Generator
// ---------------------------------------------------------------------------

pub struct EmbeddingGenerator {
    cache: Arc<ExtractorCache>,
    timeout: Duration,
    text_batch_size: usize,
    visual_batch_size: usize,
    audio_batch_size: usize,
}

impl EmbeddingGenerator {
    pub fn new(cache: Arc<ExtractorCache>, config: &EmbeddingConfig) -> Self {
        Self {
            cache,
            timeout: config.timeout,
            text_batch_size: config.text_batch_size.max(1),
            visual_batch_size: config.visual_batch_size.max(1),
            audio_batch_size: config.audio_batch_size.max(1),
        }
    }

    pub fn cache(&self) -> &Arc<ExtractorCache> {
        &self.cache
    }

    /// Dimension of the text space, loading the encoder if needed.
    pub async fn text_dimension(&self) -> Result<usize, EmbedError> {
        Ok(self.cache.text_encoder().await?.dimension())
    }

    // ---- text ----

    /// Embed each text, returning one result per input in order.
    ///
    /// The outer error is a model load failure; inner errors are per item.
    pub async fn embed_text_each(
        &self,
        texts: &[String],
    ) -> Result<Vec<Result<Vec<f32>, EmbedError>>, EmbedError> {
        let encoder = self.cache.text_encoder().await?;
        let mut results = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.text_batch_size) {
            let futures = batch.iter().map(|text| {
                let encoder = Arc::clone(&encoder);
                let input = ExtractorInput::Text(text.clone());
                async move { self.timed(encoder.extract(&input)).await }
            });
            results.extend(join_all(futures).await);
        }
        Ok(results)
    }

    /// Embed texts, replacing failed items with zero vectors.
    ///
    /// Vectors are normalized by the encoder itself (mean pooling with
    /// `normalize = true`), not here.
    pub async fn embed_text(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        let encoder = self.cache.text_encoder().await?;
        let results = self.embed_text_each(texts).await?;
        let batch = TextBatch::with_fallback(results, encoder.dimension());
        if batch.fallbacks > 0 {
            tracing::warn!(
                total = texts.len(),
                fallbacks = batch.fallbacks,
                "Text batch embedded with fallbacks"
            );
        }
        Ok(batch.vectors)
    }

    /// Embed a single search query. Unlike [`Self::embed_text`], a failure
    /// is returned rather than replaced, since a zero query matches nothing.
    pub async fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let encoder = self.cache.text_encoder().await?;
        let vector = self
            .timed(encoder.extract(&ExtractorInput::Text(text.to_string())))
            .await?;
        if let Some(index) = first_non_finite(&vector) {
            return Err(EmbedError::Degenerate(format!(
                "query embedding has non-finite value at index {index}"
            )));
        }
        Ok(vector)
    }

    // ---- visual ----

    /// Embed an encoded image (query images, thumbnails).
    pub async fn embed_image(&self, bytes: Vec<u8>) -> Result<Vec<f32>, EmbedError> {
        let encoder = self.cache.image_encoder().await?;
        let input = blocking(move || preprocess::image_tensor(&bytes)).await?;
        let vector = self.timed(encoder.extract(&input)).await?;
        normalized(vector, "image")
    }

    /// Embed a scene's keyframes into one visual vector.
    ///
    /// Frames that cannot be read or embedded are skipped. Returns
    /// `Ok(None)` when no frame succeeds, which means "no visual signal".
    pub async fn embed_frames(&self, paths: &[PathBuf]) -> Result<Option<Vec<f32>>, EmbedError> {
        if paths.is_empty() {
            return Ok(None);
        }
        let encoder = self.cache.image_encoder().await?;

        let mut frames = Vec::with_capacity(paths.len());
        for batch in paths.chunks(self.visual_batch_size) {
            let futures = batch
                .iter()
                .map(|path| self.embed_frame(Arc::clone(&encoder), path.clone()));
            for (path, result) in batch.iter().zip(join_all(futures).await) {
                match result {
                    Ok(vector) => frames.push(vector),
                    Err(e) => {
                        tracing::warn!(frame = %path.display(), error = %e, "Skipping keyframe")
                    }
                }
            }
        }

        let Some(mut mean) = mean_vector(&frames) else {
            return Ok(None);
        };
        if !l2_normalize(&mut mean) {
            tracing::warn!(frames = frames.len(), "Keyframe vectors cancel out, no visual signal");
            return Ok(None);
        }
        Ok(Some(mean))
    }

    /// Embed the keyframe sets of many scenes, `visual_batch_size` scenes
    /// at a time. One entry per input set, in order.
    pub async fn embed_frame_sets(
        &self,
        sets: &[Vec<PathBuf>],
    ) -> Result<Vec<Option<Vec<f32>>>, EmbedError> {
        let mut vectors = Vec::with_capacity(sets.len());
        for batch in sets.chunks(self.visual_batch_size) {
            let results = join_all(batch.iter().map(|paths| self.embed_frames(paths))).await;
            for result in results {
                vectors.push(result?);
            }
        }
        Ok(vectors)
    }

    async fn embed_frame(
        &self,
        encoder: Arc<dyn FeatureExtractor>,
        path: PathBuf,
    ) -> Result<Vec<f32>, EmbedError> {
        let input = blocking(move || preprocess::image_file_tensor(&path)).await?;
        let vector = self.timed(encoder.extract(&input)).await?;
        normalized(vector, "keyframe")
    }

    // ---- audio ----

    /// Embed a WAV clip into the audio space.
    pub async fn embed_audio(&self, path: &Path) -> Result<Vec<f32>, EmbedError> {
        let encoder = self.cache.audio_encoder().await?;
        let owned = path.to_path_buf();
        let input = blocking(move || preprocess::audio_samples(&owned)).await?;
        let vector = self.timed(encoder.extract(&input)).await?;
        normalized(vector, "audio")
    }

    /// Embed many WAV clips, `audio_batch_size` at a time.
    ///
    /// The outer error is a model load failure; inner errors are per clip.
    pub async fn embed_audio_each(
        &self,
        paths: &[PathBuf],
    ) -> Result<Vec<Result<Vec<f32>, EmbedError>>, EmbedError> {
        if paths.is_empty() {
            return Ok(Vec::new());
        }
        self.cache.audio_encoder().await?;

        let mut results = Vec::with_capacity(paths.len());
        for batch in paths.chunks(self.audio_batch_size) {
            let futures = batch.iter().map(|path| self.embed_audio(path));
            for result in join_all(futures).await {
                match result {
                    Err(e @ EmbedError::ModelLoad { .. }) => return Err(e),
                    other => results.push(other),
                }
            }
        }
        Ok(results)
    }

    // ---- cross-modal text ----

    /// Project text into the visual space.
    pub async fn embed_text_for_visual_space(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let projector = self.cache.text_to_visual().await?;
        let vector = self
            .timed(projector.extract(&ExtractorInput::Text(text.to_string())))
            .await?;
        normalized(vector, "text-to-visual")
    }

    /// Project text into the audio space.
    pub async fn embed_text_for_audio_space(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let projector = self.cache.text_to_audio().await?;
        let vector = self
            .timed(projector.extract(&ExtractorInput::Text(text.to_string())))
            .await?;
        normalized(vector, "text-to-audio")
    }

    // ---- private helpers ----

    async fn timed<F>(&self, future: F) -> Result<Vec<f32>, EmbedError>
    where
        F: Future<Output = Result<Vec<f32>, EmbedError>>,
    {
        tokio::time::timeout(self.timeout, future)
            .await
            .map_err(|_| EmbedError::Timeout(self.timeout))?
    }
}

/// Reject non-finite output and scale to unit length.
fn normalized(mut vector: Vec<f32>, what: &str) -> Result<Vec<f32>, EmbedError> {
    if let Some(index) = first_non_finite(&vector) {
        return Err(EmbedError::Degenerate(format!(
            "{what} embedding has non-finite value at index {index}"
        )));
    }
    if !l2_normalize(&mut vector) {
        return Err(EmbedError::Degenerate(format!("{what} embedding has zero norm")));
    }
    Ok(vector)
}

async fn blocking<T, F>(f: F) -> Result<T, EmbedError>
where
    F: FnOnce() -> Result<T, EmbedError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| EmbedError::Decode(format!("decode task failed: {e}")))?
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
