//! Shared fixtures for engine integration tests.
//!
//! The fake models are deterministic: text is a bag of words over a small
//! vocabulary, images are per-channel pixel means, audio is constant.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use reelsearch_core::scene::Scene;
use reelsearch_core::scene_store::InMemorySceneStore;
use reelsearch_embed::{
    EmbedError, EmbeddingConfig, EmbeddingGenerator, ExtractorCache, ExtractorInput,
    ExtractorLoader, FeatureExtractor, ModelRole,
};
use reelsearch_search::{EngineConfig, IndexRequest, RetrievalEngine, SidecarMediaSource};
use reelsearch_vectors::{Collections, GetRequest, VectorCollection};
use tempfile::TempDir;

/// Dimension of the fake visual and audio spaces.
pub const MEDIA_DIM: usize = 8;

/// Words the fake text encoder knows; anything else is ignored.
pub const VOCAB: &[&str] = &[
    "car", "chase", "red", "downtown", "bob", "cooking", "kitchen", "alice", "beach", "sunset",
    "highway", "dog",
];

pub const VIDEO_A: &str = "/videos/a.mp4";
pub const VIDEO_B: &str = "/videos/b.mp4";

pub const RED: [u8; 3] = [255, 0, 0];
pub const BLUE: [u8; 3] = [0, 0, 255];

// ---------------------------------------------------------------------------
// Fake models
// ---------------------------------------------------------------------------

struct FakeExtractor {
    role: ModelRole,
}

#[async_trait]
impl FeatureExtractor for FakeExtractor {
    fn model(&self) -> &str {
        self.role.as_str()
    }

    fn dimension(&self) -> usize {
        match self.role {
            ModelRole::TextEncoder => VOCAB.len(),
            _ => MEDIA_DIM,
        }
    }

    async fn extract(&self, input: &ExtractorInput) -> Result<Vec<f32>, EmbedError> {
        match input {
            ExtractorInput::Text(text) => Ok(bag_of_words(text)),
            ExtractorInput::Image { pixels, shape } => {
                let plane = shape[1] * shape[2];
                let mut v = vec![0f32; MEDIA_DIM];
                for (c, slot) in v.iter_mut().enumerate().take(shape[0]) {
                    let channel = &pixels[c * plane..(c + 1) * plane];
                    *slot = channel.iter().sum::<f32>() / plane as f32;
                }
                Ok(v)
            }
            ExtractorInput::Audio { .. } => {
                let mut v = vec![0f32; MEDIA_DIM];
                v[0] = 1.0;
                Ok(v)
            }
        }
    }
}

/// Normalized word counts over [`VOCAB`].
pub fn bag_of_words(text: &str) -> Vec<f32> {
    let mut v = vec![0f32; VOCAB.len()];
    for token in text
        .split(|c: char| !c.is_alphanumeric())
        .map(str::to_lowercase)
    {
        if let Some(i) = VOCAB.iter().position(|w| *w == token) {
            v[i] += 1.0;
        }
    }
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        v.iter_mut().for_each(|x| *x /= norm);
    }
    v
}

struct FakeLoader;

#[async_trait]
impl ExtractorLoader for FakeLoader {
    async fn load(
        &self,
        role: ModelRole,
        _model: &str,
    ) -> Result<Arc<dyn FeatureExtractor>, EmbedError> {
        Ok(Arc::new(FakeExtractor { role }))
    }
}

/// Loads every model except the image encoder.
struct NoImageLoader;

#[async_trait]
impl ExtractorLoader for NoImageLoader {
    async fn load(
        &self,
        role: ModelRole,
        model: &str,
    ) -> Result<Arc<dyn FeatureExtractor>, EmbedError> {
        match role {
            ModelRole::ImageEncoder => Err(EmbedError::ModelLoad {
                model: model.to_string(),
                reason: "weights missing".into(),
            }),
            _ => FakeLoader.load(role, model).await,
        }
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// An engine over in-memory stores. Keep the `TempDir` alive for the test.
pub struct TestEngine {
    pub engine: RetrievalEngine,
    pub media: SidecarMediaSource,
    _media_dir: TempDir,
}

pub fn build_engine() -> TestEngine {
    build_engine_with(|_| {})
}

/// Like [`build_engine`], with a hook to adjust the engine config.
pub fn build_engine_with(configure: impl FnOnce(&mut EngineConfig)) -> TestEngine {
    build(Arc::new(FakeLoader), configure)
}

/// An engine whose image encoder fails to load.
pub fn build_engine_without_image_model() -> TestEngine {
    build(Arc::new(NoImageLoader), |_| {})
}

fn build(
    loader: Arc<dyn ExtractorLoader>,
    configure: impl FnOnce(&mut EngineConfig),
) -> TestEngine {
    let media_dir = tempfile::tempdir().unwrap();
    let mut config = EngineConfig {
        media_root: media_dir.path().to_path_buf(),
        ..Default::default()
    };
    config.writer.visual_dimension = MEDIA_DIM;
    config.writer.audio_dimension = MEDIA_DIM;
    configure(&mut config);

    let embedding = EmbeddingConfig::default();
    let cache = Arc::new(ExtractorCache::new(loader, embedding.models.clone()));
    let generator = Arc::new(EmbeddingGenerator::new(cache, &embedding));

    let engine = RetrievalEngine::new(
        generator,
        Collections::in_memory(),
        Arc::new(InMemorySceneStore::new()),
        Arc::new(SidecarMediaSource::new(media_dir.path())),
        config,
    );
    TestEngine {
        engine,
        media: SidecarMediaSource::new(media_dir.path()),
        _media_dir: media_dir,
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub fn scene(source: &str, start: f64, description: &str, faces: &[&str]) -> Scene {
    let mut scene = Scene::new(source, start, start + 5.0);
    scene.description = description.to_string();
    scene.faces = faces.iter().map(|f| f.to_string()).collect();
    scene
}

/// Four scenes over two videos.
///
/// | scene | video | description                         | faces      |
/// |-------|-------|-------------------------------------|------------|
/// | 0     | a     | a red car chase downtown            | Alice      |
/// | 1     | a     | bob cooking in a kitchen            | Bob        |
/// | 2     | a     | alice and bob at the beach at sunset | Alice, Bob |
/// | 3     | b     | a car chase on the highway          |            |
pub fn library() -> Vec<Scene> {
    vec![
        scene(VIDEO_A, 0.0, "a red car chase downtown", &["Alice"]),
        scene(VIDEO_A, 5.0, "bob cooking in a kitchen", &["Bob"]),
        scene(VIDEO_A, 10.0, "alice and bob at the beach at sunset", &["Alice", "Bob"]),
        scene(VIDEO_B, 0.0, "a car chase on the highway", &[]),
    ]
}

pub fn requests(scenes: &[Scene]) -> Vec<IndexRequest> {
    scenes
        .iter()
        .map(|s| IndexRequest {
            scene: s.clone(),
            video_path: PathBuf::from(&s.source_path),
        })
        .collect()
}

/// Write a solid-colour keyframe into the scene's sidecar directory.
pub fn write_keyframe(media: &SidecarMediaSource, scene: &Scene, name: &str, color: [u8; 3]) {
    let dir = media.scene_dir(&scene.id);
    std::fs::create_dir_all(&dir).unwrap();
    RgbImage::from_pixel(4, 4, Rgb(color))
        .save(dir.join(name))
        .unwrap();
}

/// Write a short mono WAV clip into the scene's sidecar directory.
pub fn write_audio(media: &SidecarMediaSource, scene: &Scene) {
    let dir = media.scene_dir(&scene.id);
    std::fs::create_dir_all(&dir).unwrap();
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 16_000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(dir.join("audio.wav"), spec).unwrap();
    for i in 0..1600 {
        writer.write_sample(((i % 32) * 1000) as i16).unwrap();
    }
    writer.finalize().unwrap();
}

/// Drop the scene's sidecar directory.
pub fn clear_media(media: &SidecarMediaSource, scene: &Scene) {
    std::fs::remove_dir_all(media.scene_dir(&scene.id)).unwrap();
}

/// Put a plain file where the scene's sidecar directory should be, so the
/// media lookup fails.
pub fn break_media(media: &SidecarMediaSource, scene: &Scene) {
    std::fs::write(media.scene_dir(&scene.id), b"not a directory").unwrap();
}

/// A solid-colour PNG as query bytes.
pub fn png_bytes(color: [u8; 3]) -> Vec<u8> {
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 4, Rgb(color)))
        .write_to(&mut std::io::Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

/// Number of records stored in a collection.
pub async fn count(collection: &Arc<dyn VectorCollection>) -> usize {
    collection
        .get(GetRequest::by_filter(None, None, None))
        .await
        .unwrap()
        .len()
}

pub fn ids(scenes: &[Scene]) -> Vec<String> {
    scenes.iter().map(|s| s.id.clone()).collect()
}
