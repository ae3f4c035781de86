//! Boundary to the external frame/audio extraction step.
//!
//! Extraction itself (ffmpeg) runs elsewhere and leaves per-scene sidecar
//! files behind. A [`MediaSource`] tells the indexer where they are.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use reelsearch_core::error::CoreError;
use reelsearch_core::scene::Scene;

/// Extracted media for one scene. Both parts may be absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneMedia {
    pub keyframes: Vec<PathBuf>,
    pub audio: Option<PathBuf>,
}

#[async_trait]
pub trait MediaSource: Send + Sync {
    async fn scene_media(&self, scene: &Scene, video_path: &Path) -> Result<SceneMedia, CoreError>;
}

/// No extracted media; scenes are indexed as text only.
pub struct NoMedia;

#[async_trait]
impl MediaSource for NoMedia {
    async fn scene_media(&self, _scene: &Scene, _video_path: &Path) -> Result<SceneMedia, CoreError> {
        Ok(SceneMedia::default())
    }
}

/// Reads `<root>/<scene_id>/`: every `.jpg`, `.jpeg` or `.png` file is a
/// keyframe (sorted by name) and `audio.wav` is the audio clip.
pub struct SidecarMediaSource {
    root: PathBuf,
}

const KEYFRAME_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];
const AUDIO_FILE: &str = "audio.wav";

impl SidecarMediaSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn scene_dir(&self, scene_id: &str) -> PathBuf {
        self.root.join(scene_id)
    }
}

fn is_keyframe(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| KEYFRAME_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
}

#[async_trait]
impl MediaSource for SidecarMediaSource {
    async fn scene_media(&self, scene: &Scene, _video_path: &Path) -> Result<SceneMedia, CoreError> {
        let dir = self.scene_dir(&scene.id);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(scene_id = %scene.id, dir = %dir.display(), "No media sidecar");
                return Ok(SceneMedia::default());
            }
            Err(e) => {
                return Err(CoreError::Internal(format!(
                    "Failed to read media dir {}: {e}",
                    dir.display()
                )))
            }
        };

        let mut media = SceneMedia::default();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| CoreError::Internal(format!("Failed to list {}: {e}", dir.display())))?
        {
            let path = entry.path();
            if path.file_name().and_then(|n| n.to_str()) == Some(AUDIO_FILE) {
                media.audio = Some(path);
            } else if is_keyframe(&path) {
                media.keyframes.push(path);
            }
        }
        media.keyframes.sort();
        Ok(media)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_dir_means_no_media() {
        let root = tempfile::tempdir().unwrap();
        let source = SidecarMediaSource::new(root.path());
        let scene = Scene::new("/v.mp4", 0.0, 1.0);
        let media = source.scene_media(&scene, Path::new("/v.mp4")).await.unwrap();
        assert_eq!(media, SceneMedia::default());
    }

    #[tokio::test]
    async fn keyframes_sorted_and_audio_found() {
        let root = tempfile::tempdir().unwrap();
        let scene = Scene::new("/v.mp4", 0.0, 1.0);
        let source = SidecarMediaSource::new(root.path());
        let dir = source.scene_dir(&scene.id);
        std::fs::create_dir_all(&dir).unwrap();
        for name in ["b.jpg", "a.PNG", "notes.txt", "audio.wav"] {
            std::fs::write(dir.join(name), b"x").unwrap();
        }

        let media = source.scene_media(&scene, Path::new("/v.mp4")).await.unwrap();
        let names: Vec<_> = media
            .keyframes
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["a.PNG", "b.jpg"]);
        assert_eq!(media.audio, Some(dir.join("audio.wav")));
    }
}
