//! Boundary to the external scene store.
//!
//! The relational database owns scene rows. The retrieval engine records
//! the scenes it indexes and lists every scene of a source video to give
//! matched scenes their full context. [`InMemorySceneStore`] backs tests
//! and local runs.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::CoreError;
use crate::scene::Scene;

/// Scenes grouped by source video.
#[async_trait]
pub trait SceneStore: Send + Sync {
    /// All scenes of `source_path`, ordered by start time.
    async fn scenes_by_source(&self, source_path: &str) -> Result<Vec<Scene>, CoreError>;

    /// Insert a scene or replace the one with the same id.
    async fn upsert(&self, scene: &Scene) -> Result<(), CoreError>;

    /// Remove every scene of `source_path`, returning the removed ids.
    async fn delete_source(&self, source_path: &str) -> Result<Vec<String>, CoreError>;
}

/// A process-local scene store keyed by source path.
#[derive(Default)]
pub struct InMemorySceneStore {
    scenes: RwLock<HashMap<String, Vec<Scene>>>,
}

impl InMemorySceneStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SceneStore for InMemorySceneStore {
    async fn scenes_by_source(&self, source_path: &str) -> Result<Vec<Scene>, CoreError> {
        Ok(self
            .scenes
            .read()
            .await
            .get(source_path)
            .cloned()
            .unwrap_or_default())
    }

    async fn upsert(&self, scene: &Scene) -> Result<(), CoreError> {
        let mut guard = self.scenes.write().await;
        let list = guard.entry(scene.source_path.clone()).or_default();
        list.retain(|s| s.id != scene.id);
        list.push(scene.clone());
        list.sort_by(|a, b| {
            a.start_time
                .partial_cmp(&b.start_time)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Ok(())
    }

    async fn delete_source(&self, source_path: &str) -> Result<Vec<String>, CoreError> {
        Ok(self
            .scenes
            .write()
            .await
            .remove(source_path)
            .unwrap_or_default()
            .into_iter()
            .map(|s| s.id)
            .collect())
    }
}
