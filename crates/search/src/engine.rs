//! The retrieval engine: one handle over the generator, the vector
//! collections, the scene store and the media source.
//!
//! Operations live in sibling modules as `impl RetrievalEngine` blocks:
//! [`crate::indexer`], [`crate::semantic`], [`crate::visual`] and
//! [`crate::similar`].

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use reelsearch_core::metadata::scene_from_metadata;
use reelsearch_core::scene::Scene;
use reelsearch_core::scene_store::SceneStore;
use reelsearch_embed::EmbeddingGenerator;
use reelsearch_vectors::{Collections, StoredRecord, VectorWriter};

use crate::config::EngineConfig;
use crate::media::MediaSource;

pub struct RetrievalEngine {
    pub(crate) generator: Arc<EmbeddingGenerator>,
    pub(crate) writer: VectorWriter,
    pub(crate) scenes: Arc<dyn SceneStore>,
    pub(crate) media: Arc<dyn MediaSource>,
    pub(crate) config: EngineConfig,
}

impl RetrievalEngine {
    pub fn new(
        generator: Arc<EmbeddingGenerator>,
        collections: Collections,
        scenes: Arc<dyn SceneStore>,
        media: Arc<dyn MediaSource>,
        config: EngineConfig,
    ) -> Self {
        Self {
            generator,
            writer: VectorWriter::new(collections, config.writer),
            scenes,
            media,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn generator(&self) -> &Arc<EmbeddingGenerator> {
        &self.generator
    }

    pub fn collections(&self) -> &Collections {
        self.writer.collections()
    }

    pub fn scene_store(&self) -> &Arc<dyn SceneStore> {
        &self.scenes
    }

    /// Full scene lists for the sources of `hits`, keyed by source path.
    ///
    /// Context only: a failed lookup is logged and the video is shown with
    /// its matched scenes alone.
    pub(crate) async fn siblings_for(&self, hits: &[(Scene, f64)]) -> HashMap<String, Vec<Scene>> {
        let sources: HashSet<&str> = hits.iter().map(|(s, _)| s.source_path.as_str()).collect();
        let mut siblings = HashMap::with_capacity(sources.len());
        for source in sources {
            match self.scenes.scenes_by_source(source).await {
                Ok(scenes) => {
                    siblings.insert(source.to_string(), scenes);
                }
                Err(e) => {
                    tracing::warn!(source_path = source, error = %e, "Scene store lookup failed");
                }
            }
        }
        siblings
    }
}

/// Rebuild the scene of a stored record, skipping records whose metadata
/// is missing or incomplete.
pub(crate) fn record_scene(record: &StoredRecord) -> Option<Scene> {
    let Some(metadata) = record.metadata.as_ref() else {
        tracing::warn!(id = %record.id, "Vector record without metadata");
        return None;
    };
    match scene_from_metadata(&record.id, metadata) {
        Ok(scene) => Some(scene),
        Err(e) => {
            tracing::warn!(id = %record.id, error = %e, "Unreadable vector metadata");
            None
        }
    }
}
