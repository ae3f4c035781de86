//! Scene indexing and source removal.
//!
//! Indexing a batch of scenes:
//!
//! 1. validate each scene and derive missing ids
//! 2. embed text, keyframes and audio clips in batches
//! 3. record the scenes in the scene store
//! 4. write the vectors, replacing earlier records with the same ids
//!
//! Scenes without usable keyframes or audio are counted as skipped for that
//! modality and any earlier vector in that collection is deleted. A failed
//! media lookup is reported per scene and leaves that scene's visual and
//! audio vectors untouched. Only model load failures, validation errors and
//! scene store errors abort the call, and all of them happen before any
//! vector is written.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use reelsearch_core::filters::Filters;
use reelsearch_core::metadata::{metadata_to_json, scene_metadata};
use reelsearch_core::scene::Scene;
use reelsearch_core::vector::Modality;
use reelsearch_vectors::{GetRequest, VectorRecord, WriteReport};
use serde::{Deserialize, Serialize};

use crate::engine::RetrievalEngine;
use crate::error::SearchError;
use crate::media::SceneMedia;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One scene to index together with the video it was cut from.
#[derive(Debug, Clone, Deserialize)]
pub struct IndexRequest {
    pub scene: Scene,
    pub video_path: PathBuf,
}

/// Per-chunk write failure, tagged with its collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexError {
    pub collection: Modality,
    pub chunk: usize,
    pub error: String,
}

/// A scene whose media could not be looked up.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SceneError {
    pub scene_id: String,
    pub error: String,
}

/// Outcome of an indexing call.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IndexReport {
    pub scenes: usize,
    pub text: usize,
    pub visual: usize,
    pub audio: usize,
    pub skipped_visual: usize,
    pub skipped_audio: usize,
    pub errors: Vec<IndexError>,
    pub failed_scenes: Vec<SceneError>,
}

impl IndexReport {
    fn absorb(&mut self, modality: Modality, report: WriteReport) {
        match modality {
            Modality::Text => self.text += report.written,
            Modality::Visual => self.visual += report.written,
            Modality::Audio => self.audio += report.written,
        }
        self.errors
            .extend(report.errors.into_iter().map(|e| IndexError {
                collection: modality,
                chunk: e.chunk,
                error: e.error,
            }));
    }
}

/// Ids and counts removed for one source video.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RemovalReport {
    pub source_path: String,
    pub scene_ids: Vec<String>,
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

impl RetrievalEngine {
    /// Index a single scene.
    pub async fn index_scene(
        &self,
        scene: Scene,
        video_path: &Path,
    ) -> Result<IndexReport, SearchError> {
        self.index_scenes(vec![IndexRequest {
            scene,
            video_path: video_path.to_path_buf(),
        }])
        .await
    }

    /// Index a batch of scenes into all three collections.
    pub async fn index_scenes(
        &self,
        requests: Vec<IndexRequest>,
    ) -> Result<IndexReport, SearchError> {
        let mut requests = requests;
        for request in &mut requests {
            request.scene.ensure_id();
            request.scene.validate()?;
        }
        let mut report = IndexReport {
            scenes: requests.len(),
            ..Default::default()
        };
        if requests.is_empty() {
            return Ok(report);
        }

        // -- embed --
        let texts: Vec<String> = requests.iter().map(|r| r.scene.embedding_text()).collect();
        let text_vectors = self.generator.embed_text(&texts).await?;

        let mut media = Vec::with_capacity(requests.len());
        for request in &requests {
            match self.media.scene_media(&request.scene, &request.video_path).await {
                Ok(found) => media.push(Some(found)),
                Err(e) => {
                    tracing::warn!(scene_id = %request.scene.id, error = %e, "Media lookup failed");
                    report.failed_scenes.push(SceneError {
                        scene_id: request.scene.id.clone(),
                        error: e.to_string(),
                    });
                    media.push(None);
                }
            }
        }

        let keyframes: Vec<Vec<PathBuf>> = media
            .iter()
            .map(|m| m.as_ref().map(|m| m.keyframes.clone()).unwrap_or_default())
            .collect();
        let frame_vectors = self.generator.embed_frame_sets(&keyframes).await?;
        let audio_vectors = self.embed_clips(&requests, &media).await?;

        // -- store --
        for request in &requests {
            self.scenes.upsert(&request.scene).await?;
        }

        // -- write --
        let records: Vec<VectorRecord> = requests
            .iter()
            .zip(text_vectors)
            .map(|(r, vector)| scene_record(&r.scene, vector))
            .collect();
        report.absorb(
            Modality::Text,
            self.writer.write_chunked(Modality::Text, records).await,
        );

        let mut visual = Vec::new();
        let mut audio = Vec::new();
        let mut stale_visual = Vec::new();
        let mut stale_audio = Vec::new();
        let rows = requests.iter().zip(&media).zip(frame_vectors).zip(audio_vectors);
        for (((request, found), frames), clip) in rows {
            let scene = &request.scene;
            match frames {
                Some(vector) => visual.push(scene_record(scene, vector)),
                None => {
                    report.skipped_visual += 1;
                    if found.is_some() {
                        stale_visual.push(scene.id.clone());
                    }
                }
            }
            match clip {
                Some(vector) => audio.push(scene_record(scene, vector)),
                None => {
                    report.skipped_audio += 1;
                    if found.is_some() {
                        stale_audio.push(scene.id.clone());
                    }
                }
            }
        }

        for (modality, stale) in [(Modality::Visual, stale_visual), (Modality::Audio, stale_audio)] {
            if !stale.is_empty() {
                self.writer.delete(modality, &stale).await?;
            }
        }
        if !visual.is_empty() {
            report.absorb(
                Modality::Visual,
                self.writer.write_chunked(Modality::Visual, visual).await,
            );
        }
        if !audio.is_empty() {
            report.absorb(
                Modality::Audio,
                self.writer.write_chunked(Modality::Audio, audio).await,
            );
        }

        tracing::info!(
            scenes = report.scenes,
            text = report.text,
            visual = report.visual,
            audio = report.audio,
            errors = report.errors.len(),
            failed_scenes = report.failed_scenes.len(),
            "Indexed scenes"
        );
        Ok(report)
    }

    /// Audio vectors for every request, `None` where there is no clip or
    /// the clip could not be embedded.
    async fn embed_clips(
        &self,
        requests: &[IndexRequest],
        media: &[Option<SceneMedia>],
    ) -> Result<Vec<Option<Vec<f32>>>, SearchError> {
        let clips: Vec<(usize, PathBuf)> = media
            .iter()
            .enumerate()
            .filter_map(|(i, m)| Some((i, m.as_ref()?.audio.clone()?)))
            .collect();
        let paths: Vec<PathBuf> = clips.iter().map(|(_, path)| path.clone()).collect();
        let results = self.generator.embed_audio_each(&paths).await?;

        let mut vectors = vec![None; requests.len()];
        for ((index, _), result) in clips.into_iter().zip(results) {
            match result {
                Ok(vector) => vectors[index] = Some(vector),
                Err(e) => {
                    let scene_id = &requests[index].scene.id;
                    tracing::warn!(%scene_id, error = %e, "Audio embedding failed");
                }
            }
        }
        Ok(vectors)
    }

    /// Delete a source video's scenes from the scene store and from every
    /// vector collection.
    pub async fn remove_source(&self, source_path: &str) -> Result<RemovalReport, SearchError> {
        let mut ids: BTreeSet<String> = self.scenes.delete_source(source_path).await?.into_iter().collect();

        // Vectors can outlive their scene rows; sweep by metadata as well.
        let scope = Filters::scope_only(&[source_path.to_string()]);
        for modality in Modality::ALL {
            let collection = self.collections().for_modality(modality);
            let stored = collection
                .get(GetRequest {
                    include: Vec::new(),
                    ..GetRequest::by_filter(Some(scope.metadata.clone()), None, None)
                })
                .await?;
            ids.extend(stored.into_iter().map(|r| r.id));
        }

        let ids: Vec<String> = ids.into_iter().collect();
        for modality in Modality::ALL {
            self.writer.delete(modality, &ids).await?;
        }

        tracing::info!(source_path, scenes = ids.len(), "Removed source video");
        Ok(RemovalReport {
            source_path: source_path.to_string(),
            scene_ids: ids,
        })
    }
}

/// The vector record of `scene` in any modality.
fn scene_record(scene: &Scene, vector: Vec<f32>) -> VectorRecord {
    VectorRecord {
        id: scene.id.clone(),
        vector,
        metadata: Some(metadata_to_json(&scene_metadata(scene))),
        document: Some(scene.document_text()),
    }
}
