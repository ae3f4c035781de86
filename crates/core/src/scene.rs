//! Scene model and video aggregation.
//!
//! A [`Scene`] is the atomic retrievable unit. [`VideoWithScenes`] is never
//! stored; it is assembled on read by grouping scenes that share a source
//! path, marking which of them actually matched the query.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::hashing::scene_id;
use crate::types::{SceneId, Timestamp};

// ---------------------------------------------------------------------------
// Scene
// ---------------------------------------------------------------------------

/// A time-bounded segment of a source video with its extracted metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    /// Derived from `(source_path, start_time, end_time)`; filled in by
    /// [`Scene::ensure_id`] when omitted by the caller.
    #[serde(default)]
    pub id: SceneId,
    pub source_path: String,
    pub start_time: f64,
    pub end_time: f64,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub transcription: Option<String>,
    #[serde(default)]
    pub faces: Vec<String>,
    #[serde(default)]
    pub objects: Vec<String>,
    #[serde(default)]
    pub emotions: Vec<String>,
    #[serde(default)]
    pub detected_text: Vec<String>,
    #[serde(default)]
    pub shot_type: Option<String>,
    #[serde(default)]
    pub camera: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub aspect_ratio: Option<String>,
    #[serde(default = "chrono::Utc::now")]
    pub created_at: Timestamp,
    #[serde(default)]
    pub thumbnail: Option<String>,
}

impl Scene {
    /// Create an empty scene for the given segment with a derived id.
    pub fn new(source_path: impl Into<String>, start_time: f64, end_time: f64) -> Self {
        let source_path = source_path.into();
        Self {
            id: scene_id(&source_path, start_time, end_time),
            source_path,
            start_time,
            end_time,
            description: String::new(),
            transcription: None,
            faces: Vec::new(),
            objects: Vec::new(),
            emotions: Vec::new(),
            detected_text: Vec::new(),
            shot_type: None,
            camera: None,
            location: None,
            aspect_ratio: None,
            created_at: chrono::Utc::now(),
            thumbnail: None,
        }
    }

    /// The id this scene must carry given its source and time range.
    pub fn derived_id(&self) -> SceneId {
        scene_id(&self.source_path, self.start_time, self.end_time)
    }

    /// Fill in the derived id when the caller left it blank.
    pub fn ensure_id(&mut self) {
        if self.id.is_empty() {
            self.id = self.derived_id();
        }
    }

    /// Check the scene invariants.
    ///
    /// - `source_path` is non-empty.
    /// - Times are finite and `start_time < end_time`.
    /// - A caller-provided id equals the derived id.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.source_path.trim().is_empty() {
            return Err(CoreError::Validation(
                "Scene source_path must not be empty".into(),
            ));
        }
        if !self.start_time.is_finite() || !self.end_time.is_finite() {
            return Err(CoreError::Validation(format!(
                "Scene times must be finite, got {}..{}",
                self.start_time, self.end_time
            )));
        }
        if self.start_time >= self.end_time {
            return Err(CoreError::Validation(format!(
                "Scene start_time ({}) must be before end_time ({})",
                self.start_time, self.end_time
            )));
        }
        if !self.id.is_empty() && self.id != self.derived_id() {
            return Err(CoreError::Validation(format!(
                "Scene id '{}' does not match its source and time range",
                self.id
            )));
        }
        Ok(())
    }

    /// Free text stored alongside the vector and matched by document
    /// predicates: description, transcription, and detected on-screen text.
    pub fn document_text(&self) -> String {
        let mut parts: Vec<&str> = Vec::new();
        if !self.description.trim().is_empty() {
            parts.push(self.description.trim());
        }
        if let Some(t) = self.transcription.as_deref().map(str::trim) {
            if !t.is_empty() {
                parts.push(t);
            }
        }
        let detected = self.detected_text.join(" ");
        if !detected.trim().is_empty() {
            parts.push(detected.trim());
        }
        parts.join("\n")
    }

    /// Text fed to the text encoder: the document plus labelled metadata, so
    /// that "Alice smiling in a kitchen" finds scenes tagged that way even
    /// when the description never says so.
    pub fn embedding_text(&self) -> String {
        let mut lines = vec![self.document_text()];
        let labelled = [
            ("Faces", &self.faces),
            ("Objects", &self.objects),
            ("Emotions", &self.emotions),
        ];
        for (label, values) in labelled {
            if !values.is_empty() {
                lines.push(format!("{label}: {}", values.join(", ")));
            }
        }
        let optional = [
            ("Shot", &self.shot_type),
            ("Camera", &self.camera),
            ("Location", &self.location),
        ];
        for (label, value) in optional {
            if let Some(v) = value {
                lines.push(format!("{label}: {v}"));
            }
        }
        lines.retain(|l| !l.is_empty());
        lines.join("\n")
    }
}

// ---------------------------------------------------------------------------
// Aggregates
// ---------------------------------------------------------------------------

/// A scene inside a video aggregate, flagged by whether it matched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneMatch {
    #[serde(flatten)]
    pub scene: Scene,
    pub matched: bool,
    /// Similarity of this scene to the query; `None` for context siblings.
    pub score: Option<f64>,
}

/// A scene returned by similarity retrieval, with its similarity score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredScene {
    #[serde(flatten)]
    pub scene: Scene,
    pub score: f64,
}

/// All scenes of one source video, with aggregated labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoWithScenes {
    pub source_path: String,
    pub scenes: Vec<SceneMatch>,
    pub faces: Vec<String>,
    pub objects: Vec<String>,
    pub emotions: Vec<String>,
    pub shot_types: Vec<String>,
    /// Most recent `created_at` among the video's scenes.
    pub created_at: Timestamp,
    /// Ranking score: the best score among matched scenes.
    pub score: f64,
}

impl VideoWithScenes {
    /// Number of scenes flagged as matched.
    pub fn matched_count(&self) -> usize {
        self.scenes.iter().filter(|s| s.matched).count()
    }

    /// Build an aggregate from a source path, its matched hits, and any
    /// additional context scenes. A hit whose id is already among the
    /// siblings only marks that stored scene as matched and scores it.
    fn assemble(source_path: String, hits: Vec<(Scene, f64)>, siblings: Vec<Scene>) -> Self {
        let mut by_id: HashMap<SceneId, SceneMatch> = HashMap::new();

        for scene in siblings {
            by_id.entry(scene.id.clone()).or_insert(SceneMatch {
                scene,
                matched: false,
                score: None,
            });
        }
        for (scene, score) in hits {
            match by_id.get_mut(&scene.id) {
                Some(existing) if existing.matched => {
                    if existing.score.map_or(true, |s| score > s) {
                        existing.score = Some(score);
                    }
                }
                Some(existing) => {
                    existing.matched = true;
                    existing.score = Some(score);
                }
                None => {
                    by_id.insert(
                        scene.id.clone(),
                        SceneMatch {
                            scene,
                            matched: true,
                            score: Some(score),
                        },
                    );
                }
            }
        }

        let mut scenes: Vec<SceneMatch> = by_id.into_values().collect();
        scenes.sort_by(|a, b| {
            a.scene
                .start_time
                .partial_cmp(&b.scene.start_time)
                .unwrap_or(Ordering::Equal)
        });

        let score = scenes
            .iter()
            .filter_map(|s| s.score)
            .fold(f64::NEG_INFINITY, f64::max);
        let created_at = scenes
            .iter()
            .map(|s| s.scene.created_at)
            .max()
            .unwrap_or_else(chrono::Utc::now);

        let faces = dedup_labels(scenes.iter().flat_map(|s| s.scene.faces.iter()));
        let objects = dedup_labels(scenes.iter().flat_map(|s| s.scene.objects.iter()));
        let emotions = dedup_labels(scenes.iter().flat_map(|s| s.scene.emotions.iter()));
        let shot_types = dedup_labels(scenes.iter().filter_map(|s| s.scene.shot_type.as_ref()));

        Self {
            source_path,
            scenes,
            faces,
            objects,
            emotions,
            shot_types,
            created_at,
            score: if score.is_finite() { score } else { 0.0 },
        }
    }
}

/// De-duplicate labels preserving first-seen order.
fn dedup_labels<'a>(labels: impl Iterator<Item = &'a String>) -> Vec<String> {
    let mut seen = HashSet::new();
    labels
        .filter(|l| seen.insert(l.as_str()))
        .cloned()
        .collect()
}

/// Group scored hits by source video.
///
/// `siblings` maps a source path to its complete scene list (from the scene
/// store); scenes present there but absent from `hits` are included with
/// `matched = false`. Videos come back ranked by [`compare_ranked`].
pub fn group_into_videos(
    hits: Vec<(Scene, f64)>,
    mut siblings: HashMap<String, Vec<Scene>>,
) -> Vec<VideoWithScenes> {
    let mut order: Vec<String> = Vec::new();
    let mut grouped: HashMap<String, Vec<(Scene, f64)>> = HashMap::new();

    for (scene, score) in hits {
        let key = scene.source_path.clone();
        if !grouped.contains_key(&key) {
            order.push(key.clone());
        }
        grouped.entry(key).or_default().push((scene, score));
    }

    let mut videos: Vec<VideoWithScenes> = order
        .into_iter()
        .map(|source| {
            let hits = grouped.remove(&source).unwrap_or_default();
            let context = siblings.remove(&source).unwrap_or_default();
            VideoWithScenes::assemble(source, hits, context)
        })
        .collect();

    videos.sort_by(compare_ranked);
    videos
}

/// Ranking order: score descending, then most recent `created_at` first.
pub fn compare_ranked(a: &VideoWithScenes, b: &VideoWithScenes) -> Ordering {
    b.score
        .partial_cmp(&a.score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| b.created_at.cmp(&a.created_at))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
