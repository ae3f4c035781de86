//! Weighted fusion of image-branch and text-branch results.
//!
//! Pure domain logic: the engine runs both branches and hands their ranked
//! video lists to [`fuse`].

use std::collections::HashMap;

use crate::scene::{compare_ranked, SceneMatch, VideoWithScenes};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Default weight of the image branch in a combined score.
pub const DEFAULT_IMAGE_WEIGHT: f64 = 0.7;

/// Default weight of the text branch in a combined score.
pub const DEFAULT_TEXT_WEIGHT: f64 = 0.3;

/// Default minimum similarity for a visual hit to be kept.
pub const DEFAULT_VISUAL_THRESHOLD: f64 = 0.7;

// ---------------------------------------------------------------------------
// Weights
// ---------------------------------------------------------------------------

/// Weights applied when a video appears in both branches.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusionWeights {
    pub image: f64,
    pub text: f64,
}

impl Default for FusionWeights {
    fn default() -> Self {
        Self {
            image: DEFAULT_IMAGE_WEIGHT,
            text: DEFAULT_TEXT_WEIGHT,
        }
    }
}

impl FusionWeights {
    pub fn combine(&self, image_score: f64, text_score: f64) -> f64 {
        self.image * image_score + self.text * text_score
    }
}

// ---------------------------------------------------------------------------
// Threshold
// ---------------------------------------------------------------------------

/// Hard cutoff for visual hits. The boundary is inclusive.
pub fn passes_threshold(score: f64, threshold: f64) -> bool {
    score >= threshold
}

// ---------------------------------------------------------------------------
// Fusion
// ---------------------------------------------------------------------------

/// Merge two ranked video lists into one.
///
/// | Present in      | Score                                  |
/// |-----------------|----------------------------------------|
/// | both            | `image_w * image + text_w * text`      |
/// | image only      | image score, unscaled                  |
/// | text only       | text score, unscaled; dropped when there was no semantic query |
///
/// The result is sorted by score descending, ties broken by the most recent
/// `created_at`.
pub fn fuse(
    image: Vec<VideoWithScenes>,
    text: Vec<VideoWithScenes>,
    weights: FusionWeights,
    has_semantic_query: bool,
) -> Vec<VideoWithScenes> {
    let mut text_by_source: HashMap<String, VideoWithScenes> = text
        .into_iter()
        .map(|v| (v.source_path.clone(), v))
        .collect();

    let mut fused: Vec<VideoWithScenes> = image
        .into_iter()
        .map(|mut video| {
            if let Some(text_video) = text_by_source.remove(&video.source_path) {
                video.score = weights.combine(video.score, text_video.score);
                merge_scenes(&mut video, text_video);
            }
            video
        })
        .collect();

    // Without a semantic query the text branch is a pure filter listing,
    // which is not evidence of relevance on its own.
    if has_semantic_query {
        fused.extend(text_by_source.into_values());
    }

    fused.sort_by(compare_ranked);
    fused
}

/// Fold the text-branch view of a video into the image-branch view.
fn merge_scenes(target: &mut VideoWithScenes, other: VideoWithScenes) {
    for incoming in other.scenes {
        match target
            .scenes
            .iter_mut()
            .find(|s| s.scene.id == incoming.scene.id)
        {
            Some(existing) => merge_scene(existing, incoming),
            None => target.scenes.push(incoming),
        }
    }
    target.scenes.sort_by(|a, b| {
        a.scene
            .start_time
            .partial_cmp(&b.scene.start_time)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    if other.created_at > target.created_at {
        target.created_at = other.created_at;
    }
}

fn merge_scene(existing: &mut SceneMatch, incoming: SceneMatch) {
    existing.matched |= incoming.matched;
    existing.score = match (existing.score, incoming.score) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, b) => a.or(b),
    };
}

// ---------------------------------------------------------------------------
// Pagination
// ---------------------------------------------------------------------------

/// Apply `offset`/`limit` to an already ranked list.
pub fn paginate<T>(items: Vec<T>, offset: usize, limit: usize) -> Vec<T> {
    items.into_iter().skip(offset).take(limit).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
