//! Scene row model.

use reelsearch_core::scene::Scene;
use reelsearch_core::types::{SceneId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `scenes` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SceneRow {
    pub id: SceneId,
    pub source_path: String,
    pub start_time: f64,
    pub end_time: f64,
    pub description: String,
    pub transcription: Option<String>,
    pub faces: Vec<String>,
    pub objects: Vec<String>,
    pub emotions: Vec<String>,
    pub detected_text: Vec<String>,
    pub shot_type: Option<String>,
    pub camera: Option<String>,
    pub location: Option<String>,
    pub aspect_ratio: Option<String>,
    pub thumbnail: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<SceneRow> for Scene {
    fn from(row: SceneRow) -> Self {
        Scene {
            id: row.id,
            source_path: row.source_path,
            start_time: row.start_time,
            end_time: row.end_time,
            description: row.description,
            transcription: row.transcription,
            faces: row.faces,
            objects: row.objects,
            emotions: row.emotions,
            detected_text: row.detected_text,
            shot_type: row.shot_type,
            camera: row.camera,
            location: row.location,
            aspect_ratio: row.aspect_ratio,
            created_at: row.created_at,
            thumbnail: row.thumbnail,
        }
    }
}
