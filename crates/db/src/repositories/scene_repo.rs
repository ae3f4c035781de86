//! Repository for the `scenes` table.

use reelsearch_core::scene::Scene;
use sqlx::PgPool;

use crate::models::scene::SceneRow;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, source_path, start_time, end_time, description, transcription, \
    faces, objects, emotions, detected_text, shot_type, camera, location, aspect_ratio, \
    thumbnail, created_at, updated_at";

/// Provides persistence operations for scenes.
pub struct SceneRepo;

impl SceneRepo {
    /// Insert a scene or overwrite the row with the same id.
    ///
    /// `created_at` is kept from the first insert.
    pub async fn upsert(pool: &PgPool, scene: &Scene) -> Result<SceneRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO scenes
                (id, source_path, start_time, end_time, description, transcription,
                 faces, objects, emotions, detected_text, shot_type, camera, location,
                 aspect_ratio, thumbnail, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
             ON CONFLICT (id) DO UPDATE SET
                description = EXCLUDED.description,
                transcription = EXCLUDED.transcription,
                faces = EXCLUDED.faces,
                objects = EXCLUDED.objects,
                emotions = EXCLUDED.emotions,
                detected_text = EXCLUDED.detected_text,
                shot_type = EXCLUDED.shot_type,
                camera = EXCLUDED.camera,
                location = EXCLUDED.location,
                aspect_ratio = EXCLUDED.aspect_ratio,
                thumbnail = EXCLUDED.thumbnail,
                updated_at = NOW()
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, SceneRow>(&query)
            .bind(&scene.id)
            .bind(&scene.source_path)
            .bind(scene.start_time)
            .bind(scene.end_time)
            .bind(&scene.description)
            .bind(&scene.transcription)
            .bind(&scene.faces)
            .bind(&scene.objects)
            .bind(&scene.emotions)
            .bind(&scene.detected_text)
            .bind(&scene.shot_type)
            .bind(&scene.camera)
            .bind(&scene.location)
            .bind(&scene.aspect_ratio)
            .bind(&scene.thumbnail)
            .bind(scene.created_at)
            .fetch_one(pool)
            .await
    }

    /// List all scenes of a source video, ordered by start time.
    pub async fn list_by_source(
        pool: &PgPool,
        source_path: &str,
    ) -> Result<Vec<SceneRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM scenes
             WHERE source_path = $1
             ORDER BY start_time ASC"
        );
        sqlx::query_as::<_, SceneRow>(&query)
            .bind(source_path)
            .fetch_all(pool)
            .await
    }

    /// Delete every scene of a source video, returning the deleted ids.
    pub async fn delete_by_source(
        pool: &PgPool,
        source_path: &str,
    ) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar::<_, String>("DELETE FROM scenes WHERE source_path = $1 RETURNING id")
            .bind(source_path)
            .fetch_all(pool)
            .await
    }
}
