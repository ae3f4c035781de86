//! [`SceneStore`] backed by Postgres.

use async_trait::async_trait;
use reelsearch_core::error::CoreError;
use reelsearch_core::scene::Scene;
use reelsearch_core::scene_store::SceneStore;

use crate::repositories::SceneRepo;
use crate::DbPool;

#[derive(Clone)]
pub struct PgSceneStore {
    pool: DbPool,
}

impl PgSceneStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn internal(e: sqlx::Error) -> CoreError {
    tracing::error!(error = %e, "Scene store query failed");
    CoreError::Internal(format!("Database error: {e}"))
}

#[async_trait]
impl SceneStore for PgSceneStore {
    async fn scenes_by_source(&self, source_path: &str) -> Result<Vec<Scene>, CoreError> {
        let rows = SceneRepo::list_by_source(&self.pool, source_path)
            .await
            .map_err(internal)?;
        Ok(rows.into_iter().map(Scene::from).collect())
    }

    async fn upsert(&self, scene: &Scene) -> Result<(), CoreError> {
        SceneRepo::upsert(&self.pool, scene)
            .await
            .map_err(internal)?;
        Ok(())
    }

    async fn delete_source(&self, source_path: &str) -> Result<Vec<String>, CoreError> {
        SceneRepo::delete_by_source(&self.pool, source_path)
            .await
            .map_err(internal)
    }
}
