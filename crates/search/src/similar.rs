//! Nearest scenes to stored reference scenes.

use std::collections::{HashMap, HashSet};

use reelsearch_core::error::CoreError;
use reelsearch_core::filters::Filters;
use reelsearch_core::scene::ScoredScene;
use reelsearch_core::search::{clamp_limit, DEFAULT_SIMILARITY_LIMIT, MAX_SIMILARITY_LIMIT};
use reelsearch_core::vector::similarity_from_distance;
use reelsearch_vectors::{GetRequest, Include, QueryRequest};

use crate::engine::{record_scene, RetrievalEngine};
use crate::error::SearchError;

impl RetrievalEngine {
    /// Scenes most similar to the text vectors of `ids`, best first.
    ///
    /// The references themselves never appear in the result. A reference
    /// without a stored vector is a not-found error.
    pub async fn get_similar_scenes(
        &self,
        ids: &[String],
        limit: Option<usize>,
        scope: Option<&[String]>,
    ) -> Result<Vec<ScoredScene>, SearchError> {
        if ids.is_empty() {
            return Err(CoreError::Validation("at least one scene id is required".into()).into());
        }
        let count = clamp_limit(limit, DEFAULT_SIMILARITY_LIMIT, MAX_SIMILARITY_LIMIT);
        let text = &self.collections().text;

        let refs = text
            .get(GetRequest::by_ids(ids.to_vec(), vec![Include::Embeddings]))
            .await?;
        let vectors_by_id: HashMap<String, Vec<f32>> = refs
            .into_iter()
            .filter_map(|r| Some((r.id, r.embedding?)))
            .collect();
        let excluded: HashSet<&str> = ids.iter().map(String::as_str).collect();
        let mut vectors = Vec::with_capacity(excluded.len());
        for id in &excluded {
            let Some(vector) = vectors_by_id.get(*id) else {
                return Err(CoreError::NotFound {
                    entity: "scene",
                    id: id.to_string(),
                }
                .into());
            };
            vectors.push(vector.clone());
        }

        let where_metadata = scope
            .filter(|s| !s.is_empty())
            .map(|s| Filters::scope_only(s).metadata);
        let results = text
            .query(QueryRequest {
                n_results: count + vectors.len(),
                vectors,
                where_metadata,
                where_document: None,
                include: vec![Include::Metadatas, Include::Distances],
            })
            .await?;

        let mut best: HashMap<String, ScoredScene> = HashMap::new();
        for record in results.iter().flatten() {
            if excluded.contains(record.id.as_str()) {
                continue;
            }
            let score = similarity_from_distance(record.distance.unwrap_or(1.0));
            if best.get(&record.id).is_some_and(|b| b.score >= score) {
                continue;
            }
            if let Some(scene) = record_scene(record) {
                best.insert(record.id.clone(), ScoredScene { scene, score });
            }
        }

        let mut ranked: Vec<ScoredScene> = best.into_values().collect();
        ranked.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.scene.id.cmp(&b.scene.id))
        });
        ranked.truncate(count);
        Ok(ranked)
    }
}
