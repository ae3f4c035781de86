//! Text-space search with structured filters.

use reelsearch_core::filters::{build_filters, Filters, SearchParams};
use reelsearch_core::scene::{group_into_videos, Scene, VideoWithScenes};
use reelsearch_core::search::{clamp_limit, DEFAULT_SEARCH_LIMIT, HITS_PER_VIDEO, MAX_SEARCH_LIMIT};
use reelsearch_core::vector::similarity_from_distance;
use reelsearch_vectors::{GetRequest, Include, QueryRequest};

use crate::engine::{record_scene, RetrievalEngine};
use crate::error::SearchError;

/// Score given to hits found by filters alone.
const FILTER_ONLY_SCORE: f64 = 1.0;

impl RetrievalEngine {
    /// Search scenes by free text and/or metadata filters, grouped by video.
    ///
    /// - With a query: nearest neighbours in the text collection, score
    ///   `1 - distance`. `strict` drops hits below the strict threshold.
    /// - Without a query but with filters: a metadata lookup, score `1.0`.
    /// - With neither: no results.
    ///
    /// `limit` counts videos; `scope` overrides `params.scope`.
    pub async fn search_scenes(
        &self,
        params: &SearchParams,
        limit: Option<usize>,
        strict: bool,
        scope: Option<&[String]>,
    ) -> Result<Vec<VideoWithScenes>, SearchError> {
        let limit = clamp_limit(limit.or(params.limit), DEFAULT_SEARCH_LIMIT, MAX_SEARCH_LIMIT);
        let filters = build_filters(params, scope)?;
        let n_hits = limit * HITS_PER_VIDEO;

        let mut hits = match params.semantic_query() {
            Some(query) => self.semantic_hits(query, filters, n_hits).await?,
            None if !filters.is_unrestricted() => self.filter_hits(filters, n_hits).await?,
            None => return Ok(Vec::new()),
        };

        if strict && params.semantic_query().is_some() {
            let min = self.config.strict_similarity;
            hits.retain(|(_, score)| *score >= min);
        }

        let siblings = self.siblings_for(&hits).await;
        let mut videos = group_into_videos(hits, siblings);
        videos.truncate(limit);

        tracing::debug!(videos = videos.len(), strict, "Semantic search complete");
        Ok(videos)
    }

    async fn semantic_hits(
        &self,
        query: &str,
        filters: Filters,
        n_hits: usize,
    ) -> Result<Vec<(Scene, f64)>, SearchError> {
        let vector = self.generator.embed_query(query).await?;
        let request = QueryRequest {
            vectors: vec![vector],
            n_results: n_hits,
            where_metadata: Some(filters.metadata),
            where_document: filters.document,
            include: vec![Include::Metadatas, Include::Distances],
        };
        let results = self.collections().text.query(request).await?;

        Ok(results
            .into_iter()
            .next()
            .unwrap_or_default()
            .iter()
            .filter_map(|record| {
                let scene = record_scene(record)?;
                let score = similarity_from_distance(record.distance.unwrap_or(1.0));
                Some((scene, score))
            })
            .collect())
    }

    async fn filter_hits(
        &self,
        filters: Filters,
        n_hits: usize,
    ) -> Result<Vec<(Scene, f64)>, SearchError> {
        let request = GetRequest {
            include: vec![Include::Metadatas],
            ..GetRequest::by_filter(Some(filters.metadata), filters.document, Some(n_hits))
        };
        let records = self.collections().text.get(request).await?;
        Ok(records
            .iter()
            .filter_map(record_scene)
            .map(|scene| (scene, FILTER_ONLY_SCORE))
            .collect())
    }
}
