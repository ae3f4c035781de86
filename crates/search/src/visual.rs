//! Image-query search fused with the text branch.

use reelsearch_core::filters::{build_filters, SearchParams};
use reelsearch_core::fusion::{fuse, passes_threshold};
use reelsearch_core::scene::{group_into_videos, Scene, VideoWithScenes};
use reelsearch_core::search::{clamp_limit, DEFAULT_SEARCH_LIMIT, HITS_PER_VIDEO, MAX_SEARCH_LIMIT};
use reelsearch_core::threshold_validation::validate_unit_range;
use reelsearch_core::vector::similarity_from_distance;
use reelsearch_vectors::{Include, QueryRequest};

use crate::engine::{record_scene, RetrievalEngine};
use crate::error::SearchError;

impl RetrievalEngine {
    /// Search by example image, optionally refined by `params`.
    ///
    /// The image is embedded first; decoding and model errors are returned.
    /// The visual query and the text search then run concurrently, and a
    /// failure in either degrades that branch to an empty list. The two
    /// lists are merged by [`fuse`].
    pub async fn search_by_image(
        &self,
        image: Vec<u8>,
        params: &SearchParams,
        limit: Option<usize>,
        threshold: Option<f64>,
    ) -> Result<Vec<VideoWithScenes>, SearchError> {
        let threshold = threshold.unwrap_or(self.config.similarity_threshold);
        validate_unit_range(threshold, "threshold")?;
        let limit = clamp_limit(limit.or(params.limit), DEFAULT_SEARCH_LIMIT, MAX_SEARCH_LIMIT);
        let filters = build_filters(params, None)?;

        let vector = self.generator.embed_image(image).await?;

        let image_branch = async {
            let request = QueryRequest {
                vectors: vec![vector],
                n_results: limit * HITS_PER_VIDEO,
                where_metadata: Some(filters.metadata.clone()),
                where_document: filters.document.clone(),
                include: vec![Include::Metadatas, Include::Distances],
            };
            let results = self.collections().visual.query(request).await?;
            let hits: Vec<(Scene, f64)> = results
                .into_iter()
                .next()
                .unwrap_or_default()
                .iter()
                .filter_map(|record| {
                    let score = similarity_from_distance(record.distance.unwrap_or(1.0));
                    if !passes_threshold(score, threshold) {
                        return None;
                    }
                    Some((record_scene(record)?, score))
                })
                .collect();
            let siblings = self.siblings_for(&hits).await;
            Ok::<_, SearchError>(group_into_videos(hits, siblings))
        };
        let text_branch = self.search_scenes(params, Some(limit), false, None);

        let (image_result, text_result) = tokio::join!(image_branch, text_branch);
        let image_videos = image_result.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Visual branch failed, continuing without it");
            Vec::new()
        });
        let text_videos = text_result.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Text branch failed, continuing without it");
            Vec::new()
        });

        let mut fused = fuse(
            image_videos,
            text_videos,
            self.config.weights,
            params.semantic_query().is_some(),
        );
        fused.truncate(limit);
        Ok(fused)
    }
}
