//! End-to-end indexing and retrieval over in-memory stores.

mod common;

use assert_matches::assert_matches;
use common::*;
use reelsearch_core::error::CoreError;
use reelsearch_core::filters::SearchParams;
use reelsearch_core::scene_store::SceneStore;
use reelsearch_core::vector::Modality;
use reelsearch_embed::EmbedError;
use reelsearch_search::SearchError;

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

fn query(text: &str) -> SearchParams {
    SearchParams {
        query: Some(text.to_string()),
        ..Default::default()
    }
}

// ---------------------------------------------------------------------------
// Indexing
// ---------------------------------------------------------------------------

#[tokio::test]
async fn indexing_writes_text_for_every_scene_and_media_where_present() {
    let t = build_engine();
    let scenes = library();
    write_keyframe(&t.media, &scenes[0], "0001.png", RED);
    write_keyframe(&t.media, &scenes[1], "0001.png", BLUE);

    let report = t.engine.index_scenes(requests(&scenes)).await.unwrap();

    assert_eq!(report.scenes, 4);
    assert_eq!(report.text, 4);
    assert_eq!(report.visual, 2);
    assert_eq!(report.skipped_visual, 2);
    assert_eq!(report.audio, 0);
    assert_eq!(report.skipped_audio, 4);
    assert!(report.errors.is_empty());

    let collections = t.engine.collections();
    assert_eq!(count(&collections.text).await, 4);
    assert_eq!(count(&collections.visual).await, 2);
    assert_eq!(count(&collections.audio).await, 0);

    let stored = t.engine.scene_store().scenes_by_source(VIDEO_A).await.unwrap();
    assert_eq!(stored.len(), 3);
}

#[tokio::test]
async fn reindexing_replaces_instead_of_duplicating() {
    let t = build_engine();
    let scenes = library();
    t.engine.index_scenes(requests(&scenes)).await.unwrap();
    t.engine.index_scenes(requests(&scenes)).await.unwrap();

    assert_eq!(count(&t.engine.collections().text).await, 4);
    let stored = t.engine.scene_store().scenes_by_source(VIDEO_A).await.unwrap();
    assert_eq!(stored.len(), 3);
}

#[tokio::test]
async fn reindexing_without_media_drops_old_visual_and_audio_vectors() {
    let t = build_engine();
    let mut scenes = library();
    write_keyframe(&t.media, &scenes[0], "0001.png", RED);
    write_audio(&t.media, &scenes[0]);
    t.engine.index_scenes(requests(&scenes)).await.unwrap();
    assert_eq!(count(&t.engine.collections().visual).await, 1);
    assert_eq!(count(&t.engine.collections().audio).await, 1);

    clear_media(&t.media, &scenes[0]);
    scenes[0].faces = strings(&["Zed"]);
    let report = t.engine.index_scenes(requests(&scenes)).await.unwrap();

    assert_eq!(report.visual, 0);
    assert_eq!(report.skipped_visual, 4);
    assert_eq!(count(&t.engine.collections().visual).await, 0);
    assert_eq!(count(&t.engine.collections().audio).await, 0);

    let params = SearchParams {
        faces: strings(&["Alice"]),
        ..Default::default()
    };
    let videos = t
        .engine
        .search_by_image(png_bytes(RED), &params, None, Some(0.0))
        .await
        .unwrap();
    assert!(videos.is_empty());
}

#[tokio::test]
async fn audio_clip_is_written_to_audio_collection() {
    let t = build_engine();
    let scenes = library();
    write_audio(&t.media, &scenes[2]);

    let report = t.engine.index_scenes(requests(&scenes)).await.unwrap();

    assert_eq!(report.audio, 1);
    assert_eq!(report.skipped_audio, 3);
    assert!(report.errors.is_empty());
    assert_eq!(count(&t.engine.collections().audio).await, 1);
}

#[tokio::test]
async fn audio_with_wrong_dimension_is_reported_not_written() {
    let t = build_engine_with(|config| config.writer.audio_dimension = MEDIA_DIM / 2);
    let scenes = library();
    write_audio(&t.media, &scenes[0]);

    let report = t.engine.index_scenes(requests(&scenes)).await.unwrap();

    assert_eq!(report.text, 4);
    assert_eq!(report.audio, 0);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].collection, Modality::Audio);
    assert!(report.errors[0].error.contains("dimension"));
    assert_eq!(count(&t.engine.collections().audio).await, 0);
}

#[tokio::test]
async fn failed_media_lookup_is_reported_per_scene() {
    let t = build_engine();
    let scenes = library();
    write_keyframe(&t.media, &scenes[0], "0001.png", RED);
    t.engine.index_scenes(requests(&scenes)).await.unwrap();

    clear_media(&t.media, &scenes[0]);
    break_media(&t.media, &scenes[0]);
    let report = t.engine.index_scenes(requests(&scenes)).await.unwrap();

    assert_eq!(report.text, 4);
    assert_eq!(report.failed_scenes.len(), 1);
    assert_eq!(report.failed_scenes[0].scene_id, scenes[0].id);
    // The earlier keyframe vector is left alone.
    assert_eq!(count(&t.engine.collections().visual).await, 1);
}

#[tokio::test]
async fn model_load_failure_writes_nothing() {
    let t = build_engine_without_image_model();
    let scenes = library();
    write_keyframe(&t.media, &scenes[0], "0001.png", RED);

    let result = t.engine.index_scenes(requests(&scenes)).await;

    assert_matches!(result, Err(SearchError::Embed(EmbedError::ModelLoad { .. })));
    assert_eq!(count(&t.engine.collections().text).await, 0);
    assert!(t
        .engine
        .scene_store()
        .scenes_by_source(VIDEO_A)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn invalid_scene_aborts_indexing() {
    let t = build_engine();
    let mut bad = scene(VIDEO_A, 0.0, "car", &[]);
    bad.end_time = bad.start_time;

    let result = t.engine.index_scenes(requests(&[bad])).await;

    assert_matches!(result, Err(SearchError::Core(CoreError::Validation(_))));
    assert_eq!(count(&t.engine.collections().text).await, 0);
}

#[tokio::test]
async fn remove_source_clears_scene_store_and_all_collections() {
    let t = build_engine();
    let scenes = library();
    write_keyframe(&t.media, &scenes[0], "0001.png", RED);
    t.engine.index_scenes(requests(&scenes)).await.unwrap();

    let removal = t.engine.remove_source(VIDEO_A).await.unwrap();

    let mut expected = ids(&scenes[..3]);
    expected.sort();
    assert_eq!(removal.scene_ids, expected);

    let collections = t.engine.collections();
    assert_eq!(count(&collections.text).await, 1);
    assert_eq!(count(&collections.visual).await, 0);
    assert!(t
        .engine
        .scene_store()
        .scenes_by_source(VIDEO_A)
        .await
        .unwrap()
        .is_empty());
}

// ---------------------------------------------------------------------------
// Semantic search
// ---------------------------------------------------------------------------

#[tokio::test]
async fn face_filter_returns_whole_video_with_matches_flagged() {
    let t = build_engine();
    let scenes = library();
    t.engine.index_scenes(requests(&scenes)).await.unwrap();

    let params = SearchParams {
        faces: strings(&["Alice"]),
        ..Default::default()
    };
    let videos = t.engine.search_scenes(&params, None, false, None).await.unwrap();

    assert_eq!(videos.len(), 1);
    let video = &videos[0];
    assert_eq!(video.source_path, VIDEO_A);
    assert_eq!(video.scenes.len(), 3);
    assert_eq!(video.matched_count(), 2);
    assert!(!video.scenes[1].matched, "Bob-only scene is context");
    assert_eq!(video.faces, strings(&["Alice", "Bob"]));
}

#[tokio::test]
async fn no_query_and_no_filters_returns_nothing() {
    let t = build_engine();
    t.engine.index_scenes(requests(&library())).await.unwrap();

    let videos = t
        .engine
        .search_scenes(&SearchParams::default(), None, false, None)
        .await
        .unwrap();

    assert!(videos.is_empty());
}

#[tokio::test]
async fn semantic_query_ranks_closest_video_first() {
    let t = build_engine();
    t.engine.index_scenes(requests(&library())).await.unwrap();

    let videos = t
        .engine
        .search_scenes(&query("car chase"), None, false, None)
        .await
        .unwrap();

    let order: Vec<&str> = videos.iter().map(|v| v.source_path.as_str()).collect();
    assert_eq!(order, vec![VIDEO_B, VIDEO_A]);
    assert!((videos[0].score - 2.0 / 6f64.sqrt()).abs() < 1e-4);
}

#[tokio::test]
async fn strict_search_keeps_only_close_hits() {
    let t = build_engine();
    t.engine.index_scenes(requests(&library())).await.unwrap();

    let videos = t
        .engine
        .search_scenes(&query("car chase"), None, true, None)
        .await
        .unwrap();

    let video_a = videos.iter().find(|v| v.source_path == VIDEO_A).unwrap();
    assert_eq!(video_a.matched_count(), 1);
    assert_eq!(video_a.scenes.len(), 3);
}

#[tokio::test]
async fn scope_restricts_results_to_listed_sources() {
    let t = build_engine();
    t.engine.index_scenes(requests(&library())).await.unwrap();

    let scope = strings(&[VIDEO_A]);
    let videos = t
        .engine
        .search_scenes(&query("car chase"), None, false, Some(&scope))
        .await
        .unwrap();

    assert_eq!(videos.len(), 1);
    assert_eq!(videos[0].source_path, VIDEO_A);
}

#[tokio::test]
async fn transcript_literal_filters_on_document_text() {
    let t = build_engine();
    t.engine.index_scenes(requests(&library())).await.unwrap();

    let params = SearchParams {
        transcription: Some("highway".into()),
        ..Default::default()
    };
    let videos = t.engine.search_scenes(&params, None, false, None).await.unwrap();

    assert_eq!(videos.len(), 1);
    assert_eq!(videos[0].source_path, VIDEO_B);
}

#[tokio::test]
async fn invalid_regex_is_a_validation_error() {
    let t = build_engine();
    let params = SearchParams {
        exclude_regex: Some("(".into()),
        ..Default::default()
    };

    let result = t.engine.search_scenes(&params, None, false, None).await;

    assert_matches!(result, Err(SearchError::Core(CoreError::Validation(_))));
}

// ---------------------------------------------------------------------------
// Visual search and fusion
// ---------------------------------------------------------------------------

async fn indexed_with_keyframes() -> TestEngine {
    let t = build_engine();
    let scenes = library();
    write_keyframe(&t.media, &scenes[0], "0001.png", RED);
    write_keyframe(&t.media, &scenes[1], "0001.png", BLUE);
    t.engine.index_scenes(requests(&scenes)).await.unwrap();
    t
}

#[tokio::test]
async fn image_search_matches_only_scenes_above_threshold() {
    let t = indexed_with_keyframes().await;

    let videos = t
        .engine
        .search_by_image(png_bytes(RED), &SearchParams::default(), None, None)
        .await
        .unwrap();

    assert_eq!(videos.len(), 1);
    assert_eq!(videos[0].source_path, VIDEO_A);
    assert_eq!(videos[0].matched_count(), 1);
    assert!(videos[0].scenes[0].matched);
    assert!(videos[0].score > 0.99);
}

#[tokio::test]
async fn text_only_videos_are_kept_only_with_a_query() {
    let t = indexed_with_keyframes().await;

    let with_query = t
        .engine
        .search_by_image(png_bytes(RED), &query("car chase"), None, None)
        .await
        .unwrap();
    let order: Vec<&str> = with_query.iter().map(|v| v.source_path.as_str()).collect();
    assert_eq!(order, vec![VIDEO_A, VIDEO_B]);

    let text_score = 2.0 / 10f64.sqrt();
    assert!((with_query[0].score - (0.7 + 0.3 * text_score)).abs() < 1e-3);

    let filters_only = SearchParams {
        faces: strings(&["Alice"]),
        ..Default::default()
    };
    let without_query = t
        .engine
        .search_by_image(png_bytes(BLUE), &filters_only, None, None)
        .await
        .unwrap();
    assert!(without_query.is_empty(), "filter listing alone is not fused in");
}

#[tokio::test]
async fn undecodable_query_image_is_an_error() {
    let t = build_engine();

    let result = t
        .engine
        .search_by_image(b"not an image".to_vec(), &SearchParams::default(), None, None)
        .await;

    assert_matches!(result, Err(SearchError::Embed(EmbedError::Decode(_))));
}

#[tokio::test]
async fn threshold_outside_unit_range_is_rejected() {
    let t = build_engine();

    let result = t
        .engine
        .search_by_image(png_bytes(RED), &SearchParams::default(), None, Some(1.5))
        .await;

    assert_matches!(result, Err(SearchError::Core(CoreError::Validation(_))));
}

// ---------------------------------------------------------------------------
// Similarity
// ---------------------------------------------------------------------------

#[tokio::test]
async fn similar_scenes_exclude_references() {
    let t = build_engine();
    let scenes = library();
    t.engine.index_scenes(requests(&scenes)).await.unwrap();

    let reference = vec![scenes[3].id.clone()];
    let similar = t.engine.get_similar_scenes(&reference, None, None).await.unwrap();

    assert_eq!(similar.len(), 3);
    assert!(similar.iter().all(|s| s.scene.id != scenes[3].id));
    assert_eq!(similar[0].scene.id, scenes[0].id);
    assert!(similar.windows(2).all(|w| w[0].score >= w[1].score));
}

#[tokio::test]
async fn similar_scenes_honour_scope() {
    let t = build_engine();
    let scenes = library();
    t.engine.index_scenes(requests(&scenes)).await.unwrap();

    let scope = strings(&[VIDEO_B]);
    let similar = t
        .engine
        .get_similar_scenes(&[scenes[3].id.clone()], None, Some(&scope))
        .await
        .unwrap();

    assert!(similar.is_empty());
}

#[tokio::test]
async fn unknown_reference_is_not_found() {
    let t = build_engine();
    t.engine.index_scenes(requests(&library())).await.unwrap();

    let result = t
        .engine
        .get_similar_scenes(&strings(&["missing"]), None, None)
        .await;

    assert_matches!(
        result,
        Err(SearchError::Core(CoreError::NotFound { entity: "scene", .. }))
    );
}

#[tokio::test]
async fn empty_reference_list_is_rejected() {
    let t = build_engine();

    let result = t.engine.get_similar_scenes(&[], None, None).await;

    assert_matches!(result, Err(SearchError::Core(CoreError::Validation(_))));
}
