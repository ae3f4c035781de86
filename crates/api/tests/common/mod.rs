#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use reelsearch_core::scene_store::InMemorySceneStore;
use reelsearch_embed::{
    EmbedError, EmbeddingConfig, EmbeddingGenerator, ExtractorCache, ExtractorInput,
    ExtractorLoader, FeatureExtractor, ModelRole,
};
use reelsearch_search::{EngineConfig, NoMedia, RetrievalEngine};
use reelsearch_vectors::Collections;
use serde_json::Value;
use tower::ServiceExt;

use reelsearch_api::config::ServerConfig;
use reelsearch_api::router::build_app_router;
use reelsearch_api::state::AppState;

/// Words the fake text encoder knows; anything else is ignored.
const VOCAB: &[&str] = &["car", "chase", "kitchen", "cooking", "beach", "sunset"];

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        max_upload_bytes: 1024 * 1024,
        chroma_url: None,
        database_url: None,
    }
}

// ---------------------------------------------------------------------------
// Fake models
// ---------------------------------------------------------------------------

struct VocabExtractor {
    role: ModelRole,
}

#[async_trait]
impl FeatureExtractor for VocabExtractor {
    fn model(&self) -> &str {
        self.role.as_str()
    }

    fn dimension(&self) -> usize {
        VOCAB.len()
    }

    async fn extract(&self, input: &ExtractorInput) -> Result<Vec<f32>, EmbedError> {
        let ExtractorInput::Text(text) = input else {
            return Err(EmbedError::Extractor("text only".into()));
        };
        let mut v = vec![0f32; VOCAB.len()];
        for token in text.split(|c: char| !c.is_alphanumeric()) {
            if let Some(i) = VOCAB.iter().position(|w| w.eq_ignore_ascii_case(token)) {
                v[i] += 1.0;
            }
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            v.iter_mut().for_each(|x| *x /= norm);
        }
        Ok(v)
    }
}

struct VocabLoader;

#[async_trait]
impl ExtractorLoader for VocabLoader {
    async fn load(
        &self,
        role: ModelRole,
        model: &str,
    ) -> Result<Arc<dyn FeatureExtractor>, EmbedError> {
        match role {
            ModelRole::TextEncoder => Ok(Arc::new(VocabExtractor { role })),
            _ => Err(EmbedError::ModelLoad {
                model: model.to_string(),
                reason: "not available in tests".into(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

/// Build the full application router over in-memory stores. Only the text
/// encoder loads; visual and audio models fail to load.
pub fn build_test_app() -> Router {
    let config = test_config();

    let embedding = EmbeddingConfig::default();
    let cache = Arc::new(ExtractorCache::new(Arc::new(VocabLoader), embedding.models.clone()));
    let generator = Arc::new(EmbeddingGenerator::new(cache, &embedding));
    let engine = RetrievalEngine::new(
        generator,
        Collections::in_memory(),
        Arc::new(InMemorySceneStore::new()),
        Arc::new(NoMedia),
        EngineConfig::default(),
    );

    let state = AppState {
        engine: Arc::new(engine),
        config: Arc::new(config.clone()),
        pool: None,
        chroma: None,
    };
    build_app_router(state, &config)
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub async fn send_json(app: Router, method: Method, uri: &str, body: Value) -> Response<Body> {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: Value) -> Response<Body> {
    send_json(app, Method::POST, uri, body).await
}

pub async fn delete(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::DELETE)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// POST a multipart form built from `(name, bytes)` parts.
pub async fn post_multipart(app: Router, uri: &str, parts: &[(&str, &[u8])]) -> Response<Body> {
    let boundary = "reelsearch-test-boundary";
    let mut body = Vec::new();
    for (name, bytes) in parts {
        body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());

    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
