//! Extractors served by a feature-extraction inference server.
//!
//! | Call    | Request                                  | Response           |
//! |---------|------------------------------------------|--------------------|
//! | load    | `GET {base}/models/{model}`              | `{"dimension": n}` |
//! | extract | `POST {base}/models/{model}/embed`       | `{"embedding": []}`|
//!
//! Text bodies ask the server for mean pooling and normalization.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::error::EmbedError;
use crate::extractor::{ExtractorInput, ExtractorLoader, FeatureExtractor, ModelRole};

#[derive(Debug, Deserialize)]
struct ModelInfo {
    dimension: usize,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

// ---------------------------------------------------------------------------
// Loader
// ---------------------------------------------------------------------------

/// Loads [`HttpExtractor`]s from one inference server.
pub struct HttpExtractorLoader {
    client: reqwest::Client,
    base_url: String,
}

impl HttpExtractorLoader {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn probe(&self, model: &str) -> Result<ModelInfo, EmbedError> {
        let response = self
            .client
            .get(format!("{}/models/{model}", self.base_url))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(EmbedError::Extractor(format!("status {status}: {body}")));
        }
        Ok(response.json::<ModelInfo>().await?)
    }
}

#[async_trait]
impl ExtractorLoader for HttpExtractorLoader {
    async fn load(
        &self,
        role: ModelRole,
        model: &str,
    ) -> Result<Arc<dyn FeatureExtractor>, EmbedError> {
        let info = self.probe(model).await.map_err(|e| EmbedError::ModelLoad {
            model: model.to_string(),
            reason: e.to_string(),
        })?;
        if info.dimension == 0 {
            return Err(EmbedError::ModelLoad {
                model: model.to_string(),
                reason: "server reported dimension 0".into(),
            });
        }
        tracing::info!(%role, model, dimension = info.dimension, "Loaded extractor");
        Ok(Arc::new(HttpExtractor {
            client: self.client.clone(),
            url: format!("{}/models/{model}/embed", self.base_url),
            model: model.to_string(),
            dimension: info.dimension,
        }))
    }
}

// ---------------------------------------------------------------------------
// Extractor
// ---------------------------------------------------------------------------

/// One remote model.
pub struct HttpExtractor {
    client: reqwest::Client,
    url: String,
    model: String,
    dimension: usize,
}

fn request_body(input: &ExtractorInput) -> serde_json::Value {
    match input {
        ExtractorInput::Text(text) => json!({
            "text": text,
            "pooling": "mean",
            "normalize": true,
        }),
        ExtractorInput::Image { pixels, shape } => json!({
            "pixels": pixels,
            "shape": shape,
        }),
        ExtractorInput::Audio {
            samples,
            sample_rate,
        } => json!({
            "samples": samples,
            "sample_rate": sample_rate,
        }),
    }
}

#[async_trait]
impl FeatureExtractor for HttpExtractor {
    fn model(&self) -> &str {
        &self.model
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn extract(&self, input: &ExtractorInput) -> Result<Vec<f32>, EmbedError> {
        let response = self
            .client
            .post(&self.url)
            .json(&request_body(input))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(EmbedError::Extractor(format!(
                "{} rejected {} input ({status}): {body}",
                self.model,
                input.kind()
            )));
        }

        let parsed: EmbedResponse = response.json().await?;
        if parsed.embedding.len() != self.dimension {
            return Err(EmbedError::Extractor(format!(
                "{} returned {} values, expected {}",
                self.model,
                parsed.embedding.len(),
                self.dimension
            )));
        }
        Ok(parsed.embedding)
    }
}
