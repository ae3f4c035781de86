//! Lazily-loaded extractor registry, one slot per [`ModelRole`].
//!
//! Each slot is a [`OnceCell`]: concurrent first callers wait on the single
//! in-flight load. The outcome is cached either way, so a failed load is
//! reported to every later caller without touching the loader again.

use std::sync::Arc;

use tokio::sync::OnceCell;

use crate::config::ModelIds;
use crate::error::EmbedError;
use crate::extractor::{ExtractorLoader, FeatureExtractor, ModelRole, ROLE_COUNT};

type Slot = OnceCell<Result<Arc<dyn FeatureExtractor>, String>>;

pub struct ExtractorCache {
    loader: Arc<dyn ExtractorLoader>,
    models: ModelIds,
    slots: [Slot; ROLE_COUNT],
}

impl ExtractorCache {
    pub fn new(loader: Arc<dyn ExtractorLoader>, models: ModelIds) -> Self {
        Self {
            loader,
            models,
            slots: std::array::from_fn(|_| OnceCell::new()),
        }
    }

    /// The extractor for `role`, loading it on first use.
    pub async fn get(&self, role: ModelRole) -> Result<Arc<dyn FeatureExtractor>, EmbedError> {
        let model = self.models.for_role(role);
        let outcome = self.slots[role.index()]
            .get_or_init(|| async move {
                tracing::info!(%role, model, "Loading extractor");
                match self.loader.load(role, model).await {
                    Ok(extractor) => Ok(extractor),
                    Err(e) => {
                        tracing::error!(%role, model, error = %e, "Extractor load failed");
                        Err(match e {
                            EmbedError::ModelLoad { reason, .. } => reason,
                            other => other.to_string(),
                        })
                    }
                }
            })
            .await;

        match outcome {
            Ok(extractor) => Ok(Arc::clone(extractor)),
            Err(reason) => Err(EmbedError::ModelLoad {
                model: model.to_string(),
                reason: reason.clone(),
            }),
        }
    }

    pub async fn text_encoder(&self) -> Result<Arc<dyn FeatureExtractor>, EmbedError> {
        self.get(ModelRole::TextEncoder).await
    }

    pub async fn image_encoder(&self) -> Result<Arc<dyn FeatureExtractor>, EmbedError> {
        self.get(ModelRole::ImageEncoder).await
    }

    pub async fn audio_encoder(&self) -> Result<Arc<dyn FeatureExtractor>, EmbedError> {
        self.get(ModelRole::AudioEncoder).await
    }

    pub async fn text_to_visual(&self) -> Result<Arc<dyn FeatureExtractor>, EmbedError> {
        self.get(ModelRole::TextToVisual).await
    }

    pub async fn text_to_audio(&self) -> Result<Arc<dyn FeatureExtractor>, EmbedError> {
        self.get(ModelRole::TextToAudio).await
    }

    /// Whether `role` has finished loading successfully.
    pub fn is_loaded(&self, role: ModelRole) -> bool {
        matches!(self.slots[role.index()].get(), Some(Ok(_)))
    }

    /// Load every role, returning the roles that failed.
    pub async fn warm_up(&self) -> Vec<(ModelRole, EmbedError)> {
        let mut failed = Vec::new();
        for role in ModelRole::ALL {
            if let Err(e) = self.get(role).await {
                failed.push((role, e));
            }
        }
        failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use assert_matches::assert_matches;
    use async_trait::async_trait;

    use crate::extractor::ExtractorInput;

    struct Fixed(usize);

    #[async_trait]
    impl FeatureExtractor for Fixed {
        fn model(&self) -> &str {
            "fixed"
        }

        fn dimension(&self) -> usize {
            self.0
        }

        async fn extract(&self, _input: &ExtractorInput) -> Result<Vec<f32>, EmbedError> {
            Ok(vec![1.0; self.0])
        }
    }

    struct CountingLoader {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl ExtractorLoader for CountingLoader {
        async fn load(
            &self,
            _role: ModelRole,
            model: &str,
        ) -> Result<Arc<dyn FeatureExtractor>, EmbedError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            if self.fail {
                return Err(EmbedError::ModelLoad {
                    model: model.to_string(),
                    reason: "weights missing".into(),
                });
            }
            Ok(Arc::new(Fixed(4)))
        }
    }

    fn setup(fail: bool) -> (Arc<CountingLoader>, Arc<ExtractorCache>) {
        let loader = Arc::new(CountingLoader {
            calls: AtomicUsize::new(0),
            fail,
        });
        let cache = Arc::new(ExtractorCache::new(loader.clone(), ModelIds::default()));
        (loader, cache)
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_load() {
        let (loader, cache) = setup(false);
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                tokio::spawn(async move { cache.text_encoder().await.map(|e| e.dimension()) })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), 4);
        }
        assert_eq!(loader.calls.load(Ordering::SeqCst), 1);
        assert!(cache.is_loaded(ModelRole::TextEncoder));
        assert!(!cache.is_loaded(ModelRole::ImageEncoder));
    }

    #[tokio::test]
    async fn roles_load_independently() {
        let (loader, cache) = setup(false);
        assert!(cache.text_encoder().await.is_ok());
        assert!(cache.image_encoder().await.is_ok());
        assert!(cache.text_encoder().await.is_ok());
        assert_eq!(loader.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn load_failure_is_cached() {
        let (loader, cache) = setup(true);
        let first = cache.audio_encoder().await.err().unwrap();
        let second = cache.audio_encoder().await.err().unwrap();
        assert_matches!(first, EmbedError::ModelLoad { ref reason, .. } if reason == "weights missing");
        assert_matches!(second, EmbedError::ModelLoad { .. });
        assert_eq!(loader.calls.load(Ordering::SeqCst), 1);
        assert!(!cache.is_loaded(ModelRole::AudioEncoder));
    }

    #[tokio::test]
    async fn warm_up_reports_failed_roles() {
        let (_loader, cache) = setup(true);
        let failed = cache.warm_up().await;
        assert_eq!(failed.len(), ModelRole::ALL.len());
    }
}
