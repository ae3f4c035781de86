//! The three per-modality collections as one handle.

use std::sync::Arc;

use reelsearch_core::vector::Modality;

use crate::chroma::{ChromaApi, ChromaCollection};
use crate::collection::VectorCollection;
use crate::error::StoreError;
use crate::memory::InMemoryCollection;

/// `text`, `visual` and `audio` collections. Cheap to clone.
#[derive(Clone)]
pub struct Collections {
    pub text: Arc<dyn VectorCollection>,
    pub visual: Arc<dyn VectorCollection>,
    pub audio: Arc<dyn VectorCollection>,
}

impl Collections {
    /// Fresh, empty in-memory collections.
    pub fn in_memory() -> Self {
        Self {
            text: Arc::new(InMemoryCollection::new(Modality::Text.collection_name())),
            visual: Arc::new(InMemoryCollection::new(Modality::Visual.collection_name())),
            audio: Arc::new(InMemoryCollection::new(Modality::Audio.collection_name())),
        }
    }

    /// Resolve or create all three collections on a Chroma server.
    pub async fn connect_chroma(api: Arc<ChromaApi>) -> Result<Self, StoreError> {
        api.heartbeat().await?;
        Ok(Self {
            text: Arc::new(ChromaCollection::connect(api.clone(), Modality::Text.collection_name()).await?),
            visual: Arc::new(
                ChromaCollection::connect(api.clone(), Modality::Visual.collection_name()).await?,
            ),
            audio: Arc::new(ChromaCollection::connect(api, Modality::Audio.collection_name()).await?),
        })
    }

    pub fn for_modality(&self, modality: Modality) -> &Arc<dyn VectorCollection> {
        match modality {
            Modality::Text => &self.text,
            Modality::Visual => &self.visual,
            Modality::Audio => &self.audio,
        }
    }
}
