//! Process-local [`VectorCollection`] with exact cosine search.
//!
//! Used by tests and for running the engine without a vector server.
//! Predicates are evaluated with [`Predicate::matches`], so filtering
//! behaves the same as the Chroma rendering.

use async_trait::async_trait;
use indexmap::IndexMap;
use reelsearch_core::filters::Predicate;
use reelsearch_core::metadata::Metadata;
use reelsearch_core::vector::cosine_distance;
use tokio::sync::RwLock;

use crate::collection::{
    GetRequest, Include, QueryRequest, RecordBatch, StoredRecord, VectorCollection,
};
use crate::error::StoreError;

#[derive(Debug, Clone)]
struct Entry {
    embedding: Vec<f32>,
    metadata: Metadata,
    document: Option<String>,
}

impl Entry {
    fn matches(&self, metadata: Option<&Predicate>, document: Option<&Predicate>) -> bool {
        let doc = self.document.as_deref().unwrap_or_default();
        passes(metadata, &self.metadata, doc) && passes(document, &self.metadata, doc)
    }

    fn to_record(&self, id: &str, distance: Option<f64>, include: &[Include]) -> StoredRecord {
        StoredRecord {
            id: id.to_string(),
            embedding: include
                .contains(&Include::Embeddings)
                .then(|| self.embedding.clone()),
            metadata: include
                .contains(&Include::Metadatas)
                .then(|| self.metadata.clone()),
            document: include
                .contains(&Include::Documents)
                .then(|| self.document.clone())
                .flatten(),
            distance: distance.filter(|_| include.contains(&Include::Distances)),
        }
    }
}

/// An absent predicate matches everything.
fn passes(predicate: Option<&Predicate>, metadata: &Metadata, document: &str) -> bool {
    predicate.map_or(true, |p| p.matches(metadata, document))
}

/// An in-memory collection. Records keep insertion order.
pub struct InMemoryCollection {
    name: String,
    records: RwLock<IndexMap<String, Entry>>,
}

impl InMemoryCollection {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            records: RwLock::new(IndexMap::new()),
        }
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl VectorCollection for InMemoryCollection {
    fn name(&self) -> &str {
        &self.name
    }

    async fn add(&self, batch: RecordBatch) -> Result<(), StoreError> {
        let n = batch.len();
        if batch.embeddings.len() != n || batch.metadatas.len() != n || batch.documents.len() != n {
            return Err(StoreError::Validation(
                "record batch columns differ in length".into(),
            ));
        }

        let mut records = self.records.write().await;
        let existing = records.values().next().map(|e| e.embedding.len());
        let expected = existing.or_else(|| batch.embeddings.first().map(Vec::len));
        if let Some(expected) = expected {
            if let Some(bad) = batch.embeddings.iter().find(|e| e.len() != expected) {
                return Err(StoreError::Validation(format!(
                    "collection '{}' expects dimension {expected}, got {}",
                    self.name,
                    bad.len()
                )));
            }
        }

        let rows = batch
            .ids
            .into_iter()
            .zip(batch.embeddings)
            .zip(batch.metadatas)
            .zip(batch.documents);
        for (((id, embedding), metadata), document) in rows {
            records.insert(
                id,
                Entry {
                    embedding,
                    metadata,
                    document,
                },
            );
        }
        Ok(())
    }

    async fn query(&self, request: QueryRequest) -> Result<Vec<Vec<StoredRecord>>, StoreError> {
        let records = self.records.read().await;
        let metadata = request.where_metadata.as_ref();
        let document = request.where_document.as_ref();

        let results = request
            .vectors
            .iter()
            .map(|vector| {
                let mut scored: Vec<(&String, &Entry, f64)> = records
                    .iter()
                    .filter(|(_, e)| e.matches(metadata, document))
                    .map(|(id, e)| (id, e, cosine_distance(vector, &e.embedding)))
                    .collect();
                scored.sort_by(|a, b| a.2.partial_cmp(&b.2).unwrap_or(std::cmp::Ordering::Equal));
                scored
                    .into_iter()
                    .take(request.n_results)
                    .map(|(id, e, d)| e.to_record(id, Some(d), &request.include))
                    .collect::<Vec<_>>()
            })
            .collect();
        Ok(results)
    }

    async fn get(&self, request: GetRequest) -> Result<Vec<StoredRecord>, StoreError> {
        let records = self.records.read().await;
        let metadata = request.where_metadata.as_ref();
        let document = request.where_document.as_ref();
        let limit = request.limit.unwrap_or(usize::MAX);

        let selected: Vec<StoredRecord> = match &request.ids {
            Some(ids) => ids
                .iter()
                .filter_map(|id| records.get_key_value(id))
                .filter(|(_, e)| e.matches(metadata, document))
                .take(limit)
                .map(|(id, e)| e.to_record(id, None, &request.include))
                .collect(),
            None => records
                .iter()
                .filter(|(_, e)| e.matches(metadata, document))
                .take(limit)
                .map(|(id, e)| e.to_record(id, None, &request.include))
                .collect(),
        };
        Ok(selected)
    }

    async fn delete(&self, ids: &[String]) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        for id in ids {
            records.shift_remove(id);
        }
        Ok(())
    }
}
