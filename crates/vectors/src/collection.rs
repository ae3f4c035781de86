//! The narrow vector store interface the engine depends on.
//!
//! One [`VectorCollection`] holds `(id, vector, metadata, document?)`
//! records of a single modality. Implementations: [`crate::chroma`] for a
//! ChromaDB server and [`crate::memory`] for tests and local runs.

use async_trait::async_trait;
use reelsearch_core::filters::Predicate;
use reelsearch_core::metadata::Metadata;
use serde::Serialize;

use crate::error::StoreError;

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Optional record fields a read may return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Include {
    Embeddings,
    Metadatas,
    Documents,
    Distances,
}

/// A batch of records for [`VectorCollection::add`]. The four vectors are
/// parallel: entry `i` of each belongs to the same record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordBatch {
    pub ids: Vec<String>,
    pub embeddings: Vec<Vec<f32>>,
    pub metadatas: Vec<Metadata>,
    pub documents: Vec<Option<String>>,
}

impl RecordBatch {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// The batch dimension, if all vectors share one.
    pub fn dimension(&self) -> Option<usize> {
        let first = self.embeddings.first()?.len();
        self.embeddings
            .iter()
            .all(|e| e.len() == first)
            .then_some(first)
    }
}

/// Nearest-neighbour query. One result list is returned per query vector.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRequest {
    pub vectors: Vec<Vec<f32>>,
    pub n_results: usize,
    pub where_metadata: Option<Predicate>,
    pub where_document: Option<Predicate>,
    pub include: Vec<Include>,
}

impl QueryRequest {
    /// Query with one vector, returning metadata, documents and distances.
    pub fn single(vector: Vec<f32>, n_results: usize) -> Self {
        Self {
            vectors: vec![vector],
            n_results,
            where_metadata: None,
            where_document: None,
            include: vec![Include::Metadatas, Include::Documents, Include::Distances],
        }
    }
}

/// Lookup by ids and/or predicates, without a query vector.
#[derive(Debug, Clone, PartialEq)]
pub struct GetRequest {
    pub ids: Option<Vec<String>>,
    pub where_metadata: Option<Predicate>,
    pub where_document: Option<Predicate>,
    pub limit: Option<usize>,
    pub include: Vec<Include>,
}

impl GetRequest {
    pub fn by_ids(ids: Vec<String>, include: Vec<Include>) -> Self {
        Self {
            ids: Some(ids),
            where_metadata: None,
            where_document: None,
            limit: None,
            include,
        }
    }

    pub fn by_filter(
        where_metadata: Option<Predicate>,
        where_document: Option<Predicate>,
        limit: Option<usize>,
    ) -> Self {
        Self {
            ids: None,
            where_metadata,
            where_document,
            limit,
            include: vec![Include::Metadatas, Include::Documents],
        }
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// A record read back from a collection. Fields not requested through
/// [`Include`] are `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecord {
    pub id: String,
    pub embedding: Option<Vec<f32>>,
    pub metadata: Option<Metadata>,
    pub document: Option<String>,
    pub distance: Option<f64>,
}

impl StoredRecord {
    pub fn id_only(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            embedding: None,
            metadata: None,
            document: None,
            distance: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// A single-modality vector collection.
#[async_trait]
pub trait VectorCollection: Send + Sync {
    /// Collection name (`text`, `visual` or `audio`).
    fn name(&self) -> &str;

    async fn add(&self, batch: RecordBatch) -> Result<(), StoreError>;

    /// Returns one ranked list (nearest first) per query vector.
    async fn query(&self, request: QueryRequest) -> Result<Vec<Vec<StoredRecord>>, StoreError>;

    async fn get(&self, request: GetRequest) -> Result<Vec<StoredRecord>, StoreError>;

    /// Delete records by id. Unknown ids are ignored.
    async fn delete(&self, ids: &[String]) -> Result<(), StoreError>;
}
