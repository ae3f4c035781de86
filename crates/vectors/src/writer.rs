//! Validated, replace-by-id writes into a modality collection.
//!
//! Validation runs in a fixed order and stops at the first failure:
//!
//! 1. drop records without an id, metadata or vector; error if none remain
//! 2. sanitize metadata into flat scalars
//! 3. all vectors share one dimension
//! 4. `visual` / `audio` vectors match the configured dimension
//! 5. no NaN or infinite components

use std::collections::BTreeSet;

use reelsearch_core::metadata::sanitize_metadata;
use reelsearch_core::vector::{
    first_non_finite, Modality, DEFAULT_AUDIO_DIMENSION, DEFAULT_VISUAL_DIMENSION,
};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::collection::RecordBatch;
use crate::collections::Collections;
use crate::error::StoreError;

/// Default number of records per store call in [`VectorWriter::write_chunked`].
pub const DEFAULT_WRITE_CHUNK_SIZE: usize = 100;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A record as handed to the writer, before validation.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorRecord {
    pub id: String,
    pub vector: Vec<f32>,
    pub metadata: Option<Map<String, Value>>,
    pub document: Option<String>,
}

impl VectorRecord {
    fn is_complete(&self) -> bool {
        !self.id.trim().is_empty() && self.metadata.is_some() && !self.vector.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriterConfig {
    pub visual_dimension: usize,
    pub audio_dimension: usize,
    pub chunk_size: usize,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            visual_dimension: DEFAULT_VISUAL_DIMENSION,
            audio_dimension: DEFAULT_AUDIO_DIMENSION,
            chunk_size: DEFAULT_WRITE_CHUNK_SIZE,
        }
    }
}

impl WriterConfig {
    /// The fixed dimension for `modality`, if it has one.
    pub fn expected_dimension(&self, modality: Modality) -> Option<usize> {
        match modality {
            Modality::Text => None,
            Modality::Visual => Some(self.visual_dimension),
            Modality::Audio => Some(self.audio_dimension),
        }
    }
}

/// A chunk that failed during [`VectorWriter::write_chunked`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChunkError {
    pub chunk: usize,
    pub records: usize,
    pub error: String,
}

/// Outcome of a chunked write. Failed chunks do not roll back earlier ones.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WriteReport {
    pub written: usize,
    pub errors: Vec<ChunkError>,
}

impl WriteReport {
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Writer
// ---------------------------------------------------------------------------

/// The only component that writes to the vector collections.
#[derive(Clone)]
pub struct VectorWriter {
    collections: Collections,
    config: WriterConfig,
}

impl VectorWriter {
    pub fn new(collections: Collections, config: WriterConfig) -> Self {
        Self {
            collections,
            config,
        }
    }

    pub fn collections(&self) -> &Collections {
        &self.collections
    }

    /// Run the validation chain and build a store batch.
    pub fn prepare(
        &self,
        modality: Modality,
        records: Vec<VectorRecord>,
    ) -> Result<RecordBatch, StoreError> {
        let total = records.len();
        let records: Vec<VectorRecord> = records.into_iter().filter(VectorRecord::is_complete).collect();
        if records.len() < total {
            tracing::warn!(
                collection = %modality,
                dropped = total - records.len(),
                "Dropped incomplete vector records"
            );
        }
        if records.is_empty() {
            return Err(StoreError::Validation("empty batch after filtering".into()));
        }

        let mut batch = RecordBatch::default();
        for record in records {
            let metadata = record
                .metadata
                .as_ref()
                .map(sanitize_metadata)
                .unwrap_or_default();
            batch.ids.push(record.id);
            batch.embeddings.push(record.vector);
            batch.metadatas.push(metadata);
            batch.documents.push(record.document);
        }

        let dimensions: BTreeSet<usize> = batch.embeddings.iter().map(Vec::len).collect();
        if dimensions.len() > 1 {
            return Err(StoreError::Validation(format!(
                "inconsistent vector dimensions in {modality} batch: {dimensions:?}"
            )));
        }

        if let Some(expected) = self.config.expected_dimension(modality) {
            let actual = batch.embeddings[0].len();
            if actual != expected {
                return Err(StoreError::Validation(format!(
                    "{modality} vectors must have dimension {expected}, got {actual}"
                )));
            }
        }

        for (id, embedding) in batch.ids.iter().zip(&batch.embeddings) {
            if let Some(index) = first_non_finite(embedding) {
                return Err(StoreError::Validation(format!(
                    "non-finite value at index {index} in vector '{id}'"
                )));
            }
        }

        Ok(batch)
    }

    /// Validate and write one batch, replacing any records with the same ids.
    pub async fn write(
        &self,
        modality: Modality,
        records: Vec<VectorRecord>,
    ) -> Result<usize, StoreError> {
        let batch = self.prepare(modality, records)?;
        let count = batch.len();
        let collection = self.collections.for_modality(modality);

        collection.delete(&batch.ids).await?;
        collection.add(batch).await?;

        tracing::debug!(collection = %modality, count, "Wrote vectors");
        Ok(count)
    }

    /// Write in fixed-size chunks, continuing past failed chunks.
    pub async fn write_chunked(&self, modality: Modality, records: Vec<VectorRecord>) -> WriteReport {
        let chunk_size = self.config.chunk_size.max(1);
        let mut report = WriteReport::default();
        let mut records = records.into_iter().peekable();
        let mut chunk_index = 0;

        while records.peek().is_some() {
            let chunk: Vec<VectorRecord> = records.by_ref().take(chunk_size).collect();
            let size = chunk.len();
            match self.write(modality, chunk).await {
                Ok(written) => report.written += written,
                Err(e) => {
                    tracing::error!(
                        collection = %modality,
                        chunk = chunk_index,
                        error = %e,
                        "Vector chunk write failed"
                    );
                    report.errors.push(ChunkError {
                        chunk: chunk_index,
                        records: size,
                        error: e.to_string(),
                    });
                }
            }
            chunk_index += 1;
        }

        report
    }

    /// Delete ids from one collection.
    pub async fn delete(&self, modality: Modality, ids: &[String]) -> Result<(), StoreError> {
        self.collections.for_modality(modality).delete(ids).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::{GetRequest, Include};
    use assert_matches::assert_matches;
    use serde_json::json;

    fn record(id: &str, vector: Vec<f32>) -> VectorRecord {
        VectorRecord {
            id: id.into(),
            vector,
            metadata: Some(
                json!({ "source_path": "/v.mp4", "faces": ["Alice", "Bob"] })
                    .as_object()
                    .cloned()
                    .unwrap(),
            ),
            document: Some(format!("scene {id}")),
        }
    }

    fn writer(visual_dimension: usize, chunk_size: usize) -> VectorWriter {
        VectorWriter::new(
            Collections::in_memory(),
            WriterConfig {
                visual_dimension,
                audio_dimension: visual_dimension,
                chunk_size,
            },
        )
    }

    async fn count(writer: &VectorWriter, modality: Modality) -> usize {
        writer
            .collections()
            .for_modality(modality)
            .get(GetRequest::by_filter(None, None, None))
            .await
            .unwrap()
            .len()
    }

    // -- validation ----------------------------------------------------------

    #[test]
    fn incomplete_records_are_dropped() {
        let w = writer(2, 10);
        let mut missing_meta = record("b", vec![1.0, 0.0]);
        missing_meta.metadata = None;
        let batch = w
            .prepare(
                Modality::Text,
                vec![record("a", vec![1.0, 0.0]), missing_meta, record("", vec![1.0]), record("c", vec![])],
            )
            .unwrap();
        assert_eq!(batch.ids, vec!["a".to_string()]);
    }

    #[test]
    fn all_incomplete_is_an_error() {
        let w = writer(2, 10);
        let err = w.prepare(Modality::Text, vec![record("a", vec![])]).unwrap_err();
        assert_matches!(err, StoreError::Validation(msg) if msg == "empty batch after filtering");
    }

    #[test]
    fn metadata_is_sanitized() {
        let w = writer(2, 10);
        let batch = w.prepare(Modality::Text, vec![record("a", vec![1.0, 0.0])]).unwrap();
        assert_eq!(batch.metadatas[0]["faces"].as_str(), Some("Alice, Bob"));
    }

    #[test]
    fn mixed_dimensions_are_rejected() {
        let w = writer(2, 10);
        let err = w
            .prepare(
                Modality::Text,
                vec![record("a", vec![1.0, 0.0]), record("b", vec![1.0, 0.0, 0.0])],
            )
            .unwrap_err();
        assert_matches!(err, StoreError::Validation(msg) if msg.contains("{2, 3}"));
    }

    #[test]
    fn visual_dimension_must_match_config() {
        let w = writer(4, 10);
        let err = w
            .prepare(Modality::Visual, vec![record("a", vec![1.0, 0.0])])
            .unwrap_err();
        assert_matches!(err, StoreError::Validation(msg) if msg.contains("dimension 4"));
        // Text has no fixed dimension.
        assert!(w.prepare(Modality::Text, vec![record("a", vec![1.0, 0.0])]).is_ok());
    }

    #[test]
    fn non_finite_values_name_index_and_id() {
        let w = writer(2, 10);
        let err = w
            .prepare(Modality::Text, vec![record("bad", vec![0.5, f32::NAN])])
            .unwrap_err();
        assert_matches!(
            err,
            StoreError::Validation(msg) if msg.contains("index 1") && msg.contains("'bad'")
        );
    }

    // -- writes --------------------------------------------------------------

    #[tokio::test]
    async fn rewriting_same_ids_is_idempotent() {
        let w = writer(2, 10);
        w.write(Modality::Visual, vec![record("a", vec![1.0, 0.0])])
            .await
            .unwrap();
        w.write(Modality::Visual, vec![record("a", vec![0.0, 1.0])])
            .await
            .unwrap();
        assert_eq!(count(&w, Modality::Visual).await, 1);

        let stored = w
            .collections()
            .visual
            .get(GetRequest::by_ids(vec!["a".into()], vec![Include::Embeddings]))
            .await
            .unwrap();
        assert_eq!(stored[0].embedding.as_deref(), Some(&[0.0, 1.0][..]));
    }

    #[tokio::test]
    async fn chunked_write_keeps_earlier_chunks() {
        let w = writer(2, 2);
        let report = w
            .write_chunked(
                Modality::Text,
                vec![
                    record("a", vec![1.0, 0.0]),
                    record("b", vec![0.0, 1.0]),
                    record("c", vec![1.0, 0.0, 0.0]),
                ],
            )
            .await;
        assert_eq!(report.written, 2);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].chunk, 1);
        assert_eq!(count(&w, Modality::Text).await, 2);
    }
}
