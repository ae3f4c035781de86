//! Vector store access: the [`collection::VectorCollection`] seam, its
//! ChromaDB and in-memory implementations, and the validating
//! [`writer::VectorWriter`].

pub mod chroma;
pub mod collection;
pub mod collections;
pub mod error;
pub mod memory;
pub mod writer;

pub use collection::{GetRequest, Include, QueryRequest, RecordBatch, StoredRecord, VectorCollection};
pub use collections::Collections;
pub use error::StoreError;
pub use writer::{VectorRecord, VectorWriter, WriteReport, WriterConfig};
