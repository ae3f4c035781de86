//! Model access and embedding generation.
//!
//! [`cache::ExtractorCache`] loads each model role once through an
//! [`extractor::ExtractorLoader`]; [`generator::EmbeddingGenerator`] turns
//! text, keyframes and audio into vectors with per-call timeouts.

pub mod cache;
pub mod config;
pub mod error;
pub mod extractor;
pub mod generator;
pub mod http;
pub mod preprocess;

pub use cache::ExtractorCache;
pub use config::{EmbeddingConfig, ModelIds};
pub use error::EmbedError;
pub use extractor::{ExtractorInput, ExtractorLoader, FeatureExtractor, ModelRole};
pub use generator::{EmbeddingGenerator, TextBatch};
pub use http::HttpExtractorLoader;
