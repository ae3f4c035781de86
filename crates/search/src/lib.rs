//! Scene indexing and retrieval over the text, visual and audio collections.
//!
//! [`RetrievalEngine`] ties together the embedding generator, the vector
//! writer and collections, the scene store and the media source.

pub mod config;
pub mod engine;
pub mod error;
pub mod indexer;
pub mod media;
pub mod semantic;
pub mod similar;
pub mod visual;

pub use config::EngineConfig;
pub use engine::RetrievalEngine;
pub use error::SearchError;
pub use indexer::{IndexError, IndexReport, IndexRequest, RemovalReport, SceneError};
pub use media::{MediaSource, NoMedia, SceneMedia, SidecarMediaSource};
