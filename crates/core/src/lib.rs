//! Domain types and pure logic for the scene retrieval engine.
//!
//! No I/O beyond the in-memory [`scene_store::InMemorySceneStore`]; every
//! other crate in the workspace builds on these types.

pub mod error;
pub mod filters;
pub mod fusion;
pub mod hashing;
pub mod metadata;
pub mod scene;
pub mod scene_store;
pub mod search;
pub mod threshold_validation;
pub mod types;
pub mod vector;
