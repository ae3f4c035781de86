//! Shared SHA-256 hex digest utility and scene id derivation.

use sha2::{Digest, Sha256};

use crate::types::SceneId;

/// Compute a SHA-256 hex digest of the given bytes.
pub fn sha256_hex(data: &[u8]) -> String {
    let hash = Sha256::digest(data);
    format!("{hash:x}")
}

/// Derive the stable id of a scene from its source and time range.
///
/// Times are rendered with millisecond precision so that float noise below
/// a millisecond does not produce a different id for the same segment.
pub fn scene_id(source_path: &str, start_time: f64, end_time: f64) -> SceneId {
    let key = format!("{source_path}|{start_time:.3}|{end_time:.3}");
    sha256_hex(key.as_bytes())
}
