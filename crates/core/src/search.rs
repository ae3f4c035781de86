//! Search limits and pagination helpers.
//!
//! Lives in `core` so the engine and the API layer bound caller input the
//! same way.

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Pagination defaults
// ---------------------------------------------------------------------------

/// Default number of videos returned by a search.
pub const DEFAULT_SEARCH_LIMIT: usize = 20;

/// Maximum number of videos returned by a search.
pub const MAX_SEARCH_LIMIT: usize = 100;

/// Default number of scenes returned by similarity retrieval.
pub const DEFAULT_SIMILARITY_LIMIT: usize = 10;

/// Maximum number of scenes returned by similarity retrieval.
pub const MAX_SIMILARITY_LIMIT: usize = 50;

/// Number of raw hits fetched per requested video. Several scenes of one
/// video often match, so the store is asked for more hits than videos.
pub const HITS_PER_VIDEO: usize = 5;

/// Default minimum similarity for semantic hits in strict mode.
pub const DEFAULT_STRICT_SIMILARITY: f64 = 0.5;

// ---------------------------------------------------------------------------
// Clamping
// ---------------------------------------------------------------------------

/// Clamp a user-provided limit to valid bounds.
pub fn clamp_limit(limit: Option<usize>, default: usize, max: usize) -> usize {
    limit.unwrap_or(default).clamp(1, max)
}

/// Check a user-provided offset against the deepest reachable rank;
/// `None` means the first page.
///
/// Only the first `max` ranked results are ever computed, so an offset at
/// or past `max` could only ever produce an empty page.
pub fn validate_offset(offset: Option<usize>, max: usize) -> Result<usize, CoreError> {
    let offset = offset.unwrap_or(0);
    if offset >= max {
        return Err(CoreError::Validation(format!(
            "offset must be below {max}, got {offset}"
        )));
    }
    Ok(offset)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
