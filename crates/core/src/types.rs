/// Scene identifiers are hex SHA-256 digests of (source, start, end).
pub type SceneId = String;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
