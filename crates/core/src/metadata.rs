//! Scalar metadata codec.
//!
//! Vector stores only accept flat `string | number | bool` metadata. This
//! module owns the (lossy) mapping between a [`Scene`] and that flat form,
//! plus the generic sanitizer applied to arbitrary JSON before a write.
//!
//! Label fields (faces, objects, emotions) and tag fields (shot type,
//! camera, location, aspect ratio) are stored twice:
//!
//! | Key                     | Value                 | Used for                |
//! |-------------------------|-----------------------|-------------------------|
//! | `faces`                 | `"Alice, Bob"`        | reconstruction          |
//! | `faces:alice`           | `true`                | membership filtering    |
//! | `camera`                | `"Static"`            | reconstruction          |
//! | `camera:static`         | `true`                | membership filtering    |
//!
//! Filters on either kind therefore match case-insensitively. Reconstruction
//! splits the joined string on `,`, so labels that contain commas come back
//! split.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::CoreError;
use crate::scene::Scene;
use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// Keys
// ---------------------------------------------------------------------------

pub const KEY_SOURCE_PATH: &str = "source_path";
pub const KEY_START_TIME: &str = "start_time";
pub const KEY_END_TIME: &str = "end_time";
pub const KEY_DESCRIPTION: &str = "description";
pub const KEY_TRANSCRIPTION: &str = "transcription";
pub const KEY_FACES: &str = "faces";
pub const KEY_OBJECTS: &str = "objects";
pub const KEY_EMOTIONS: &str = "emotions";
pub const KEY_DETECTED_TEXT: &str = "detected_text";
pub const KEY_SHOT_TYPE: &str = "shot_type";
pub const KEY_CAMERA: &str = "camera";
pub const KEY_LOCATION: &str = "location";
pub const KEY_ASPECT_RATIO: &str = "aspect_ratio";
pub const KEY_CREATED_AT: &str = "created_at";
pub const KEY_THUMBNAIL: &str = "thumbnail";

/// Fields whose values are label sets filtered by membership.
pub const LIST_FIELDS: &[&str] = &[KEY_FACES, KEY_OBJECTS, KEY_EMOTIONS];

/// Single-valued fields that are also filtered by membership.
pub const TAG_FIELDS: &[&str] = &[KEY_SHOT_TYPE, KEY_CAMERA, KEY_LOCATION, KEY_ASPECT_RATIO];

/// Separator used when joining list values into one string.
const LIST_SEPARATOR: &str = ", ";

/// Whether `field` is stored with membership keys and filtered through them.
pub fn is_membership_field(field: &str) -> bool {
    LIST_FIELDS.contains(&field) || TAG_FIELDS.contains(&field)
}

/// Metadata key marking that a field holds `value`.
///
/// Values are trimmed and lowercased so filters are case-insensitive.
pub fn membership_key(field: &str, value: &str) -> String {
    format!("{field}:{}", value.trim().to_lowercase())
}

// ---------------------------------------------------------------------------
// MetadataValue
// ---------------------------------------------------------------------------

/// A scalar that a vector store accepts as a metadata value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Bool(bool),
    Number(f64),
    String(String),
}

impl MetadataValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Convert into a JSON value for a store request body.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Bool(b) => Value::Bool(*b),
            Self::Number(n) => serde_json::Number::from_f64(*n)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Self::String(s) => Value::String(s.clone()),
        }
    }

    /// Render as text, used when joining a scalar array.
    fn render(&self) -> String {
        match self {
            Self::Bool(b) => b.to_string(),
            Self::Number(n) => n.to_string(),
            Self::String(s) => s.clone(),
        }
    }
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<f64> for MetadataValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<bool> for MetadataValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// Flat metadata as stored next to a vector.
pub type Metadata = BTreeMap<String, MetadataValue>;

/// Convert flat metadata into a JSON object.
pub fn metadata_to_json(metadata: &Metadata) -> Map<String, Value> {
    metadata
        .iter()
        .map(|(k, v)| (k.clone(), v.to_json()))
        .collect()
}

// ---------------------------------------------------------------------------
// Generic sanitizer
// ---------------------------------------------------------------------------

/// Flatten arbitrary JSON into store-safe scalar metadata.
///
/// - Nested objects become dotted keys (`{"a":{"b":1}}` -> `a.b = 1`).
/// - Arrays of scalars are joined with `", "`; arrays holding objects or
///   arrays are dropped, as are empty arrays.
/// - `null` and non-finite numbers are dropped.
pub fn sanitize_metadata(raw: &Map<String, Value>) -> Metadata {
    let mut out = Metadata::new();
    for (key, value) in raw {
        flatten_into(key, value, &mut out);
    }
    out
}

fn flatten_into(key: &str, value: &Value, out: &mut Metadata) {
    match value {
        Value::Object(map) => {
            for (child, v) in map {
                flatten_into(&format!("{key}.{child}"), v, out);
            }
        }
        Value::Array(items) => {
            let scalars: Option<Vec<MetadataValue>> = items.iter().map(scalar).collect();
            if let Some(scalars) = scalars.filter(|s| !s.is_empty()) {
                let joined = scalars
                    .iter()
                    .map(MetadataValue::render)
                    .collect::<Vec<_>>()
                    .join(LIST_SEPARATOR);
                out.insert(key.to_string(), MetadataValue::String(joined));
            }
        }
        other => {
            if let Some(v) = scalar(other) {
                out.insert(key.to_string(), v);
            }
        }
    }
}

fn scalar(value: &Value) -> Option<MetadataValue> {
    match value {
        Value::Bool(b) => Some(MetadataValue::Bool(*b)),
        Value::Number(n) => n
            .as_f64()
            .filter(|f| f.is_finite())
            .map(MetadataValue::Number),
        Value::String(s) => Some(MetadataValue::String(s.clone())),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Scene <-> metadata
// ---------------------------------------------------------------------------

/// Encode a scene as flat metadata. Total: every scene has an encoding.
pub fn scene_metadata(scene: &Scene) -> Metadata {
    let mut m = Metadata::new();
    m.insert(KEY_SOURCE_PATH.into(), scene.source_path.clone().into());
    m.insert(KEY_START_TIME.into(), scene.start_time.into());
    m.insert(KEY_END_TIME.into(), scene.end_time.into());
    m.insert(KEY_DESCRIPTION.into(), scene.description.clone().into());
    m.insert(
        KEY_CREATED_AT.into(),
        (scene.created_at.timestamp_millis() as f64).into(),
    );

    let optional = [
        (KEY_TRANSCRIPTION, &scene.transcription),
        (KEY_SHOT_TYPE, &scene.shot_type),
        (KEY_CAMERA, &scene.camera),
        (KEY_LOCATION, &scene.location),
        (KEY_ASPECT_RATIO, &scene.aspect_ratio),
        (KEY_THUMBNAIL, &scene.thumbnail),
    ];
    for (key, value) in optional {
        if let Some(v) = value {
            m.insert(key.into(), v.clone().into());
            if TAG_FIELDS.contains(&key) && !v.trim().is_empty() {
                m.insert(membership_key(key, v), true.into());
            }
        }
    }

    let lists = [
        (KEY_FACES, &scene.faces),
        (KEY_OBJECTS, &scene.objects),
        (KEY_EMOTIONS, &scene.emotions),
    ];
    for (field, values) in lists {
        if values.is_empty() {
            continue;
        }
        m.insert(field.into(), values.join(LIST_SEPARATOR).into());
        for v in values {
            m.insert(membership_key(field, v), true.into());
        }
    }

    if !scene.detected_text.is_empty() {
        m.insert(
            KEY_DETECTED_TEXT.into(),
            scene.detected_text.join(LIST_SEPARATOR).into(),
        );
    }

    m
}

/// Rebuild a scene from its stored metadata.
///
/// Tolerates missing optional keys; fails only when the segment itself
/// (`source_path`, `start_time`, `end_time`) cannot be recovered.
pub fn scene_from_metadata(id: &str, m: &Metadata) -> Result<Scene, CoreError> {
    let source_path = get_str(m, KEY_SOURCE_PATH)
        .ok_or_else(|| missing_key(id, KEY_SOURCE_PATH))?
        .to_string();
    let start_time = get_f64(m, KEY_START_TIME).ok_or_else(|| missing_key(id, KEY_START_TIME))?;
    let end_time = get_f64(m, KEY_END_TIME).ok_or_else(|| missing_key(id, KEY_END_TIME))?;

    let created_at = get_f64(m, KEY_CREATED_AT)
        .and_then(|ms| chrono::DateTime::from_timestamp_millis(ms as i64))
        .unwrap_or_else(Timestamp::default);

    Ok(Scene {
        id: id.to_string(),
        source_path,
        start_time,
        end_time,
        description: get_str(m, KEY_DESCRIPTION).unwrap_or_default().to_string(),
        transcription: get_owned(m, KEY_TRANSCRIPTION),
        faces: split_list(m, KEY_FACES),
        objects: split_list(m, KEY_OBJECTS),
        emotions: split_list(m, KEY_EMOTIONS),
        detected_text: split_list(m, KEY_DETECTED_TEXT),
        shot_type: get_owned(m, KEY_SHOT_TYPE),
        camera: get_owned(m, KEY_CAMERA),
        location: get_owned(m, KEY_LOCATION),
        aspect_ratio: get_owned(m, KEY_ASPECT_RATIO),
        created_at,
        thumbnail: get_owned(m, KEY_THUMBNAIL),
    })
}

fn missing_key(id: &str, key: &str) -> CoreError {
    CoreError::Validation(format!("Stored metadata for scene {id} is missing '{key}'"))
}

fn get_str<'a>(m: &'a Metadata, key: &str) -> Option<&'a str> {
    m.get(key).and_then(MetadataValue::as_str)
}

fn get_owned(m: &Metadata, key: &str) -> Option<String> {
    get_str(m, key).map(str::to_string)
}

fn get_f64(m: &Metadata, key: &str) -> Option<f64> {
    match m.get(key)? {
        MetadataValue::Number(n) => Some(*n),
        MetadataValue::String(s) => s.parse().ok(),
        MetadataValue::Bool(_) => None,
    }
}

fn split_list(m: &Metadata, key: &str) -> Vec<String> {
    get_str(m, key)
        .map(|s| {
            s.split(',')
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
