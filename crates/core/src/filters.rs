//! Structured search parameters and the predicate AST they compile to.
//!
//! [`build_filters`] splits a [`SearchParams`] into two independent
//! predicates: one over stored metadata, one over the stored document text.
//! Vector stores expose these as separate query parameters (`where` and
//! `where_document` in ChromaDB), so they are kept apart here as well.
//! The AST is store-agnostic; each collection implementation renders or
//! evaluates it.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::metadata::{
    is_membership_field, membership_key, Metadata, MetadataValue, KEY_ASPECT_RATIO, KEY_CAMERA,
    KEY_EMOTIONS, KEY_FACES, KEY_LOCATION, KEY_OBJECTS, KEY_SHOT_TYPE, KEY_SOURCE_PATH,
};

// ---------------------------------------------------------------------------
// SearchParams
// ---------------------------------------------------------------------------

/// A structured retrieval query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchParams {
    /// Free-text semantic query, embedded and matched by similarity.
    pub query: Option<String>,
    pub faces: Vec<String>,
    pub objects: Vec<String>,
    pub emotions: Vec<String>,
    pub locations: Vec<String>,
    pub camera: Option<String>,
    pub shot_type: Option<String>,
    pub aspect_ratio: Option<String>,
    /// Comma-separated literals that must all appear in the document text.
    pub transcription: Option<String>,
    pub transcription_regex: Option<String>,
    /// Comma-separated literals for on-screen text.
    pub detected_text: Option<String>,
    pub detected_text_regex: Option<String>,
    /// Scenes whose document text matches this pattern are excluded.
    pub exclude_regex: Option<String>,
    pub limit: Option<usize>,
    /// Allowed source paths; empty means unrestricted.
    pub scope: Vec<String>,
}

impl SearchParams {
    /// The semantic query, if one was given and is not blank.
    pub fn semantic_query(&self) -> Option<&str> {
        self.query.as_deref().map(str::trim).filter(|q| !q.is_empty())
    }
}

// ---------------------------------------------------------------------------
// Predicate AST
// ---------------------------------------------------------------------------

/// A filter condition over metadata (`Eq`, `In`) or document text
/// (`Contains`, `Regex`, `NotRegex`), combined with `And`.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Eq {
        field: String,
        value: MetadataValue,
    },
    /// For membership fields (labels and tags) this means "the scene holds
    /// any of `values`", compared case-insensitively. Other fields compare
    /// exactly.
    In {
        field: String,
        values: Vec<MetadataValue>,
    },
    And(Vec<Predicate>),
    Contains(String),
    Regex(String),
    NotRegex(String),
}

impl Predicate {
    /// The predicate that matches everything (`{}`).
    pub fn empty() -> Self {
        Self::And(Vec::new())
    }

    /// `true` if this predicate imposes no restriction.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::And(children) => children.iter().all(Predicate::is_empty),
            _ => false,
        }
    }

    /// Evaluate against a record's metadata and document text.
    ///
    /// Invalid regex patterns never match; [`build_filters`] rejects them
    /// before they reach a store.
    pub fn matches(&self, metadata: &Metadata, document: &str) -> bool {
        match self {
            Self::Eq { field, value } => metadata.get(field) == Some(value),
            Self::In { field, values } if is_membership_field(field) => values.iter().any(|v| {
                v.as_str().is_some_and(|label| {
                    metadata.get(&membership_key(field, label)) == Some(&MetadataValue::Bool(true))
                })
            }),
            Self::In { field, values } => metadata
                .get(field)
                .is_some_and(|actual| values.contains(actual)),
            Self::And(children) => children.iter().all(|c| c.matches(metadata, document)),
            Self::Contains(needle) => document.contains(needle.as_str()),
            Self::Regex(pattern) => regex::Regex::new(pattern)
                .map(|re| re.is_match(document))
                .unwrap_or(false),
            Self::NotRegex(pattern) => regex::Regex::new(pattern)
                .map(|re| !re.is_match(document))
                .unwrap_or(false),
        }
    }
}

/// The two predicates derived from a [`SearchParams`].
#[derive(Debug, Clone, PartialEq)]
pub struct Filters {
    /// AND of metadata conditions; [`Predicate::empty`] when unrestricted.
    pub metadata: Predicate,
    /// AND of document conditions; `None` when unrestricted.
    pub document: Option<Predicate>,
}

impl Filters {
    /// `true` when neither predicate restricts anything.
    pub fn is_unrestricted(&self) -> bool {
        self.metadata.is_empty() && self.document.is_none()
    }

    /// Filters carrying only a scope restriction.
    pub fn scope_only(scope: &[String]) -> Self {
        let metadata = match in_condition(KEY_SOURCE_PATH, scope.iter()) {
            Some(cond) => Predicate::And(vec![cond]),
            None => Predicate::empty(),
        };
        Self {
            metadata,
            document: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Translate search parameters into metadata and document predicates.
///
/// `scope` overrides `params.scope` when given and non-empty. Conditions
/// are AND-combined: a scene must satisfy every provided filter.
pub fn build_filters(params: &SearchParams, scope: Option<&[String]>) -> Result<Filters, CoreError> {
    let scope = scope
        .filter(|s| !s.is_empty())
        .unwrap_or(params.scope.as_slice());

    let mut metadata = Vec::new();

    // Scope is always the first condition.
    if let Some(cond) = in_condition(KEY_SOURCE_PATH, scope.iter()) {
        metadata.push(cond);
    }

    let single_valued = [
        (KEY_ASPECT_RATIO, &params.aspect_ratio),
        (KEY_CAMERA, &params.camera),
    ];
    for (field, value) in single_valued {
        if let Some(cond) = in_condition(field, value.iter()) {
            metadata.push(cond);
        }
    }
    if let Some(cond) = in_condition(KEY_LOCATION, params.locations.iter()) {
        metadata.push(cond);
    }
    if let Some(cond) = in_condition(KEY_SHOT_TYPE, params.shot_type.iter()) {
        metadata.push(cond);
    }

    let labels = [
        (KEY_FACES, &params.faces),
        (KEY_OBJECTS, &params.objects),
        (KEY_EMOTIONS, &params.emotions),
    ];
    for (field, values) in labels {
        if let Some(cond) = in_condition(field, values.iter()) {
            metadata.push(cond);
        }
    }

    let mut document = Vec::new();
    for literal in [&params.transcription, &params.detected_text]
        .into_iter()
        .flatten()
    {
        document.extend(
            literal
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(|t| Predicate::Contains(t.to_string())),
        );
    }
    for pattern in [&params.transcription_regex, &params.detected_text_regex]
        .into_iter()
        .flatten()
        .filter(|p| !p.trim().is_empty())
    {
        validate_pattern(pattern)?;
        document.push(Predicate::Regex(pattern.clone()));
    }
    if let Some(pattern) = params.exclude_regex.as_ref().filter(|p| !p.trim().is_empty()) {
        validate_pattern(pattern)?;
        document.push(Predicate::NotRegex(pattern.clone()));
    }

    Ok(Filters {
        metadata: Predicate::And(metadata),
        document: (!document.is_empty()).then_some(Predicate::And(document)),
    })
}

/// Build `field ∈ {values}` from non-blank values, or `None` if there are none.
fn in_condition<'a>(field: &str, values: impl Iterator<Item = &'a String>) -> Option<Predicate> {
    let values: Vec<MetadataValue> = values
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(MetadataValue::from)
        .collect();
    if values.is_empty() {
        return None;
    }
    Some(Predicate::In {
        field: field.to_string(),
        values,
    })
}

fn validate_pattern(pattern: &str) -> Result<(), CoreError> {
    regex::Regex::new(pattern)
        .map(|_| ())
        .map_err(|e| CoreError::Validation(format!("Invalid regex '{pattern}': {e}")))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
