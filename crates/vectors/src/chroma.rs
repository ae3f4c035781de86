//! REST client for a ChromaDB server (API v1).
//!
//! [`ChromaApi`] wraps the raw endpoints; [`ChromaCollection`] binds it to
//! one collection id and implements [`VectorCollection`]. Predicates are
//! rendered into Chroma's `where` / `where_document` JSON by
//! [`render_predicate`].

use std::sync::Arc;

use async_trait::async_trait;
use reelsearch_core::filters::Predicate;
use reelsearch_core::metadata::{is_membership_field, membership_key, metadata_to_json, Metadata};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::collection::{GetRequest, QueryRequest, RecordBatch, StoredRecord, VectorCollection};
use crate::error::StoreError;

/// Distance space used for every collection.
const DISTANCE_SPACE: &str = "cosine";

// ---------------------------------------------------------------------------
// Raw API
// ---------------------------------------------------------------------------

/// HTTP client for a single ChromaDB instance.
pub struct ChromaApi {
    client: reqwest::Client,
    base_url: String,
}

/// Collection descriptor returned by `POST /api/v1/collections`.
#[derive(Debug, Deserialize)]
pub struct CollectionInfo {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
struct QueryResponse {
    ids: Vec<Vec<String>>,
    #[serde(default)]
    distances: Option<Vec<Vec<Option<f64>>>>,
    #[serde(default)]
    metadatas: Option<Vec<Vec<Option<Metadata>>>>,
    #[serde(default)]
    documents: Option<Vec<Vec<Option<String>>>>,
    #[serde(default)]
    embeddings: Option<Vec<Vec<Option<Vec<f32>>>>>,
}

#[derive(Debug, Default, Deserialize)]
struct GetResponse {
    ids: Vec<String>,
    #[serde(default)]
    metadatas: Option<Vec<Option<Metadata>>>,
    #[serde(default)]
    documents: Option<Vec<Option<String>>>,
    #[serde(default)]
    embeddings: Option<Vec<Option<Vec<f32>>>>,
}

impl ChromaApi {
    /// * `base_url` - e.g. `http://localhost:8000`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// `GET /api/v1/heartbeat`.
    pub async fn heartbeat(&self) -> Result<(), StoreError> {
        let response = self
            .client
            .get(format!("{}/api/v1/heartbeat", self.base_url))
            .send()
            .await?;
        Self::check_status(response).await
    }

    /// Fetch or create a collection using cosine distance.
    pub async fn get_or_create_collection(&self, name: &str) -> Result<CollectionInfo, StoreError> {
        let body = json!({
            "name": name,
            "metadata": { "hnsw:space": DISTANCE_SPACE },
            "get_or_create": true,
        });
        let response = self
            .client
            .post(format!("{}/api/v1/collections", self.base_url))
            .json(&body)
            .send()
            .await?;
        Self::parse_response(response).await.map_err(|e| match e {
            StoreError::Request(_) => e,
            other => StoreError::NotInitialized(format!("{name}: {other}")),
        })
    }

    async fn post_collection<T: DeserializeOwned>(
        &self,
        collection_id: &str,
        action: &str,
        body: &Value,
    ) -> Result<T, StoreError> {
        let response = self
            .client
            .post(format!(
                "{}/api/v1/collections/{collection_id}/{action}",
                self.base_url
            ))
            .json(body)
            .send()
            .await?;
        Self::parse_response(response).await
    }

    async fn post_collection_unit(
        &self,
        collection_id: &str,
        action: &str,
        body: &Value,
    ) -> Result<(), StoreError> {
        let response = self
            .client
            .post(format!(
                "{}/api/v1/collections/{collection_id}/{action}",
                self.base_url
            ))
            .json(body)
            .send()
            .await?;
        Self::check_status(response).await
    }

    // ---- private helpers ----

    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, StoreError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(StoreError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn parse_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, StoreError> {
        let response = Self::ensure_success(response).await?;
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| StoreError::Malformed(e.to_string()))
    }

    async fn check_status(response: reqwest::Response) -> Result<(), StoreError> {
        Self::ensure_success(response).await?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Collection
// ---------------------------------------------------------------------------

/// A named Chroma collection bound to its server-side id.
pub struct ChromaCollection {
    api: Arc<ChromaApi>,
    id: String,
    name: String,
}

impl ChromaCollection {
    /// Resolve (creating if needed) the collection called `name`.
    pub async fn connect(api: Arc<ChromaApi>, name: &str) -> Result<Self, StoreError> {
        let info = api.get_or_create_collection(name).await?;
        tracing::info!(collection = %info.name, id = %info.id, "Chroma collection ready");
        Ok(Self {
            api,
            id: info.id,
            name: info.name,
        })
    }
}

#[async_trait]
impl VectorCollection for ChromaCollection {
    fn name(&self) -> &str {
        &self.name
    }

    async fn add(&self, batch: RecordBatch) -> Result<(), StoreError> {
        if batch.is_empty() {
            return Ok(());
        }
        let body = add_body(&batch);
        self.api.post_collection_unit(&self.id, "add", &body).await
    }

    async fn query(&self, request: QueryRequest) -> Result<Vec<Vec<StoredRecord>>, StoreError> {
        if request.vectors.is_empty() {
            return Ok(Vec::new());
        }
        let body = query_body(&request);
        let response: QueryResponse = self.api.post_collection(&self.id, "query", &body).await?;
        unpack_query(response)
    }

    async fn get(&self, request: GetRequest) -> Result<Vec<StoredRecord>, StoreError> {
        if request.ids.as_ref().is_some_and(|ids| ids.is_empty()) {
            return Ok(Vec::new());
        }
        let body = get_body(&request);
        let response: GetResponse = self.api.post_collection(&self.id, "get", &body).await?;
        unpack_get(response)
    }

    async fn delete(&self, ids: &[String]) -> Result<(), StoreError> {
        if ids.is_empty() {
            return Ok(());
        }
        self.api
            .post_collection_unit(&self.id, "delete", &json!({ "ids": ids }))
            .await
    }
}

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

fn add_body(batch: &RecordBatch) -> Value {
    let metadatas: Vec<Map<String, Value>> = batch.metadatas.iter().map(metadata_to_json).collect();
    let mut body = json!({
        "ids": batch.ids,
        "embeddings": batch.embeddings,
        "metadatas": metadatas,
    });
    // Chroma takes documents for every record or none at all.
    if batch.documents.iter().any(Option::is_some) {
        let documents: Vec<&str> = batch
            .documents
            .iter()
            .map(|d| d.as_deref().unwrap_or_default())
            .collect();
        body["documents"] = json!(documents);
    }
    body
}

fn query_body(request: &QueryRequest) -> Value {
    let mut body = json!({
        "query_embeddings": request.vectors,
        "n_results": request.n_results,
        "include": request.include,
    });
    insert_predicates(
        &mut body,
        request.where_metadata.as_ref(),
        request.where_document.as_ref(),
    );
    body
}

fn get_body(request: &GetRequest) -> Value {
    let mut body = json!({ "include": request.include });
    if let Some(ids) = &request.ids {
        body["ids"] = json!(ids);
    }
    if let Some(limit) = request.limit {
        body["limit"] = json!(limit);
    }
    insert_predicates(
        &mut body,
        request.where_metadata.as_ref(),
        request.where_document.as_ref(),
    );
    body
}

/// Empty predicates are omitted; Chroma rejects `"where": {}`.
fn insert_predicates(body: &mut Value, metadata: Option<&Predicate>, document: Option<&Predicate>) {
    if let Some(rendered) = metadata.and_then(render_predicate) {
        body["where"] = rendered;
    }
    if let Some(rendered) = document.and_then(render_predicate) {
        body["where_document"] = rendered;
    }
}

/// Render a predicate as Chroma filter JSON. Returns `None` for a predicate
/// with no conditions.
///
/// | Predicate                   | JSON                                         |
/// |-----------------------------|----------------------------------------------|
/// | `Eq { f, v }`               | `{f: {"$eq": v}}`                            |
/// | `In { f, vs }` (exact)      | `{f: {"$in": vs}}`                           |
/// | `In { f, vs }` (membership) | `$or` of `{"f:v": {"$eq": true}}`            |
/// | `And([..])`                 | `$and`; a single child is unwrapped          |
/// | `Contains(s)`               | `{"$contains": s}`                           |
/// | `Regex(p)` / `NotRegex(p)`  | `{"$regex": p}` / `{"$not_regex": p}`        |
pub fn render_predicate(predicate: &Predicate) -> Option<Value> {
    match predicate {
        Predicate::Eq { field, value } => Some(json!({ field: { "$eq": value.to_json() } })),
        Predicate::In { field, values } if is_membership_field(field) => {
            let arms: Vec<Value> = values
                .iter()
                .filter_map(|v| v.as_str())
                .map(|label| json!({ membership_key(field, label): { "$eq": true } }))
                .collect();
            combine("$or", arms)
        }
        Predicate::In { field, values } => {
            if values.is_empty() {
                return None;
            }
            let values: Vec<Value> = values.iter().map(|v| v.to_json()).collect();
            Some(json!({ field: { "$in": values } }))
        }
        Predicate::And(children) => combine("$and", children.iter().filter_map(render_predicate).collect()),
        Predicate::Contains(needle) => Some(json!({ "$contains": needle })),
        Predicate::Regex(pattern) => Some(json!({ "$regex": pattern })),
        Predicate::NotRegex(pattern) => Some(json!({ "$not_regex": pattern })),
    }
}

fn combine(operator: &str, mut arms: Vec<Value>) -> Option<Value> {
    match arms.len() {
        0 => None,
        1 => arms.pop(),
        _ => Some(json!({ operator: arms })),
    }
}

// ---------------------------------------------------------------------------
// Response unpacking
// ---------------------------------------------------------------------------

fn unpack_query(response: QueryResponse) -> Result<Vec<Vec<StoredRecord>>, StoreError> {
    let mut out = Vec::with_capacity(response.ids.len());
    for (q, ids) in response.ids.into_iter().enumerate() {
        let distances = column(&response.distances, q, ids.len(), "distances")?;
        let metadatas = column(&response.metadatas, q, ids.len(), "metadatas")?;
        let documents = column(&response.documents, q, ids.len(), "documents")?;
        let embeddings = column(&response.embeddings, q, ids.len(), "embeddings")?;

        let records = ids
            .into_iter()
            .enumerate()
            .map(|(i, id)| StoredRecord {
                id,
                distance: distances.and_then(|d| d[i]),
                metadata: metadatas.and_then(|m| m[i].clone()),
                document: documents.and_then(|d| d[i].clone()),
                embedding: embeddings.and_then(|e| e[i].clone()),
            })
            .collect();
        out.push(records);
    }
    Ok(out)
}

/// Borrow the `q`-th row of an optional query column, checking its length.
fn column<'a, T>(
    field: &'a Option<Vec<Vec<T>>>,
    q: usize,
    expected: usize,
    name: &str,
) -> Result<Option<&'a [T]>, StoreError> {
    let Some(rows) = field else {
        return Ok(None);
    };
    match rows.get(q) {
        Some(row) if row.len() == expected => Ok(Some(row.as_slice())),
        _ => Err(StoreError::Malformed(format!(
            "query column '{name}' does not match ids"
        ))),
    }
}

fn unpack_get(response: GetResponse) -> Result<Vec<StoredRecord>, StoreError> {
    let n = response.ids.len();
    let check = |len: Option<usize>, name: &str| match len {
        Some(len) if len != n => Err(StoreError::Malformed(format!(
            "get column '{name}' does not match ids"
        ))),
        _ => Ok(()),
    };
    check(response.metadatas.as_ref().map(Vec::len), "metadatas")?;
    check(response.documents.as_ref().map(Vec::len), "documents")?;
    check(response.embeddings.as_ref().map(Vec::len), "embeddings")?;

    let mut metadatas = response.metadatas.map(Vec::into_iter);
    let mut documents = response.documents.map(Vec::into_iter);
    let mut embeddings = response.embeddings.map(Vec::into_iter);

    Ok(response
        .ids
        .into_iter()
        .map(|id| StoredRecord {
            id,
            distance: None,
            metadata: metadatas.as_mut().and_then(|it| it.next().flatten()),
            document: documents.as_mut().and_then(|it| it.next().flatten()),
            embedding: embeddings.as_mut().and_then(|it| it.next().flatten()),
        })
        .collect())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use reelsearch_core::filters::{build_filters, Filters, SearchParams};
    use reelsearch_core::metadata::MetadataValue;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    // -- render_predicate ----------------------------------------------------

    #[test]
    fn empty_predicate_is_omitted() {
        assert_eq!(render_predicate(&Predicate::empty()), None);
    }

    #[test]
    fn single_condition_is_unwrapped() {
        let filters = Filters::scope_only(&strings(&["/videos/a.mp4"]));
        assert_eq!(
            render_predicate(&filters.metadata),
            Some(json!({ "source_path": { "$in": ["/videos/a.mp4"] } }))
        );
    }

    #[test]
    fn tag_field_renders_membership_key() {
        let params = SearchParams {
            camera: Some("Static".into()),
            ..Default::default()
        };
        let filters = build_filters(&params, None).unwrap();
        assert_eq!(
            render_predicate(&filters.metadata),
            Some(json!({ "camera:static": { "$eq": true } }))
        );
    }

    #[test]
    fn list_field_renders_membership_keys() {
        let params = SearchParams {
            faces: strings(&["Alice", "Bob"]),
            objects: strings(&["Car"]),
            ..Default::default()
        };
        let filters = build_filters(&params, None).unwrap();
        assert_eq!(
            render_predicate(&filters.metadata),
            Some(json!({
                "$and": [
                    { "$or": [
                        { "faces:alice": { "$eq": true } },
                        { "faces:bob": { "$eq": true } },
                    ]},
                    { "objects:car": { "$eq": true } },
                ]
            }))
        );
    }

    #[test]
    fn document_predicates_render_operators() {
        let params = SearchParams {
            transcription: Some("hello".into()),
            exclude_regex: Some("(?i)intro".into()),
            ..Default::default()
        };
        let filters = build_filters(&params, None).unwrap();
        let document = filters.document.expect("document predicate");
        assert_eq!(
            render_predicate(&document),
            Some(json!({
                "$and": [
                    { "$contains": "hello" },
                    { "$not_regex": "(?i)intro" },
                ]
            }))
        );
    }

    #[test]
    fn eq_renders_scalar() {
        let p = Predicate::Eq {
            field: "start_time".into(),
            value: MetadataValue::Number(1.5),
        };
        assert_eq!(render_predicate(&p), Some(json!({ "start_time": { "$eq": 1.5 } })));
    }

    // -- bodies --------------------------------------------------------------

    #[test]
    fn add_body_omits_documents_when_none_present() {
        let batch = RecordBatch {
            ids: strings(&["a"]),
            embeddings: vec![vec![1.0, 0.0]],
            metadatas: vec![Metadata::new()],
            documents: vec![None],
        };
        let body = add_body(&batch);
        assert!(body.get("documents").is_none());
        assert_eq!(body["ids"], json!(["a"]));
    }

    #[test]
    fn query_body_includes_where_only_when_restricted() {
        let mut request = QueryRequest::single(vec![1.0], 3);
        request.where_metadata = Some(Predicate::empty());
        let body = query_body(&request);
        assert!(body.get("where").is_none());
        assert_eq!(body["include"], json!(["metadatas", "documents", "distances"]));
    }

    // -- unpacking -----------------------------------------------------------

    #[test]
    fn unpack_query_zips_columns() {
        let response: QueryResponse = serde_json::from_value(json!({
            "ids": [["a", "b"]],
            "distances": [[0.1, 0.4]],
            "metadatas": [[{ "source_path": "/v.mp4" }, null]],
            "documents": null,
        }))
        .unwrap();
        let results = unpack_query(response).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0][0].distance, Some(0.1));
        assert!(results[0][0].metadata.is_some());
        assert!(results[0][1].metadata.is_none());
        assert!(results[0][1].document.is_none());
    }

    #[test]
    fn unpack_get_rejects_ragged_columns() {
        let response: GetResponse = serde_json::from_value(json!({
            "ids": ["a", "b"],
            "metadatas": [{}],
        }))
        .unwrap();
        assert_matches!(unpack_get(response), Err(StoreError::Malformed(_)));
    }
}
