//! Elasticsearch-backed vector store.
//!
//! Talks to the cluster's REST API directly: a `dense_vector` field holds the
//! embedding and approximate kNN search does the retrieval. Scores are the
//! cluster's cosine scores, `(1 + cos) / 2`.

use super::{IndexedSource, Node, SearchResult, VectorStore};
use crate::config::ElasticSettings;
use crate::error::{PdfragError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info, instrument};
use url::Url;
use uuid::Uuid;

/// Nodes sent per `_bulk` request.
const BULK_BATCH_SIZE: usize = 500;

/// Upper bound the cluster accepts for `k` and `num_candidates`.
const MAX_KNN_CANDIDATES: usize = 10_000;

/// Characters Elasticsearch rejects in index names.
const INVALID_INDEX_CHARS: &[char] = &['\\', '/', '*', '?', '"', '<', '>', '|', ' ', ',', '#', ':'];

/// Vector store over an Elasticsearch index.
pub struct ElasticsearchStore {
    client: reqwest::Client,
    base_url: Url,
    index: String,
    username: String,
    password: String,
}

impl ElasticsearchStore {
    /// Create a client for the configured host, credentials and index.
    ///
    /// No request is made until the first operation.
    pub fn new(settings: &ElasticSettings) -> Result<Self> {
        let mut base_url = Url::parse(&settings.host).map_err(|e| {
            PdfragError::Config(format!("Invalid Elasticsearch host '{}': {}", settings.host, e))
        })?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        validate_index_name(&settings.index_name)?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_seconds))
            .danger_accept_invalid_certs(settings.insecure)
            .build()?;

        Ok(Self {
            client,
            base_url,
            index: settings.index_name.clone(),
            username: settings.username.clone(),
            password: settings.password.clone(),
        })
    }

    /// Name of the backing index.
    pub fn index_name(&self) -> &str {
        &self.index
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let url = self
            .base_url
            .join(path)
            .map_err(|e| PdfragError::VectorStore(format!("Invalid URL path '{}': {}", path, e)))?;

        let builder = self.client.request(method, url);
        Ok(if self.username.is_empty() {
            builder
        } else {
            builder.basic_auth(&self.username, Some(&self.password))
        })
    }

    /// Send a request and decode the JSON reply. `Ok(None)` when the index is missing.
    async fn send(&self, builder: RequestBuilder) -> Result<Option<Value>> {
        let response = builder.send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PdfragError::VectorStore(format!(
                "Elasticsearch returned {}: {}",
                status,
                error_reason(&body)
            )));
        }

        Ok(Some(response.json().await?))
    }

    /// Check that the cluster is reachable and the credentials are accepted.
    pub async fn ping(&self) -> Result<String> {
        let info = self
            .send(self.request(Method::GET, "")?)
            .await?
            .ok_or_else(|| PdfragError::VectorStore("Cluster root returned 404".to_string()))?;

        Ok(info["version"]["number"]
            .as_str()
            .unwrap_or("unknown")
            .to_string())
    }
}

#[async_trait]
impl VectorStore for ElasticsearchStore {
    #[instrument(skip(self), fields(index = %self.index))]
    async fn ensure_index(&self, dimensions: usize) -> Result<()> {
        let response = self.request(Method::HEAD, &self.index)?.send().await?;

        match response.status() {
            s if s.is_success() => {
                debug!("Index {} already exists", self.index);
                Ok(())
            }
            StatusCode::NOT_FOUND => {
                self.send(self.request(Method::PUT, &self.index)?.json(&index_mapping(dimensions)))
                    .await?;
                info!("Created index {} ({} dimensions)", self.index, dimensions);
                Ok(())
            }
            status => Err(PdfragError::VectorStore(format!(
                "Checking index {} returned {}",
                self.index, status
            ))),
        }
    }

    #[instrument(skip(self, nodes), fields(count = nodes.len()))]
    async fn upsert_batch(&self, nodes: &[Node]) -> Result<usize> {
        let mut indexed = 0;

        for batch in nodes.chunks(BULK_BATCH_SIZE) {
            let body = bulk_body(&self.index, batch)?;
            let response = self
                .send(
                    self.request(Method::POST, "_bulk?refresh=true")?
                        .header(reqwest::header::CONTENT_TYPE, "application/x-ndjson")
                        .body(body),
                )
                .await?
                .ok_or_else(|| PdfragError::VectorStore("Bulk endpoint returned 404".to_string()))?;

            indexed += parse_bulk_response(&response)?;
        }

        debug!("Indexed {} nodes into {}", indexed, self.index);
        Ok(indexed)
    }

    async fn search_with_threshold(
        &self,
        query_embedding: &[f32],
        limit: usize,
        min_score: f32,
    ) -> Result<Vec<SearchResult>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let path = format!("{}/_search", self.index);
        let response = self
            .send(self.request(Method::POST, &path)?.json(&knn_query(query_embedding, limit)))
            .await?;

        let Some(response) = response else {
            return Ok(Vec::new());
        };

        Ok(parse_search_hits(&response)?
            .into_iter()
            .filter(|r| r.score >= min_score)
            .collect())
    }

    async fn delete_by_source(&self, file_path: &str, keep: &[Uuid]) -> Result<usize> {
        let path = format!("{}/_delete_by_query?refresh=true", self.index);
        let response = self
            .send(self.request(Method::POST, &path)?.json(&delete_query(file_path, keep)))
            .await?;

        Ok(response
            .and_then(|r| r["deleted"].as_u64())
            .unwrap_or(0) as usize)
    }

    async fn list_sources(&self) -> Result<Vec<IndexedSource>> {
        let path = format!("{}/_search", self.index);
        let response = self
            .send(self.request(Method::POST, &path)?.json(&sources_aggregation()))
            .await?;

        Ok(response.map(|r| parse_sources(&r)).unwrap_or_default())
    }

    async fn is_source_indexed(&self, file_path: &str) -> Result<bool> {
        let path = format!("{}/_count", self.index);
        let response = self
            .send(self.request(Method::POST, &path)?.json(&source_query(file_path)))
            .await?;

        Ok(response.and_then(|r| r["count"].as_u64()).unwrap_or(0) > 0)
    }

    async fn document_count(&self) -> Result<usize> {
        let path = format!("{}/_count", self.index);
        let response = self.send(self.request(Method::GET, &path)?).await?;

        Ok(response.and_then(|r| r["count"].as_u64()).unwrap_or(0) as usize)
    }
}

/// Reject index names the cluster would refuse.
fn validate_index_name(name: &str) -> Result<()> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.starts_with(['-', '_', '+'])
        || name.chars().any(|c| c.is_uppercase() || INVALID_INDEX_CHARS.contains(&c));

    if invalid {
        return Err(PdfragError::Config(format!(
            "Invalid index name '{}': use lowercase letters, digits, '-' or '_'",
            name
        )));
    }
    Ok(())
}

/// Index mapping for nodes.
pub fn index_mapping(dimensions: usize) -> Value {
    json!({
        "mappings": {
            "properties": {
                "id": {"type": "keyword"},
                "content": {"type": "text"},
                "embedding": {
                    "type": "dense_vector",
                    "dims": dimensions,
                    "index": true,
                    "similarity": "cosine"
                },
                "metadata": {
                    "properties": {
                        "file_name": {"type": "keyword"},
                        "file_path": {"type": "keyword"},
                        "page_label": {"type": "integer"},
                        "chunk_order": {"type": "integer"},
                        "indexed_at": {"type": "date"}
                    }
                }
            }
        }
    })
}

/// NDJSON body for a `_bulk` request indexing `nodes`.
pub fn bulk_body(index: &str, nodes: &[Node]) -> Result<String> {
    let mut body = String::new();
    for node in nodes {
        let action = json!({"index": {"_index": index, "_id": node.id.to_string()}});
        body.push_str(&serde_json::to_string(&action)?);
        body.push('\n');
        body.push_str(&serde_json::to_string(node)?);
        body.push('\n');
    }
    Ok(body)
}

/// Count indexed items, failing on the first item-level error.
pub fn parse_bulk_response(response: &Value) -> Result<usize> {
    let items = response["items"].as_array().cloned().unwrap_or_default();

    if response["errors"].as_bool().unwrap_or(false) {
        let reason = items
            .iter()
            .filter_map(|item| item["index"]["error"]["reason"].as_str())
            .next()
            .unwrap_or("unknown error");
        return Err(PdfragError::VectorStore(format!("Bulk indexing failed: {}", reason)));
    }

    Ok(items.len())
}

/// Approximate kNN query on the embedding field. `k` is capped at the cluster limit.
pub fn knn_query(query_embedding: &[f32], k: usize) -> Value {
    let k = k.min(MAX_KNN_CANDIDATES);
    json!({
        "knn": {
            "field": "embedding",
            "query_vector": query_embedding,
            "k": k,
            "num_candidates": k.saturating_mul(10).clamp(100, MAX_KNN_CANDIDATES)
        },
        "size": k,
        "_source": {"excludes": ["embedding"]}
    })
}

/// Term query selecting one source file.
fn source_query(file_path: &str) -> Value {
    json!({"query": {"term": {"metadata.file_path": file_path}}})
}

/// Query selecting one source file's nodes, minus the ids in `keep`.
fn delete_query(file_path: &str, keep: &[Uuid]) -> Value {
    let keep: Vec<String> = keep.iter().map(|id| id.to_string()).collect();
    json!({
        "query": {
            "bool": {
                "filter": [{"term": {"metadata.file_path": file_path}}],
                "must_not": [{"ids": {"values": keep}}]
            }
        }
    })
}

/// Aggregation listing indexed files.
fn sources_aggregation() -> Value {
    json!({
        "size": 0,
        "aggs": {
            "sources": {
                "terms": {"field": "metadata.file_path", "size": 10000, "order": {"_key": "asc"}},
                "aggs": {
                    "file_name": {"terms": {"field": "metadata.file_name", "size": 1}},
                    "pages": {"cardinality": {"field": "metadata.page_label"}},
                    "last_indexed": {"max": {"field": "metadata.indexed_at"}}
                }
            }
        }
    })
}

#[derive(Deserialize)]
struct Hit {
    #[serde(rename = "_score")]
    score: Option<f32>,
    #[serde(rename = "_source")]
    source: Node,
}

/// Decode `hits.hits` into search results.
pub fn parse_search_hits(response: &Value) -> Result<Vec<SearchResult>> {
    let hits = match response["hits"]["hits"].as_array() {
        Some(hits) => hits,
        None => return Ok(Vec::new()),
    };

    hits.iter()
        .map(|hit| {
            let hit: Hit = serde_json::from_value(hit.clone())?;
            Ok(SearchResult {
                node: hit.source,
                score: hit.score.unwrap_or_default(),
            })
        })
        .collect()
}

/// Decode the file aggregation into source summaries.
pub fn parse_sources(response: &Value) -> Vec<IndexedSource> {
    let Some(buckets) = response["aggregations"]["sources"]["buckets"].as_array() else {
        return Vec::new();
    };

    buckets
        .iter()
        .filter_map(|bucket| {
            let file_path = bucket["key"].as_str()?.to_string();
            let file_name = bucket["file_name"]["buckets"][0]["key"]
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| file_name_of(&file_path));
            Some(IndexedSource {
                file_path,
                file_name,
                chunk_count: bucket["doc_count"].as_u64().unwrap_or(0) as u32,
                page_count: bucket["pages"]["value"].as_u64().unwrap_or(0) as u32,
                indexed_at: bucket["last_indexed"]["value_as_string"]
                    .as_str()
                    .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                    .map(|t| t.with_timezone(&Utc)),
            })
        })
        .collect()
}

fn file_name_of(path: &str) -> String {
    std::path::Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string())
}

/// Pull the human-readable reason out of an Elasticsearch error body.
fn error_reason(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v["error"]["reason"]
                .as_str()
                .or_else(|| v["error"].as_str())
                .map(|s| s.to_string())
        })
        .unwrap_or_else(|| body.chars().take(300).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector_store::test_node;

    fn settings(host: &str, index: &str) -> ElasticSettings {
        ElasticSettings {
            host: host.to_string(),
            index_name: index.to_string(),
            ..ElasticSettings::default()
        }
    }

    #[test]
    fn test_new_normalizes_base_url() {
        let store = ElasticsearchStore::new(&settings("https://es.local:9200/prefix", "docs")).unwrap();
        assert_eq!(store.base_url.as_str(), "https://es.local:9200/prefix/");
        assert_eq!(store.index_name(), "docs");

        let url = store.base_url.join("docs/_search").unwrap();
        assert_eq!(url.as_str(), "https://es.local:9200/prefix/docs/_search");
    }

    #[test]
    fn test_new_rejects_bad_config() {
        assert!(matches!(
            ElasticsearchStore::new(&settings("not a url", "docs")),
            Err(PdfragError::Config(_))
        ));
        for bad in ["", "Docs", "_private", "a b", "x/y"] {
            assert!(
                matches!(validate_index_name(bad), Err(PdfragError::Config(_))),
                "{} should be rejected",
                bad
            );
        }
        assert!(validate_index_name("pdf-docs_2024").is_ok());
    }

    #[test]
    fn test_index_mapping() {
        let mapping = index_mapping(1024);
        let embedding = &mapping["mappings"]["properties"]["embedding"];
        assert_eq!(embedding["type"], "dense_vector");
        assert_eq!(embedding["dims"], 1024);
        assert_eq!(embedding["similarity"], "cosine");
        assert_eq!(
            mapping["mappings"]["properties"]["metadata"]["properties"]["file_name"]["type"],
            "keyword"
        );
    }

    #[test]
    fn test_bulk_body_is_ndjson() {
        let nodes = vec![
            test_node("a.pdf", 1, "first", vec![0.1, 0.2]),
            test_node("a.pdf", 2, "second", vec![0.3, 0.4]),
        ];
        let body = bulk_body("docs", &nodes).unwrap();
        let lines: Vec<&str> = body.lines().collect();

        assert_eq!(lines.len(), 4);
        assert!(body.ends_with('\n'));

        let action: Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(action["index"]["_index"], "docs");
        assert_eq!(action["index"]["_id"], nodes[0].id.to_string());

        let source: Value = serde_json::from_str(lines[3]).unwrap();
        assert_eq!(source["content"], "second");
        assert_eq!(source["metadata"]["page_label"], 2);
        assert_eq!(source["embedding"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_parse_bulk_response() {
        let ok = json!({"errors": false, "items": [{"index": {"status": 201}}, {"index": {"status": 201}}]});
        assert_eq!(parse_bulk_response(&ok).unwrap(), 2);

        let failed = json!({
            "errors": true,
            "items": [
                {"index": {"status": 201}},
                {"index": {"status": 400, "error": {"reason": "different number of dimensions"}}}
            ]
        });
        let err = parse_bulk_response(&failed).unwrap_err();
        assert!(err.to_string().contains("different number of dimensions"));
    }

    #[test]
    fn test_knn_query() {
        let query = knn_query(&[0.5, 0.5], 2);
        assert_eq!(query["knn"]["k"], 2);
        assert_eq!(query["knn"]["num_candidates"], 100);
        assert_eq!(query["size"], 2);
        assert_eq!(knn_query(&[0.5], 50)["knn"]["num_candidates"], 500);
    }

    #[test]
    fn test_knn_query_respects_cluster_limit() {
        let query = knn_query(&[0.5], 5000);
        assert_eq!(query["knn"]["num_candidates"], 10_000);
        assert_eq!(query["knn"]["k"], 5000);

        let query = knn_query(&[0.5], 50_000);
        assert_eq!(query["knn"]["k"], 10_000);
        assert_eq!(query["knn"]["num_candidates"], 10_000);
        assert_eq!(query["size"], 10_000);
    }

    #[test]
    fn test_delete_query_keeps_new_ids() {
        let keep = Uuid::new_v4();
        let query = delete_query("data/a/report.pdf", &[keep]);
        assert_eq!(
            query["query"]["bool"]["filter"][0]["term"]["metadata.file_path"],
            "data/a/report.pdf"
        );
        assert_eq!(query["query"]["bool"]["must_not"][0]["ids"]["values"], json!([keep.to_string()]));
    }

    #[test]
    fn test_parse_search_hits() {
        let node = test_node("a.pdf", 3, "matched text", vec![]);
        let response = json!({
            "hits": {
                "hits": [
                    {"_id": node.id.to_string(), "_score": 0.91, "_source": serde_json::to_value(&node).unwrap()}
                ]
            }
        });

        let results = parse_search_hits(&response).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].node.content, "matched text");
        assert_eq!(results[0].node.metadata.page_label, 3);
        assert!((results[0].score - 0.91).abs() < 1e-6);

        assert!(parse_search_hits(&json!({})).unwrap().is_empty());
    }

    #[test]
    fn test_parse_sources() {
        let response = json!({
            "aggregations": {
                "sources": {
                    "buckets": [
                        {
                            "key": "data/manuals/guide.pdf",
                            "doc_count": 12,
                            "file_name": {"buckets": [{"key": "guide.pdf", "doc_count": 12}]},
                            "pages": {"value": 5},
                            "last_indexed": {"value": 1714564800000.0, "value_as_string": "2024-05-01T12:00:00.000Z"}
                        }
                    ]
                }
            }
        });

        let sources = parse_sources(&response);
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].file_path, "data/manuals/guide.pdf");
        assert_eq!(sources[0].file_name, "guide.pdf");
        assert_eq!(sources[0].chunk_count, 12);
        assert_eq!(sources[0].page_count, 5);
        assert!(sources[0].indexed_at.is_some());
    }

    #[test]
    fn test_error_reason() {
        let body = r#"{"error":{"type":"security_exception","reason":"unable to authenticate user"},"status":401}"#;
        assert_eq!(error_reason(body), "unable to authenticate user");
        assert_eq!(error_reason("plain text"), "plain text");
    }

    mod http {
        use super::*;
        use wiremock::matchers::{basic_auth, body_partial_json, header, method, path, query_param};
        use wiremock::{Mock, MockServer, Request, ResponseTemplate};

        fn store_for(server: &MockServer) -> ElasticsearchStore {
            ElasticsearchStore::new(&ElasticSettings {
                host: server.uri(),
                username: "elastic".to_string(),
                password: "changeme".to_string(),
                index_name: "docs".to_string(),
                ..ElasticSettings::default()
            })
            .unwrap()
        }

        /// Acknowledge every action in a `_bulk` body.
        fn bulk_ack(request: &Request) -> ResponseTemplate {
            let actions = String::from_utf8_lossy(&request.body).lines().count() / 2;
            let items: Vec<Value> = (0..actions).map(|_| json!({"index": {"status": 201}})).collect();
            ResponseTemplate::new(200).set_body_json(json!({"errors": false, "items": items}))
        }

        #[tokio::test]
        async fn test_ping_sends_basic_auth() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/"))
                .and(basic_auth("elastic", "changeme"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({"version": {"number": "8.13.0"}})))
                .expect(1)
                .mount(&server)
                .await;

            assert_eq!(store_for(&server).ping().await.unwrap(), "8.13.0");
        }

        #[tokio::test]
        async fn test_ensure_index_creates_missing_index() {
            let server = MockServer::start().await;
            Mock::given(method("HEAD"))
                .and(path("/docs"))
                .respond_with(ResponseTemplate::new(404))
                .expect(1)
                .mount(&server)
                .await;
            Mock::given(method("PUT"))
                .and(path("/docs"))
                .and(body_partial_json(json!({
                    "mappings": {"properties": {"embedding": {"type": "dense_vector", "dims": 1536}}}
                })))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({"acknowledged": true})))
                .expect(1)
                .mount(&server)
                .await;

            store_for(&server).ensure_index(1536).await.unwrap();
        }

        #[tokio::test]
        async fn test_ensure_index_leaves_existing_index() {
            let server = MockServer::start().await;
            Mock::given(method("HEAD"))
                .and(path("/docs"))
                .respond_with(ResponseTemplate::new(200))
                .mount(&server)
                .await;
            Mock::given(method("PUT"))
                .respond_with(ResponseTemplate::new(200))
                .expect(0)
                .mount(&server)
                .await;

            store_for(&server).ensure_index(1024).await.unwrap();
        }

        #[tokio::test]
        async fn test_ensure_index_reports_unexpected_status() {
            let server = MockServer::start().await;
            Mock::given(method("HEAD"))
                .and(path("/docs"))
                .respond_with(ResponseTemplate::new(401))
                .mount(&server)
                .await;

            let err = store_for(&server).ensure_index(1024).await.unwrap_err();
            assert!(matches!(err, PdfragError::VectorStore(_)));
            assert!(err.to_string().contains("401"));
        }

        #[tokio::test]
        async fn test_error_status_carries_reason() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/docs/_count"))
                .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                    "error": {"type": "security_exception", "reason": "unable to authenticate user"},
                    "status": 401
                })))
                .mount(&server)
                .await;

            let err = store_for(&server).document_count().await.unwrap_err();
            assert!(err.to_string().contains("unable to authenticate user"));
        }

        #[tokio::test]
        async fn test_missing_index_reads_as_empty() {
            let server = MockServer::start().await;
            Mock::given(wiremock::matchers::any())
                .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                    "error": {"type": "index_not_found_exception", "reason": "no such index [docs]"}
                })))
                .mount(&server)
                .await;

            let store = store_for(&server);
            assert_eq!(store.document_count().await.unwrap(), 0);
            assert!(!store.is_source_indexed("data/a.pdf").await.unwrap());
            assert_eq!(store.delete_by_source("data/a.pdf", &[]).await.unwrap(), 0);
            assert!(store.list_sources().await.unwrap().is_empty());
            assert!(store.search(&[0.1, 0.2], 2).await.unwrap().is_empty());
        }

        #[tokio::test]
        async fn test_source_queries_use_file_path() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/docs/_count"))
                .and(body_partial_json(json!({"query": {"term": {"metadata.file_path": "data/b/report.pdf"}}})))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({"count": 3})))
                .expect(1)
                .mount(&server)
                .await;
            Mock::given(method("POST"))
                .and(path("/docs/_delete_by_query"))
                .and(query_param("refresh", "true"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({"deleted": 2})))
                .expect(1)
                .mount(&server)
                .await;

            let store = store_for(&server);
            assert!(store.is_source_indexed("data/b/report.pdf").await.unwrap());
            assert_eq!(store.delete_by_source("data/b/report.pdf", &[Uuid::new_v4()]).await.unwrap(), 2);
        }

        #[tokio::test]
        async fn test_upsert_batch_splits_bulk_requests() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/_bulk"))
                .and(query_param("refresh", "true"))
                .and(header("content-type", "application/x-ndjson"))
                .respond_with(bulk_ack)
                .expect(2)
                .mount(&server)
                .await;

            let nodes: Vec<Node> = (0..501)
                .map(|i| test_node("a.pdf", 1, &format!("chunk {}", i), vec![0.1, 0.2]))
                .collect();

            assert_eq!(store_for(&server).upsert_batch(&nodes).await.unwrap(), 501);

            let requests = server.received_requests().await.unwrap();
            let sizes: Vec<usize> = requests
                .iter()
                .map(|r| String::from_utf8_lossy(&r.body).lines().count() / 2)
                .collect();
            assert_eq!(sizes, vec![500, 1]);
        }

        #[tokio::test]
        async fn test_upsert_batch_fails_on_item_error() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/_bulk"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "errors": true,
                    "items": [{"index": {"status": 400, "error": {"reason": "different number of dimensions"}}}]
                })))
                .mount(&server)
                .await;

            let err = store_for(&server)
                .upsert_batch(&[test_node("a.pdf", 1, "text", vec![0.1])])
                .await
                .unwrap_err();
            assert!(err.to_string().contains("different number of dimensions"));
        }
    }
}
