//! Knowledge-base retrieval over a vector store.
//!
//! - `ChromaKnowledgeStore` talks to a Chroma server over its REST API and embeds text through
//!   an OpenAI-compatible embeddings endpoint.
//! - `InMemoryKnowledgeStore` ranks documents by word overlap and needs no external services.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use helpdesk_core::config::{KnowledgeBackend, KnowledgeConfig};
use helpdesk_core::domain::knowledge::{
    parse_entries, KbDocument, KbSearchResult, KnowledgeEntry,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tokio::sync::OnceCell;

#[derive(Debug, Error)]
pub enum KnowledgeError {
    #[error("failed to read knowledge base file {path}: {source}")]
    ReadFile { path: String, source: std::io::Error },
    #[error("failed to parse knowledge base file {path}: {source}")]
    ParseFile { path: String, source: serde_json::Error },
    #[error("embedding request failed: {0}")]
    Embedding(String),
    #[error("vector store request failed: {0}")]
    Store(String),
    #[error("knowledge store misconfigured: {0}")]
    Configuration(String),
}

/// Turns text into vectors for the vector store.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, KnowledgeError>;
}

#[async_trait]
pub trait KnowledgeStore: Send + Sync {
    fn backend_name(&self) -> &'static str;

    /// Ids recorded in the metadata of every stored document.
    async fn existing_ids(&self) -> Result<HashSet<String>, KnowledgeError>;

    async fn add(&self, documents: Vec<KbDocument>) -> Result<(), KnowledgeError>;

    async fn query(&self, text: &str, limit: usize) -> Result<KbSearchResult, KnowledgeError>;

    async fn ping(&self) -> Result<(), KnowledgeError>;
}

/// Embeds through `POST {url}` with an OpenAI-style `{model, input}` body.
#[derive(Clone)]
pub struct HttpEmbedder {
    client: reqwest::Client,
    url: String,
    model: String,
}

impl HttpEmbedder {
    pub fn new(
        url: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, KnowledgeError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| KnowledgeError::Configuration(error.to_string()))?;
        Ok(Self { client, url: url.into(), model: model.into() })
    }
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingRow>,
}

#[derive(Deserialize)]
struct EmbeddingRow {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, KnowledgeError> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let response = self
            .client
            .post(&self.url)
            .json(&json!({ "model": self.model, "input": inputs }))
            .send()
            .await
            .map_err(|error| KnowledgeError::Embedding(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(KnowledgeError::Embedding(format!("status={} body={body}", status.as_u16())));
        }

        let mut parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|error| KnowledgeError::Embedding(format!("invalid payload: {error}")))?;
        if parsed.data.len() != inputs.len() {
            return Err(KnowledgeError::Embedding(format!(
                "expected {} embeddings, received {}",
                inputs.len(),
                parsed.data.len()
            )));
        }

        parsed.data.sort_by_key(|row| row.index);
        Ok(parsed.data.into_iter().map(|row| row.embedding).collect())
    }
}

pub struct ChromaKnowledgeStore {
    client: reqwest::Client,
    base_url: String,
    collection: String,
    collection_id: OnceCell<String>,
    embedder: Arc<dyn Embedder>,
}

#[derive(Deserialize)]
struct ChromaCollection {
    id: String,
}

#[derive(Deserialize)]
struct ChromaGetResponse {
    #[serde(default)]
    metadatas: Option<Vec<Option<HashMap<String, Value>>>>,
}

#[derive(Deserialize)]
struct ChromaQueryResponse {
    #[serde(default)]
    documents: Option<Vec<Vec<Option<String>>>>,
    #[serde(default)]
    distances: Option<Vec<Vec<Option<f32>>>>,
}

#[derive(Serialize)]
struct ChromaAddRequest {
    ids: Vec<String>,
    embeddings: Vec<Vec<f32>>,
    metadatas: Vec<Value>,
    documents: Vec<String>,
}

impl ChromaKnowledgeStore {
    pub fn new(
        base_url: impl Into<String>,
        collection: impl Into<String>,
        embedder: Arc<dyn Embedder>,
        timeout: Duration,
    ) -> Result<Self, KnowledgeError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| KnowledgeError::Configuration(error.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            collection: collection.into(),
            collection_id: OnceCell::new(),
            embedder,
        })
    }

    async fn collection_id(&self) -> Result<&str, KnowledgeError> {
        let id = self
            .collection_id
            .get_or_try_init(|| async {
                let collection: ChromaCollection = self
                    .post_json(
                        &format!("{}/api/v1/collections", self.base_url),
                        &json!({ "name": self.collection, "get_or_create": true }),
                    )
                    .await?;
                Ok::<_, KnowledgeError>(collection.id)
            })
            .await?;
        Ok(id.as_str())
    }

    async fn collection_url(&self, operation: &str) -> Result<String, KnowledgeError> {
        let id = self.collection_id().await?;
        Ok(format!("{}/api/v1/collections/{id}/{operation}", self.base_url))
    }

    async fn post_json<T, B>(&self, url: &str, body: &B) -> Result<T, KnowledgeError>
    where
        T: for<'de> Deserialize<'de>,
        B: Serialize + ?Sized,
    {
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|error| KnowledgeError::Store(error.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(KnowledgeError::Store(format!("status={} body={body}", status.as_u16())));
        }
        response.json().await.map_err(|error| KnowledgeError::Store(format!("invalid payload: {error}")))
    }
}

#[async_trait]
impl KnowledgeStore for ChromaKnowledgeStore {
    fn backend_name(&self) -> &'static str {
        "chroma"
    }

    async fn existing_ids(&self) -> Result<HashSet<String>, KnowledgeError> {
        let url = self.collection_url("get").await?;
        let response: ChromaGetResponse =
            self.post_json(&url, &json!({ "include": ["metadatas"] })).await?;

        Ok(response
            .metadatas
            .unwrap_or_default()
            .into_iter()
            .flatten()
            .filter_map(|metadata| match metadata.get("id") {
                Some(Value::String(id)) => Some(id.clone()),
                Some(Value::Number(id)) => Some(id.to_string()),
                _ => None,
            })
            .collect())
    }

    async fn add(&self, documents: Vec<KbDocument>) -> Result<(), KnowledgeError> {
        if documents.is_empty() {
            return Ok(());
        }

        let texts = documents.iter().map(|document| document.text.clone()).collect::<Vec<_>>();
        let embeddings = self.embedder.embed(&texts).await?;
        let request = ChromaAddRequest {
            ids: documents.iter().map(|document| document.id.clone()).collect(),
            embeddings,
            metadatas: documents
                .iter()
                .map(|document| {
                    json!({ "id": document.metadata.id, "category": document.metadata.category })
                })
                .collect(),
            documents: texts,
        };

        let url = self.collection_url("add").await?;
        let _: Value = self.post_json(&url, &request).await?;
        Ok(())
    }

    async fn query(&self, text: &str, limit: usize) -> Result<KbSearchResult, KnowledgeError> {
        let mut embeddings = self.embedder.embed(&[text.to_string()]).await?;
        let embedding = embeddings
            .pop()
            .ok_or_else(|| KnowledgeError::Embedding("no embedding returned".to_string()))?;

        let url = self.collection_url("query").await?;
        let response: ChromaQueryResponse = self
            .post_json(
                &url,
                &json!({
                    "query_embeddings": [embedding],
                    "n_results": limit,
                    "include": ["documents", "distances"],
                }),
            )
            .await?;

        let documents = response
            .documents
            .and_then(|mut rows| if rows.is_empty() { None } else { Some(rows.swap_remove(0)) })
            .unwrap_or_default();
        let distances = response
            .distances
            .and_then(|mut rows| if rows.is_empty() { None } else { Some(rows.swap_remove(0)) })
            .unwrap_or_default();

        let (documents, distances) = documents
            .into_iter()
            .zip(distances.into_iter().map(Some).chain(std::iter::repeat(None)))
            .filter_map(|(document, distance)| {
                document.map(|document| (document, distance.flatten().unwrap_or(f32::NAN)))
            })
            .unzip();
        Ok(KbSearchResult { documents, distances })
    }

    async fn ping(&self) -> Result<(), KnowledgeError> {
        let response = self
            .client
            .get(format!("{}/api/v1/heartbeat", self.base_url))
            .send()
            .await
            .map_err(|error| KnowledgeError::Store(error.to_string()))?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(KnowledgeError::Store(format!("heartbeat status={}", response.status().as_u16())))
        }
    }
}

/// Lexical store: distance is the share of query words missing from the document.
#[derive(Debug, Default)]
pub struct InMemoryKnowledgeStore {
    documents: RwLock<Vec<KbDocument>>,
}

impl InMemoryKnowledgeStore {
    pub fn len(&self) -> usize {
        match self.documents.read() {
            Ok(documents) => documents.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn words(text: &str) -> BTreeSet<String> {
    text.split(|character: char| !character.is_alphanumeric())
        .filter(|word| word.len() > 1)
        .map(str::to_lowercase)
        .collect()
}

#[async_trait]
impl KnowledgeStore for InMemoryKnowledgeStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn existing_ids(&self) -> Result<HashSet<String>, KnowledgeError> {
        let documents = self
            .documents
            .read()
            .map_err(|_| KnowledgeError::Store("in-memory store lock poisoned".to_string()))?;
        Ok(documents.iter().map(|document| document.metadata.id.clone()).collect())
    }

    async fn add(&self, documents: Vec<KbDocument>) -> Result<(), KnowledgeError> {
        let mut stored = self
            .documents
            .write()
            .map_err(|_| KnowledgeError::Store("in-memory store lock poisoned".to_string()))?;
        stored.extend(documents);
        Ok(())
    }

    async fn query(&self, text: &str, limit: usize) -> Result<KbSearchResult, KnowledgeError> {
        let query_words = words(text);
        if query_words.is_empty() {
            return Ok(KbSearchResult::default());
        }

        let documents = self
            .documents
            .read()
            .map_err(|_| KnowledgeError::Store("in-memory store lock poisoned".to_string()))?;
        let mut scored = documents
            .iter()
            .filter_map(|document| {
                let overlap = words(&document.text).intersection(&query_words).count();
                (overlap > 0).then(|| {
                    let distance = 1.0 - overlap as f32 / query_words.len() as f32;
                    (distance, document.text.clone())
                })
            })
            .collect::<Vec<_>>();
        scored.sort_by(|left, right| left.0.total_cmp(&right.0));
        scored.truncate(limit);

        let (distances, documents) = scored.into_iter().unzip();
        Ok(KbSearchResult { documents, distances })
    }

    async fn ping(&self) -> Result<(), KnowledgeError> {
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub total: usize,
    pub added: usize,
    pub skipped: usize,
}

/// Retrieval facade used by the technical flow and the bootstrap loader.
#[derive(Clone)]
pub struct KnowledgeBase {
    store: Arc<dyn KnowledgeStore>,
    result_count: usize,
}

impl KnowledgeBase {
    pub fn new(store: Arc<dyn KnowledgeStore>, result_count: usize) -> Self {
        Self { store, result_count }
    }

    pub fn backend_name(&self) -> &'static str {
        self.store.backend_name()
    }

    /// Adds entries whose id is not already stored. Duplicate ids within `entries` are added once.
    pub async fn load_entries(
        &self,
        entries: Vec<KnowledgeEntry>,
    ) -> Result<LoadReport, KnowledgeError> {
        let total = entries.len();
        let mut known = self.store.existing_ids().await?;
        let fresh = entries
            .into_iter()
            .filter(|entry| known.insert(entry.id.clone()))
            .map(|entry| entry.to_document())
            .collect::<Vec<_>>();
        let added = fresh.len();

        self.store.add(fresh).await?;
        Ok(LoadReport { total, added, skipped: total - added })
    }

    pub async fn load_file(&self, path: &Path) -> Result<LoadReport, KnowledgeError> {
        let display = path.display().to_string();
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| KnowledgeError::ReadFile { path: display.clone(), source })?;
        let entries =
            parse_entries(&raw).map_err(|source| KnowledgeError::ParseFile { path: display, source })?;
        self.load_entries(entries).await
    }

    /// Startup load. Failures are logged and never stop the service.
    pub async fn bootstrap(&self, path: &Path) -> Option<LoadReport> {
        match self.load_file(path).await {
            Ok(report) => {
                tracing::info!(
                    event_name = "knowledge.bootstrap_loaded",
                    backend = self.backend_name(),
                    total = report.total,
                    added = report.added,
                    skipped = report.skipped,
                    "knowledge base loaded"
                );
                Some(report)
            }
            Err(error) => {
                tracing::warn!(
                    event_name = "knowledge.bootstrap_failed",
                    backend = self.backend_name(),
                    error = %error,
                    "knowledge base loading failed"
                );
                None
            }
        }
    }

    /// Ranked documents for `query`. A failed query is logged and yields no documents.
    pub async fn search(&self, query: &str) -> KbSearchResult {
        match self.store.query(query, self.result_count).await {
            Ok(result) => result,
            Err(error) => {
                tracing::warn!(
                    event_name = "knowledge.search_failed",
                    backend = self.backend_name(),
                    error = %error,
                    "knowledge base search failed"
                );
                KbSearchResult::default()
            }
        }
    }

    pub async fn ping(&self) -> Result<(), KnowledgeError> {
        self.store.ping().await
    }
}

pub fn store_from_config(
    config: &KnowledgeConfig,
    timeout: Duration,
) -> Result<Arc<dyn KnowledgeStore>, KnowledgeError> {
    match config.backend {
        KnowledgeBackend::Memory => Ok(Arc::new(InMemoryKnowledgeStore::default())),
        KnowledgeBackend::Chroma => {
            let embedder =
                HttpEmbedder::new(config.embedding_url.clone(), config.embedding_model.clone(), timeout)?;
            let store = ChromaKnowledgeStore::new(
                config.chroma_url.clone(),
                config.collection.clone(),
                Arc::new(embedder),
                timeout,
            )?;
            Ok(Arc::new(store))
        }
    }
}

pub fn knowledge_base_from_config(
    config: &KnowledgeConfig,
    timeout: Duration,
) -> Result<KnowledgeBase, KnowledgeError> {
    Ok(KnowledgeBase::new(store_from_config(config, timeout)?, config.result_count))
}
