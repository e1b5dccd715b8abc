
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use url::Url;

use super::{ChunkMetadata, IndexEntry, SearchResult, StoreStats, VectorStore};
use crate::config::RemoteStoreConfig;
use crate::{RagError, Result};

const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

/// Managed similarity-search index reached over the network.
///
/// Every `upsert`/`query`/`stats` call is one HTTP round trip. Persistence
/// is not assumed to be visible immediately after `upsert` returns; callers
/// use `stats` to decide whether the index is populated.
///
/// A store constructed without its access credential is unusable: queries
/// return empty results and stats report zero instead of failing, so the
/// question-answering flow can degrade rather than crash.
pub struct RemoteStore {
    client: Option<RemoteClient>,
}

struct RemoteClient {
    agent: ureq::Agent,
    index_host: Url,
    api_key: String,
}

#[derive(Debug, Serialize)]
struct UpsertRequest<'a> {
    vectors: Vec<RemoteVector<'a>>,
}

#[derive(Debug, Serialize)]
struct RemoteVector<'a> {
    id: &'a str,
    values: &'a [f32],
    metadata: &'a ChunkMetadata,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Debug, Deserialize)]
struct QueryMatch {
    score: f32,
    metadata: Option<ChunkMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatsResponse {
    #[serde(default)]
    total_vector_count: u64,
}

impl RemoteStore {
    /// Build a remote store from configuration, reading the access
    /// credential from the configured environment variable. A missing or
    /// blank credential yields an unusable store, never an error.
    pub fn new(config: &RemoteStoreConfig) -> Self {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty());

        let Some(api_key) = api_key else {
            warn!(
                "No credential in {}; remote vector store is unusable and will return empty results",
                config.api_key_env
            );
            return Self::without_credentials();
        };

        match Self::with_credentials(&config.index_host, api_key) {
            Ok(store) => store,
            Err(e) => {
                warn!("Remote vector store unusable: {}", e);
                Self::without_credentials()
            }
        }
    }

    /// Build a store with an explicit credential, for callers that resolve
    /// credentials themselves
    pub fn with_credentials(index_host: &str, api_key: String) -> Result<Self> {
        let index_host = Url::parse(index_host)
            .map_err(|e| RagError::Store(format!("Invalid index host '{}': {}", index_host, e)))?;

        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(DEFAULT_TIMEOUT_SECONDS)))
            .build()
            .into();

        info!("Remote vector store addressed at {}", index_host);
        Ok(Self {
            client: Some(RemoteClient {
                agent,
                index_host,
                api_key,
            }),
        })
    }

    /// Build an unusable store that degrades to empty results
    pub fn without_credentials() -> Self {
        Self { client: None }
    }
}

impl RemoteClient {
    fn post<T: Serialize>(&self, path: &str, body: &T) -> Result<String> {
        let url = self
            .index_host
            .join(path)
            .map_err(|e| RagError::Store(format!("Failed to build URL for {}: {}", path, e)))?;

        let body = serde_json::to_string(body)
            .map_err(|e| RagError::Store(format!("Failed to serialize request: {}", e)))?;

        debug!("POST {}", url);
        self.agent
            .post(url.as_str())
            .header("Api-Key", &self.api_key)
            .header("Content-Type", "application/json")
            .send(&body)
            .and_then(|mut resp| resp.body_mut().read_to_string())
            .map_err(|e| RagError::Store(format!("Request to {} failed: {}", url, e)))
    }
}

impl VectorStore for RemoteStore {
    fn upsert(&mut self, entries: &[IndexEntry]) -> Result<()> {
        let Some(client) = &self.client else {
            return Err(RagError::Store(
                "Remote vector store has no credential; cannot upsert".to_string(),
            ));
        };

        if entries.is_empty() {
            return Ok(());
        }

        let request = UpsertRequest {
            vectors: entries
                .iter()
                .map(|entry| RemoteVector {
                    id: &entry.id,
                    values: &entry.vector,
                    metadata: &entry.metadata,
                })
                .collect(),
        };

        client.post("/vectors/upsert", &request)?;
        debug!("Upserted batch of {} entries", entries.len());
        Ok(())
    }

    fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<SearchResult>> {
        let Some(client) = &self.client else {
            return Ok(Vec::new());
        };

        let request = QueryRequest {
            vector,
            top_k,
            include_metadata: true,
        };

        let response = client.post("/query", &request)?;
        let response: QueryResponse = serde_json::from_str(&response)
            .map_err(|e| RagError::Store(format!("Failed to parse query response: {}", e)))?;

        Ok(response
            .matches
            .into_iter()
            .filter_map(|m| {
                m.metadata.map(|metadata| SearchResult {
                    text: metadata.text,
                    source: metadata.source,
                    score: m.score,
                })
            })
            .collect())
    }

    fn stats(&self) -> Result<StoreStats> {
        let Some(client) = &self.client else {
            return Ok(StoreStats {
                total_entry_count: 0,
            });
        };

        let response = client.post("/describe_index_stats", &serde_json::json!({}))?;
        let response: StatsResponse = serde_json::from_str(&response)
            .map_err(|e| RagError::Store(format!("Failed to parse stats response: {}", e)))?;

        Ok(StoreStats {
            total_entry_count: response.total_vector_count,
        })
    }

    fn is_usable(&self) -> bool {
        self.client.is_some()
    }
}
