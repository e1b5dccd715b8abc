
use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::OllamaConfig;

const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
const EXPONENTIAL_BACKOFF_BASE: u64 = 2;

/// Maps text to fixed-dimension vectors, deterministically for a fixed
/// model configuration.
///
/// Batch calls exist purely for throughput; `embed` is semantically
/// identical to mapping `embed_one` over each element in order, and the
/// returned sequence is fully realized and aligned 1:1 with the input.
pub trait Embedder: Send + Sync {
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed(std::slice::from_ref(&text.to_string()))?;
        vectors
            .pop()
            .ok_or_else(|| anyhow!("Embedder returned no vector for single input"))
    }

    /// The fixed vector dimension produced by this embedder
    fn dimension(&self) -> usize;
}

/// Embedder backed by an Ollama server's `/api/embed` endpoint
#[derive(Debug, Clone)]
pub struct OllamaEmbedder {
    base_url: Url,
    model: String,
    dimension: usize,
    agent: ureq::Agent,
    retry_attempts: u32,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Debug, Deserialize)]
struct ModelsResponse {
    models: Vec<ModelInfo>,
}

#[derive(Debug, Deserialize)]
struct ModelInfo {
    name: String,
}

impl OllamaEmbedder {
    pub fn new(config: &OllamaConfig) -> Result<Self> {
        let base_url = config
            .ollama_url()
            .context("Failed to build Ollama URL from config")?;

        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(DEFAULT_TIMEOUT_SECONDS)))
            .build()
            .into();

        Ok(Self {
            base_url,
            model: config.model.clone(),
            dimension: config.embedding_dimension as usize,
            agent,
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
        })
    }

    pub fn with_retry_attempts(mut self, attempts: u32) -> Self {
        self.retry_attempts = attempts;
        self
    }

    /// Verify the server is reachable and the configured model is present.
    ///
    /// Run at engine construction so a missing model is a hard error before
    /// any query is accepted, never a half-initialized engine.
    pub fn health_check(&self) -> Result<()> {
        let models = self.list_models().context("Ollama server unreachable")?;

        if models.iter().any(|m| m.name == self.model) {
            info!(
                "Embedding model {} available at {}",
                self.model, self.base_url
            );
            Ok(())
        } else {
            let available: Vec<&str> = models.iter().map(|m| m.name.as_str()).collect();
            Err(anyhow!(
                "Embedding model '{}' is not available. Available models: {:?}",
                self.model,
                available
            ))
        }
    }

    fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let url = self
            .base_url
            .join("/api/tags")
            .context("Failed to build models URL")?;

        let response = self
            .request_with_retry(|| {
                self.agent
                    .get(url.as_str())
                    .call()
                    .and_then(|mut resp| resp.body_mut().read_to_string())
            })
            .context("Failed to list models")?;

        let models: ModelsResponse =
            serde_json::from_str(&response).context("Failed to parse models response")?;
        Ok(models.models)
    }

    fn request_with_retry<F>(&self, mut request_fn: F) -> Result<String>
    where
        F: FnMut() -> std::result::Result<String, ureq::Error>,
    {
        let mut last_error = None;

        for attempt in 1..=self.retry_attempts {
            match request_fn() {
                Ok(response) => return Ok(response),
                Err(error) => {
                    let retryable = match &error {
                        ureq::Error::StatusCode(status) => {
                            if *status >= 500 {
                                warn!(
                                    "Ollama server error (status {}), attempt {}/{}",
                                    status, attempt, self.retry_attempts
                                );
                                true
                            } else {
                                return Err(anyhow!("Ollama client error: HTTP {}", status));
                            }
                        }
                        ureq::Error::ConnectionFailed
                        | ureq::Error::HostNotFound
                        | ureq::Error::Timeout(_)
                        | ureq::Error::Io(_) => {
                            warn!(
                                "Ollama transport error: {}, attempt {}/{}",
                                error, attempt, self.retry_attempts
                            );
                            true
                        }
                        _ => false,
                    };

                    if !retryable {
                        return Err(anyhow!("Non-retryable Ollama error: {}", error));
                    }

                    last_error = Some(anyhow!("Ollama request error: {}", error));

                    if attempt < self.retry_attempts {
                        let delay = Duration::from_millis(
                            EXPONENTIAL_BACKOFF_BASE.pow(attempt - 1) * 1000,
                        );
                        debug!("Waiting {:?} before retry", delay);
                        std::thread::sleep(delay);
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| anyhow!("Ollama request failed after retries")))
    }
}

impl Embedder for OllamaEmbedder {
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Embedding batch of {} texts", texts.len());

        let request = EmbedRequest {
            model: &self.model,
            input: texts,
        };
        let body =
            serde_json::to_string(&request).context("Failed to serialize embed request")?;

        let url = self
            .base_url
            .join("/api/embed")
            .context("Failed to build embed URL")?;

        let response = self
            .request_with_retry(|| {
                self.agent
                    .post(url.as_str())
                    .header("Content-Type", "application/json")
                    .send(&body)
                    .and_then(|mut resp| resp.body_mut().read_to_string())
            })
            .context("Failed to generate embeddings")?;

        let response: EmbedResponse =
            serde_json::from_str(&response).context("Failed to parse embed response")?;

        if response.embeddings.len() != texts.len() {
            return Err(anyhow!(
                "Embedding count mismatch: sent {} texts, received {} vectors",
                texts.len(),
                response.embeddings.len()
            ));
        }

        for vector in &response.embeddings {
            if vector.len() != self.dimension {
                return Err(anyhow!(
                    "Embedding dimension mismatch: expected {}, model returned {}",
                    self.dimension,
                    vector.len()
                ));
            }
        }

        Ok(response.embeddings)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Deterministic bag-of-hashed-tokens embedder for pipeline tests.
///
/// Tokens are lowercased, stripped to alphanumerics, truncated to six
/// characters, and hashed into a fixed number of buckets; the vector is
/// L2-normalized. Shared vocabulary between two texts pulls their vectors
/// together, which is enough signal for ranking assertions.
#[cfg(test)]
pub(crate) struct HashEmbedder {
    pub dimension: usize,
}

#[cfg(test)]
impl HashEmbedder {
    pub(crate) fn new() -> Self {
        Self { dimension: 64 }
    }

    fn bucket(&self, token: &str) -> usize {
        // FNV-1a, fixed so vectors are stable across processes.
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in token.bytes() {
            hash ^= u64::from(byte);
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        (hash % self.dimension as u64) as usize
    }
}

#[cfg(test)]
impl Embedder for HashEmbedder {
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|text| {
                let mut vector = vec![0.0f32; self.dimension];
                for raw in text.split_whitespace() {
                    let token: String = raw
                        .chars()
                        .filter(|c| c.is_alphanumeric())
                        .flat_map(char::to_lowercase)
                        .take(6)
                        .collect();
                    if !token.is_empty() {
                        vector[self.bucket(&token)] += 1.0;
                    }
                }
                let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
                if norm > 0.0 {
                    for v in &mut vector {
                        *v /= norm;
                    }
                }
                vector
            })
            .collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
