//! Ollama embedding provider
//!
//! Calls a local Ollama server's `/api/embeddings` endpoint with models such
//! as `all-minilm` (384-dim) or `nomic-embed-text` (768-dim).
//!
//! Failure classes:
//! - connection errors, timeouts, 429 and 5xx responses are transient
//!   (`EmbeddingUnavailable`) and retried with exponential backoff
//! - other 4xx responses and malformed bodies are permanent (`Embedding`)
//! - a vector of the wrong width is a `DimensionMismatch`
//!
//! # Example
//! ```no_run
//! use vaultqa_knowledge::embeddings::{EmbeddingConfig, EmbeddingProvider};
//! use vaultqa_knowledge::embeddings::providers::ollama::OllamaProvider;
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let config = EmbeddingConfig {
//!     provider: "ollama".to_string(),
//!     model: "all-minilm".to_string(),
//!     dimensions: 384,
//!     ..Default::default()
//! };
//!
//! let provider = OllamaProvider::new(&config).unwrap();
//! let embedding = provider.embed("Hello world").await.unwrap();
//! assert_eq!(embedding.len(), 384);
//! # });
//! ```

use crate::embeddings::{EmbeddingConfig, EmbeddingProvider};
use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument, warn};
use vaultqa_core::{AppError, AppResult};

const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
const EMBEDDING_ENDPOINT: &str = "/api/embeddings";

/// Maximum attempts per text for transient failures
const MAX_RETRIES: u32 = 3;

/// Initial backoff duration in milliseconds
const INITIAL_BACKOFF_MS: u64 = 100;

/// Requests in flight at once within one batch
const MAX_CONCURRENT_REQUESTS: usize = 4;

/// Ollama embedding provider using the local HTTP API
#[derive(Debug, Clone)]
pub struct OllamaProvider {
    client: Client,
    base_url: String,
    model: String,
    dimensions: usize,
    normalize: bool,
}

#[derive(Debug, Clone, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

#[derive(Debug, Clone, Deserialize)]
struct ErrorResponse {
    error: String,
}

impl OllamaProvider {
    /// Create a provider. No request is made until the first embedding.
    ///
    /// The base URL comes from `config.endpoint`, then `OLLAMA_URL`, then
    /// `http://localhost:11434`.
    pub fn new(config: &EmbeddingConfig) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                AppError::Config(format!("Failed to create HTTP client for Ollama: {}", e))
            })?;

        let base_url = config
            .endpoint
            .clone()
            .or_else(|| std::env::var("OLLAMA_URL").ok())
            .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string());

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            dimensions: config.dimensions,
            normalize: config.normalize,
        })
    }

    /// Embed one text, retrying transient failures with exponential backoff
    #[instrument(skip(self, text), fields(text_len = text.len(), model = %self.model))]
    async fn embed_with_retries(&self, text: &str) -> AppResult<Vec<f32>> {
        let mut attempt = 0;

        loop {
            match self.embed_single(text).await {
                Ok(embedding) => return Ok(embedding),
                Err(e) if e.is_retryable() && attempt + 1 < MAX_RETRIES => {
                    attempt += 1;
                    let backoff_ms = INITIAL_BACKOFF_MS * 2_u64.pow(attempt);
                    warn!(
                        "Embedding failed (attempt {}/{}): {}; retrying in {}ms",
                        attempt, MAX_RETRIES, e, backoff_ms
                    );
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Embed one text (no retries)
    async fn embed_single(&self, text: &str) -> AppResult<Vec<f32>> {
        let url = format!("{}{}", self.base_url, EMBEDDING_ENDPOINT);

        let request = EmbeddingRequest {
            model: &self.model,
            prompt: text,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                AppError::EmbeddingUnavailable(format!(
                    "Ollama not reachable at {}: {}",
                    self.base_url, e
                ))
            })?;

        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            let message = serde_json::from_str::<ErrorResponse>(&error_text)
                .map(|r| r.error)
                .unwrap_or(error_text);

            return Err(classify_status(status, &self.model, message));
        }

        let body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| AppError::Embedding(format!("Failed to parse Ollama response: {}", e)))?;

        if body.embedding.len() != self.dimensions {
            return Err(AppError::DimensionMismatch {
                expected: self.dimensions,
                actual: body.embedding.len(),
            });
        }

        let mut embedding = body.embedding;
        if self.normalize {
            let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
            if norm > 0.0 {
                embedding.iter_mut().for_each(|v| *v /= norm);
            }
        }

        Ok(embedding)
    }
}

fn classify_status(status: StatusCode, model: &str, message: String) -> AppError {
    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        AppError::EmbeddingUnavailable(format!("Ollama API error ({}): {}", status, message))
    } else if status == StatusCode::NOT_FOUND {
        AppError::Embedding(format!(
            "Ollama model '{}' not found ({}). Run: ollama pull {}",
            model, message, model
        ))
    } else {
        AppError::Embedding(format!("Ollama API error ({}): {}", status, message))
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaProvider {
    fn provider_name(&self) -> &str {
        "ollama"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    #[instrument(skip(self, texts), fields(batch_size = texts.len(), provider = "ollama", model = %self.model))]
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Embedding batch of {} texts", texts.len());

        // `buffered` keeps output order equal to input order
        futures::stream::iter(texts.iter().cloned().enumerate())
            .map(|(i, text)| async move {
                if text.trim().is_empty() {
                    warn!("Empty text at batch index {}, using zero vector", i);
                    return Ok(vec![0.0; self.dimensions]);
                }
                self.embed_with_retries(&text).await
            })
            .buffered(MAX_CONCURRENT_REQUESTS)
            .try_collect()
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    fn unreachable_config() -> EmbeddingConfig {
        EmbeddingConfig {
            provider: "ollama".to_string(),
            model: "all-minilm".to_string(),
            dimensions: 384,
            timeout_secs: 2,
            // port 9 (discard) is closed on test machines
            endpoint: Some("http://127.0.0.1:9/".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_endpoint_trailing_slash_trimmed() {
        let provider = OllamaProvider::new(&unreachable_config()).unwrap();
        assert_eq!(provider.base_url, "http://127.0.0.1:9");
    }

    #[test]
    fn test_status_classification() {
        let transient = classify_status(StatusCode::SERVICE_UNAVAILABLE, "m", "busy".into());
        assert!(transient.is_retryable());

        let throttled = classify_status(StatusCode::TOO_MANY_REQUESTS, "m", "slow down".into());
        assert!(throttled.is_retryable());

        let missing = classify_status(StatusCode::NOT_FOUND, "all-minilm", "no model".into());
        assert!(!missing.is_retryable());
        assert!(missing.to_string().contains("ollama pull all-minilm"));

        let bad = classify_status(StatusCode::BAD_REQUEST, "m", "bad".into());
        assert!(matches!(bad, AppError::Embedding(_)));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_unavailable() {
        let provider = OllamaProvider::new(&unreachable_config()).unwrap();
        let result = provider.embed("generator maintenance").await;

        assert!(matches!(result, Err(AppError::EmbeddingUnavailable(_))));
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let provider = OllamaProvider::new(&unreachable_config()).unwrap();
        assert!(provider.embed_batch(&[]).await.unwrap().is_empty());
    }

    /// Answer one `/api/embeddings` request with `[prompt chars, 0, 1]`.
    /// Prompts starting with "slow" are answered late.
    async fn serve_embedding(mut stream: TcpStream) {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];

        let header_end = loop {
            let n = stream.read(&mut chunk).await.unwrap();
            assert!(n > 0, "connection closed before headers");
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
        };

        let headers = String::from_utf8_lossy(&buf[..header_end]).to_lowercase();
        let content_length: usize = headers
            .lines()
            .find_map(|line| line.strip_prefix("content-length:"))
            .map(|v| v.trim().parse().unwrap())
            .unwrap_or(0);

        while buf.len() < header_end + content_length {
            let n = stream.read(&mut chunk).await.unwrap();
            assert!(n > 0, "connection closed before body");
            buf.extend_from_slice(&chunk[..n]);
        }

        let request: serde_json::Value =
            serde_json::from_slice(&buf[header_end..header_end + content_length]).unwrap();
        let prompt = request["prompt"].as_str().unwrap().to_string();
        assert_eq!(request["model"], "all-minilm");

        if prompt.starts_with("slow") {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        let body = serde_json::json!({
            "embedding": [prompt.chars().count() as f32, 0.0, 1.0]
        })
        .to_string();
        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            body.len(),
            body
        );
        stream.write_all(response.as_bytes()).await.unwrap();
        stream.shutdown().await.unwrap();
    }

    async fn stub_server() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            loop {
                let (stream, _) = listener.accept().await.unwrap();
                tokio::spawn(serve_embedding(stream));
            }
        });

        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_embed_batch_keeps_input_order() {
        let config = EmbeddingConfig {
            provider: "ollama".to_string(),
            model: "all-minilm".to_string(),
            dimensions: 3,
            normalize: false,
            timeout_secs: 5,
            endpoint: Some(stub_server().await),
            ..Default::default()
        };
        let provider = OllamaProvider::new(&config).unwrap();

        let texts = vec![
            "slow pump".to_string(),
            "".to_string(),
            "fan".to_string(),
            "slower valve".to_string(),
            "oil".to_string(),
        ];
        let embeddings = provider.embed_batch(&texts).await.unwrap();

        assert_eq!(
            embeddings,
            vec![
                vec![9.0, 0.0, 1.0],
                vec![0.0, 0.0, 0.0],
                vec![3.0, 0.0, 1.0],
                vec![12.0, 0.0, 1.0],
                vec![3.0, 0.0, 1.0],
            ]
        );
    }

    #[tokio::test]
    async fn test_wrong_width_from_server_is_dimension_mismatch() {
        let config = EmbeddingConfig {
            provider: "ollama".to_string(),
            model: "all-minilm".to_string(),
            dimensions: 4,
            timeout_secs: 5,
            endpoint: Some(stub_server().await),
            ..Default::default()
        };
        let provider = OllamaProvider::new(&config).unwrap();

        let result = provider.embed("pump").await;
        assert!(matches!(
            result,
            Err(AppError::DimensionMismatch {
                expected: 4,
                actual: 3
            })
        ));
    }
}
