//! Gemini REST client: text generation plus single and batched embeddings.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

use docsearch_core::config::OracleConfig;
use docsearch_core::traits::{EmbeddingOracle, GenerationOracle};
use docsearch_core::{OracleError, OracleResult};

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<TextPart>,
}

#[derive(Debug, Deserialize)]
struct TextPart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Embedding {
    values: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embedding: Embedding,
}

#[derive(Debug, Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<Embedding>,
}

#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    generation_model: String,
    embedding_model: String,
    id: String,
}

impl GeminiClient {
    pub fn new(config: &OracleConfig) -> OracleResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| OracleError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            api_key: config.resolved_api_key(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            generation_model: config.generation_model.clone(),
            embedding_model: config.embedding_model.clone(),
            id: format!("gemini:{}", config.embedding_model),
        })
    }

    pub fn has_credentials(&self) -> bool { self.api_key.is_some() }

    fn key(&self) -> OracleResult<&str> {
        self.api_key.as_deref().ok_or_else(|| OracleError::MissingCredentials("GEMINI_API_KEY is not set".into()))
    }

    async fn post<T: DeserializeOwned>(&self, model: &str, method: &str, body: &Value) -> OracleResult<T> {
        let key = self.key()?;
        let url = format!("{}/models/{}:{}", self.base_url, model, method);
        let response = self
            .client
            .post(&url)
            .query(&[("key", key)])
            .json(body)
            .send()
            .await
            .map_err(|e| OracleError::Transport(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(status_error(status, text));
        }
        response.json::<T>().await.map_err(|e| OracleError::Malformed(e.to_string()))
    }

    fn embed_request(&self, text: &str) -> Value {
        json!({
            "model": format!("models/{}", self.embedding_model),
            "content": { "parts": [{ "text": text }] },
        })
    }
}

/// 429 becomes `RateLimited` so the retry policy can back off on it.
pub fn status_error(status: StatusCode, body: String) -> OracleError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        OracleError::RateLimited(body)
    } else {
        OracleError::Http { status: status.as_u16(), message: body }
    }
}

#[async_trait]
impl GenerationOracle for GeminiClient {
    async fn generate(&self, prompt: &str) -> OracleResult<String> {
        let body = json!({ "contents": [{ "role": "user", "parts": [{ "text": prompt }] }] });
        let response: GenerateResponse = self.post(&self.generation_model, "generateContent", &body).await?;
        let candidate = response
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| OracleError::Malformed("no candidates returned".into()))?;
        Ok(candidate.content.map(|c| c.parts.into_iter().filter_map(|p| p.text).collect::<String>()).unwrap_or_default())
    }
}

#[async_trait]
impl EmbeddingOracle for GeminiClient {
    fn embedder_id(&self) -> &str { &self.id }

    async fn embed_batch(&self, texts: &[String]) -> OracleResult<Vec<Vec<f32>>> {
        if texts.is_empty() { return Ok(Vec::new()); }
        let requests: Vec<Value> = texts.iter().map(|t| self.embed_request(t)).collect();
        let response: BatchEmbedResponse =
            self.post(&self.embedding_model, "batchEmbedContents", &json!({ "requests": requests })).await?;
        if response.embeddings.len() != texts.len() {
            return Err(OracleError::Malformed(format!("expected {} embeddings, got {}", texts.len(), response.embeddings.len())));
        }
        Ok(response.embeddings.into_iter().map(|e| e.values).collect())
    }

    async fn embed_query(&self, text: &str) -> OracleResult<Vec<f32>> {
        let response: EmbedResponse = self.post(&self.embedding_model, "embedContent", &self.embed_request(text)).await?;
        Ok(response.embedding.values)
    }
}
