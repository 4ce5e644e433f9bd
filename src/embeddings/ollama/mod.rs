
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use super::Embedder;
use crate::config::OllamaConfig;

#[derive(Debug, Clone)]
pub struct OllamaClient {
    base_url: Url,
    model: String,
    agent: ureq::Agent,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: String,
}

impl OllamaClient {
    #[inline]
    pub fn new(config: &OllamaConfig) -> Result<Self> {
        let base_url = config
            .ollama_url()
            .context("Failed to generate Ollama URL from config")?;

        Ok(Self {
            base_url,
            model: config.model.clone(),
            agent: build_agent(Duration::from_secs(config.timeout_seconds)),
        })
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = build_agent(timeout);
        self
    }

    #[inline]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Generate the embedding for a single text input
    #[inline]
    pub fn generate_embedding(&self, text: &str) -> Result<Vec<f32>> {
        debug!("Generating embedding for text (length: {})", text.len());

        let url = self
            .base_url
            .join("/api/embed")
            .context("Failed to build embedding URL")?;

        let request_json = serde_json::to_string(&EmbedRequest {
            model: &self.model,
            input: text,
        })
        .context("Failed to serialize embedding request")?;

        let mut response = self
            .agent
            .post(url.as_str())
            .header("Content-Type", "application/json")
            .send(&request_json)
            .with_context(|| format!("Embedding request to {} failed", url))?;

        let status = response.status();
        let response_text = response
            .body_mut()
            .read_to_string()
            .context("Failed to read embedding response")?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorResponse>(&response_text)
                .map_or(response_text, |e| e.error);
            warn!("Ollama returned HTTP {}: {}", status.as_u16(), message);
            return Err(anyhow::anyhow!(
                "Ollama returned HTTP {}: {}",
                status.as_u16(),
                message
            ));
        }

        let embed_response: EmbedResponse =
            serde_json::from_str(&response_text).context("Failed to parse embedding response")?;

        let mut embeddings = embed_response.embeddings.into_iter();
        let embedding = match (embeddings.next(), embeddings.next()) {
            (Some(embedding), None) if !embedding.is_empty() => embedding,
            (None, _) => return Err(anyhow::anyhow!("Ollama returned no embedding")),
            (Some(_), None) => return Err(anyhow::anyhow!("Ollama returned an empty embedding")),
            (Some(_), Some(_)) => {
                return Err(anyhow::anyhow!(
                    "Ollama returned more than one embedding for a single input"
                ));
            }
        };

        debug!("Generated embedding with {} dimensions", embedding.len());
        Ok(embedding)
    }
}

impl Embedder for OllamaClient {
    #[inline]
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.generate_embedding(text)
    }
}

fn build_agent(timeout: Duration) -> ureq::Agent {
    ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .http_status_as_error(false)
        .build()
        .into()
}
