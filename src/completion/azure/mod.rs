#[cfg(test)]
mod tests;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use super::{Completer, Message, Prompt};
use crate::config::CompletionConfig;

/// Chat completion client for one Azure OpenAI deployment
#[derive(Debug, Clone)]
pub struct AzureOpenAiClient {
    completions_url: Url,
    deployment: String,
    api_key: Option<String>,
    agent: ureq::Agent,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    messages: &'a [Message],
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

impl AzureOpenAiClient {
    #[inline]
    pub fn new(config: &CompletionConfig) -> Result<Self> {
        config
            .validate()
            .context("Invalid completion configuration")?;

        let mut completions_url = config
            .endpoint_url()
            .context("Failed to parse completion endpoint")?;
        completions_url
            .path_segments_mut()
            .map_err(|()| anyhow::anyhow!("Completion endpoint cannot carry a path"))?
            .clear()
            .extend([
                "openai",
                "deployments",
                config.deployment.trim(),
                "chat",
                "completions",
            ]);
        completions_url.set_fragment(None);
        completions_url.set_query(None);
        completions_url
            .query_pairs_mut()
            .append_pair("api-version", config.api_version.trim());

        Ok(Self {
            completions_url,
            deployment: config.deployment.trim().to_string(),
            api_key: config.api_key.clone(),
            agent: build_agent(Duration::from_secs(config.timeout_seconds)),
        })
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = build_agent(timeout);
        self
    }

    #[inline]
    pub fn deployment(&self) -> &str {
        &self.deployment
    }

    /// Send the prompt as a chat completion and return the first choice's text
    #[inline]
    pub fn chat(&self, prompt: &Prompt) -> Result<String> {
        debug!(
            "Requesting chat completion from deployment {} with {} messages",
            self.deployment,
            prompt.messages.len()
        );

        let request_json = serde_json::to_string(&ChatRequest {
            messages: &prompt.messages,
            max_tokens: prompt.max_tokens,
            temperature: prompt.temperature,
        })
        .context("Failed to serialize chat completion request")?;

        let mut request = self
            .agent
            .post(self.completions_url.as_str())
            .header("Content-Type", "application/json");
        if let Some(api_key) = &self.api_key {
            request = request.header("api-key", api_key.as_str());
        }

        let mut response = request
            .send(&request_json)
            .with_context(|| format!("Chat completion request to {} failed", self.deployment))?;

        let status = response.status();
        let response_text = response
            .body_mut()
            .read_to_string()
            .context("Failed to read chat completion response")?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorEnvelope>(&response_text)
                .map_or(response_text, |e| e.error.message);
            warn!(
                "Chat completion returned HTTP {}: {}",
                status.as_u16(),
                message
            );
            return Err(anyhow::anyhow!(
                "Chat completion returned HTTP {}: {}",
                status.as_u16(),
                message
            ));
        }

        let chat_response: ChatResponse = serde_json::from_str(&response_text)
            .context("Failed to parse chat completion response")?;

        let content = chat_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("Chat completion returned no choices"))?
            .message
            .content
            .ok_or_else(|| anyhow::anyhow!("Chat completion returned no message content"))?;

        debug!("Received completion of {} characters", content.len());
        Ok(content)
    }
}

impl Completer for AzureOpenAiClient {
    #[inline]
    fn complete(&self, prompt: &Prompt) -> Result<String> {
        self.chat(prompt)
    }
}

fn build_agent(timeout: Duration) -> ureq::Agent {
    ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .http_status_as_error(false)
        .build()
        .into()
}
