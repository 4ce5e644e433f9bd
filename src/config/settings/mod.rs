
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const DEFAULT_TOP_K: usize = 3;

const DEFAULT_GROUNDING_CONTEXT: &str = "
Quantum Root is a platform created by data engineering professionals.
It offers training and project-based learning in GenAI, Big Data, and NoSQL technologies.
It focuses on hands-on experience and real-world systems used in modern data stacks.
Further details can be found at https://quantumroot.in.
Their course details can be found at https://quantumroot.in/courses
Refund policy can be found at https://quantumroot.in/refund
Blog can be found at https://quantumroot.in/blog
";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub completion: CompletionConfig,
    #[serde(default)]
    pub ollama: OllamaConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub grounding: GroundingConfig,
    #[serde(default)]
    pub direct: DirectConfig,
    #[serde(skip)]
    pub base_dir: PathBuf,
}

/// Azure OpenAI chat completion deployment
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CompletionConfig {
    pub endpoint: String,
    pub api_version: String,
    pub deployment: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub timeout_seconds: u64,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_version: "2024-02-01".to_string(),
            deployment: String::new(),
            api_key: None,
            timeout_seconds: 60,
        }
    }
}

/// Ollama server used for query and chunk embeddings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OllamaConfig {
    pub protocol: String,
    pub host: String,
    pub port: u16,
    pub model: String,
    pub timeout_seconds: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            protocol: "http".to_string(),
            host: "localhost".to_string(),
            port: 11434,
            model: "nomic-embed-text:latest".to_string(),
            timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Index directory, relative paths resolve against the config directory
    pub index_dir: PathBuf,
    pub top_k: usize,
    /// Target chunk length in characters used by `build`
    pub chunk_chars: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            index_dir: PathBuf::from("index"),
            top_k: DEFAULT_TOP_K,
            chunk_chars: 1200,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GroundingConfig {
    pub context: String,
}

impl Default for GroundingConfig {
    fn default() -> Self {
        Self {
            context: DEFAULT_GROUNDING_CONTEXT.to_string(),
        }
    }
}

/// Generation settings for pass-through questions
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DirectConfig {
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for DirectConfig {
    fn default() -> Self {
        Self {
            max_tokens: 500,
            temperature: 0.7,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration directory not found or could not be created")]
    DirectoryError,
    #[error("Invalid URL format: {0}")]
    InvalidUrl(String),
    #[error("Invalid port: {0} (must be between 1 and 65535)")]
    InvalidPort(u16),
    #[error("Invalid model name: {0} (cannot be empty)")]
    InvalidModel(String),
    #[error("Invalid protocol: {0} (must be 'http' or 'https')")]
    InvalidProtocol(String),
    #[error("Completion endpoint is not set (set completion.endpoint or AZURE_OPENAI_ENDPOINT)")]
    MissingEndpoint,
    #[error("Completion deployment is not set (set completion.deployment or AZURE_OPENAI_DEPLOYMENT_NAME)")]
    MissingDeployment,
    #[error("Invalid API version: {0} (cannot be empty)")]
    InvalidApiVersion(String),
    #[error("Invalid timeout: {0} (must be between 1 and 600 seconds)")]
    InvalidTimeout(u64),
    #[error("Invalid top_k: {0} (must be between 1 and 100)")]
    InvalidTopK(usize),
    #[error("Invalid chunk size: {0} (must be between 100 and 20000 characters)")]
    InvalidChunkChars(usize),
    #[error("Invalid max tokens: {0} (must be between 1 and 32768)")]
    InvalidMaxTokens(u32),
    #[error("Invalid temperature: {0} (must be between 0.0 and 2.0)")]
    InvalidTemperature(f32),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl Config {
    /// Default configuration directory (`~/.rag-answer`)
    #[inline]
    pub fn config_dir() -> Result<PathBuf, ConfigError> {
        dirs::home_dir()
            .map(|home| home.join(".rag-answer"))
            .or_else(|| dirs::data_dir().map(|data| data.join("rag-answer")))
            .ok_or(ConfigError::DirectoryError)
    }

    /// Load `config.toml` from `config_dir`, falling back to defaults when the
    /// file does not exist. Validation is left to the caller so that
    /// environment overrides can be applied first.
    #[inline]
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_path = config_dir.as_ref().join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            return Ok(Self {
                base_dir: config_dir.as_ref().to_path_buf(),
                ..Self::default()
            });
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;
        config.base_dir = config_dir.as_ref().to_path_buf();

        Ok(config)
    }

    #[inline]
    pub fn save(&self) -> Result<()> {
        self.validate()
            .context("Configuration validation failed before saving")?;
        self.write_to_disk()
    }

    /// Write `config.toml` without validating it first
    #[inline]
    pub fn write_to_disk(&self) -> Result<()> {
        fs::create_dir_all(&self.base_dir).with_context(|| {
            format!(
                "Failed to create config directory: {}",
                self.base_dir.display()
            )
        })?;

        let config_path = self.config_file_path();
        let content = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

        Ok(())
    }

    /// Overlay the Azure OpenAI variables the deployment is usually configured with.
    ///
    /// `lookup` is `std::env::var` at the CLI boundary and a map in tests.
    #[inline]
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(endpoint) = non_empty("AZURE_OPENAI_ENDPOINT") {
            self.completion.endpoint = endpoint;
        }
        if let Some(api_version) = non_empty("AZURE_OPENAI_API_VERSION") {
            self.completion.api_version = api_version;
        }
        if let Some(api_key) = non_empty("AZURE_OPENAI_KEY") {
            self.completion.api_key = Some(api_key);
        }
        if let Some(deployment) = non_empty("AZURE_OPENAI_DEPLOYMENT_NAME") {
            self.completion.deployment = deployment;
        }
    }

    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.completion.validate()?;
        self.validate_local()
    }

    /// Validate everything except the completion deployment, which commands
    /// that never call the model do not need.
    #[inline]
    pub fn validate_local(&self) -> Result<(), ConfigError> {
        self.ollama.validate()?;
        self.retrieval.validate()?;
        self.direct.validate()
    }

    #[inline]
    pub fn config_file_path(&self) -> PathBuf {
        self.base_dir.join(CONFIG_FILE_NAME)
    }

    /// Resolved location of the persisted index
    #[inline]
    pub fn index_path(&self) -> PathBuf {
        if self.retrieval.index_dir.is_absolute() {
            self.retrieval.index_dir.clone()
        } else {
            self.base_dir.join(&self.retrieval.index_dir)
        }
    }

    #[inline]
    pub fn ollama_url(&self) -> Result<Url, ConfigError> {
        self.ollama.ollama_url()
    }
}

impl CompletionConfig {
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.endpoint.trim().is_empty() {
            return Err(ConfigError::MissingEndpoint);
        }

        let url = self.endpoint_url()?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::InvalidProtocol(url.scheme().to_string()));
        }

        if self.deployment.trim().is_empty() {
            return Err(ConfigError::MissingDeployment);
        }

        if self.api_version.trim().is_empty() {
            return Err(ConfigError::InvalidApiVersion(self.api_version.clone()));
        }

        validate_timeout(self.timeout_seconds)
    }

    #[inline]
    pub fn endpoint_url(&self) -> Result<Url, ConfigError> {
        Url::parse(self.endpoint.trim()).map_err(|_| ConfigError::InvalidUrl(self.endpoint.clone()))
    }
}

impl OllamaConfig {
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.protocol != "http" && self.protocol != "https" {
            return Err(ConfigError::InvalidProtocol(self.protocol.clone()));
        }

        self.ollama_url()?;

        if self.port == 0 {
            return Err(ConfigError::InvalidPort(self.port));
        }

        if self.model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(self.model.clone()));
        }

        validate_timeout(self.timeout_seconds)
    }

    #[inline]
    pub fn ollama_url(&self) -> Result<Url, ConfigError> {
        let url_str = format!("{}://{}:{}", self.protocol, self.host, self.port);
        Url::parse(&url_str).map_err(|_| ConfigError::InvalidUrl(url_str))
    }
}

impl RetrievalConfig {
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100).contains(&self.top_k) {
            return Err(ConfigError::InvalidTopK(self.top_k));
        }

        if !(100..=20_000).contains(&self.chunk_chars) {
            return Err(ConfigError::InvalidChunkChars(self.chunk_chars));
        }

        Ok(())
    }
}

impl DirectConfig {
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=32_768).contains(&self.max_tokens) {
            return Err(ConfigError::InvalidMaxTokens(self.max_tokens));
        }

        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::InvalidTemperature(self.temperature));
        }

        Ok(())
    }
}

fn validate_timeout(seconds: u64) -> Result<(), ConfigError> {
    if !(1..=600).contains(&seconds) {
        return Err(ConfigError::InvalidTimeout(seconds));
    }
    Ok(())
}
