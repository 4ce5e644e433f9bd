// Configuration management module
// TOML settings for the completion deployment, embeddings and retrieval

pub mod display;
pub mod settings;

pub use display::{mask_secret, show_config};
pub use settings::{
    CompletionConfig, Config, ConfigError, DirectConfig, GroundingConfig, OllamaConfig,
    RetrievalConfig,
};

/// Get the configuration directory path
#[inline]
pub fn get_config_dir() -> Result<std::path::PathBuf, ConfigError> {
    Config::config_dir()
}
