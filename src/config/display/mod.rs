
use console::style;

use super::Config;

#[inline]
pub fn show_config(config: &Config) {
    eprintln!("{}", style("📋 Current Configuration").bold().cyan());
    eprintln!();

    eprintln!("{}", style("Completion (Azure OpenAI):").bold().yellow());
    eprintln!("  Endpoint: {}", value_or_unset(&config.completion.endpoint));
    eprintln!(
        "  Deployment: {}",
        value_or_unset(&config.completion.deployment)
    );
    eprintln!(
        "  API Version: {}",
        style(&config.completion.api_version).cyan()
    );
    eprintln!(
        "  API Key: {}",
        config
            .completion
            .api_key
            .as_deref()
            .map_or_else(
                || style("<unset>".to_string()).red(),
                |key| style(mask_secret(key)).cyan()
            )
    );
    eprintln!(
        "  Timeout: {}s",
        style(config.completion.timeout_seconds).cyan()
    );

    eprintln!();
    eprintln!("{}", style("Embeddings (Ollama):").bold().yellow());
    match config.ollama_url() {
        Ok(url) => eprintln!("  URL: {}", style(url).cyan()),
        Err(e) => eprintln!("  URL: {} ({})", style("Invalid").red(), e),
    }
    eprintln!("  Model: {}", style(&config.ollama.model).cyan());

    eprintln!();
    eprintln!("{}", style("Retrieval:").bold().yellow());
    eprintln!("  Index: {}", style(config.index_path().display()).cyan());
    eprintln!("  Top K: {}", style(config.retrieval.top_k).cyan());
    eprintln!(
        "  Chunk Size: {} chars",
        style(config.retrieval.chunk_chars).cyan()
    );

    eprintln!();
    eprintln!("{}", style("Direct Mode:").bold().yellow());
    eprintln!("  Max Tokens: {}", style(config.direct.max_tokens).cyan());
    eprintln!("  Temperature: {}", style(config.direct.temperature).cyan());

    eprintln!();
    if let Err(e) = config.validate() {
        eprintln!("{} {}", style("⚠").yellow(), style(e).yellow());
    }
    eprintln!(
        "Config file: {}",
        style(config.config_file_path().display()).dim()
    );
}

/// Keep the last four characters of a credential, hide the rest.
#[inline]
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 4 {
        return "*".repeat(chars.len());
    }

    let visible: String = chars[chars.len() - 4..].iter().collect();
    format!("{}{}", "*".repeat(chars.len() - 4), visible)
}

fn value_or_unset(value: &str) -> console::StyledObject<String> {
    if value.trim().is_empty() {
        style("<unset>".to_string()).red()
    } else {
        style(value.to_string()).cyan()
    }
}
