use clap::{Parser, Subcommand};
use console::style;
use rag_answer::Result;
use rag_answer::answer::AnswerMode;
use rag_answer::commands::{ask, build_index, init_config, show_status};
use rag_answer::config::{Config, get_config_dir, show_config};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "rag-answer")]
#[command(about = "Answer questions with an Azure OpenAI deployment, grounded by a local document index")]
#[command(version)]
struct Cli {
    /// Directory holding config.toml and the default index location
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a question
    Ask {
        /// The question to answer
        question: String,
        /// How the question is grounded before it reaches the model
        #[arg(long, value_enum, default_value_t = AnswerMode::Retrieval)]
        mode: AnswerMode,
    },
    /// Chunk and embed the .md and .txt files under a directory into a fresh index
    Build {
        /// Directory of source documents
        dir: PathBuf,
    },
    /// Write a starter configuration file, or show the current one
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Show where the index lives and how many chunks it holds
    Status,
}

fn load_config(config_dir: Option<PathBuf>) -> Result<Config> {
    let config_dir = match config_dir {
        Some(dir) => dir,
        None => get_config_dir().map_err(|e| rag_answer::RagError::Config(e.to_string()))?,
    };

    let mut config = Config::load(config_dir)?;
    config.apply_env_overrides(|key| std::env::var(key).ok());
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config_dir)?;

    match cli.command {
        Commands::Ask { question, mode } => {
            let answer = ask(&config, mode, &question).await?;
            println!("{}", answer);
        }
        Commands::Build { dir } => {
            let stats = build_index(&config, &dir).await?;
            eprintln!(
                "{} {} chunks from {} documents ({} dimensions)",
                style("✓ Indexed").green(),
                stats.chunks,
                stats.documents,
                stats.dimension
            );
        }
        Commands::Config { show } => {
            if show {
                show_config(&config);
            } else {
                init_config(&config)?;
            }
        }
        Commands::Status => {
            show_status(&config).await?;
        }
    }

    Ok(())
}
