use std::path::PathBuf;

use clap::{Parser, Subcommand};
use llm_playground::Result;
use llm_playground::commands::{serve, show_config};
use llm_playground::config::{Config, default_base_dir};

#[derive(Parser)]
#[command(name = "llm-playground")]
#[command(about = "Web playground for prompt, chat, and document Q&A experiments backed by Ollama")]
#[command(version)]
struct Cli {
    /// Override the data directory holding config, sessions, and collections
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the web server
    Serve,
    /// Show the active configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let base_dir = match cli.data_dir {
        Some(dir) => dir,
        None => default_base_dir()
            .map_err(|e| llm_playground::PlaygroundError::Config(e.to_string()))?,
    };
    let config = Config::load(&base_dir)?;

    match cli.command {
        Commands::Serve => serve(config).await?,
        Commands::Config => show_config(&config)?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn cli_parsing() {
        let cli = Cli::try_parse_from(["llm-playground", "serve"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            matches!(parsed.command, Commands::Serve);
        }
    }

    #[test]
    fn config_command() {
        let cli = Cli::try_parse_from(["llm-playground", "config"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            matches!(parsed.command, Commands::Config);
        }
    }

    #[test]
    fn data_dir_override() {
        let cli = Cli::try_parse_from(["llm-playground", "serve", "--data-dir", "/tmp/playground"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            assert_eq!(parsed.data_dir, Some(PathBuf::from("/tmp/playground")));
        }
    }

    #[test]
    fn invalid_command() {
        let cli = Cli::try_parse_from(["llm-playground", "invalid"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::InvalidSubcommand);
        }
    }

    #[test]
    fn help_message() {
        let cli = Cli::try_parse_from(["llm-playground", "--help"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::DisplayHelp);
        }
    }
}
