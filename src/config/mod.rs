// Configuration management module
// Handles TOML configuration loading, validation, and data-directory paths

pub mod settings;

pub use settings::{ChunkingConfig, Config, ConfigError, OllamaConfig, ServerConfig};

/// Get the default data directory for the application
#[inline]
pub fn default_base_dir() -> Result<std::path::PathBuf, ConfigError> {
    dirs::data_local_dir()
        .or_else(dirs::home_dir)
        .map(|dir| dir.join("llm-playground"))
        .ok_or(ConfigError::DirectoryError)
}
