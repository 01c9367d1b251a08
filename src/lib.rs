use thiserror::Error;

pub type Result<T> = std::result::Result<T, PlaygroundError>;

#[derive(Error, Debug)]
pub enum PlaygroundError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Session storage unavailable: {0}")]
    SessionUnavailable(String),

    #[error("Upload rejected: {0}")]
    UploadRejected(String),

    #[error("Collection not found: {0}")]
    IndexNotFound(String),

    #[error("Collection data is malformed: {0}")]
    MalformedIndex(String),

    #[error("Provider call failed: {0}")]
    ProviderFailure(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

pub mod commands;
pub mod config;
pub mod database;
pub mod embeddings;
pub mod indexer;
pub mod llm;
pub mod memory;
pub mod retrieval;
pub mod session;
pub mod web;
