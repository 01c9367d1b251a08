#[cfg(test)]
mod tests;

use std::ffi::OsStr;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::database::CollectionStore;
use crate::embeddings::chunking::chunk_text;
use crate::embeddings::ollama::EmbeddingClient;
use crate::{PlaygroundError, Result};

/// Session-facing record of one indexed document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionRecord {
    pub name: String,
    pub location: String,
    pub chunk_count: usize,
    pub created_at: DateTime<Utc>,
}

/// Chunk a document, embed every chunk, and persist the collection.
///
/// Embedding is all-or-nothing: if any chunk fails to embed, nothing is
/// written. The collection directory is named from the sanitized file stem
/// plus a digest of the content, so identical re-uploads land on the same
/// location (where last write wins) and same-named uploads with different
/// content do not collide.
#[inline]
pub async fn index_document(
    store: &CollectionStore,
    embedder: &EmbeddingClient,
    chunk_size: usize,
    file_name: &str,
    text: &str,
) -> Result<CollectionRecord> {
    if text.trim().is_empty() {
        return Err(PlaygroundError::UploadRejected(
            "The uploaded document is empty".to_string(),
        ));
    }

    let name = collection_name(file_name);
    let chunks = chunk_text(text, chunk_size);
    debug!(
        "Chunked '{}' into {} chunks (chunk size {})",
        file_name,
        chunks.len(),
        chunk_size
    );

    let contents: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
    let vectors = embedder.embed_batch(&contents).await?;

    let dir_name = format!("{}-{}", name, content_digest(text));
    let location = store.location(&dir_name);
    store.create(&location, &chunks, &vectors).await?;

    info!(
        "Indexed '{}' as collection '{}' ({} chunks)",
        file_name,
        name,
        chunks.len()
    );

    Ok(CollectionRecord {
        name,
        location: location.display().to_string(),
        chunk_count: chunks.len(),
        created_at: Utc::now(),
    })
}

/// Collection name from an upload file name: the stem, lowercased, with
/// anything outside `[a-z0-9]` collapsed to single dashes
pub(crate) fn collection_name(file_name: &str) -> String {
    let stem = Path::new(file_name)
        .file_stem()
        .and_then(OsStr::to_str)
        .unwrap_or(file_name);

    let mut name = String::with_capacity(stem.len());
    let mut last_was_dash = false;
    for ch in stem.chars() {
        if ch.is_ascii_alphanumeric() {
            name.extend(ch.to_lowercase());
            last_was_dash = false;
        } else if !last_was_dash && !name.is_empty() {
            name.push('-');
            last_was_dash = true;
        }
    }
    while name.ends_with('-') {
        name.pop();
    }

    if name.is_empty() {
        "document".to_string()
    } else {
        name
    }
}

/// First 8 hex chars of the content's SHA-256
pub(crate) fn content_digest(text: &str) -> String {
    let mut digest = hex::encode(Sha256::digest(text.as_bytes()));
    digest.truncate(8);
    digest
}
