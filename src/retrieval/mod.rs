#[cfg(test)]
mod tests;

use std::path::Path;

use tracing::debug;

use crate::Result;
use crate::database::{CollectionStore, ScoredChunk};
use crate::embeddings::ollama::EmbeddingClient;
use crate::llm::{ChatClient, ChatOptions};
use crate::memory::{ChatMessage, Turn, to_messages};

/// How many chunks retrieval pulls into the prompt
pub const DEFAULT_TOP_K: usize = 4;

const QA_INSTRUCTIONS: &str = "Use the following pieces of context to answer the \
user's question. If you don't know the answer based on the context, just say \
that you don't know; don't try to make up an answer.";

/// Answer a question against a persisted collection.
///
/// Opens the collection read-only, embeds the question, retrieves the
/// top-k chunks, and makes one chat call carrying the retrieved context in
/// the system message and any prior turns before the question. The caller
/// owns appending the exchange to the session on success.
#[inline]
pub async fn retrieve_and_answer(
    store: &CollectionStore,
    embedder: &EmbeddingClient,
    chat: &ChatClient,
    location: &str,
    question: &str,
    history: &[Turn],
) -> Result<String> {
    let collection = store.open(Path::new(location)).await?;

    let query_vector = embedder.embed(question).await?;
    let hits = collection.search(&query_vector, DEFAULT_TOP_K).await?;
    debug!(
        "Retrieved {} chunks from {} for question (length {})",
        hits.len(),
        location,
        question.len()
    );

    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(ChatMessage::system(render_context(&hits)));
    messages.extend(to_messages(history));
    messages.push(ChatMessage::user(question));

    chat.chat(&messages, ChatOptions::with_temperature(0.3))
        .await
}

/// System message carrying the QA instructions plus the retrieved chunks
pub(crate) fn render_context(hits: &[ScoredChunk]) -> String {
    let mut prompt = String::from(QA_INSTRUCTIONS);
    prompt.push_str("\n\nContext:\n");

    if hits.is_empty() {
        prompt.push_str("(no matching context found)");
        return prompt;
    }

    for (i, hit) in hits.iter().enumerate() {
        if i > 0 {
            prompt.push_str("\n---\n");
        }
        prompt.push_str(&hit.content);
    }

    prompt
}
