//! Upload/indexing and the two document Q&A pages.

use std::path::Path;

use axum::Form;
use axum::extract::{Multipart, State};
use axum::response::{Html, IntoResponse, Response};
use axum_extra::extract::cookie::SignedCookieJar;
use serde::Deserialize;
use tracing::warn;

use crate::indexer::{CollectionRecord, index_document};
use crate::memory::{self, Memory, Turn};
use crate::retrieval::retrieve_and_answer;
use crate::session::Session;
use crate::{PlaygroundError, Result};

use super::{AppState, error_status, views};

/// Session key holding the list of indexed collections
pub const COLLECTIONS_KEY: &str = "collections";
/// Session key holding the conversational Q&A transcript
pub const DOC_CHAT_MEMORY_KEY: &str = "memory:documents-chat";

const ACCEPTED_EXTENSIONS: &[&str] = &["txt", "md", "text"];

#[derive(Debug, Deserialize)]
pub(super) struct QaForm {
    #[serde(default)]
    document: String,
    #[serde(default)]
    question: String,
    #[serde(default)]
    intent: String,
}

fn collections_from(session: &Session) -> Vec<CollectionRecord> {
    session.get(COLLECTIONS_KEY).unwrap_or_default()
}

fn transcript_from(session: &Session) -> Vec<Turn> {
    match session.get::<Memory>(DOC_CHAT_MEMORY_KEY) {
        Some(Memory::PlainTurns { turns }) => turns,
        _ => Vec::new(),
    }
}

/// Reject a form-supplied location that does not point inside the collection
/// root; everything else about its validity is decided when it is opened
fn check_location(state: &AppState, location: &str) -> Result<()> {
    let path = Path::new(location);
    if path.starts_with(state.collections.root()) && !location.contains("..") {
        Ok(())
    } else {
        Err(PlaygroundError::IndexNotFound(location.to_string()))
    }
}

#[expect(clippy::unused_async, reason = "axum handlers must be async")]
pub(super) async fn show_documents(State(state): State<AppState>, jar: SignedCookieJar) -> Response {
    let session = state.sessions.load_or_empty(&jar);
    Html(views::documents_page(&collections_from(&session), None, None)).into_response()
}

pub(super) async fn upload_document(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    multipart: Multipart,
) -> Response {
    let mut session = state.sessions.load_or_empty(&jar);

    match handle_upload(&state, &mut session, multipart).await {
        Ok(record) => {
            let notice = format!("New collection '{}' created.", record.name);
            match state.sessions.commit(&session) {
                Ok(cookie) => (
                    jar.add(cookie),
                    Html(views::documents_page(
                        &collections_from(&session),
                        Some(&notice),
                        None,
                    )),
                )
                    .into_response(),
                Err(e) => upload_error(&session, &e),
            }
        }
        Err(e) => upload_error(&session, &e),
    }
}

fn upload_error(session: &Session, e: &PlaygroundError) -> Response {
    warn!("Document upload failed: {}", e);
    (
        error_status(e),
        Html(views::documents_page(
            &collections_from(session),
            None,
            Some(&e.to_string()),
        )),
    )
        .into_response()
}

async fn handle_upload(
    state: &AppState,
    session: &mut Session,
    mut multipart: Multipart,
) -> Result<CollectionRecord> {
    let mut upload: Option<(String, String)> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        PlaygroundError::UploadRejected(format!("Could not read the upload: {}", e))
    })? {
        if field.name() != Some("file") {
            continue;
        }

        let Some(file_name) = field.file_name().map(ToString::to_string) else {
            continue;
        };

        check_extension(&file_name)?;

        let bytes = field.bytes().await.map_err(|e| {
            PlaygroundError::UploadRejected(format!(
                "Could not read the uploaded file (is it larger than 5 MB?): {}",
                e
            ))
        })?;

        let text = String::from_utf8(bytes.to_vec()).map_err(|_| {
            PlaygroundError::UploadRejected(
                "The uploaded file is not valid UTF-8 text".to_string(),
            )
        })?;

        upload = Some((file_name, text));
    }

    let Some((file_name, text)) = upload else {
        return Err(PlaygroundError::UploadRejected(
            "No file uploaded".to_string(),
        ));
    };

    let record = index_document(
        &state.collections,
        &state.embedder,
        state.config.chunking.chunk_size,
        &file_name,
        &text,
    )
    .await?;

    // Re-indexing the same content replaces the old record for its location
    let mut collections = collections_from(session);
    collections.retain(|existing| existing.location != record.location);
    collections.push(record.clone());
    session.set(COLLECTIONS_KEY, &collections)?;

    Ok(record)
}

fn check_extension(file_name: &str) -> Result<()> {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("");

    if ACCEPTED_EXTENSIONS
        .iter()
        .any(|accepted| extension.eq_ignore_ascii_case(accepted))
    {
        Ok(())
    } else {
        Err(PlaygroundError::UploadRejected(format!(
            "Unsupported file type '{}'; accepted: .txt, .md, .text",
            file_name
        )))
    }
}

#[expect(clippy::unused_async, reason = "axum handlers must be async")]
pub(super) async fn show_qa(State(state): State<AppState>, jar: SignedCookieJar) -> Response {
    let session = state.sessions.load_or_empty(&jar);
    Html(views::qa_page(&collections_from(&session), None, None)).into_response()
}

/// One-shot document Q&A: no memory, session untouched
pub(super) async fn submit_qa(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    Form(form): Form<QaForm>,
) -> Response {
    let session = state.sessions.load_or_empty(&jar);
    let collections = collections_from(&session);

    let answer = match answer_one_shot(&state, &form).await {
        Ok(answer) => answer,
        Err(e) => {
            warn!("Document Q&A failed: {}", e);
            return (
                error_status(&e),
                Html(views::qa_page(&collections, None, Some(&e.to_string()))),
            )
                .into_response();
        }
    };

    Html(views::qa_page(&collections, Some(&answer), None)).into_response()
}

async fn answer_one_shot(state: &AppState, form: &QaForm) -> Result<String> {
    check_location(state, &form.document)?;
    retrieve_and_answer(
        &state.collections,
        &state.embedder,
        &state.chat,
        &form.document,
        &form.question,
        &[],
    )
    .await
}

#[expect(clippy::unused_async, reason = "axum handlers must be async")]
pub(super) async fn show_chat(State(state): State<AppState>, jar: SignedCookieJar) -> Response {
    let session = state.sessions.load_or_empty(&jar);
    Html(views::document_chat_page(
        &collections_from(&session),
        &transcript_from(&session),
        None,
        None,
    ))
    .into_response()
}

/// Conversational document Q&A: buffer memory in the session, cleared on
/// request without touching the collection list
pub(super) async fn submit_chat(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    Form(form): Form<QaForm>,
) -> Response {
    let mut session = state.sessions.load_or_empty(&jar);
    let collections = collections_from(&session);

    if form.intent == "clear" {
        return match clear_chat(&state, jar, &mut session) {
            Ok(response) => response,
            Err(e) => chat_error(&collections, &transcript_from(&session), &form, &e),
        };
    }

    let mut turns = transcript_from(&session);

    let answer = match answer_conversational(&state, &form, &turns).await {
        Ok(answer) => answer,
        // Failure leaves the session's turns untouched
        Err(e) => return chat_error(&collections, &turns, &form, &e),
    };

    turns.extend(memory::from_exchange(&form.question, &answer));

    let committed = session
        .set(DOC_CHAT_MEMORY_KEY, &Memory::PlainTurns { turns: turns.clone() })
        .and_then(|()| state.sessions.commit(&session));

    match committed {
        Ok(cookie) => (
            jar.add(cookie),
            Html(views::document_chat_page(
                &collections,
                &turns,
                Some(&form.document),
                None,
            )),
        )
            .into_response(),
        Err(e) => chat_error(&collections, &turns, &form, &e),
    }
}

async fn answer_conversational(state: &AppState, form: &QaForm, turns: &[Turn]) -> Result<String> {
    check_location(state, &form.document)?;
    retrieve_and_answer(
        &state.collections,
        &state.embedder,
        &state.chat,
        &form.document,
        &form.question,
        turns,
    )
    .await
}

fn clear_chat(state: &AppState, jar: SignedCookieJar, session: &mut Session) -> Result<Response> {
    session.set(DOC_CHAT_MEMORY_KEY, &Memory::empty_turns())?;
    let cookie = state.sessions.commit(session)?;

    Ok((
        jar.add(cookie),
        Html(views::document_chat_page(
            &collections_from(session),
            &[],
            None,
            None,
        )),
    )
        .into_response())
}

fn chat_error(
    collections: &[CollectionRecord],
    turns: &[Turn],
    form: &QaForm,
    e: &PlaygroundError,
) -> Response {
    warn!("Conversational document Q&A failed: {}", e);
    (
        error_status(e),
        Html(views::document_chat_page(
            collections,
            turns,
            Some(&form.document),
            Some(&e.to_string()),
        )),
    )
        .into_response()
}
