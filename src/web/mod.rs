
pub mod documents;
pub mod pages;
pub mod views;

use axum::Router;
use axum::extract::{DefaultBodyLimit, FromRef};
use axum::http::StatusCode;
use axum::response::Html;
use axum::routing::get;
use axum_extra::extract::cookie::Key;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::Config;
use crate::database::CollectionStore;
use crate::embeddings::ollama::EmbeddingClient;
use crate::llm::ChatClient;
use crate::session::SessionStore;
use crate::{PlaygroundError, Result};

/// Upload size cap, enforced before any chunking happens
pub const MAX_UPLOAD_BYTES: usize = 5_000_000;

/// Shared per-process state.
///
/// The provider clients and stores are value objects with no per-request
/// mutable state; they are built once at startup and reused by every
/// request instead of being reconstructed per call.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub sessions: SessionStore,
    pub collections: CollectionStore,
    pub chat: ChatClient,
    pub embedder: EmbeddingClient,
}

impl AppState {
    #[inline]
    pub fn from_config(config: Config) -> Result<Self> {
        let sessions = SessionStore::new(config.sessions_dir(), &config.server.cookie_secret)?;
        let collections = CollectionStore::new(config.collections_dir());
        let chat = ChatClient::new(&config.ollama)?;
        let embedder = EmbeddingClient::new(&config.ollama)?;

        Ok(Self {
            config: Arc::new(config),
            sessions,
            collections,
            chat,
            embedder,
        })
    }
}

impl FromRef<AppState> for Key {
    #[inline]
    fn from_ref(state: &AppState) -> Self {
        state.sessions.cookie_key()
    }
}

/// Build the full application router
#[inline]
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/agents", get(agents))
        .route(
            "/prompt/:slug",
            get(pages::show_prompt).post(pages::submit_prompt),
        )
        .route(
            "/chat/:slug",
            get(pages::show_chat).post(pages::submit_chat),
        )
        .route(
            "/documents",
            get(documents::show_documents).post(documents::upload_document),
        )
        .route(
            "/documents/qa",
            get(documents::show_qa).post(documents::submit_qa),
        )
        .route(
            "/documents/chat",
            get(documents::show_chat).post(documents::submit_chat),
        )
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve until shutdown
#[inline]
pub async fn serve(config: Config) -> Result<()> {
    let addr = config.bind_addr();
    let state = AppState::from_config(config)?;
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Playground listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

#[expect(clippy::unused_async, reason = "axum handlers must be async")]
async fn home() -> Html<String> {
    Html(views::home_page())
}

/// The agent experiments are explicitly unsupported; this page says so
#[expect(clippy::unused_async, reason = "axum handlers must be async")]
async fn agents() -> Html<String> {
    Html(views::agents_page())
}

/// Status code for a request-level failure. No error is process-fatal; the
/// caller pairs this with a rendered page carrying the message.
pub(crate) fn error_status(e: &PlaygroundError) -> StatusCode {
    match e {
        PlaygroundError::UploadRejected(_) => StatusCode::BAD_REQUEST,
        PlaygroundError::IndexNotFound(_) | PlaygroundError::MalformedIndex(_) => {
            StatusCode::NOT_FOUND
        }
        PlaygroundError::ProviderFailure(_) => StatusCode::BAD_GATEWAY,
        PlaygroundError::SessionUnavailable(_)
        | PlaygroundError::Config(_)
        | PlaygroundError::Io(_)
        | PlaygroundError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
