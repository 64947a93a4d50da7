use crate::activity::{Action, ActivityStatus, SessionActivity};
use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use pdf_brief_core::{
    DocumentError, DocumentOverview, DocumentPipeline, HighlightCount, LanguageDetector,
    LopdfExtractor, QaResult, Session, SessionError, SessionSnapshot, SummaryRun, TextGenerator,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use uuid::Uuid;

pub type ServerPipeline = DocumentPipeline<
    LopdfExtractor,
    Box<dyn LanguageDetector + Send + Sync>,
    Box<dyn TextGenerator>,
>;

pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(60 * 60);

#[derive(Clone)]
struct SessionHandle {
    session: Arc<Mutex<Session>>,
    activity: Arc<SessionActivity>,
}

/// Shared state for the HTTP controller: one pipeline, many sessions.
#[derive(Clone)]
pub struct AppState {
    pipeline: Arc<ServerPipeline>,
    sessions: Arc<RwLock<HashMap<Uuid, SessionHandle>>>,
    session_ttl: Duration,
}

impl AppState {
    pub fn new(pipeline: ServerPipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            sessions: Arc::new(RwLock::new(HashMap::new())),
            session_ttl: DEFAULT_SESSION_TTL,
        }
    }

    /// Sessions untouched for longer than `ttl` are dropped by the sweeper.
    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    async fn session(&self, id: Uuid) -> Result<SessionHandle, ApiError> {
        let handle = self
            .sessions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(ApiError::UnknownSession(id))?;
        handle.activity.touch();
        Ok(handle)
    }

    /// Removes sessions idle past the TTL as of `now`. Busy sessions stay.
    pub async fn prune_idle(&self, now: Instant) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, handle| {
            handle.activity.is_busy() || handle.activity.idle_for(now) <= self.session_ttl
        });
        before - sessions.len()
    }

    fn sweep_period(&self) -> Duration {
        self.session_ttl
            .clamp(Duration::from_secs(1), Duration::from_secs(60))
    }
}

#[derive(Debug)]
pub enum ApiError {
    UnknownSession(Uuid),
    UnsupportedMediaType(String),
    Session(SessionError),
}

impl From<SessionError> for ApiError {
    fn from(value: SessionError) -> Self {
        Self::Session(value)
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::UnknownSession(id) => (StatusCode::NOT_FOUND, format!("unknown session {id}")),
            Self::UnsupportedMediaType(found) => (
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                format!("expected a pdf upload, got {found}"),
            ),
            Self::Session(error) => {
                let status = match &error {
                    SessionError::NoDocument => StatusCode::CONFLICT,
                    SessionError::InvalidHighlightCount { .. } | SessionError::EmptyQuestion => {
                        StatusCode::BAD_REQUEST
                    }
                    SessionError::Document(DocumentError::Io(_)) | SessionError::Task(_) => {
                        StatusCode::INTERNAL_SERVER_ERROR
                    }
                    SessionError::Document(_) => StatusCode::UNPROCESSABLE_ENTITY,
                };
                (status, error.to_string())
            }
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}

#[derive(Serialize)]
struct CreatedSession {
    session_id: Uuid,
}

#[derive(Serialize)]
struct SessionView {
    id: Uuid,
    activity: ActivityStatus,
    /// `None` while an action holds the session.
    session: Option<SessionSnapshot>,
}

#[derive(Deserialize)]
struct UploadParams {
    file_name: Option<String>,
}

#[derive(Deserialize)]
struct HighlightsBody {
    count: i64,
}

#[derive(Deserialize)]
struct QuestionBody {
    question: String,
}

/// One route per user action, each bound to a session.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/sessions", post(create_session))
        .route("/sessions/:id", get(get_session).delete(delete_session))
        .route("/sessions/:id/document", put(upload_document))
        .route("/sessions/:id/highlights", put(set_highlights))
        .route("/sessions/:id/summaries", post(summarize))
        .route("/sessions/:id/questions", post(ask))
        .layer(DefaultBodyLimit::disable())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn serve(state: AppState, addr: SocketAddr) -> anyhow::Result<()> {
    tokio::spawn(expire_idle_sessions(state.clone()));
    let app = create_router(state);
    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn expire_idle_sessions(state: AppState) {
    let mut ticker = tokio::time::interval(state.sweep_period());
    loop {
        ticker.tick().await;
        let expired = state.prune_idle(Instant::now()).await;
        if expired > 0 {
            info!(expired, ttl_secs = state.session_ttl.as_secs(), "expired idle sessions");
        }
    }
}

async fn health() -> &'static str {
    "ok"
}

async fn create_session(State(state): State<AppState>) -> (StatusCode, Json<CreatedSession>) {
    let session = Session::new();
    let session_id = session.id();
    state
        .sessions
        .write()
        .await
        .insert(
            session_id,
            SessionHandle {
                session: Arc::new(Mutex::new(session)),
                activity: Arc::new(SessionActivity::new()),
            },
        );

    info!(session = %session_id, "session created");
    (StatusCode::CREATED, Json(CreatedSession { session_id }))
}

async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, ApiError> {
    let handle = state.session(id).await?;
    let session = handle
        .session
        .try_lock()
        .ok()
        .map(|session| session.snapshot());

    Ok(Json(SessionView {
        id,
        activity: handle.activity.status(),
        session,
    }))
}

async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state
        .sessions
        .write()
        .await
        .remove(&id)
        .ok_or(ApiError::UnknownSession(id))?;
    Ok(StatusCode::NO_CONTENT)
}

async fn upload_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<UploadParams>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<DocumentOverview>, ApiError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("<none>");
    if !content_type.starts_with("application/pdf") {
        return Err(ApiError::UnsupportedMediaType(content_type.to_string()));
    }

    if let Some(name) = &params.file_name {
        let is_pdf = std::path::Path::new(name)
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
        if !is_pdf {
            return Err(ApiError::UnsupportedMediaType(name.clone()));
        }
    }

    let handle = state.session(id).await?;
    let mut session = handle.session.lock().await;
    let _busy = handle.activity.begin(Action::Uploading);

    let pipeline = Arc::clone(&state.pipeline);
    let file_name = params.file_name;
    let outcome = tokio::task::spawn_blocking(move || pipeline.load(&body, file_name.as_deref()))
        .await
        .map_err(|error| SessionError::Task(error.to_string()))?;

    let overview = session.document_loaded(outcome)?;
    Ok(Json(overview))
}

async fn set_highlights(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<HighlightsBody>,
) -> Result<Json<HighlightCount>, ApiError> {
    let handle = state.session(id).await?;
    let highlights = handle
        .session
        .lock()
        .await
        .highlight_count_changed(body.count)?;
    Ok(Json(highlights))
}

async fn summarize(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SummaryRun>, ApiError> {
    let handle = state.session(id).await?;
    let mut session = handle.session.lock().await;
    let _busy = handle.activity.begin(Action::Summarizing);
    let run = session
        .summarize_requested_with_progress(state.pipeline.as_ref(), handle.activity.as_ref())
        .await?
        .clone();
    Ok(Json(run))
}

async fn ask(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<QuestionBody>,
) -> Result<Json<QaResult>, ApiError> {
    let handle = state.session(id).await?;
    let mut session = handle.session.lock().await;
    let _busy = handle.activity.begin(Action::Answering);
    let answer = session
        .question_asked(state.pipeline.as_ref(), &body.question)
        .await?
        .clone();
    Ok(Json(answer))
}
