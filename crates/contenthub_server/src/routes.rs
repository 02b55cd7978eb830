//! Axum routes for the content hub.
//!
//! # Responsibility
//! - Map browser and JSON requests onto gate-checked hub operations.
//! - Keep blocking file I/O off the async runtime.
//!
//! # Invariants
//! - Every route except the login form answers only to a live session.
//! - Storage failures reach clients as a generic 500; details stay in the log.
//! - Hidden asset files, including in-flight uploads, are never served.

use crate::config::ServerConfig;
use crate::render;
use crate::session::{
    clear_session_cookie, session_cookie, session_token, SessionContext, SessionStore,
};
use axum::extract::multipart::{Field, MultipartError, MultipartRejection};
use axum::extract::{DefaultBodyLimit, Multipart, Request, State};
use axum::http::header::SET_COOKIE;
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{Html, IntoResponse, Json, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Router};
use contenthub_core::{
    AccessGate, DirAssetStore, FileNoteLog, Hub, HubError, Submission, Upload,
};
use log::{debug, error, warn};
use serde::Deserialize;
use std::io::{self, Seek, SeekFrom};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tower_http::services::ServeDir;

pub type ServerHub = Hub<FileNoteLog, DirAssetStore, SessionStore>;

pub struct AppState {
    pub hub: ServerHub,
    pub config: ServerConfig,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        let sessions = SessionStore::new(&config.admin_user, &config.admin_pass, config.session_ttl);
        let hub = Hub::open(
            config.data_file.clone(),
            config.assets_dir.clone(),
            config.asset_url_prefix(),
            sessions,
        );
        Self { hub, config }
    }

    pub fn sessions(&self) -> &SessionStore {
        self.hub.gate()
    }
}

/// Builds the full router, mounted under `config.base_path`.
pub fn build_router(state: Arc<AppState>) -> Router {
    let base = state.config.base_path.clone();

    let assets: Router<Arc<AppState>> = Router::new()
        .nest_service(
            &format!("{base}/assets"),
            ServeDir::new(&state.config.assets_dir),
        )
        .layer(middleware::from_fn(refuse_hidden_assets))
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            require_session,
        ));

    let mut router = Router::new()
        .route(&format!("{base}/"), get(feed_page))
        .route(&format!("{base}/login"), get(login_form).post(login_submit))
        .route(&format!("{base}/logout"), get(logout).post(logout))
        .route(
            &format!("{base}/upload"),
            post(upload).fallback(redirect_to_feed),
        )
        .route(&format!("{base}/api/feed"), get(api_feed));
    if !base.is_empty() {
        router = router.route(&base, get(redirect_to_feed));
    }

    router
        .merge(assets)
        .layer(DefaultBodyLimit::max(state.config.max_upload_bytes))
        .with_state(state)
}

/// Handler-level failure of a hub call.
enum RouteError {
    Denied,
    Internal,
}

/// Runs a hub operation on the blocking pool and logs failures.
async fn run_blocking<T, F>(
    state: &Arc<AppState>,
    event: &'static str,
    work: F,
) -> Result<T, RouteError>
where
    T: Send + 'static,
    F: FnOnce(&ServerHub) -> Result<T, HubError> + Send + 'static,
{
    let state = Arc::clone(state);
    match tokio::task::spawn_blocking(move || work(&state.hub)).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(HubError::Denied(_))) => Err(RouteError::Denied),
        Ok(Err(HubError::Ingest(err))) => {
            error!(
                "event={} module=http status=error stage={} error={}",
                event,
                err.stage(),
                err
            );
            Err(RouteError::Internal)
        }
        Ok(Err(err)) => {
            error!("event={} module=http status=error error={}", event, err);
            Err(RouteError::Internal)
        }
        Err(err) => {
            error!(
                "event={} module=http status=error reason=task_failed error={}",
                event, err
            );
            Err(RouteError::Internal)
        }
    }
}

fn internal_error() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
}

fn redirect_to_login(state: &AppState) -> Response {
    Redirect::to(&state.config.path("/login")).into_response()
}

async fn redirect_to_feed(State(state): State<Arc<AppState>>) -> Redirect {
    Redirect::to(&state.config.path("/"))
}

async fn require_session(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let ctx = SessionContext::from_headers(request.headers());
    if state.sessions().is_authorized(&ctx) {
        return next.run(request).await;
    }
    redirect_to_login(&state)
}

async fn refuse_hidden_assets(request: Request, next: Next) -> Response {
    if is_hidden_asset_path(request.uri().path()) {
        debug!(
            "event=asset_serve module=http status=skip reason=hidden path={:?}",
            request.uri().path()
        );
        return StatusCode::NOT_FOUND.into_response();
    }
    next.run(request).await
}

/// True when the last path segment names a dot file, encoded or not.
fn is_hidden_asset_path(path: &str) -> bool {
    let last = path.rsplit('/').next().unwrap_or_default();
    last.starts_with('.')
        || last
            .get(..3)
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case("%2e"))
}

// GET {base}/
async fn feed_page(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let ctx = SessionContext::from_headers(&headers);
    match run_blocking(&state, "feed_page", move |hub| hub.build_feed(&ctx)).await {
        Ok(feed) => Html(render::feed_page(&feed, &state.config.base_path, |name| {
            state.hub.asset_path(name)
        }))
        .into_response(),
        Err(RouteError::Denied) => redirect_to_login(&state),
        Err(RouteError::Internal) => internal_error(),
    }
}

// GET {base}/api/feed
async fn api_feed(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let ctx = SessionContext::from_headers(&headers);
    match run_blocking(&state, "api_feed", move |hub| hub.build_feed(&ctx)).await {
        Ok(feed) => Json(feed).into_response(),
        Err(RouteError::Denied) => (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({ "error": "unauthorized" })),
        )
            .into_response(),
        Err(RouteError::Internal) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": "internal error" })),
        )
            .into_response(),
    }
}

#[derive(Debug, Deserialize)]
struct LoginForm {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

// GET {base}/login
async fn login_form(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(render::login_page(&state.config.base_path, None))
}

// POST {base}/login
async fn login_submit(
    State(state): State<Arc<AppState>>,
    Form(form): Form<LoginForm>,
) -> Response {
    match state.sessions().login(&form.username, &form.password) {
        Some(token) => {
            let cookie = session_cookie(
                &token,
                state.sessions().ttl(),
                state.config.cookie_secure,
            );
            (
                [(SET_COOKIE, cookie)],
                Redirect::to(&state.config.path("/")),
            )
                .into_response()
        }
        None => Html(render::login_page(
            &state.config.base_path,
            Some("Invalid credentials"),
        ))
        .into_response(),
    }
}

// GET|POST {base}/logout
async fn logout(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    if let Some(token) = session_token(&headers) {
        state.sessions().revoke(&token);
    }
    (
        [(SET_COOKIE, clear_session_cookie(state.config.cookie_secure))],
        redirect_to_login(&state),
    )
        .into_response()
}

// POST {base}/upload
async fn upload(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let ctx = SessionContext::from_headers(&headers);
    // Refuse before spooling the body to disk.
    if !state.sessions().is_authorized(&ctx) {
        return redirect_to_login(&state);
    }

    let submission = match multipart {
        Ok(multipart) => match read_submission(multipart).await {
            Ok(submission) => submission,
            Err(UploadError::Multipart(err)) => {
                warn!(
                    "event=upload module=http status=error reason=multipart error={}",
                    err
                );
                return (err.status(), err.body_text()).into_response();
            }
            Err(UploadError::Spool(err)) => {
                error!(
                    "event=upload module=http status=error reason=spool error={}",
                    err
                );
                return internal_error();
            }
        },
        Err(rejection) => {
            debug!(
                "event=upload module=http status=skip reason=not_multipart error={}",
                rejection
            );
            Submission::default()
        }
    };

    match run_blocking(&state, "upload", move |hub| hub.ingest(&ctx, submission)).await {
        Ok(report) => {
            debug!(
                "event=upload module=http status=ok note_appended={} stored={} skipped={}",
                report.note_appended,
                report.stored.len(),
                report.skipped.len()
            );
            Redirect::to(&state.config.path("/")).into_response()
        }
        Err(RouteError::Denied) => redirect_to_login(&state),
        Err(RouteError::Internal) => internal_error(),
    }
}

enum UploadError {
    Multipart(MultipartError),
    Spool(io::Error),
}

impl From<MultipartError> for UploadError {
    fn from(value: MultipartError) -> Self {
        Self::Multipart(value)
    }
}

impl From<io::Error> for UploadError {
    fn from(value: io::Error) -> Self {
        Self::Spool(value)
    }
}

/// Collects the `text` field and spools every `file` part to an anonymous
/// temporary file, so the core reads uploads synchronously.
async fn read_submission(mut multipart: Multipart) -> Result<Submission, UploadError> {
    let mut submission = Submission::default();
    while let Some(mut field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("text") => {
                let text = field.text().await?;
                if !text.is_empty() {
                    submission.text = Some(text);
                }
            }
            Some("file") => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let spooled = spool_field(&mut field).await?;
                submission.uploads.push(Upload::new(file_name, spooled));
            }
            _ => {}
        }
    }
    Ok(submission)
}

async fn spool_field(field: &mut Field<'_>) -> Result<std::fs::File, UploadError> {
    let mut file = tokio::fs::File::from_std(tempfile::tempfile()?);
    while let Some(chunk) = field.chunk().await? {
        file.write_all(&chunk).await?;
    }
    file.flush().await?;

    let mut file = file.into_std().await;
    file.seek(SeekFrom::Start(0))?;
    Ok(file)
}
