//! HTTP server for the noted browser UI, using Axum.
//!
//! Pages:
//! - `/`, `/home`, `/about`, `/editor` - HTML pages
//! - `/terminate` - shut the server down after a short delay
//! - `/static/*` - files from the configured static directory
//!
//! The JSON API lives under `/api`. Every failure is answered with
//! `{"result": "error", "message": ...}` and a matching status code.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use axum::{
    async_trait,
    extract::{FromRequest, Request, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tower_http::services::ServeDir;

use crate::config::Config;
use crate::database::Database;
use crate::error::{NotedError, NotedResult};
use crate::filename::{notes_by_stem, stem};
use crate::markdown::word_list;
use crate::models::Tags;
use crate::note_store::NoteStore;
use crate::notes::{create_note, store_note, NewNote};
use crate::search::{execute_search, find_files_by_key, find_files_in_database};
use crate::sync::update_database;

/// Delay between a `/terminate` request and the shutdown signal
pub const SHUTDOWN_DELAY: Duration = Duration::from_secs(2);

/// Shared server state
#[derive(Clone)]
pub struct AppState {
    store: Arc<NoteStore>,
    db: Arc<Mutex<Database>>,
    config: Arc<Config>,
    shutdown: Arc<Mutex<Option<oneshot::Sender<()>>>>,
}

impl AppState {
    /// Build the state and the receiver that fires when `/terminate` is requested
    pub fn new(store: NoteStore, db: Database, config: Config) -> (Self, oneshot::Receiver<()>) {
        let (tx, rx) = oneshot::channel();
        let state = Self {
            store: Arc::new(store),
            db: Arc::new(Mutex::new(db)),
            config: Arc::new(config),
            shutdown: Arc::new(Mutex::new(Some(tx))),
        };
        (state, rx)
    }

    pub fn store(&self) -> &NoteStore {
        &self.store
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Lock the revision database
    pub fn db(&self) -> NotedResult<MutexGuard<'_, Database>> {
        self.db
            .lock()
            .map_err(|_| NotedError::Other("database lock poisoned".to_string()))
    }

    /// Fire the shutdown signal once; later calls do nothing
    fn trigger_shutdown(&self) {
        if let Ok(mut guard) = self.shutdown.lock() {
            if let Some(tx) = guard.take() {
                let _ = tx.send(());
            }
        }
    }
}

// Error handling

#[derive(Debug, Serialize)]
struct ErrorResponse {
    result: &'static str,
    message: String,
}

/// Handler error, rendered as a JSON error payload
#[derive(Debug)]
pub struct ApiError(NotedError);

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match &self.0 {
            NotedError::Validation { .. } | NotedError::Json(_) => StatusCode::BAD_REQUEST,
            NotedError::NotFound(_) => StatusCode::NOT_FOUND,
            NotedError::Conflict(_) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<NotedError> for ApiError {
    fn from(err: NotedError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self.0);
        } else {
            tracing::debug!("Request rejected ({}): {}", status, self.0);
        }
        let body = Json(ErrorResponse {
            result: "error",
            message: self.0.to_string(),
        });
        (status, body).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

/// JSON request body whose rejections use the API error payload
#[derive(Debug)]
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(ApiError(NotedError::validation(
                "body",
                rejection.body_text(),
            ))),
        }
    }
}

// Request/Response types

#[derive(Debug, Deserialize)]
struct SearchRequest {
    #[serde(default)]
    search_string: String,
}

#[derive(Debug, Deserialize)]
struct KeywordRequest {
    keyword: String,
}

#[derive(Debug, Deserialize)]
struct FilenameRequest {
    filename: String,
}

#[derive(Debug, Deserialize)]
struct StoreRequest {
    filename: String,
    text: String,
}

#[derive(Debug, Deserialize)]
struct CreateRequest {
    filename: String,
    #[serde(default)]
    keywords: String,
    #[serde(default)]
    present: String,
    #[serde(default)]
    speakers: String,
}

#[derive(Debug, Deserialize)]
struct RevisionRequest {
    filename: String,
    timestamp: String,
}

#[derive(Debug, Serialize)]
struct ListResponse {
    notes: String,
}

#[derive(Debug, Serialize)]
struct UpdateDatabaseResponse {
    result: &'static str,
    count: usize,
}

#[derive(Debug, Serialize)]
struct StemResponse {
    result: &'static str,
    stem: Option<String>,
    notes: Vec<String>,
}

#[derive(Debug, Serialize)]
struct FilesResponse {
    result: &'static str,
    files: Vec<String>,
}

#[derive(Debug, Serialize)]
struct TextResponse {
    result: &'static str,
    text: String,
}

#[derive(Debug, Serialize)]
struct StoreResponse {
    result: &'static str,
    chars: usize,
    timestamp: String,
}

#[derive(Debug, Serialize)]
struct PathResponse {
    path: String,
}

#[derive(Debug, Serialize)]
struct CreateResponse {
    result: &'static str,
    filename: String,
    chars: usize,
}

#[derive(Debug, Serialize)]
struct RevisionSummary {
    timestamp: String,
    chars: usize,
}

#[derive(Debug, Serialize)]
struct HistoryResponse {
    result: &'static str,
    revisions: Vec<RevisionSummary>,
}

#[derive(Debug, Serialize)]
struct CountResponse {
    result: &'static str,
    count: i64,
}

#[derive(Debug, Serialize)]
struct DateResponse {
    date: String,
}

#[derive(Debug, Serialize)]
struct TimeResponse {
    time: String,
}

const SUCCESS: &str = "success";

// Pages

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn page(title: &str, body: &str) -> Html<String> {
    Html(format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>noted - {title}</title>\n\
         <link rel=\"stylesheet\" href=\"/static/css/noted.css\">\n</head>\n<body>\n\
         <nav><a href=\"/home\">Home</a> <a href=\"/editor\">Editor</a> <a href=\"/about\">About</a></nav>\n\
         {body}\n</body>\n</html>\n",
        title = escape_html(title),
        body = body
    ))
}

async fn home(State(state): State<AppState>) -> Result<Html<String>, ApiError> {
    let notes = state.store.list()?;
    let count = state.db()?.count()?;

    let mut body = format!(
        "<h1>noted</h1>\n<p>Notes in <code>{}</code>: {} files, {} revisions.</p>\n<ul>\n",
        escape_html(&state.config.notes_path().display().to_string()),
        notes.len(),
        count
    );
    for note in &notes {
        let name = escape_html(note);
        body.push_str(&format!("<li><a href=\"/editor?file={name}\">{name}</a></li>\n"));
    }
    body.push_str("</ul>");
    Ok(page("home", &body))
}

async fn about(State(state): State<AppState>) -> Html<String> {
    page(
        "about",
        &format!(
            "<h1>About noted</h1>\n<p>Version {}</p>\n<p>Configuration: <code>{}</code></p>",
            escape_html(state.config.version()),
            escape_html(&state.config.config_file().display().to_string())
        ),
    )
}

async fn editor(State(state): State<AppState>) -> Html<String> {
    page(
        "editor",
        &format!(
            "<h1>Editor</h1>\n<div id=\"editor\" data-autosave=\"{}\"></div>\n\
             <script src=\"/static/js/editor.js\"></script>",
            state.config.autosave()
        ),
    )
}

async fn terminate(State(state): State<AppState>) -> Html<String> {
    tracing::info!("Termination requested, stopping in {:?}", SHUTDOWN_DELAY);
    let delayed = state.clone();
    tokio::spawn(async move {
        tokio::time::sleep(SHUTDOWN_DELAY).await;
        delayed.trigger_shutdown();
    });
    page("terminate", "<h1>noted is shutting down</h1>")
}

// API handlers

async fn list_notes(State(state): State<AppState>) -> ApiResult<ListResponse> {
    let notes = state.store.list()?;
    Ok(Json(ListResponse {
        notes: notes.join(","),
    }))
}

async fn update_db(State(state): State<AppState>) -> Response {
    let result = state
        .db()
        .and_then(|db| update_database(&state.store, &db, state.config.exclude_prefixes()));
    match result {
        Ok(summary) => Json(UpdateDatabaseResponse {
            result: SUCCESS,
            count: summary.inserted,
        })
        .into_response(),
        Err(e) => {
            tracing::error!("Database update failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(UpdateDatabaseResponse {
                    result: "error",
                    count: 0,
                }),
            )
                .into_response()
        }
    }
}

async fn find_stem(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<SearchRequest>,
) -> ApiResult<StemResponse> {
    let wanted = stem(request.search_string.trim());
    let notes = match &wanted {
        Some(wanted) => notes_by_stem(wanted, state.store.list()?.iter()),
        None => Vec::new(),
    };
    Ok(Json(StemResponse {
        result: SUCCESS,
        stem: wanted,
        notes,
    }))
}

async fn find_files(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<SearchRequest>,
) -> ApiResult<FilesResponse> {
    let files = state.store.find_files(&request.search_string)?;
    Ok(Json(FilesResponse {
        result: SUCCESS,
        files,
    }))
}

async fn find_in_database(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<SearchRequest>,
) -> ApiResult<FilesResponse> {
    let db = state.db()?;
    let files = find_files_in_database(&db, &request.search_string)?;
    Ok(Json(FilesResponse {
        result: SUCCESS,
        files,
    }))
}

async fn find_by_key(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<KeywordRequest>,
) -> ApiResult<FilesResponse> {
    let db = state.db()?;
    let files = find_files_by_key(&db, &request.keyword)?;
    Ok(Json(FilesResponse {
        result: SUCCESS,
        files,
    }))
}

async fn search(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<SearchRequest>,
) -> ApiResult<FilesResponse> {
    let db = state.db()?;
    let files = execute_search(&db, &request.search_string)?;
    Ok(Json(FilesResponse {
        result: SUCCESS,
        files,
    }))
}

async fn get_note(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<FilenameRequest>,
) -> ApiResult<TextResponse> {
    let text = state.store.read(&request.filename)?;
    Ok(Json(TextResponse {
        result: SUCCESS,
        text,
    }))
}

async fn store(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<StoreRequest>,
) -> ApiResult<StoreResponse> {
    let db = state.db()?;
    let revision = store_note(&state.store, &db, &request.filename, &request.text)?;
    Ok(Json(StoreResponse {
        result: SUCCESS,
        chars: revision.chars(),
        timestamp: revision.timestamp,
    }))
}

async fn full_path(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<FilenameRequest>,
) -> Json<PathResponse> {
    Json(PathResponse {
        path: state.store.full_path(&request.filename).display().to_string(),
    })
}

async fn create(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CreateRequest>,
) -> ApiResult<CreateResponse> {
    let new_note = NewNote {
        filename: request.filename,
        tags: Tags {
            keywords: word_list(&request.keywords),
            present: word_list(&request.present),
            speakers: word_list(&request.speakers),
        },
    };
    let created = create_note(&state.store, &new_note)?;
    Ok(Json(CreateResponse {
        result: SUCCESS,
        filename: created.filename,
        chars: created.chars,
    }))
}

async fn history(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<FilenameRequest>,
) -> ApiResult<HistoryResponse> {
    let revisions = state
        .db()?
        .history(&request.filename)?
        .into_iter()
        .map(|r| RevisionSummary {
            chars: r.chars(),
            timestamp: r.timestamp,
        })
        .collect();
    Ok(Json(HistoryResponse {
        result: SUCCESS,
        revisions,
    }))
}

async fn revision(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RevisionRequest>,
) -> ApiResult<TextResponse> {
    let revision = state
        .db()?
        .revision(&request.filename, &request.timestamp)?
        .ok_or_else(|| {
            NotedError::not_found(format!("{} at {}", request.filename, request.timestamp))
        })?;
    Ok(Json(TextResponse {
        result: SUCCESS,
        text: revision.text,
    }))
}

async fn count(State(state): State<AppState>) -> ApiResult<CountResponse> {
    let count = state.db()?.count()?;
    Ok(Json(CountResponse {
        result: SUCCESS,
        count,
    }))
}

async fn today() -> Json<DateResponse> {
    Json(DateResponse {
        date: chrono::Local::now().format("%Y%m%d").to_string(),
    })
}

async fn current_time() -> Json<TimeResponse> {
    Json(TimeResponse {
        time: chrono::Local::now().format("%a %b %e %H:%M:%S %Y").to_string(),
    })
}

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let static_path = state.config.static_path().map(|p| p.to_path_buf());

    let router = Router::new()
        .route("/", get(home))
        .route("/home", get(home))
        .route("/about", get(about))
        .route("/editor", get(editor))
        .route("/terminate", get(terminate))
        .route("/api/list", get(list_notes))
        .route("/api/updateDatabase", get(update_db))
        .route("/api/count", get(count))
        .route("/api/date", get(today))
        .route("/api/time", get(current_time))
        .route("/api/stem", post(find_stem))
        .route("/api/findFiles", post(find_files))
        .route("/api/findFilesInDatabase", post(find_in_database))
        .route("/api/findFilesByKey", post(find_by_key))
        .route("/api/search", post(search))
        .route("/api/get", post(get_note))
        .route("/api/store", post(store))
        .route("/api/fullPath", post(full_path))
        .route("/api/create", post(create))
        .route("/api/history", post(history))
        .route("/api/revision", post(revision));

    let router = match static_path {
        Some(path) => {
            tracing::debug!("Serving static files from {}", path.display());
            router.nest_service("/static", ServeDir::new(path))
        }
        None => router,
    };

    router.with_state(state)
}

/// Serve on localhost until `/terminate` is requested or Ctrl-C is received
pub async fn start_server(
    state: AppState,
    shutdown: oneshot::Receiver<()>,
    port: u16,
) -> NotedResult<()> {
    let router = create_router(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    tracing::info!("Starting noted server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| NotedError::Network(e.to_string()))?;

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            tokio::select! {
                _ = shutdown => tracing::info!("Shutdown requested"),
                _ = tokio::signal::ctrl_c() => tracing::info!("Interrupted, shutting down"),
            }
        })
        .await
        .map_err(|e| NotedError::Network(e.to_string()))?;

    Ok(())
}
