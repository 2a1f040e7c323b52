//! HTTP API
//!
//! Routes:
//! - `POST /create` creates a session, enrolls its players and stores the model
//! - `GET /model/{id}` returns the stored model
//! - `GET /download/{id}` returns the model with identified threats merged in
//! - `GET /players/{id}` lists the players of a session

pub mod error;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, Path, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

pub use error::ApiError;

use crate::error::ConfigError;
use crate::export::ExportAssembler;
use crate::observability::metrics;
use crate::session::{CreateSession, Credential, PlayerSummary, SessionOrchestrator};

/// Shared state of the API handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Game name used for every session.
    pub game: String,
    /// Session creation and lookup.
    pub orchestrator: SessionOrchestrator,
    /// Download assembly.
    pub exporter: ExportAssembler,
}

#[derive(Debug, Deserialize)]
struct CreateRequest {
    players: usize,
    #[serde(default)]
    names: Vec<String>,
    #[serde(default)]
    model: Option<Value>,
}

#[derive(Debug, Serialize)]
struct CreateResponse {
    game: String,
    credentials: Vec<Credential>,
}

#[derive(Debug, Serialize)]
struct PlayersResponse {
    players: Vec<PlayerSummary>,
}

/// Builds the API router.
pub fn router(state: Arc<AppState>, max_body_size: usize) -> Router {
    Router::new()
        .route("/create", post(handle_create))
        .route("/model/{id}", get(handle_model))
        .route("/download/{id}", get(handle_download))
        .route("/players/{id}", get(handle_players))
        .fallback(handle_unknown)
        .layer(DefaultBodyLimit::max(max_body_size))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Binds the API listener.
///
/// # Errors
///
/// Returns an I/O error if the address cannot be bound.
pub async fn bind(addr: SocketAddr) -> std::io::Result<(TcpListener, SocketAddr)> {
    let listener = TcpListener::bind(addr).await?;
    let bound = listener.local_addr()?;
    Ok((listener, bound))
}

/// Serves `app` on `listener` until `cancel` fires.
///
/// In-flight requests are allowed to finish.
///
/// # Errors
///
/// Returns an I/O error if the server fails.
pub async fn serve(
    listener: TcpListener,
    app: Router,
    cancel: CancellationToken,
) -> std::io::Result<()> {
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            cancel.cancelled().await;
        })
        .await?;
    debug!("API server shut down");
    Ok(())
}

/// Normalizes a bind address.
///
/// `:8080` and `8080` both bind all interfaces on port 8080.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidValue`] if the result is not a socket
/// address.
pub fn parse_bind_addr(input: &str) -> Result<SocketAddr, ConfigError> {
    let addr = if input.starts_with(':') {
        format!("0.0.0.0{input}")
    } else if input.parse::<u16>().is_ok() {
        format!("0.0.0.0:{input}")
    } else {
        input.to_string()
    };
    addr.parse::<SocketAddr>()
        .map_err(|e| ConfigError::InvalidValue {
            field: "api.bind".into(),
            value: input.to_string(),
            expected: format!("host:port, :port or port ({e})"),
        })
}

// ============================================================================
// Handlers
// ============================================================================

fn finish(route: &'static str, result: Result<Response, ApiError>) -> Response {
    let response = result.unwrap_or_else(IntoResponse::into_response);
    metrics::record_http_request(route, response.status().as_u16());
    response
}

async fn handle_create(
    State(state): State<Arc<AppState>>,
    body: Result<Json<CreateRequest>, JsonRejection>,
) -> Response {
    finish("create", create(&state, body).await)
}

async fn create(
    state: &AppState,
    body: Result<Json<CreateRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = body?;
    let created = state
        .orchestrator
        .create(
            &state.game,
            CreateSession {
                players: request.players,
                names: request.names,
                model: request.model,
            },
        )
        .await?;

    Ok(Json(CreateResponse {
        game: created.session_id,
        credentials: created.credentials,
    })
    .into_response())
}

async fn handle_model(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    finish("model", model(&state, &id).await)
}

async fn model(state: &AppState, id: &str) -> Result<Response, ApiError> {
    let model = state
        .orchestrator
        .fetch_model(&state.game, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("model not found for session {id}")))?;
    Ok(Json(model).into_response())
}

async fn handle_download(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    finish("download", download(&state, &id).await)
}

async fn download(state: &AppState, id: &str) -> Result<Response, ApiError> {
    let export = state.exporter.assemble(&state.game, id).await?;
    info!(session = id, filename = %export.filename, "serving download");

    let mut response = Json(export.document).into_response();
    response.headers_mut().insert(
        header::CONTENT_DISPOSITION,
        content_disposition(&export.filename),
    );
    Ok(response)
}

async fn handle_players(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    finish("players", players(&state, &id).await)
}

async fn players(state: &AppState, id: &str) -> Result<Response, ApiError> {
    let players = state
        .orchestrator
        .fetch_players(&state.game, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("session {id} not found")))?;
    Ok(Json(PlayersResponse { players }).into_response())
}

async fn handle_unknown() -> Response {
    let response = ApiError::NotFound("no such route".into()).into_response();
    metrics::record_http_request("", StatusCode::NOT_FOUND.as_u16());
    response
}

/// Builds an `attachment` disposition for `filename`.
///
/// Non-ASCII names get an ASCII `filename` with `?` substitutes plus an
/// RFC 5987 `filename*`.
fn content_disposition(filename: &str) -> HeaderValue {
    let value = if filename.is_ascii() {
        format!("attachment; filename=\"{filename}\"")
    } else {
        let fallback: String = filename
            .chars()
            .map(|c| if c.is_ascii() { c } else { '?' })
            .collect();
        format!(
            "attachment; filename=\"{fallback}\"; filename*=UTF-8''{}",
            percent_encode(filename)
        )
    };
    HeaderValue::from_str(&value).unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}

fn percent_encode(value: &str) -> String {
    use std::fmt::Write;

    let mut out = String::with_capacity(value.len() * 3);
    for byte in value.bytes() {
        if byte.is_ascii_alphanumeric() || b"!#$&+-.^_`|~".contains(&byte) {
            out.push(char::from(byte));
        } else {
            let _ = write!(out, "%{byte:02X}");
        }
    }
    out
}

// ============================================================================
// Tests
// ============================================================================
