//! Mapping of domain errors onto HTTP responses.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::{debug, warn};

use crate::error::{ExportError, LobbyError, SessionError, StoreError};
use crate::observability::metrics;

/// Error returned by API handlers.
///
/// Renders as `{"error": "<message>"}`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Request body or parameters are unusable
    #[error("invalid request: {0}")]
    BadRequest(String),

    /// Requested document or session does not exist
    #[error("{0}")]
    NotFound(String),

    /// Session creation failed
    #[error(transparent)]
    Lobby(#[from] LobbyError),

    /// Session service failed
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Artifact store failed
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Export could not be assembled
    #[error(transparent)]
    Export(#[from] ExportError),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl ApiError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Lobby(e) => lobby_status(e),
            Self::Session(e) => session_status(e),
            Self::Store(e) => store_status(e),
            Self::Export(e) => match e {
                ExportError::NotFound { .. } => StatusCode::NOT_FOUND,
                ExportError::Malformed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
                ExportError::Store(e) => store_status(e),
            },
        }
    }

    const fn category(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "request",
            Self::NotFound(_) => "not_found",
            Self::Lobby(_) | Self::Session(_) => "lobby",
            Self::Store(_) => "store",
            Self::Export(_) => "export",
        }
    }
}

const fn lobby_status(error: &LobbyError) -> StatusCode {
    match error {
        LobbyError::InvalidPlayerCount(_) => StatusCode::BAD_REQUEST,
        LobbyError::PartialEnrollment { source, .. } | LobbyError::Session(source) => {
            session_status(source)
        }
        LobbyError::Store(e) => store_status(e),
    }
}

const fn session_status(error: &SessionError) -> StatusCode {
    match error {
        SessionError::MissingPlayerName { .. } => StatusCode::BAD_REQUEST,
        SessionError::Store(e) => store_status(e),
        SessionError::Network(_)
        | SessionError::HttpStatus { .. }
        | SessionError::InvalidResponse(_)
        | SessionError::Timeout(_) => StatusCode::BAD_GATEWAY,
    }
}

const fn store_status(error: &StoreError) -> StatusCode {
    match error {
        StoreError::InvalidKey(_) => StatusCode::BAD_REQUEST,
        StoreError::Io(_) | StoreError::Json(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!(%status, error = %self, "request failed");
            metrics::record_error(self.category());
        } else {
            debug!(%status, error = %self, "request rejected");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
