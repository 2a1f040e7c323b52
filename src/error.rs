//! Error types for `eop-api`
//!
//! One enum per concern (configuration, storage, lobby, orchestration,
//! export), aggregated into [`EopError`] for the CLI and mapped to exit codes.

use std::path::PathBuf;
use thiserror::Error;

use crate::store::DocumentKind;

// ============================================================================
// Exit Codes
// ============================================================================

/// Exit codes for `eop-api` CLI operations.
pub struct ExitCode;

impl ExitCode {
    /// Successful execution
    pub const SUCCESS: i32 = 0;

    /// General error
    pub const ERROR: i32 = 1;

    /// Configuration error (invalid YAML, validation failure)
    pub const CONFIG_ERROR: i32 = 2;

    /// I/O error (file not found, permission denied)
    pub const IO_ERROR: i32 = 3;

    /// Lobby or session service error
    pub const SESSION_ERROR: i32 = 4;

    /// Storage or export error
    pub const STORE_ERROR: i32 = 5;

    /// Usage error (invalid arguments, missing required options)
    pub const USAGE_ERROR: i32 = 64;

    /// Interrupted by SIGINT (Ctrl+C)
    pub const INTERRUPTED: i32 = 130;

    /// Terminated by SIGTERM
    pub const TERMINATED: i32 = 143;
}

// ============================================================================
// Top-Level Error
// ============================================================================

/// Top-level error type for `eop-api` operations.
#[derive(Debug, Error)]
pub enum EopError {
    /// Configuration loading or validation error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Artifact store error
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Session service error
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Session creation error
    #[error(transparent)]
    Lobby(#[from] LobbyError),

    /// Export error
    #[error(transparent)]
    Export(#[from] ExportError),

    /// Invalid command-line usage
    #[error("usage error: {0}")]
    Usage(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl EopError {
    /// Returns the appropriate exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Json(_) => ExitCode::CONFIG_ERROR,
            Self::Session(_) | Self::Lobby(_) => ExitCode::SESSION_ERROR,
            Self::Store(_) | Self::Export(_) => ExitCode::STORE_ERROR,
            Self::Usage(_) => ExitCode::USAGE_ERROR,
            Self::Io(_) => ExitCode::IO_ERROR,
        }
    }
}

// ============================================================================
// Configuration Errors
// ============================================================================

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// YAML parsing failed
    #[error("parse error in {path}: {message}")]
    ParseError {
        /// Path to the configuration file
        path: PathBuf,
        /// Error message from the parser
        message: String,
    },

    /// Referenced configuration file not found
    #[error("file not found: {path}")]
    MissingFile {
        /// Path to the missing file
        path: PathBuf,
    },

    /// Field has an invalid value
    #[error("invalid value for '{field}': got '{value}', expected {expected}")]
    InvalidValue {
        /// Name of the field with invalid value
        field: String,
        /// The actual value provided
        value: String,
        /// Description of what was expected
        expected: String,
    },

    /// Environment variable referenced in configuration is not set
    #[error("environment variable '{var}' not set ({message})")]
    EnvVarNotSet {
        /// Name of the environment variable
        var: String,
        /// Message supplied with the `${VAR:?message}` form
        message: String,
    },
}

// ============================================================================
// Store Errors
// ============================================================================

/// Artifact store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Backend I/O failure
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored document could not be encoded or decoded
    #[error("store JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Key segment cannot be mapped onto the backend
    #[error("invalid store key: {0}")]
    InvalidKey(String),
}

// ============================================================================
// Session Service Errors
// ============================================================================

/// Errors raised by the external game-session service.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Connection or transport failure
    #[error("lobby request failed: {0}")]
    Network(String),

    /// Lobby answered with a non-success status
    #[error("lobby returned HTTP {status} for {url}")]
    HttpStatus {
        /// HTTP status code
        status: u16,
        /// Request URL
        url: String,
    },

    /// Lobby response body did not have the expected shape
    #[error("invalid lobby response: {0}")]
    InvalidResponse(String),

    /// Request exceeded the configured timeout
    #[error("lobby request timed out after {0} ms")]
    Timeout(u64),

    /// No display name was supplied for a player slot
    #[error("no name supplied for player {index}")]
    MissingPlayerName {
        /// Player index without a name
        index: usize,
    },

    /// Shared store failure while reading session state
    #[error(transparent)]
    Store(#[from] StoreError),
}

// ============================================================================
// Orchestrator Errors
// ============================================================================

/// Errors raised while creating a session and enrolling its players.
#[derive(Debug, Error)]
pub enum LobbyError {
    /// Requested player count is not allowed
    #[error("invalid player count {0}: at least one player is required")]
    InvalidPlayerCount(usize),

    /// Enrollment failed part-way; earlier enrollments are not rolled back
    #[error("enrollment of player {index} in session {session} failed after {enrolled} player(s) joined: {source}")]
    PartialEnrollment {
        /// Session that was left partially populated
        session: String,
        /// Index of the player whose enrollment failed
        index: usize,
        /// Number of players enrolled before the failure
        enrolled: usize,
        /// Underlying failure
        #[source]
        source: SessionError,
    },

    /// Session service failure outside enrollment
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Model could not be persisted
    #[error(transparent)]
    Store(#[from] StoreError),
}

// ============================================================================
// Export Errors
// ============================================================================

/// Errors raised while assembling a download.
#[derive(Debug, Error)]
pub enum ExportError {
    /// A document required for export is absent
    #[error("{kind} not found for session {session}")]
    NotFound {
        /// Which document is missing
        kind: DocumentKind,
        /// Session identifier
        session: String,
    },

    /// A stored document could not be decoded
    #[error("malformed {kind} document for session {session}: {message}")]
    Malformed {
        /// Which document failed to decode
        kind: DocumentKind,
        /// Session identifier
        session: String,
        /// Decoder message
        message: String,
    },

    /// Store failure
    #[error(transparent)]
    Store(#[from] StoreError),
}

// ============================================================================
// Result Type Alias
// ============================================================================

/// Result type alias for `eop-api` operations.
pub type Result<T> = std::result::Result<T, EopError>;

// ============================================================================
// Tests
// ============================================================================
