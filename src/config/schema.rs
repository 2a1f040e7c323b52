//! Configuration schema.
//!
//! Every section is optional; absent values take the defaults below.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::session::lobby::DEFAULT_LOBBY_TIMEOUT_MS;

/// Default API bind address.
pub const DEFAULT_BIND: &str = "0.0.0.0:8001";

/// Default lobby base URL.
pub const DEFAULT_LOBBY_URL: &str = "http://localhost:8002";

/// Default game name.
pub const DEFAULT_GAME_NAME: &str = "elevationOfPrivilege";

/// Default maximum request body size in bytes (10 MB).
pub const DEFAULT_MAX_BODY_SIZE: usize = 10 * 1024 * 1024;

/// Default directory of the file store.
pub const DEFAULT_DATA_DIR: &str = "./db";

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// HTTP API settings.
    pub api: ApiConfig,
    /// Lobby connection settings.
    pub lobby: LobbySettings,
    /// Game settings.
    pub game: GameConfig,
    /// Storage backend.
    pub storage: StorageConfig,
}

/// HTTP API settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ApiConfig {
    /// Bind address, `host:port`, `:port` or `port`.
    pub bind: String,
    /// Maximum request body size in bytes.
    pub max_body_size: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_owned(),
            max_body_size: DEFAULT_MAX_BODY_SIZE,
        }
    }
}

/// Lobby connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LobbySettings {
    /// Base URL of the lobby API.
    pub url: String,
    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for LobbySettings {
    fn default() -> Self {
        Self {
            url: DEFAULT_LOBBY_URL.to_owned(),
            timeout_ms: DEFAULT_LOBBY_TIMEOUT_MS,
        }
    }
}

/// Game settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GameConfig {
    /// Game name used in lobby paths and store keys.
    pub name: String,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_GAME_NAME.to_owned(),
        }
    }
}

/// Storage backend kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// One JSON file per document.
    #[default]
    File,
    /// Process memory; lost on restart.
    Memory,
}

/// Storage settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    /// Backend kind.
    pub backend: StorageBackend,
    /// Root directory for the file backend.
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::File,
            path: PathBuf::from(DEFAULT_DATA_DIR),
        }
    }
}
