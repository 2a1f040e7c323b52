//! Game-session service contract.
//!
//! The turn-based engine is an external service reached over its lobby API.
//! This module defines the slice of that API the rest of the crate relies
//! on ([`SessionService`]), the HTTP client for it ([`LobbyClient`]) and the
//! [`SessionOrchestrator`] that drives multi-player session creation.

pub mod lobby;
pub mod orchestrator;

pub use lobby::{LobbyClient, LobbyConfig};
pub use orchestrator::{CreateSession, CreatedSession, PlayerSummary, SessionOrchestrator};

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::SessionError;
use crate::model::{GameState, SessionMetadata};

/// Result type alias for session service operations.
pub type Result<T> = std::result::Result<T, SessionError>;

/// Opaque session identifier issued by the engine.
pub type SessionId = String;

/// Secret issued to a player at enrollment.
///
/// Serializes as the bare string; `Debug` never reveals the value.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credential(String);

impl Credential {
    /// Wraps a credential string.
    #[must_use]
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Exposes the secret, e.g. to hand it to the player.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// A session as seen by this API: engine state plus player metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    /// Session identifier.
    pub id: SessionId,
    /// Game state produced by play; read-only here.
    pub state: GameState,
    /// Enrolled players.
    pub metadata: SessionMetadata,
}

/// Contract of the external game-session service.
#[async_trait::async_trait]
pub trait SessionService: Send + Sync {
    /// Creates a session of `game` for `num_players` players.
    async fn create_session(&self, game: &str, num_players: usize) -> Result<SessionId>;

    /// Enrolls player `index` under `name` and returns its credential.
    async fn enroll_player(
        &self,
        game: &str,
        session: &str,
        index: usize,
        name: &str,
    ) -> Result<Credential>;

    /// Fetches a session. Returns `Ok(None)` if the engine does not know it.
    async fn get_session_state(&self, game: &str, session: &str) -> Result<Option<Session>>;
}
