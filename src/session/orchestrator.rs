//! Multi-player session creation.
//!
//! Creating a session is a short sequential chain: create the session,
//! enroll each player in index order, then persist the attached model.
//! Enrollment must stay sequential because the credential list is ordered
//! by call order. A failed enrollment aborts the chain; the session and any
//! earlier enrollments are left in place.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use super::{Credential, Session, SessionId, SessionService};
use crate::error::{LobbyError, SessionError, StoreError};
use crate::observability::metrics;
use crate::store::{ArtifactStore, StoreKey};

/// Request to create a session.
#[derive(Debug, Clone, Default)]
pub struct CreateSession {
    /// Number of players to enroll.
    pub players: usize,
    /// Display names by player index; extra names are ignored.
    pub names: Vec<String>,
    /// Design artifact to attach.
    pub model: Option<Value>,
}

/// Result of a successful creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedSession {
    /// New session identifier.
    pub session_id: SessionId,
    /// Credentials by player index.
    pub credentials: Vec<Credential>,
}

/// Public view of an enrolled player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayerSummary {
    /// Player index.
    pub id: usize,
    /// Display name, if enrolled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Drives session creation against a [`SessionService`] and an
/// [`ArtifactStore`].
#[derive(Clone)]
pub struct SessionOrchestrator {
    sessions: Arc<dyn SessionService>,
    store: Arc<dyn ArtifactStore>,
}

impl SessionOrchestrator {
    /// Creates an orchestrator over the given collaborators.
    #[must_use]
    pub fn new(sessions: Arc<dyn SessionService>, store: Arc<dyn ArtifactStore>) -> Self {
        Self { sessions, store }
    }

    /// Creates a session of `game`, enrolls `request.players` players and
    /// stores the attached model.
    ///
    /// # Errors
    ///
    /// - [`LobbyError::InvalidPlayerCount`] if `request.players` is zero.
    /// - [`LobbyError::Session`] if the session cannot be created.
    /// - [`LobbyError::PartialEnrollment`] if any enrollment fails,
    ///   including a missing name. Nothing is rolled back.
    /// - [`LobbyError::Store`] if the model cannot be stored.
    pub async fn create(
        &self,
        game: &str,
        request: CreateSession,
    ) -> Result<CreatedSession, LobbyError> {
        if request.players == 0 {
            return Err(LobbyError::InvalidPlayerCount(0));
        }

        let session_id = self.sessions.create_session(game, request.players).await?;
        debug!(game, session = %session_id, players = request.players, "session created");

        let mut credentials = Vec::with_capacity(request.players.min(request.names.len()));
        for index in 0..request.players {
            let credential = self
                .enroll(game, &session_id, index, request.names.get(index).map(String::as_str))
                .await
                .map_err(|source| LobbyError::PartialEnrollment {
                    session: session_id.clone(),
                    index,
                    enrolled: credentials.len(),
                    source,
                })?;
            credentials.push(credential);
            metrics::record_player_enrolled();
        }

        if let Some(model) = request.model {
            self.store
                .set(&StoreKey::model(game, &session_id), model)
                .await?;
            debug!(session = %session_id, "model stored");
        }

        metrics::record_session_created();
        info!(game, session = %session_id, players = credentials.len(), "session ready");

        Ok(CreatedSession {
            session_id,
            credentials,
        })
    }

    async fn enroll(
        &self,
        game: &str,
        session: &str,
        index: usize,
        name: Option<&str>,
    ) -> Result<Credential, SessionError> {
        let name = name.ok_or(SessionError::MissingPlayerName { index })?;
        self.sessions.enroll_player(game, session, index, name).await
    }

    /// Fetches a session from the session service.
    ///
    /// # Errors
    ///
    /// Propagates the session service error unchanged.
    pub async fn fetch_session_state(
        &self,
        game: &str,
        session: &str,
    ) -> Result<Option<Session>, SessionError> {
        self.sessions.get_session_state(game, session).await
    }

    /// Lists the players of a session, without credentials.
    ///
    /// # Errors
    ///
    /// Propagates the session service error unchanged.
    pub async fn fetch_players(
        &self,
        game: &str,
        session: &str,
    ) -> Result<Option<Vec<PlayerSummary>>, SessionError> {
        Ok(self
            .fetch_session_state(game, session)
            .await?
            .map(|session| {
                session
                    .metadata
                    .players
                    .into_iter()
                    .map(|(id, player)| PlayerSummary {
                        id,
                        name: player.name,
                    })
                    .collect()
            }))
    }

    /// Returns the model attached to a session, if any.
    ///
    /// # Errors
    ///
    /// Propagates the store error unchanged.
    pub async fn fetch_model(&self, game: &str, session: &str) -> Result<Option<Value>, StoreError> {
        self.store.get(&StoreKey::model(game, session)).await
    }
}

impl std::fmt::Debug for SessionOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionOrchestrator").finish_non_exhaustive()
    }
}
