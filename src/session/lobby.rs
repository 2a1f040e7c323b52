//! HTTP client for the game server's lobby API.
//!
//! Session creation and enrollment go through the lobby endpoints. The
//! engine state itself is not exposed by the lobby; the game server persists
//! it in the shared artifact store, so [`LobbyClient`] reads it from there.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{StatusCode, Url, redirect};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Credential, Result, Session, SessionId, SessionService};
use crate::error::SessionError;
use crate::model::{GameState, PlayerMetadata, SessionMetadata, StoredState};
use crate::store::{ArtifactStore, StoreKey};

/// Default per-request timeout (10 s).
pub const DEFAULT_LOBBY_TIMEOUT_MS: u64 = 10_000;

/// Connection settings for the lobby API.
#[derive(Debug, Clone)]
pub struct LobbyConfig {
    /// Base URL of the lobby, e.g. `http://localhost:8002`.
    pub base_url: Url,
    /// Per-request timeout.
    pub timeout: Duration,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateBody {
    num_players: usize,
}

#[derive(Deserialize)]
struct CreateResponse {
    #[serde(rename = "gameID")]
    game_id: String,
}

#[derive(Serialize)]
struct JoinBody<'a> {
    #[serde(rename = "playerID")]
    player_id: usize,
    #[serde(rename = "playerName")]
    player_name: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct JoinResponse {
    player_credentials: String,
}

#[derive(Deserialize)]
struct RoomResponse {
    #[serde(default)]
    players: Vec<PlayerMetadata>,
}

/// [`SessionService`] implementation over the lobby HTTP API.
///
/// Redirects are never followed.
pub struct LobbyClient {
    http: reqwest::Client,
    config: LobbyConfig,
    store: Arc<dyn ArtifactStore>,
}

impl LobbyClient {
    /// Creates a client for the lobby at `config.base_url`, reading engine
    /// state from `store`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Network`] if the HTTP client cannot be built.
    pub fn new(config: LobbyConfig, store: Arc<dyn ArtifactStore>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .redirect(redirect::Policy::none())
            .build()
            .map_err(|e| SessionError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            config,
            store,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.config.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                SessionError::Network(format!(
                    "lobby URL {} cannot carry a path",
                    self.config.base_url
                ))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    #[allow(clippy::cast_possible_truncation)]
    fn timeout_ms(&self) -> u64 {
        self.config.timeout.as_millis() as u64
    }

    async fn execute(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        tokio::time::timeout(self.config.timeout, request.send())
            .await
            .map_err(|_| SessionError::Timeout(self.timeout_ms()))?
            .map_err(|e| SessionError::Network(e.to_string()))
    }

    async fn decode<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();
        let url = response.url().to_string();
        if !status.is_success() {
            return Err(SessionError::HttpStatus {
                status: status.as_u16(),
                url,
            });
        }

        let bytes = tokio::time::timeout(self.config.timeout, response.bytes())
            .await
            .map_err(|_| SessionError::Timeout(self.timeout_ms()))?
            .map_err(|e| SessionError::Network(e.to_string()))?;

        serde_json::from_slice(&bytes)
            .map_err(|e| SessionError::InvalidResponse(format!("{url}: {e}")))
    }

    async fn read_state(&self, game: &str, session: &str) -> Result<GameState> {
        let Some(document) = self.store.get(&StoreKey::state(game, session)).await? else {
            return Ok(GameState::default());
        };
        let stored: StoredState = serde_json::from_value(document)
            .map_err(|e| SessionError::InvalidResponse(format!("stored state: {e}")))?;
        Ok(stored.game)
    }
}

impl std::fmt::Debug for LobbyClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LobbyClient")
            .field("base_url", &self.config.base_url.as_str())
            .field("timeout", &self.config.timeout)
            .finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl SessionService for LobbyClient {
    async fn create_session(&self, game: &str, num_players: usize) -> Result<SessionId> {
        let url = self.endpoint(&["games", game, "create"])?;
        debug!(%url, num_players, "creating session");
        let response = self
            .execute(self.http.post(url).json(&CreateBody { num_players }))
            .await?;
        let created: CreateResponse = self.decode(response).await?;
        Ok(created.game_id)
    }

    async fn enroll_player(
        &self,
        game: &str,
        session: &str,
        index: usize,
        name: &str,
    ) -> Result<Credential> {
        let url = self.endpoint(&["games", game, session, "join"])?;
        debug!(%url, index, "enrolling player");
        let body = JoinBody {
            player_id: index,
            player_name: name,
        };
        let response = self.execute(self.http.post(url).json(&body)).await?;
        let joined: JoinResponse = self.decode(response).await?;
        Ok(Credential::new(joined.player_credentials))
    }

    async fn get_session_state(&self, game: &str, session: &str) -> Result<Option<Session>> {
        let url = self.endpoint(&["games", game, session])?;
        let response = self.execute(self.http.get(url)).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let room: RoomResponse = self.decode(response).await?;

        let players = room
            .players
            .into_iter()
            .enumerate()
            .map(|(position, player)| {
                let index = player
                    .id
                    .and_then(|id| usize::try_from(id).ok())
                    .unwrap_or(position);
                (index, player)
            })
            .collect();

        Ok(Some(Session {
            id: session.to_owned(),
            state: self.read_state(game, session).await?,
            metadata: SessionMetadata { players },
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use axum::Router;
    use axum::extract::{Path, State};
    use axum::http::StatusCode as AxumStatus;
    use axum::routing::{get, post};
    use serde_json::{Value, json};
    use std::sync::Mutex;
    use tokio::net::TcpListener;

    type Seen = Arc<Mutex<Vec<Value>>>;

    async fn spawn_lobby(router: Router) -> Url {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.ok();
        });
        Url::parse(&format!("http://{addr}/")).unwrap()
    }

    fn fake_lobby(seen: Seen) -> Router {
        Router::new()
            .route(
                "/games/{game}/create",
                post(
                    |State(seen): State<Seen>, axum::Json(body): axum::Json<Value>| async move {
                        seen.lock().unwrap().push(body);
                        axum::Json(json!({"gameID": "g-123"}))
                    },
                ),
            )
            .route(
                "/games/{game}/{id}/join",
                post(
                    |State(seen): State<Seen>,
                     Path((_game, id)): Path<(String, String)>,
                     axum::Json(body): axum::Json<Value>| async move {
                        seen.lock().unwrap().push(body.clone());
                        axum::Json(json!({"playerCredentials": format!("{id}-cred-{}", body["playerID"])}))
                    },
                ),
            )
            .route(
                "/games/{game}/{id}",
                get(|Path((_game, id)): Path<(String, String)>| async move {
                    if id == "missing" {
                        return Err(AxumStatus::NOT_FOUND);
                    }
                    Ok(axum::Json(json!({
                        "roomID": id,
                        "players": [{"id": 0, "name": "Alice"}, {"id": 1}]
                    })))
                }),
            )
            .with_state(seen)
    }

    fn client(base_url: Url, store: Arc<dyn ArtifactStore>) -> LobbyClient {
        LobbyClient::new(
            LobbyConfig {
                base_url,
                timeout: Duration::from_millis(DEFAULT_LOBBY_TIMEOUT_MS),
            },
            store,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn create_sends_num_players() {
        let seen = Seen::default();
        let url = spawn_lobby(fake_lobby(Arc::clone(&seen))).await;
        let lobby = client(url, Arc::new(MemoryStore::new()));

        let id = lobby.create_session("eop", 3).await.unwrap();
        assert_eq!(id, "g-123");
        assert_eq!(seen.lock().unwrap()[0], json!({"numPlayers": 3}));
    }

    #[tokio::test]
    async fn enroll_sends_index_and_name() {
        let seen = Seen::default();
        let url = spawn_lobby(fake_lobby(Arc::clone(&seen))).await;
        let lobby = client(url, Arc::new(MemoryStore::new()));

        let cred = lobby.enroll_player("eop", "g-123", 1, "Bob").await.unwrap();
        assert_eq!(cred.expose(), "g-123-cred-1");
        assert_eq!(
            seen.lock().unwrap()[0],
            json!({"playerID": 1, "playerName": "Bob"})
        );
    }

    #[tokio::test]
    async fn session_state_combines_room_and_store() {
        let url = spawn_lobby(fake_lobby(Seen::default())).await;
        let store = Arc::new(MemoryStore::new());
        store
            .set(
                &StoreKey::state("eop", "g-123"),
                json!({"G": {"identifiedThreats": {"0": {"c1": {}}}}}),
            )
            .await
            .unwrap();
        let lobby = client(url, store);

        let session = lobby.get_session_state("eop", "g-123").await.unwrap().unwrap();
        assert_eq!(session.id, "g-123");
        assert_eq!(session.metadata.player_name(0), Some("Alice"));
        assert_eq!(session.metadata.player_name(1), None);
        assert_eq!(session.state.identified_threats.len(), 1);
    }

    #[tokio::test]
    async fn unknown_session_is_none() {
        let url = spawn_lobby(fake_lobby(Seen::default())).await;
        let lobby = client(url, Arc::new(MemoryStore::new()));
        assert!(lobby.get_session_state("eop", "missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn missing_state_reads_as_empty() {
        let url = spawn_lobby(fake_lobby(Seen::default())).await;
        let lobby = client(url, Arc::new(MemoryStore::new()));
        let session = lobby.get_session_state("eop", "g-1").await.unwrap().unwrap();
        assert!(session.state.identified_threats.is_empty());
    }

    #[tokio::test]
    async fn non_success_status_is_error() {
        let router = Router::new().route(
            "/games/{game}/create",
            post(|| async { (AxumStatus::SERVICE_UNAVAILABLE, "down") }),
        );
        let url = spawn_lobby(router).await;
        let lobby = client(url, Arc::new(MemoryStore::new()));

        let err = lobby.create_session("eop", 2).await.unwrap_err();
        assert!(matches!(err, SessionError::HttpStatus { status: 503, .. }));
    }

    #[tokio::test]
    async fn unexpected_body_is_invalid_response() {
        let router = Router::new().route(
            "/games/{game}/create",
            post(|| async { axum::Json(json!({"id": "nope"})) }),
        );
        let url = spawn_lobby(router).await;
        let lobby = client(url, Arc::new(MemoryStore::new()));

        let err = lobby.create_session("eop", 2).await.unwrap_err();
        assert!(matches!(err, SessionError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn slow_lobby_times_out() {
        let router = Router::new().route(
            "/games/{game}/create",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                axum::Json(json!({"gameID": "late"}))
            }),
        );
        let url = spawn_lobby(router).await;
        let lobby = LobbyClient::new(
            LobbyConfig {
                base_url: url,
                timeout: Duration::from_millis(50),
            },
            Arc::new(MemoryStore::new()),
        )
        .unwrap();

        let err = lobby.create_session("eop", 2).await.unwrap_err();
        assert!(matches!(err, SessionError::Timeout(50)));
    }

    #[tokio::test]
    async fn connection_refused_is_network_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let url = Url::parse(&format!("http://{addr}")).unwrap();
        let lobby = client(url, Arc::new(MemoryStore::new()));

        let err = lobby.create_session("eop", 2).await.unwrap_err();
        assert!(matches!(err, SessionError::Network(_)));
    }

    #[test]
    fn endpoint_joins_segments_under_base_path() {
        let lobby = client(
            Url::parse("http://lobby.local/api/").unwrap(),
            Arc::new(MemoryStore::new()),
        );
        let url = lobby.endpoint(&["games", "eop", "a b", "join"]).unwrap();
        assert_eq!(url.as_str(), "http://lobby.local/api/games/eop/a%20b/join");
    }
}
