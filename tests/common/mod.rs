//! Shared integration-test harness: an in-process fake lobby, a spawned
//! `eop-api` server, and store seeding helpers.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path as UrlPath, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpListener;
use tokio::process::{Child, Command};

use eop_api::store::{ArtifactStore, FileStore, StoreKey};

/// Game name used throughout the integration tests.
pub const GAME: &str = "elevationOfPrivilege";

/// Timeout for server startup.
pub const STARTUP_TIMEOUT: Duration = Duration::from_secs(10);

// ============================================================================
// Fake lobby
// ============================================================================

#[derive(Default)]
struct LobbyState {
    next_id: usize,
    rooms: HashMap<String, Vec<Option<String>>>,
    joins: Vec<(String, usize, String)>,
    fail_join_at: Option<usize>,
}

/// In-process stand-in for the game server's lobby API.
#[derive(Clone, Default)]
pub struct FakeLobby {
    state: Arc<Mutex<LobbyState>>,
}

impl FakeLobby {
    /// Makes the join of `index` answer with HTTP 500.
    pub fn fail_join_at(&self, index: usize) {
        self.state.lock().unwrap().fail_join_at = Some(index);
    }

    /// Joins seen so far as `(session, index, name)`.
    pub fn joins(&self) -> Vec<(String, usize, String)> {
        self.state.lock().unwrap().joins.clone()
    }

    /// Serves the lobby on an ephemeral port and returns its base URL.
    pub async fn spawn(&self) -> String {
        let router = Router::new()
            .route("/games/{game}/create", post(create))
            .route("/games/{game}/{id}/join", post(join))
            .route("/games/{game}/{id}", get(room))
            .with_state(self.clone());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.ok();
        });
        format!("http://{addr}")
    }
}

async fn create(
    State(lobby): State<FakeLobby>,
    UrlPath(_game): UrlPath<String>,
    Json(body): Json<Value>,
) -> Response {
    let Some(players) = body["numPlayers"].as_u64() else {
        return StatusCode::BAD_REQUEST.into_response();
    };
    let mut state = lobby.state.lock().unwrap();
    state.next_id += 1;
    let id = format!("session-{}", state.next_id);
    state
        .rooms
        .insert(id.clone(), vec![None; usize::try_from(players).unwrap()]);
    Json(json!({ "gameID": id })).into_response()
}

async fn join(
    State(lobby): State<FakeLobby>,
    UrlPath((_game, id)): UrlPath<(String, String)>,
    Json(body): Json<Value>,
) -> Response {
    let index = usize::try_from(body["playerID"].as_u64().unwrap_or(u64::MAX)).unwrap();
    let name = body["playerName"].as_str().unwrap_or_default().to_owned();
    let mut state = lobby.state.lock().unwrap();
    if state.fail_join_at == Some(index) {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    let Some(seat) = state.rooms.get_mut(&id).and_then(|room| room.get_mut(index)) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    if seat.is_some() {
        return StatusCode::CONFLICT.into_response();
    }
    *seat = Some(name.clone());
    state.joins.push((id.clone(), index, name));
    Json(json!({ "playerCredentials": format!("cred-{id}-{index}") })).into_response()
}

async fn room(
    State(lobby): State<FakeLobby>,
    UrlPath((_game, id)): UrlPath<(String, String)>,
) -> Response {
    let state = lobby.state.lock().unwrap();
    let Some(seats) = state.rooms.get(&id) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    let players: Vec<Value> = seats
        .iter()
        .enumerate()
        .map(|(i, name)| match name {
            Some(name) => json!({ "id": i, "name": name }),
            None => json!({ "id": i }),
        })
        .collect();
    Json(json!({ "roomID": id, "players": players })).into_response()
}

// ============================================================================
// Game-side documents
// ============================================================================

/// A model with one diagram holding cells `c1` and `c2`.
pub fn demo_model() -> Value {
    json!({
        "summary": { "title": "Demo Model" },
        "detail": {
            "diagrams": [
                { "diagramJson": { "cells": [ { "id": "c1" }, { "id": "c2", "threats": [] } ] } }
            ]
        }
    })
}

/// Writes the engine state and metadata the game server would persist.
pub async fn seed_game(store: &dyn ArtifactStore, session: &str, identified: Value, names: &[&str]) {
    let players: serde_json::Map<String, Value> = names
        .iter()
        .enumerate()
        .map(|(i, name)| (i.to_string(), json!({ "id": i, "name": name })))
        .collect();
    store
        .set(
            &StoreKey::state(GAME, session),
            json!({ "G": { "identifiedThreats": identified }, "ctx": { "turn": 3 } }),
        )
        .await
        .unwrap();
    store
        .set(
            &StoreKey::metadata(GAME, session),
            json!({ "gameName": GAME, "players": players }),
        )
        .await
        .unwrap();
}

/// Same as [`seed_game`] against a file store rooted at `root`.
pub async fn seed_game_files(root: &Path, session: &str, identified: Value, names: &[&str]) {
    seed_game(&FileStore::new(root), session, identified, names).await;
}

// ============================================================================
// Spawned server
// ============================================================================

/// A running `eop-api serve` process.
///
/// The child process is killed on drop via `kill_on_drop(true)`.
pub struct EopServer {
    child: Child,
    pub base_url: String,
    pub client: reqwest::Client,
}

impl EopServer {
    /// Spawns `eop-api serve` on an ephemeral port with a file store at
    /// `data_dir`, reading stderr until the listening line reveals the port.
    pub async fn start(data_dir: &Path, lobby_url: &str) -> Self {
        let bin = env!("CARGO_BIN_EXE_eop-api");
        let mut child = Command::new(bin)
            .args([
                "-v",
                "--color",
                "never",
                "serve",
                "--bind",
                "127.0.0.1:0",
                "--lobby-url",
                lobby_url,
                "--data-dir",
                data_dir.to_str().expect("non-UTF-8 data dir"),
            ])
            .env_remove("EOP_LOG_LEVEL")
            .env_remove("EOP_CONFIG")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .expect("failed to spawn eop-api");

        let stderr = child.stderr.take().expect("stderr not captured");
        let mut reader = BufReader::new(stderr);
        let mut line = String::new();
        let mut port: Option<u16> = None;

        let deadline = tokio::time::Instant::now() + STARTUP_TIMEOUT;
        while tokio::time::Instant::now() < deadline {
            line.clear();
            let n = tokio::time::timeout(STARTUP_TIMEOUT, reader.read_line(&mut line))
                .await
                .expect("timed out waiting for server startup")
                .expect("failed to read stderr");
            assert!(n > 0, "server exited before printing listening address");

            if line.contains("API listening") {
                if let Some(start) = line.find("bound=127.0.0.1:") {
                    let after = &line[start + "bound=127.0.0.1:".len()..];
                    let digits: String = after.chars().take_while(char::is_ascii_digit).collect();
                    port = digits.parse().ok();
                }
                break;
            }
        }

        // Keep draining stderr so the child never blocks on a full pipe.
        tokio::spawn(async move {
            let mut sink = String::new();
            while reader.read_line(&mut sink).await.is_ok_and(|n| n > 0) {
                sink.clear();
            }
        });

        let port = port.expect("failed to discover API port from stderr");
        Self {
            child,
            base_url: format!("http://127.0.0.1:{port}"),
            client: reqwest::Client::new(),
        }
    }

    /// Absolute URL for `path`.
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Kills the server process.
    pub async fn stop(mut self) {
        self.child.kill().await.ok();
    }
}

/// Runs `eop-api` with `args` to completion.
pub fn run_command(args: &[&str]) -> std::process::Output {
    let bin = env!("CARGO_BIN_EXE_eop-api");
    std::process::Command::new(bin)
        .args(args)
        .env_remove("EOP_CONFIG")
        .env_remove("EOP_DATA_DIR")
        .output()
        .expect("failed to run eop-api")
}
