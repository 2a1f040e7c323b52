//! Artifact store abstraction.
//!
//! Documents are arbitrary JSON values addressed by a composite
//! [`StoreKey`] of game name, session id and [`DocumentKind`]. The game
//! server and this API share the same store, so the canonical string form
//! follows the game server's key convention.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use std::fmt;

use serde_json::Value;

use crate::error::StoreError;

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Kind of document stored per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    /// Game state owned by the game engine.
    State,
    /// Session metadata (players, names).
    Metadata,
    /// The design artifact attached at creation.
    Model,
}

impl DocumentKind {
    /// Returns the lowercase name of this kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::State => "state",
            Self::Metadata => "metadata",
            Self::Model => "model",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Composite identity of a stored document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StoreKey {
    /// Game name, e.g. `elevationOfPrivilege`.
    pub game: String,
    /// Session identifier.
    pub session: String,
    /// Document kind.
    pub kind: DocumentKind,
}

impl StoreKey {
    /// Creates a key.
    #[must_use]
    pub fn new(game: impl Into<String>, session: impl Into<String>, kind: DocumentKind) -> Self {
        Self {
            game: game.into(),
            session: session.into(),
            kind,
        }
    }

    /// Key of the engine state document.
    #[must_use]
    pub fn state(game: &str, session: &str) -> Self {
        Self::new(game, session, DocumentKind::State)
    }

    /// Key of the session metadata document.
    #[must_use]
    pub fn metadata(game: &str, session: &str) -> Self {
        Self::new(game, session, DocumentKind::Metadata)
    }

    /// Key of the attached model document.
    #[must_use]
    pub fn model(game: &str, session: &str) -> Self {
        Self::new(game, session, DocumentKind::Model)
    }
}

/// Canonical string form.
///
/// State lives at `game:session`, the other kinds append `:kind`.
impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            DocumentKind::State => write!(f, "{}:{}", self.game, self.session),
            kind => write!(f, "{}:{}:{kind}", self.game, self.session),
        }
    }
}

/// Async key/value persistence for JSON documents.
///
/// Implementations must provide read-after-write consistency for a single
/// key. No cross-key transactions are assumed.
#[async_trait::async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Reads a document. Returns `Ok(None)` when the key is absent.
    async fn get(&self, key: &StoreKey) -> Result<Option<Value>>;

    /// Writes a document, replacing any previous value.
    async fn set(&self, key: &StoreKey, document: Value) -> Result<()>;
}
