//! Configuration module
//!
//! Loads and validates the `eop-api` YAML configuration: API binding,
//! lobby connection, game name and storage backend.

pub mod loader;
pub mod schema;

pub use loader::{ConfigLoader, LoadResult, LoadWarning, lobby_url, validate};
pub use schema::*;
