//! `eop-api` - HTTP API for Elevation of Privilege threat-modeling sessions
//!
//! Creates game sessions on the game server's lobby, enrolls players,
//! keeps the design model attached to each session and, on download,
//! merges the threats identified during play back into that model.

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod model;
pub mod observability;
pub mod session;
pub mod store;
