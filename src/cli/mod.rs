//! Command-line interface
//!
//! Argument definitions and command handlers for the `eop-api` binary.

pub mod args;
pub mod commands;
