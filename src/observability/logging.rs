//! Logging setup for the `eop-api` binary.
//!
//! Everything goes to stderr so `export` can print the written path on
//! stdout. Verbosity raises this crate's level first; dependencies (hyper,
//! reqwest) stay at `warn` until `-vv`, where request spans from
//! `tower_http` are enabled as well.

use std::io::IsTerminal;

use tracing_subscriber::EnvFilter;

use crate::cli::args::{ColorChoice, LogFormat};

/// Environment variable holding a full `EnvFilter` directive; replaces the
/// `-v` derived filter when set.
pub const LOG_LEVEL_ENV: &str = "EOP_LOG_LEVEL";

/// Filter directive for a `-v` count.
#[must_use]
pub const fn directive_for(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "warn,eop_api=info",
        2 => "info,eop_api=debug,tower_http=debug",
        _ => "trace",
    }
}

/// Whether stderr output should carry ANSI colors.
fn ansi_enabled(color: ColorChoice) -> bool {
    match color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => {
            std::env::var_os("NO_COLOR").is_none() && std::io::stderr().is_terminal()
        }
    }
}

/// Installs the global subscriber.
///
/// A second call is a no-op (`try_init`), which the unit tests rely on.
pub fn init_logging(format: LogFormat, verbosity: u8, color: ColorChoice) {
    let filter = EnvFilter::try_from_env(LOG_LEVEL_ENV)
        .unwrap_or_else(|_| EnvFilter::new(directive_for(verbosity)));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbosity >= 2);

    let _ = match format {
        LogFormat::Human => builder.with_ansi(ansi_enabled(color)).try_init(),
        // One flat object per event.
        LogFormat::Json => builder
            .json()
            .flatten_event(true)
            .with_current_span(false)
            .try_init(),
    };
}
