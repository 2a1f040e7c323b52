//! Configuration loader
//!
//! Loading pipeline:
//! 1. Size check
//! 2. Environment variable expansion (pre-parse, on raw text)
//! 3. YAML parsing into [`AppConfig`]
//! 4. Validation

use std::path::{Path, PathBuf};

use reqwest::Url;

use crate::api::parse_bind_addr;
use crate::config::schema::AppConfig;
use crate::error::ConfigError;

/// Maximum configuration file size in bytes unless `EOP_MAX_CONFIG_SIZE`
/// says otherwise.
const DEFAULT_MAX_CONFIG_SIZE: usize = 1024 * 1024;

/// Result of loading a configuration file.
#[derive(Debug)]
pub struct LoadResult {
    /// The loaded and validated configuration.
    pub config: AppConfig,

    /// Warnings encountered during loading.
    pub warnings: Vec<LoadWarning>,
}

/// Warning during configuration loading.
#[derive(Debug, Clone)]
pub struct LoadWarning {
    /// Warning message.
    pub message: String,

    /// Location where the warning occurred.
    pub location: Option<String>,
}

/// Configuration loader.
#[derive(Debug)]
pub struct ConfigLoader {
    max_config_size: usize,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self {
            max_config_size: env_or("EOP_MAX_CONFIG_SIZE", DEFAULT_MAX_CONFIG_SIZE),
        }
    }
}

impl ConfigLoader {
    /// Creates a loader with a custom size limit.
    #[must_use]
    pub const fn with_max_size(max_config_size: usize) -> Self {
        Self { max_config_size }
    }

    /// Loads and validates a configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read or exceeds the size limit
    /// - A `${VAR:?message}` reference is unset
    /// - YAML parsing fails
    /// - Validation fails
    pub fn load(&self, path: &Path) -> Result<LoadResult, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::MissingFile {
                    path: path.to_path_buf(),
                }
            } else {
                ConfigError::ParseError {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                }
            }
        })?;

        self.load_from_str(&raw, path)
    }

    /// Loads and validates configuration text; `path` is used for messages.
    ///
    /// # Errors
    ///
    /// Same as [`load`](Self::load), minus the read failure.
    pub fn load_from_str(&self, raw: &str, path: &Path) -> Result<LoadResult, ConfigError> {
        if raw.len() > self.max_config_size {
            return Err(ConfigError::ParseError {
                path: path.to_path_buf(),
                message: format!(
                    "file is {} bytes, limit is {}",
                    raw.len(),
                    self.max_config_size
                ),
            });
        }

        let mut env_sub = EnvSubstitution::new();
        let substituted = env_sub.substitute(raw, path)?;

        let config = if substituted.trim().is_empty() {
            AppConfig::default()
        } else {
            serde_yaml::from_str(&substituted).map_err(|e| ConfigError::ParseError {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?
        };

        validate(&config)?;

        Ok(LoadResult {
            config,
            warnings: env_sub.warnings,
        })
    }
}

// ============================================================================
// Validation
// ============================================================================

/// Validates a configuration, whether loaded from a file or built from
/// defaults and CLI overrides.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidValue`] naming the first offending field.
pub fn validate(config: &AppConfig) -> Result<(), ConfigError> {
    parse_bind_addr(&config.api.bind).map_err(|_| ConfigError::InvalidValue {
        field: "api.bind".into(),
        value: config.api.bind.clone(),
        expected: "host:port, :port or port".into(),
    })?;

    if config.api.max_body_size == 0 {
        return Err(ConfigError::InvalidValue {
            field: "api.max_body_size".into(),
            value: "0".into(),
            expected: "a positive byte count".into(),
        });
    }

    lobby_url(&config.lobby.url)?;

    if config.lobby.timeout_ms == 0 {
        return Err(ConfigError::InvalidValue {
            field: "lobby.timeout_ms".into(),
            value: "0".into(),
            expected: "a positive number of milliseconds".into(),
        });
    }

    let name = &config.game.name;
    if name.is_empty() || name.contains([':', '/', '\\']) {
        return Err(ConfigError::InvalidValue {
            field: "game.name".into(),
            value: name.clone(),
            expected: "a non-empty name without ':' or path separators".into(),
        });
    }

    Ok(())
}

/// Parses the lobby base URL.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidValue`] unless the URL is absolute http(s).
pub fn lobby_url(raw: &str) -> Result<Url, ConfigError> {
    let invalid = || ConfigError::InvalidValue {
        field: "lobby.url".into(),
        value: raw.to_owned(),
        expected: "an absolute http(s) URL".into(),
    };
    let url = Url::parse(raw).map_err(|_| invalid())?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid());
    }
    Ok(url)
}

// ============================================================================
// Environment Variable Substitution
// ============================================================================

/// Pre-parse environment variable substitution.
///
/// Runs on raw YAML text before parsing so substituted values keep their
/// YAML type inference.
struct EnvSubstitution {
    warnings: Vec<LoadWarning>,
}

impl EnvSubstitution {
    const fn new() -> Self {
        Self {
            warnings: Vec::new(),
        }
    }

    /// Substitutes environment variables in raw YAML text.
    ///
    /// Supports:
    /// - `${VAR}` - expand to value (empty string if unset, with warning)
    /// - `${VAR:-default}` - expand to default if unset
    /// - `${VAR:?message}` - fail if unset
    /// - `$$` - literal `$`
    fn substitute(&mut self, raw_yaml: &str, source_path: &Path) -> Result<String, ConfigError> {
        let mut result = String::with_capacity(raw_yaml.len());
        let mut chars = raw_yaml.chars().peekable();

        while let Some(c) = chars.next() {
            if c != '$' {
                result.push(c);
                continue;
            }
            match chars.peek() {
                Some('$') => {
                    chars.next();
                    result.push('$');
                }
                Some('{') => {
                    chars.next();
                    let reference = read_var_ref(&mut chars, source_path)?;
                    match (std::env::var(&reference.name), reference.fallback) {
                        (Ok(value), _) => result.push_str(&value),
                        (Err(_), Fallback::Default(default)) => result.push_str(&default),
                        (Err(_), Fallback::Required(message)) => {
                            return Err(ConfigError::EnvVarNotSet {
                                var: reference.name,
                                message,
                            });
                        }
                        (Err(_), Fallback::Empty) => self.warnings.push(LoadWarning {
                            message: format!(
                                "environment variable '{}' is not set, using empty string",
                                reference.name
                            ),
                            location: Some(source_path.display().to_string()),
                        }),
                    }
                }
                _ => result.push(c),
            }
        }

        Ok(result)
    }
}

enum Fallback {
    Empty,
    Default(String),
    Required(String),
}

struct VarRef {
    name: String,
    fallback: Fallback,
}

/// Parses the inside of `${...}`; the opening brace is already consumed.
fn read_var_ref(
    chars: &mut std::iter::Peekable<std::str::Chars>,
    source_path: &Path,
) -> Result<VarRef, ConfigError> {
    let mut name = String::new();

    while let Some(c) = chars.next() {
        match c {
            '}' => {
                return Ok(VarRef {
                    name,
                    fallback: Fallback::Empty,
                });
            }
            ':' if chars.peek() == Some(&'-') => {
                chars.next();
                let default = read_until_close(chars, source_path)?;
                return Ok(VarRef {
                    name,
                    fallback: Fallback::Default(default),
                });
            }
            ':' if chars.peek() == Some(&'?') => {
                chars.next();
                let message = read_until_close(chars, source_path)?;
                return Ok(VarRef {
                    name,
                    fallback: Fallback::Required(message),
                });
            }
            _ => name.push(c),
        }
    }

    Err(unclosed(source_path, &name))
}

/// Reads up to the matching `}`, allowing nested braces.
fn read_until_close(
    chars: &mut std::iter::Peekable<std::str::Chars>,
    source_path: &Path,
) -> Result<String, ConfigError> {
    let mut value = String::new();
    let mut depth = 1;

    for c in chars.by_ref() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(value);
                }
            }
            _ => {}
        }
        value.push(c);
    }

    Err(unclosed(source_path, &value))
}

fn unclosed(source_path: &Path, fragment: &str) -> ConfigError {
    ConfigError::ParseError {
        path: PathBuf::from(source_path),
        message: format!("unclosed environment variable reference: ${{{fragment}"),
    }
}

/// Parses an environment variable with a default value.
fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

// ============================================================================
// Tests
// ============================================================================
