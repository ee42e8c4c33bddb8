//! Application configuration.
//!
//! Loaded from a TOML file, with environment variable interpolation using
//! `${VAR_NAME}` syntax.
//!
//! # Example
//!
//! ```toml
//! [server]
//! host = "0.0.0.0"
//! port = 8080
//!
//! [store]
//! type = "sqlite"
//! path = "${DATA_DIR}/idp-configs.db"
//!
//! [observability.logging]
//! format = "json"
//! ```

mod observability;
mod server;
mod store;

use std::{path::Path, sync::LazyLock};

pub use observability::*;
use regex::Regex;
use serde::{Deserialize, Serialize};
pub use server::*;
pub use store::*;

/// Root configuration. Every section is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,

    /// Where IdP binding records are kept.
    #[serde(default)]
    pub store: StoreConfig,

    /// Logging configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    ///
    /// Environment variables in the format `${VAR_NAME}` are expanded.
    /// Missing variables cause an error.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(e, path.as_ref().to_path_buf()))?;

        Self::from_str(&contents)
    }

    /// Parse configuration from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(contents: &str) -> Result<Self, ConfigError> {
        let expanded = expand_env_vars(contents)?;

        // Catch store types this build cannot serve before serde reports an
        // opaque "unknown variant".
        let raw: toml::Value = toml::from_str(&expanded)?;
        check_disabled_features(&raw)?;

        let config: AppConfig = toml::from_str(&expanded)?;
        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.store.validate()?;
        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {1}: {0}")]
    Io(std::io::Error, std::path::PathBuf),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),

    #[error("Configuration validation error: {0}")]
    Validation(String),
}

fn check_disabled_features(raw: &toml::Value) -> Result<(), ConfigError> {
    let store_type = raw
        .get("store")
        .and_then(|v| v.get("type"))
        .and_then(|v| v.as_str());

    match store_type {
        #[cfg(not(feature = "database-sqlite"))]
        Some("sqlite") => Err(ConfigError::Validation(
            "store type 'sqlite' requires the 'database-sqlite' feature\n\n\
             Rebuild with: cargo build --features database-sqlite"
                .into(),
        )),
        _ => Ok(()),
    }
}

static ENV_VAR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("valid env var pattern"));

/// Expand environment variables in the format `${VAR_NAME}`.
/// Variables after a `#` on the same line are left as written.
fn expand_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut lines = Vec::new();
    for line in input.split('\n') {
        let comment_pos = line.find('#').unwrap_or(line.len());

        let mut expanded = String::with_capacity(line.len());
        let mut last_end = 0;
        for cap in ENV_VAR_PATTERN.captures_iter(&line[..comment_pos]) {
            let (Some(whole), Some(name)) = (cap.get(0), cap.get(1)) else {
                continue;
            };
            let value = std::env::var(name.as_str())
                .map_err(|_| ConfigError::EnvVarNotFound(name.as_str().to_string()))?;
            expanded.push_str(&line[last_end..whole.start()]);
            expanded.push_str(&value);
            last_end = whole.end();
        }
        expanded.push_str(&line[last_end..]);
        lines.push(expanded);
    }

    Ok(lines.join("\n"))
}
