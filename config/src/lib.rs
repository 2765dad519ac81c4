//! Configuration loading for hubrun.
//!
//! Settings come from `~/.hubrun/config.toml` and the environment:
//!
//! ```toml
//! [runninghub]
//! api_key = "${RUNNINGHUB_API_KEY}"
//! base_url = "https://www.runninghub.ai"
//! request_timeout_secs = 30
//! poll_interval_ms = 2000
//! run_timeout_secs = 600
//! ```
//!
//! A missing file is not an error; every field has a default except the API
//! key. `RUNNINGHUB_API_KEY` in the environment overrides the file.

use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs};

use hubrun_types::ApiKey;
use serde::Deserialize;

/// Environment variable holding the RunningHub API key.
pub const API_KEY_ENV: &str = "RUNNINGHUB_API_KEY";

pub const DEFAULT_BASE_URL: &str = "https://www.runninghub.ai";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_POLL_INTERVAL_MS: u64 = 2_000;
const DEFAULT_RUN_TIMEOUT_SECS: u64 = 600;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
    #[error("no RunningHub API key: set RUNNINGHUB_API_KEY or [runninghub] api_key")]
    MissingApiKey,
}

impl ConfigError {
    pub fn path(&self) -> Option<&Path> {
        match self {
            ConfigError::Read { path, .. } | ConfigError::Parse { path, .. } => Some(path),
            ConfigError::Invalid { .. } | ConfigError::MissingApiKey => None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct HubrunConfig {
    pub runninghub: Option<RunningHubConfig>,
}

#[derive(Default, Deserialize)]
pub struct RunningHubConfig {
    /// May reference the environment as `${VAR}`.
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub poll_interval_ms: Option<u64>,
    pub run_timeout_secs: Option<u64>,
}

// Manual Debug impl to prevent leaking API keys in logs.
impl std::fmt::Debug for RunningHubConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let key = if self.api_key.is_some() { "[REDACTED]" } else { "None" };
        f.debug_struct("RunningHubConfig")
            .field("api_key", &key)
            .field("base_url", &self.base_url)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("poll_interval_ms", &self.poll_interval_ms)
            .field("run_timeout_secs", &self.run_timeout_secs)
            .finish()
    }
}

/// Fully resolved client settings.
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub api_key: ApiKey,
    pub base_url: String,
    pub request_timeout: Duration,
    pub poll_interval: Duration,
    pub run_timeout: Duration,
}

/// Replace every `${VAR}` with `lookup(VAR)`; unknown variables become empty.
///
/// An unclosed `${` is kept literally.
pub fn expand_vars_with(value: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("${") {
        let Some(end_rel) = rest[start + 2..].find('}') else {
            break;
        };
        out.push_str(&rest[..start]);
        let var = &rest[start + 2..start + 2 + end_rel];
        if !var.is_empty() {
            out.push_str(&lookup(var).unwrap_or_default());
        }
        rest = &rest[start + 2 + end_rel + 1..];
    }

    out.push_str(rest);
    out
}

impl HubrunConfig {
    /// Load from the default path. `Ok(None)` when there is no config file.
    pub fn load() -> Result<Option<Self>, ConfigError> {
        let Some(path) = config_path() else {
            return Ok(None);
        };
        if !path.exists() {
            return Ok(None);
        }
        Self::load_from(&path).map(Some)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!("Failed to read config at {:?}: {}", path, err);
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source: err,
                });
            }
        };
        warn_if_exposed(path);

        match toml::from_str(&content) {
            Ok(config) => Ok(config),
            Err(err) => {
                tracing::warn!("Failed to parse config at {:?}: {}", path, err);
                Err(ConfigError::Parse {
                    path: path.to_path_buf(),
                    source: err,
                })
            }
        }
    }

    #[must_use]
    pub fn path() -> Option<PathBuf> {
        config_path()
    }

    /// Resolve against the process environment.
    pub fn resolve(&self) -> Result<ClientSettings, ConfigError> {
        self.resolve_with(|var| env::var(var).ok())
    }

    /// Resolve with an explicit environment lookup.
    pub fn resolve_with(
        &self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<ClientSettings, ConfigError> {
        let section = self.runninghub.as_ref();
        let from_file = section.and_then(|s| s.api_key.as_deref());

        let api_key = lookup(API_KEY_ENV)
            .filter(|key| !key.trim().is_empty())
            .or_else(|| from_file.map(|raw| expand_vars_with(raw, &lookup)))
            .map(|key| ApiKey::new(key.trim()))
            .filter(|key| !key.is_empty())
            .ok_or(ConfigError::MissingApiKey)?;

        let base_url = section
            .and_then(|s| s.base_url.clone())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        if !(base_url.starts_with("https://") || base_url.starts_with("http://")) {
            return Err(ConfigError::Invalid {
                field: "base_url",
                reason: format!("{base_url:?} is not an http(s) URL"),
            });
        }

        let request_timeout_secs = positive(
            "request_timeout_secs",
            section.and_then(|s| s.request_timeout_secs),
            DEFAULT_REQUEST_TIMEOUT_SECS,
        )?;
        let poll_interval_ms = positive(
            "poll_interval_ms",
            section.and_then(|s| s.poll_interval_ms),
            DEFAULT_POLL_INTERVAL_MS,
        )?;
        let run_timeout_secs = positive(
            "run_timeout_secs",
            section.and_then(|s| s.run_timeout_secs),
            DEFAULT_RUN_TIMEOUT_SECS,
        )?;

        Ok(ClientSettings {
            api_key,
            base_url,
            request_timeout: Duration::from_secs(request_timeout_secs),
            poll_interval: Duration::from_millis(poll_interval_ms),
            run_timeout: Duration::from_secs(run_timeout_secs),
        })
    }
}

fn positive(field: &'static str, value: Option<u64>, default: u64) -> Result<u64, ConfigError> {
    match value {
        Some(0) => Err(ConfigError::Invalid {
            field,
            reason: "must be greater than zero".to_string(),
        }),
        Some(value) => Ok(value),
        None => Ok(default),
    }
}

/// The file may hold a literal API key; flag it when others can read it.
#[cfg(unix)]
fn warn_if_exposed(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    if let Ok(metadata) = fs::metadata(path) {
        let mode = metadata.permissions().mode() & 0o777;
        if mode & 0o077 != 0 {
            tracing::warn!(
                path = %path.display(),
                mode = %format!("{mode:o}"),
                "Config file is readable by other users. \
                 Consider chmod 600 or ${{ENV_VAR}} syntax for api_key."
            );
        }
    }
}

#[cfg(not(unix))]
fn warn_if_exposed(_path: &Path) {}

pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".hubrun").join("config.toml"))
}
