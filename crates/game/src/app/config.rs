use std::path::PathBuf;
use std::time::Duration;

use engine::AppPaths;
use thiserror::Error;

const API_URL_ENV_VAR: &str = "ROSE_API_URL";
const PLAYER_NAME_ENV_VAR: &str = "ROSE_PLAYER_NAME";
const REQUEST_TIMEOUT_ENV_VAR: &str = "ROSE_REQUEST_TIMEOUT_MS";
const SESSION_FILE_ENV_VAR: &str = "ROSE_SESSION_FILE";

const DEFAULT_PLAYER_NAME: &str = "guest";
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 5000;

#[derive(Debug, Error)]
pub(crate) enum ConfigError {
    #[error("{var} must be a positive number of milliseconds, got '{value}'")]
    InvalidTimeout { var: &'static str, value: String },
    #[error("{var} must start with http:// or https://, got '{value}'")]
    InvalidApiUrl { var: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct GameConfig {
    /// `None` runs fully offline.
    pub(crate) api_base_url: Option<String>,
    pub(crate) player_name: String,
    pub(crate) request_timeout: Duration,
    pub(crate) session_file: PathBuf,
}

impl GameConfig {
    pub(crate) fn from_env(paths: &AppPaths) -> Result<Self, ConfigError> {
        Self::from_lookup(paths, |var| std::env::var(var).ok())
    }

    pub(crate) fn from_lookup(
        paths: &AppPaths,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let non_empty = |var: &str| {
            lookup(var)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let api_base_url = match non_empty(API_URL_ENV_VAR) {
            Some(url) if url.starts_with("http://") || url.starts_with("https://") => Some(url),
            Some(value) => {
                return Err(ConfigError::InvalidApiUrl {
                    var: API_URL_ENV_VAR,
                    value,
                })
            }
            None => None,
        };

        let request_timeout_ms = match non_empty(REQUEST_TIMEOUT_ENV_VAR) {
            Some(value) => match value.parse::<u64>() {
                Ok(ms) if ms > 0 => ms,
                _ => {
                    return Err(ConfigError::InvalidTimeout {
                        var: REQUEST_TIMEOUT_ENV_VAR,
                        value,
                    })
                }
            },
            None => DEFAULT_REQUEST_TIMEOUT_MS,
        };

        let session_file = non_empty(SESSION_FILE_ENV_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|| paths.cache_dir.join("session").join("rose_session.json"));

        Ok(Self {
            api_base_url,
            player_name: non_empty(PLAYER_NAME_ENV_VAR)
                .unwrap_or_else(|| DEFAULT_PLAYER_NAME.to_string()),
            request_timeout: Duration::from_millis(request_timeout_ms),
            session_file,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn paths() -> AppPaths {
        let root = PathBuf::from("/game");
        AppPaths {
            assets_dir: root.join("assets"),
            cache_dir: root.join("cache"),
            root,
        }
    }

    fn config_with(vars: &[(&str, &str)]) -> Result<GameConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        GameConfig::from_lookup(&paths(), |var| vars.get(var).cloned())
    }

    #[test]
    fn defaults_run_offline_as_guest() {
        let config = config_with(&[]).expect("config");
        assert_eq!(config.api_base_url, None);
        assert_eq!(config.player_name, "guest");
        assert_eq!(config.request_timeout, Duration::from_millis(5000));
        assert_eq!(
            config.session_file,
            PathBuf::from("/game/cache/session/rose_session.json")
        );
    }

    #[test]
    fn reads_overrides_and_ignores_blank_values() {
        let config = config_with(&[
            ("ROSE_API_URL", " https://quest.example/api "),
            ("ROSE_PLAYER_NAME", "Ana"),
            ("ROSE_REQUEST_TIMEOUT_MS", "1500"),
            ("ROSE_SESSION_FILE", "   "),
        ])
        .expect("config");
        assert_eq!(config.api_base_url.as_deref(), Some("https://quest.example/api"));
        assert_eq!(config.player_name, "Ana");
        assert_eq!(config.request_timeout, Duration::from_millis(1500));
        assert!(config.session_file.ends_with("rose_session.json"));
    }

    #[test]
    fn rejects_bad_timeout_and_url() {
        assert!(matches!(
            config_with(&[("ROSE_REQUEST_TIMEOUT_MS", "0")]),
            Err(ConfigError::InvalidTimeout { .. })
        ));
        assert!(matches!(
            config_with(&[("ROSE_REQUEST_TIMEOUT_MS", "soon")]),
            Err(ConfigError::InvalidTimeout { .. })
        ));
        assert!(matches!(
            config_with(&[("ROSE_API_URL", "quest.example")]),
            Err(ConfigError::InvalidApiUrl { .. })
        ));
    }
}
