//! On-disk mirror of the quest session, read at mount and rewritten after
//! every applied transition.

use std::io;
use std::path::{Path, PathBuf};

use engine::storage::{read_text_if_exists, write_text_atomic};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::quest::{EmotionKind, QuestStage};

pub(crate) const SAVE_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct SessionCache {
    pub(crate) save_version: u32,
    pub(crate) session_id: Option<String>,
    pub(crate) display_name: String,
    pub(crate) current_stage: QuestStage,
    #[serde(default)]
    pub(crate) last_dialogue_lines: Vec<String>,
    /// Delivery is not implied by the stage once the player collects ahead
    /// of delivering, so it is kept explicitly.
    #[serde(default)]
    pub(crate) delivered_kinds: Vec<EmotionKind>,
}

impl SessionCache {
    pub(crate) fn fresh(display_name: &str) -> Self {
        Self {
            save_version: SAVE_VERSION,
            session_id: None,
            display_name: display_name.to_string(),
            current_stage: QuestStage::Intro,
            last_dialogue_lines: Vec::new(),
            delivered_kinds: Vec::new(),
        }
    }
}

#[derive(Debug, Error)]
pub(crate) enum SessionCacheError {
    #[error("read session cache '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("parse session cache '{path}'{location}: {source}")]
    Parse {
        path: PathBuf,
        location: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("session cache '{path}' has save_version {actual}, expected {expected}")]
    Version {
        path: PathBuf,
        expected: u32,
        actual: u32,
    },
    #[error("encode session cache: {source}")]
    Encode {
        #[source]
        source: serde_json::Error,
    },
    #[error("write session cache '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// `Ok(None)` when no session has been saved yet.
pub(crate) fn load_session_cache(path: &Path) -> Result<Option<SessionCache>, SessionCacheError> {
    let Some(raw) = read_text_if_exists(path).map_err(|source| SessionCacheError::Read {
        path: path.to_path_buf(),
        source,
    })?
    else {
        return Ok(None);
    };

    let cache = parse_session_cache(path, &raw)?;
    if cache.save_version != SAVE_VERSION {
        return Err(SessionCacheError::Version {
            path: path.to_path_buf(),
            expected: SAVE_VERSION,
            actual: cache.save_version,
        });
    }
    Ok(Some(cache))
}

fn parse_session_cache(path: &Path, raw: &str) -> Result<SessionCache, SessionCacheError> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    serde_path_to_error::deserialize::<_, SessionCache>(&mut deserializer).map_err(|error| {
        let location = error.path().to_string();
        let location = if location.is_empty() || location == "." {
            String::new()
        } else {
            format!(" at {location}")
        };
        SessionCacheError::Parse {
            path: path.to_path_buf(),
            location,
            source: error.into_inner(),
        }
    })
}

pub(crate) fn save_session_cache(path: &Path, cache: &SessionCache) -> Result<(), SessionCacheError> {
    let json = serde_json::to_string_pretty(cache)
        .map_err(|source| SessionCacheError::Encode { source })?;
    write_text_atomic(path, &json).map_err(|source| SessionCacheError::Write {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_then_load_preserves_session() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("session").join("rose_session.json");
        let cache = SessionCache {
            session_id: Some("abc".to_string()),
            current_stage: QuestStage::DeliverEnvy,
            last_dialogue_lines: vec!["Hello.".to_string()],
            delivered_kinds: vec![EmotionKind::Pride, EmotionKind::Envy],
            ..SessionCache::fresh("Ana")
        };

        save_session_cache(&path, &cache).expect("save");
        let loaded = load_session_cache(&path).expect("load").expect("present");
        assert_eq!(loaded, cache);
    }

    #[test]
    fn missing_file_loads_as_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        let loaded = load_session_cache(&dir.path().join("absent.json")).expect("load");
        assert!(loaded.is_none());
    }

    #[test]
    fn optional_fields_default_when_absent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("cache.json");
        std::fs::write(
            &path,
            r#"{"save_version":1,"session_id":null,"display_name":"guest","current_stage":"game_start"}"#,
        )
        .expect("write");
        let loaded = load_session_cache(&path).expect("load").expect("present");
        assert_eq!(loaded.current_stage, QuestStage::GameStart);
        assert!(loaded.last_dialogue_lines.is_empty());
        assert!(loaded.delivered_kinds.is_empty());
    }

    #[test]
    fn parse_error_names_the_failing_field() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("cache.json");
        std::fs::write(
            &path,
            r#"{"save_version":1,"session_id":"x","display_name":"guest","current_stage":"later"}"#,
        )
        .expect("write");
        let err = load_session_cache(&path).expect_err("bad stage");
        assert!(
            err.to_string().contains("at current_stage"),
            "unexpected error: {err}"
        );
    }

    #[test]
    fn unknown_version_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("cache.json");
        let cache = SessionCache {
            save_version: 99,
            ..SessionCache::fresh("guest")
        };
        save_session_cache(&path, &cache).expect("save");
        let err = load_session_cache(&path).expect_err("version");
        assert!(matches!(
            err,
            SessionCacheError::Version {
                expected: SAVE_VERSION,
                actual: 99,
                ..
            }
        ));
    }
}
