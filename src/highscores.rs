//! Persist the best score to disk (XDG config or ~/.config/stackertui).
//!
//! The file holds `key=value` lines so more counters can live next to `BestScore`.

use crate::game::{KeyValueStore, StoreError};
use std::collections::BTreeMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

const FILENAME: &str = "highscores";

/// Returns the path to the high scores file (config dir / stackertui / highscores).
pub fn config_path() -> PathBuf {
    let base = if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        if xdg.is_empty() {
            std::env::var("HOME")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("."))
                .join(".config")
        } else {
            PathBuf::from(xdg)
        }
    } else {
        std::env::var("HOME")
            .map(|h| PathBuf::from(h).join(".config"))
            .unwrap_or_else(|_| PathBuf::from("."))
    };
    base.join("stackertui").join(FILENAME)
}

/// One `key=value` line. Blank and `#` lines yield `None`.
fn parse_line(number: usize, line: &str) -> Result<Option<(String, i64)>, StoreError> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }
    trimmed
        .split_once('=')
        .and_then(|(k, v)| Some((k.trim(), v.trim().parse::<i64>().ok()?)))
        .filter(|(key, _)| !key.is_empty())
        .map(|(key, value)| Some((key.to_string(), value)))
        .ok_or_else(|| StoreError::Malformed {
            line: number,
            content: trimmed.to_string(),
        })
}

/// Entries of a score file. Bad lines are logged and skipped so one broken entry never
/// costs the others.
fn parse(content: &[u8]) -> BTreeMap<String, i64> {
    let mut values = BTreeMap::new();
    for (i, line) in String::from_utf8_lossy(content).lines().enumerate() {
        match parse_line(i + 1, line) {
            Ok(Some((key, value))) => {
                values.insert(key, value);
            }
            Ok(None) => {}
            Err(err) => tracing::warn!(%err, "skipping score file entry"),
        }
    }
    values
}

/// Best-score store backed by a `key=value` file. Writes go straight to disk.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    values: BTreeMap<String, i64>,
}

impl FileStore {
    /// Load `path`. A missing file is an empty store; an unreadable one is logged and
    /// treated as empty so a broken file never blocks a game.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let values = match Self::load(&path) {
            Ok(values) => values,
            Err(err) => {
                tracing::warn!(path = %path.display(), %err, "ignoring unreadable score file");
                BTreeMap::new()
            }
        };
        Self { path, values }
    }

    fn load(path: &Path) -> Result<BTreeMap<String, i64>, StoreError> {
        match fs::read(path) {
            Ok(content) => Ok(parse(&content)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(err) => Err(err.into()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Save to disk. Creates config directory if needed.
    fn save(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut f = fs::File::create(&self.path)?;
        for (key, value) in &self.values {
            writeln!(f, "{key}={value}")?;
        }
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get_int(&self, key: &str, default: i64) -> i64 {
        self.values.get(key).copied().unwrap_or(default)
    }

    fn set_int(&mut self, key: &str, value: i64) -> Result<(), StoreError> {
        self.values.insert(key.to_string(), value);
        self.save()
    }
}

/// In-memory store, used by tests and `--no-save` sessions.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    values: BTreeMap<String, i64>,
}

impl KeyValueStore for MemoryStore {
    fn get_int(&self, key: &str, default: i64) -> i64 {
        self.values.get(key).copied().unwrap_or(default)
    }

    fn set_int(&mut self, key: &str, value: i64) -> Result<(), StoreError> {
        self.values.insert(key.to_string(), value);
        Ok(())
    }
}
