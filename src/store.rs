//! Small persisted state files.
//!
//! * [`LaunchHistory`]: application id → launch counter, used only as a
//!   sort key by the launcher.
//! * [`PinStore`]: the ordered list of pinned dock application ids.
//!
//! Both are JSON, read once at startup and rewritten wholesale (write to a
//! sibling temp file, then rename) after every mutation.  A missing file is
//! an empty store.

use log::debug;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("json error in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

fn read_json<T: DeserializeOwned + Default>(path: &Path) -> Result<T, StoreError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("{} does not exist yet", path.display());
            return Ok(T::default());
        }
        Err(source) => {
            return Err(StoreError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    serde_json::from_str(&contents).map_err(|source| StoreError::Json {
        path: path.to_path_buf(),
        source,
    })
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let io_err = |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    let json = serde_json::to_string_pretty(value).map_err(|source| StoreError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json).map_err(io_err)?;
    std::fs::rename(&tmp, path).map_err(io_err)
}

/// How often each application was launched.
#[derive(Debug, Clone)]
pub struct LaunchHistory {
    path: PathBuf,
    counts: BTreeMap<String, u64>,
}

impl LaunchHistory {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let counts = read_json(&path)?;
        Ok(Self { path, counts })
    }

    /// An empty history that saves to `path`.
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            counts: BTreeMap::new(),
        }
    }

    pub fn count(&self, app_id: &str) -> u64 {
        self.counts.get(app_id).copied().unwrap_or(0)
    }

    /// Bump the counter for `app_id` and rewrite the file.
    pub fn record(&mut self, app_id: &str) -> Result<u64, StoreError> {
        let count = self.counts.entry(app_id.to_string()).or_insert(0);
        *count += 1;
        let count = *count;
        write_json(&self.path, &self.counts)?;
        Ok(count)
    }
}

/// Pinned dock application ids, in dock order.
#[derive(Debug, Clone)]
pub struct PinStore {
    path: PathBuf,
    ids: Vec<String>,
}

impl PinStore {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let ids = read_json(&path)?;
        Ok(Self { path, ids })
    }

    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ids: Vec::new(),
        }
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    /// Replace the list and rewrite the file.  Unchanged lists are not
    /// written.
    pub fn set(&mut self, ids: Vec<String>) -> Result<(), StoreError> {
        if ids == self.ids {
            return Ok(());
        }
        self.ids = ids;
        write_json(&self.path, &self.ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    static TEST_ID: AtomicU32 = AtomicU32::new(0);

    fn tmp_path(name: &str) -> PathBuf {
        let id = TEST_ID.fetch_add(1, Ordering::SeqCst);
        std::env::temp_dir()
            .join(format!("hyprpill-store-{}-{}", std::process::id(), id))
            .join(name)
    }

    #[test]
    fn missing_files_are_empty() {
        let h = LaunchHistory::load(tmp_path("history.json")).unwrap();
        assert_eq!(h.count("firefox"), 0);
        let p = PinStore::load(tmp_path("pins.json")).unwrap();
        assert!(p.ids().is_empty());
    }

    #[test]
    fn history_round_trips() {
        let path = tmp_path("history.json");
        let mut h = LaunchHistory::load(&path).unwrap();
        assert_eq!(h.record("firefox").unwrap(), 1);
        assert_eq!(h.record("firefox").unwrap(), 2);
        h.record("foot").unwrap();
        let reloaded = LaunchHistory::load(&path).unwrap();
        assert_eq!(reloaded.count("firefox"), 2);
        assert_eq!(reloaded.count("foot"), 1);
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn pins_round_trip_in_order() {
        let path = tmp_path("pins.json");
        let mut p = PinStore::load(&path).unwrap();
        let ids = vec!["foot".to_string(), "firefox".to_string(), "a b".to_string()];
        p.set(ids.clone()).unwrap();
        let reloaded = PinStore::load(&path).unwrap();
        assert_eq!(reloaded.ids(), ids.as_slice());
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let path = tmp_path("pins.json");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(PinStore::load(&path), Err(StoreError::Json { .. })));
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }
}
