use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::FormData;
use crate::config::CacheConfig;

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache file {} could not be written: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cache entry could not be encoded: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry {
    /// Milliseconds since the Unix epoch.
    timestamp: i64,
    data: FormData,
}

/// Time-boxed local copy of `get_form_data`, stored as one JSON file.
#[derive(Debug, Clone)]
pub struct FormDataCache {
    path: PathBuf,
    ttl: Duration,
}

impl FormDataCache {
    pub fn new(path: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            path: path.into(),
            ttl,
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.path.clone(), config.ttl)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Option<FormData> {
        self.load_at(Utc::now())
    }

    /// Returns the cached tables when fresh. Expired or unreadable entries
    /// are removed.
    pub fn load_at(&self, now: DateTime<Utc>) -> Option<FormData> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "form data cache miss");
                return None;
            }
            Err(err) => {
                tracing::warn!(path = %self.path.display(), error = %err, "form data cache unreadable");
                self.discard();
                return None;
            }
        };

        let entry: CacheEntry = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(err) => {
                tracing::warn!(path = %self.path.display(), error = %err, "discarding corrupt form data cache");
                self.discard();
                return None;
            }
        };

        let age_ms = now.timestamp_millis().saturating_sub(entry.timestamp);
        let ttl_ms = i64::try_from(self.ttl.as_millis()).unwrap_or(i64::MAX);
        if age_ms >= ttl_ms {
            tracing::debug!(path = %self.path.display(), age_ms, "form data cache expired");
            self.discard();
            return None;
        }

        tracing::debug!(path = %self.path.display(), age_ms, "form data cache hit");
        Some(entry.data)
    }

    pub fn store(&self, data: &FormData) -> Result<(), CacheError> {
        self.store_at(data, Utc::now())
    }

    pub fn store_at(&self, data: &FormData, now: DateTime<Utc>) -> Result<(), CacheError> {
        let entry = CacheEntry {
            timestamp: now.timestamp_millis(),
            data: data.clone(),
        };
        let encoded = serde_json::to_string(&entry)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| CacheError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        fs::write(&self.path, encoded).map_err(|source| CacheError::Io {
            path: self.path.clone(),
            source,
        })
    }

    /// Drop the cached entry, e.g. after lookup tables were edited.
    pub fn invalidate(&self) -> Result<(), CacheError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(CacheError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }

    fn discard(&self) {
        if let Err(err) = self.invalidate() {
            tracing::warn!(error = %err, "failed to remove stale form data cache");
        }
    }
}
