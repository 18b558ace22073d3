//! Disk cache for raw API response bodies.
//!
//! Entries are addressed by a fingerprint of the request URL:
//!
//! ```text
//! ~/.cache/kaken/
//!   <sha256(url)>.cache
//! ```
//!
//! Every failure is absorbed: a broken or missing cache behaves like an
//! empty one and never fails a search.

use sha2::{Digest, Sha256};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::CacheConfig;

/// File suffix marking cache entries
pub const CACHE_FILE_SUFFIX: &str = ".cache";

/// File-backed response cache
#[derive(Debug, Clone)]
pub struct ResponseCache {
    /// Storage directory, `None` when caching is disabled
    dir: Option<PathBuf>,
}

impl ResponseCache {
    /// Create a cache from config
    pub fn from_config(config: &CacheConfig) -> Self {
        if config.enabled {
            Self::new(config.resolved_directory())
        } else {
            Self::disabled()
        }
    }

    /// Enabled cache rooted at `dir`; the directory is created on first write
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(dir.into()),
        }
    }

    /// Cache that never stores or returns anything
    pub fn disabled() -> Self {
        Self { dir: None }
    }

    /// Check if caching is enabled
    pub fn is_enabled(&self) -> bool {
        self.dir.is_some()
    }

    /// Fingerprint of a request URL: lower-case hex SHA-256
    pub fn key(url: &str) -> String {
        format!("{:x}", Sha256::digest(url.as_bytes()))
    }

    fn entry_path(dir: &Path, url: &str) -> PathBuf {
        dir.join(format!("{}{}", Self::key(url), CACHE_FILE_SUFFIX))
    }

    /// Read the stored body for `url`
    pub fn get(&self, url: &str) -> Option<Vec<u8>> {
        let dir = self.dir.as_ref()?;
        let path = Self::entry_path(dir, url);

        match fs::read(&path) {
            Ok(bytes) => {
                tracing::debug!("Cache HIT: {}", path.display());
                Some(bytes)
            }
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!("Failed to read cache entry {}: {}", path.display(), e);
                }
                tracing::debug!("Cache MISS: {}", path.display());
                None
            }
        }
    }

    /// Store `bytes` for `url`
    pub fn set(&self, url: &str, bytes: &[u8]) {
        let Some(dir) = self.dir.as_ref() else {
            return;
        };

        match Self::write_entry(dir, url, bytes) {
            Ok(path) => tracing::debug!("Cached response at {}", path.display()),
            Err(e) => tracing::warn!("Failed to cache response {}: {}", Self::key(url), e),
        }
    }

    /// Write through a temp file in the same directory, then rename over the entry
    fn write_entry(dir: &Path, url: &str, bytes: &[u8]) -> std::io::Result<PathBuf> {
        fs::create_dir_all(dir)?;
        let path = Self::entry_path(dir, url);

        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(bytes)?;
        tmp.flush()?;
        tmp.persist(&path).map_err(|e| e.error)?;
        Ok(path)
    }

    /// Remove every stored entry
    pub fn clear(&self) {
        let Some(dir) = self.dir.as_ref() else {
            return;
        };

        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!("Failed to list cache directory {}: {}", dir.display(), e);
                }
                return;
            }
        };

        let mut removed = 0usize;
        for entry in entries.flatten() {
            let path = entry.path();
            let is_entry = path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.ends_with(CACHE_FILE_SUFFIX));
            if !is_entry {
                continue;
            }
            match fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) => tracing::warn!("Failed to remove {}: {}", path.display(), e),
            }
        }
        tracing::info!("Cache cleared ({} entries)", removed);
    }
}
