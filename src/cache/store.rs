//! Disk-backed store for lookup results
//!
//! Provides a `DiskCache` that keeps every entry in one pretty-printed JSON
//! file and replaces that file atomically on each write.

use chrono::{DateTime, Duration, Utc};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::warn;

use crate::data::{IpKind, LookupResult};

/// Default time-to-live for cache entries in hours
pub const DEFAULT_TTL_HOURS: i64 = 24;

/// File name of the store inside the cache directory
const CACHE_FILE_NAME: &str = "ipinfo_cache.json";

/// Errors that can occur when writing the cache
#[derive(Debug, Error)]
pub enum CacheError {
    /// The cache directory could not be created
    #[error("failed to create cache directory {}: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The cache file could not be written or replaced
    #[error("failed to write cache file {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The entries could not be serialized
    #[error("failed to serialize cache: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Identifies a cached lookup: the address plus the family it was queried as
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(ip: &str, kind: IpKind) -> Self {
        Self(format!("{}:{}", kind.as_str(), ip.trim()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A cached lookup result and when it was fetched
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// The cached result
    pub payload: LookupResult,
    /// When the result was fetched from a provider
    pub fetched_at: DateTime<Utc>,
}

/// On-disk layout: cache key string to entry
type CacheFile = BTreeMap<String, CacheEntry>;

/// Reads and writes the lookup cache file
///
/// The store lives at `~/.cache/ipscope/ipinfo_cache.json` on Linux (or the
/// equivalent XDG path elsewhere) unless a path is given explicitly. Reads
/// never fail: a missing, unreadable, or corrupt file reads as empty.
#[derive(Debug, Clone)]
pub struct DiskCache {
    /// Location of the cache file
    path: PathBuf,
    /// Maximum age of a fresh entry
    ttl: Duration,
}

impl DiskCache {
    /// Creates a DiskCache in the XDG-compliant cache directory
    ///
    /// Returns `None` if the cache directory cannot be determined (e.g., no home directory).
    pub fn new() -> Option<Self> {
        let project_dirs = ProjectDirs::from("", "", "ipscope")?;
        let path = project_dirs.cache_dir().join(CACHE_FILE_NAME);
        Some(Self::with_path(path))
    }

    /// Creates a DiskCache backed by a specific file
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ttl: Duration::hours(DEFAULT_TTL_HOURS),
        }
    }

    /// Overrides the time-to-live
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Reads the entry for `key`, fresh or not
    ///
    /// Returns `None` if the key is absent or the store cannot be read.
    pub fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        self.load().remove(key.as_str())
    }

    /// Inserts or replaces the entry for `key`
    ///
    /// The whole store is written to a uniquely named sibling temp file and
    /// renamed over the original, so a crash mid-write leaves the previous
    /// file intact. Entries that have already expired are dropped while
    /// rewriting.
    pub fn put(
        &self,
        key: &CacheKey,
        payload: &LookupResult,
        fetched_at: DateTime<Utc>,
    ) -> Result<(), CacheError> {
        let now = Utc::now();
        let mut entries = self.load();
        entries.retain(|_, entry| self.is_fresh(entry, now));
        entries.insert(
            key.to_string(),
            CacheEntry {
                payload: payload.clone(),
                fetched_at,
            },
        );

        let json = serde_json::to_string_pretty(&entries)?;
        let dir = self.ensure_dir()?;

        let write_err = |source: io::Error| CacheError::Write {
            path: self.path.clone(),
            source,
        };
        let mut tmp = NamedTempFile::new_in(dir).map_err(write_err)?;
        tmp.write_all(json.as_bytes()).map_err(write_err)?;
        tmp.persist(&self.path)
            .map(|_| ())
            .map_err(|e| write_err(e.error))
    }

    /// Returns true iff `now - entry.fetched_at < ttl`
    pub fn is_fresh(&self, entry: &CacheEntry, now: DateTime<Utc>) -> bool {
        now - entry.fetched_at < self.ttl
    }

    /// Loads every entry, treating any read or parse failure as an empty store
    fn load(&self) -> CacheFile {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return CacheFile::new(),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "cache file unreadable, ignoring it");
                return CacheFile::new();
            }
        };

        match serde_json::from_str(&content) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "cache file is corrupt, ignoring it");
                CacheFile::new()
            }
        }
    }

    /// Ensures the directory holding the cache file exists and returns it
    fn ensure_dir(&self) -> Result<&Path, CacheError> {
        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => return Ok(Path::new(".")),
        };
        fs::create_dir_all(dir).map_err(|source| CacheError::CreateDir {
            path: dir.to_path_buf(),
            source,
        })?;
        Ok(dir)
    }
}
