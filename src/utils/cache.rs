//! On-disk cache for normalized API responses.
//!
//! Each entry is one JSON file named after the cache key plus the md5 of the
//! key, so keys that sanitize to the same file name still get distinct files:
//!
//! ```text
//! ~/.cache/research-clients/census/
//!   acs_2022_acs5_county___B01003_001E_<md5>.json
//! ```
//!
//! Entries never expire; [`ResponseCache::clear`] is the only way to drop them.
//! The cache is safe for sequential reuse but not for concurrent writers.

use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

use crate::models::Record;

const EXTENSION: &str = "json";

/// Replace characters that are unsafe in file names
fn sanitize(key: &str) -> String {
    match Regex::new(r"[^A-Za-z0-9_.\-]") {
        Ok(re) => re.replace_all(key, "_").into_owned(),
        Err(_) => key.to_string(),
    }
}

/// File-backed cache of [`Record`]s keyed by request fingerprint
#[derive(Debug, Clone)]
pub struct ResponseCache {
    dir: PathBuf,
    enabled: bool,
}

impl ResponseCache {
    /// A cache rooted at `dir`; nothing is created until the first write
    pub fn new(dir: impl Into<PathBuf>, enabled: bool) -> Self {
        Self {
            dir: dir.into(),
            enabled,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File that holds the entry for `key`
    pub fn path_for(&self, key: &str) -> PathBuf {
        let digest = md5::compute(key.as_bytes());
        let stem = sanitize(key);
        self.dir.join(format!("{}_{:x}.{}", stem, digest, EXTENSION))
    }

    /// Read an entry; unreadable entries count as misses
    pub fn get(&self, key: &str) -> Option<Record> {
        if !self.enabled {
            return None;
        }

        let path = self.path_for(key);
        let content = fs::read_to_string(&path).ok()?;

        match serde_json::from_str(&content) {
            Ok(record) => {
                tracing::debug!("Cache HIT: {}", path.display());
                Some(record)
            }
            Err(e) => {
                tracing::warn!("Cache read error for {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Store an entry; failures are logged and otherwise ignored
    pub fn put(&self, key: &str, record: &Record) {
        if !self.enabled {
            return;
        }

        let path = self.path_for(key);
        let written = fs::create_dir_all(&self.dir)
            .and_then(|_| serde_json::to_string_pretty(record).map_err(std::io::Error::from))
            .and_then(|content| fs::write(&path, content));

        match written {
            Ok(()) => tracing::debug!("Cached response: {}", path.display()),
            Err(e) => tracing::warn!("Cache write error for {}: {}", path.display(), e),
        }
    }

    /// Delete cached files whose name matches a glob (`*` and `?`), or every
    /// entry when `pattern` is `None`. Returns the number of files removed.
    pub fn clear(&self, pattern: Option<&str>) -> usize {
        let matcher = match pattern.map(glob_to_regex) {
            Some(Ok(re)) => Some(re),
            Some(Err(e)) => {
                tracing::warn!("Invalid cache pattern: {}", e);
                return 0;
            }
            None => None,
        };

        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(_) => return 0,
        };

        let mut removed = 0;
        for entry in entries.flatten() {
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().into_owned();

            let selected = match &matcher {
                Some(re) => re.is_match(&name),
                None => path.extension().is_some_and(|ext| ext == EXTENSION),
            };
            if !selected || !path.is_file() {
                continue;
            }

            match fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) => tracing::warn!("Error deleting {}: {}", path.display(), e),
            }
        }

        tracing::info!("Cleared {} cached file(s)", removed);
        removed
    }

    /// Number of entries on disk
    pub fn len(&self) -> usize {
        fs::read_dir(&self.dir)
            .map(|entries| {
                entries
                    .flatten()
                    .filter(|e| e.path().extension().is_some_and(|ext| ext == EXTENSION))
                    .count()
            })
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn glob_to_regex(pattern: &str) -> Result<Regex, regex::Error> {
    let escaped = regex::escape(pattern)
        .replace(r"\*", ".*")
        .replace(r"\?", ".");
    Regex::new(&format!("^{}$", escaped))
}
