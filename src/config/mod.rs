//! Configuration management.
//!
//! The environment is read in exactly one place, [`Config::from_env`] (and
//! [`load_config`], which layers a file on top of it). Adapters receive
//! already-resolved values through the factory and never call `std::env`.

mod file_config;

pub use file_config::{find_config_file, load_config, CONFIG_ENV_PREFIX};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::sources::SOURCES;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// API keys, keyed by canonical source name
    #[serde(default)]
    pub api_keys: ApiKeys,

    #[serde(default)]
    pub http: HttpConfig,

    #[serde(default)]
    pub cache: CacheConfig,
}

impl Config {
    /// Defaults plus every provider key found in the environment
    pub fn from_env() -> Self {
        Self {
            api_keys: ApiKeys::from_env(),
            ..Self::default()
        }
    }

    /// Per-request timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.http.timeout_secs)
    }
}

/// API keys for the providers, keyed by canonical source name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApiKeys(HashMap<String, String>);

impl ApiKeys {
    /// Read each source's key variables from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Resolve keys with a custom variable lookup.
    ///
    /// For sources with several variables the first non-empty one wins.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut keys = HashMap::new();
        for entry in SOURCES.iter() {
            let found = entry
                .key_variables
                .iter()
                .filter_map(|var| lookup(var))
                .map(|value| value.trim().to_string())
                .find(|value| !value.is_empty());

            if let Some(key) = found {
                tracing::debug!("Found API key for {}", entry.name);
                keys.insert(entry.name.to_string(), key);
            }
        }
        Self(keys)
    }

    /// Key for a canonical source name
    pub fn get(&self, source: &str) -> Option<&str> {
        self.0.get(source).map(String::as_str)
    }

    pub fn set(&mut self, source: impl Into<String>, key: impl Into<String>) {
        self.0.insert(source.into(), key.into());
    }

    /// Copy keys from `other` for sources that have none yet
    pub fn fill_missing(&mut self, other: &ApiKeys) {
        for (source, key) in &other.0 {
            self.0.entry(source.clone()).or_insert_with(|| key.clone());
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// HTTP settings shared by every adapter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// User agent override (defaults to the crate name and version)
    #[serde(default)]
    pub user_agent: Option<String>,

    /// Contact address sent to providers that ask for one (NCBI)
    #[serde(default)]
    pub contact_email: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            user_agent: None,
            contact_email: None,
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

/// On-disk response cache (used by the Census adapter)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default)]
    pub directory: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            directory: None,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Platform cache directory for this crate
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from(".cache"))
        .join("research-clients")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.cache.enabled);
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert!(config.api_keys.is_empty());
    }

    #[test]
    fn test_keys_from_lookup() {
        let keys = ApiKeys::from_lookup(|name| match name {
            "NEWS_API_KEY" => Some("news-key".to_string()),
            "GITHUB_TOKEN" => Some("  ".to_string()),
            "GITHUB_API_KEY" => Some("gh-key".to_string()),
            "MYANIMELIST_API_KEY" => Some("mal-key".to_string()),
            _ => None,
        });

        assert_eq!(keys.get("news"), Some("news-key"));
        assert_eq!(keys.get("github"), Some("gh-key"));
        assert_eq!(keys.get("mal"), Some("mal-key"));
        assert_eq!(keys.get("arxiv"), None);
    }

    #[test]
    fn test_fill_missing_keeps_explicit_keys() {
        let mut keys = ApiKeys::default();
        keys.set("news", "from-file");

        let mut env = ApiKeys::default();
        env.set("news", "from-env");
        env.set("fec", "fec-env");

        keys.fill_missing(&env);
        assert_eq!(keys.get("news"), Some("from-file"));
        assert_eq!(keys.get("fec"), Some("fec-env"));
    }
}
