//! Configuration file support.
//!
//! Files are TOML and may be overridden field by field through environment
//! variables prefixed with `RESEARCH_CLIENTS_` (nested keys use `__`):
//!
//! ```toml
//! [api_keys]
//! news = "your-newsapi-key"
//! wolfram = "your-app-id"
//!
//! [http]
//! timeout_secs = 20
//! contact_email = "you@example.org"
//!
//! [cache]
//! enabled = true
//! directory = "~/.cache/research-clients"
//! ```
//!
//! ```bash
//! export RESEARCH_CLIENTS_HTTP__TIMEOUT_SECS=10
//! ```

use std::path::{Path, PathBuf};

use super::{ApiKeys, Config};

/// Prefix for environment overrides of file settings
pub const CONFIG_ENV_PREFIX: &str = "RESEARCH_CLIENTS";

const CONFIG_FILE_NAME: &str = "research-clients.toml";

/// Load configuration from a file, then fill missing keys from the environment
pub fn load_config(path: &Path) -> Result<Config, config::ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::from(path))
        .add_source(config::Environment::with_prefix(CONFIG_ENV_PREFIX).separator("__"))
        .build()?;

    let mut config: Config = settings.try_deserialize()?;
    config.api_keys.fill_missing(&ApiKeys::from_env());

    tracing::debug!(
        "Loaded configuration from {} ({} API keys)",
        path.display(),
        config.api_keys.len()
    );
    Ok(config)
}

/// Locate a configuration file.
///
/// Checked in order: `RESEARCH_CLIENTS_CONFIG`, `./research-clients.toml`,
/// then `<config dir>/research-clients/config.toml`.
pub fn find_config_file() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(format!("{}_CONFIG", CONFIG_ENV_PREFIX)) {
        let path = PathBuf::from(path);
        if path.is_file() {
            return Some(path);
        }
        tracing::warn!("Config file {} does not exist", path.display());
    }

    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.is_file() {
        return Some(local);
    }

    dirs::config_dir()
        .map(|dir| dir.join("research-clients").join("config.toml"))
        .filter(|path| path.is_file())
}
