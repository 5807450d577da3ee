use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;
use zeolite_interpret::{DEFAULT_TIMEOUT, QueryInterpreter, RemoteInterpreter};

use crate::error::ZeoError;

pub const DEFAULT_OWNER: &str = "default";

#[derive(Debug, Deserialize, Default)]
pub struct Config {
    pub openrouter_api_key: Option<String>,
    pub owner_id: Option<String>,
    #[serde(default)]
    pub interpreter: InterpreterConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

#[derive(Debug, Deserialize, Default)]
pub struct InterpreterConfig {
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
pub struct StoreConfig {
    pub path: Option<PathBuf>,
}

fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("zeolite").join("config.toml"))
}

pub fn load_config() -> Config {
    let Some(path) = config_path() else {
        return Config::default();
    };

    let Ok(content) = std::fs::read_to_string(&path) else {
        return Config::default();
    };

    match toml::from_str(&content) {
        Ok(config) => config,
        Err(err) => {
            debug!(path = %path.display(), error = %err, "ignoring unreadable config");
            Config::default()
        }
    }
}

pub fn load_api_key(config: &Config) -> Result<String, ZeoError> {
    // First, try environment variable
    if let Ok(key) = std::env::var("OPENROUTER_API_KEY") {
        if !key.trim().is_empty() {
            return Ok(key);
        }
    }

    // Then, try config file
    if let Some(key) = &config.openrouter_api_key {
        if !key.trim().is_empty() {
            return Ok(key.clone());
        }
    }

    Err(ZeoError::ApiKeyNotFound)
}

pub fn default_store_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("zeolite")
        .join("store")
}

pub fn resolve_store_path(cli_path: Option<PathBuf>, config: &Config) -> PathBuf {
    cli_path
        .or_else(|| config.store.path.clone())
        .unwrap_or_else(default_store_path)
}

pub fn resolve_owner(cli_owner: Option<String>, config: &Config) -> String {
    cli_owner
        .or_else(|| config.owner_id.clone())
        .unwrap_or_else(|| DEFAULT_OWNER.to_string())
}

/// Builds the interpreter, failing when the remote path is enabled without a
/// credential.
pub fn build_interpreter(config: &Config, offline: bool) -> Result<QueryInterpreter, ZeoError> {
    if offline {
        return Ok(QueryInterpreter::fallback_only());
    }

    let mut remote = RemoteInterpreter::new(load_api_key(config)?)?;
    if let Some(model) = &config.interpreter.model {
        remote = remote.with_model(model);
    }
    if let Some(base_url) = &config.interpreter.base_url {
        remote = remote.with_base_url(base_url);
    }
    let timeout = config
        .interpreter
        .timeout_secs
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_TIMEOUT);

    Ok(QueryInterpreter::new(remote).with_timeout(timeout))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_config() {
        let config: Config = toml::from_str(
            r#"
            openrouter_api_key = "sk-test"
            owner_id = "ada"

            [interpreter]
            model = "openai/gpt-4o"
            timeout_secs = 3

            [store]
            path = "/tmp/zeolite"
            "#,
        )
        .unwrap();

        assert_eq!(config.owner_id.as_deref(), Some("ada"));
        assert_eq!(config.interpreter.timeout_secs, Some(3));
        assert_eq!(resolve_store_path(None, &config), PathBuf::from("/tmp/zeolite"));
        assert_eq!(
            resolve_store_path(Some(PathBuf::from("/elsewhere")), &config),
            PathBuf::from("/elsewhere")
        );
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(resolve_owner(None, &config), DEFAULT_OWNER);
        assert_eq!(resolve_owner(Some("bob".into()), &config), "bob");
        assert_eq!(resolve_store_path(None, &config), default_store_path());
    }

    #[test]
    fn offline_needs_no_key() {
        let interpreter = build_interpreter(&Config::default(), true).unwrap();
        assert!(!interpreter.has_primary());
    }
}
