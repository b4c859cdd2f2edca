//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.sahayika/config.json`).
//! Missing file means defaults; `sahayika init` creates the directory.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::qa::UiLang;

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Q&A backend settings.
    #[serde(default)]
    pub qa: QaConfig,

    /// Chat defaults (language, store location).
    #[serde(default)]
    pub chat: ChatConfig,
}

/// Q&A backend endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QaConfig {
    /// Base URL of the Q&A service (default "http://127.0.0.1:8000").
    #[serde(default = "default_qa_base_url")]
    pub base_url: String,
}

fn default_qa_base_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

impl Default for QaConfig {
    fn default() -> Self {
        Self {
            base_url: default_qa_base_url(),
        }
    }
}

/// Chat defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatConfig {
    /// UI language at startup ("hi" or "en", default "hi").
    #[serde(default)]
    pub default_lang: UiLang,

    /// Chats file override (default: `chats.json` next to the config file).
    #[serde(default)]
    pub store_path: Option<PathBuf>,
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("SAHAYIKA_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .map(|h| h.join(".sahayika").join("config.json"))
                .unwrap_or_else(|| PathBuf::from("config.json"))
        })
}

/// Load config from the default path (or SAHAYIKA_CONFIG_PATH). Missing file => default config.
/// Returns the config and the path that was used (for resolving the config directory).
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config, path))
}

/// Where the chat store lives: the configured override (relative paths
/// resolved against the config file's parent), or `chats.json` next to the
/// config file.
pub fn resolve_store_path(config: &Config, config_path: &Path) -> PathBuf {
    let config_parent = config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    match &config.chat.store_path {
        Some(p) if !p.as_os_str().is_empty() => {
            if p.is_absolute() {
                p.clone()
            } else {
                config_parent.join(p)
            }
        }
        _ => config_parent.join("chats.json"),
    }
}

/// Create the config directory and a default config file if they do not exist.
pub fn init_config_dir(config_path: &Path) -> Result<PathBuf> {
    let config_dir = config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(config_dir)
        .with_context(|| format!("creating config directory {}", config_dir.display()))?;

    if !config_path.exists() {
        std::fs::write(config_path, b"{}")
            .with_context(|| format!("writing default config to {}", config_path.display()))?;
        log::info!("created default config at {}", config_path.display());
    }

    Ok(config_dir.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.qa.base_url, "http://127.0.0.1:8000");
        assert_eq!(config.chat.default_lang, UiLang::Hi);
        assert!(config.chat.store_path.is_none());
    }

    #[test]
    fn empty_json_parses_to_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.qa.base_url, "http://127.0.0.1:8000");
    }

    #[test]
    fn resolve_store_path_default() {
        let config = Config::default();
        let path = Path::new("/home/user/.sahayika/config.json");
        assert_eq!(
            resolve_store_path(&config, path),
            PathBuf::from("/home/user/.sahayika/chats.json")
        );
    }

    #[test]
    fn resolve_store_path_override_relative() {
        let mut config = Config::default();
        config.chat.store_path = Some(PathBuf::from("data/chats.json"));
        let path = Path::new("/home/user/.sahayika/config.json");
        assert_eq!(
            resolve_store_path(&config, path),
            PathBuf::from("/home/user/.sahayika/data/chats.json")
        );
    }

    #[test]
    fn resolve_store_path_override_absolute() {
        let mut config = Config::default();
        config.chat.store_path = Some(PathBuf::from("/tmp/chats.json"));
        let path = Path::new("/home/user/.sahayika/config.json");
        assert_eq!(
            resolve_store_path(&config, path),
            PathBuf::from("/tmp/chats.json")
        );
    }
}
