use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_ENDPOINT: &str =
    "https://functions.poehali.dev/5d46b851-4fcb-471b-9e6b-1f5e7d81ced8";
pub const DEFAULT_GREETING: &str = "Hi! I'm MadAI, your smart assistant. How can I help?";
pub const DEFAULT_UPSTREAM_URL: &str = "https://mad-ai-programming-assistant--preview.poehali.dev/";
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are MadAI, a helpful and friendly AI assistant.";

/// Main application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Chat endpoint the client posts `{"message": ...}` to
    pub endpoint: String,

    /// Per-request timeout for the client, in seconds
    pub request_timeout_secs: u64,

    /// Synthetic first message of every conversation
    pub greeting: String,

    /// UI preferences
    pub ui: UiConfig,

    /// Relay server settings (`madai serve`)
    pub relay: RelayConfig,
}

/// UI configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// How long an error toast stays up before it expires
    pub toast_seconds: u64,
    /// Animation tick interval
    pub tick_millis: u64,
}

/// Relay configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub bind: String,
    pub upstream_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub system_prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            request_timeout_secs: 60,
            greeting: DEFAULT_GREETING.to_string(),
            ui: UiConfig::default(),
            relay: RelayConfig::default(),
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        UiConfig {
            toast_seconds: 5,
            tick_millis: 300,
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        RelayConfig {
            bind: "127.0.0.1:8787".to_string(),
            upstream_url: DEFAULT_UPSTREAM_URL.to_string(),
            api_key: None,
            model: "gpt-3.5-turbo".to_string(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            max_tokens: 500,
            temperature: 0.7,
            timeout_secs: 30,
        }
    }
}

impl Config {
    /// Load `~/.madai/config.toml` and apply environment overrides
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        let mut config = Self::load_from(&path)?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load from an explicit path; a missing file yields the defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::config_path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content).context("Failed to write config file")?;
        Ok(())
    }

    /// Apply environment overrides through `lookup`
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(endpoint) = non_empty("MADAI_ENDPOINT") {
            self.endpoint = endpoint;
        }
        if let Some(url) = non_empty("CUSTOM_GPT_URL") {
            self.relay.upstream_url = url;
        }
        if let Some(key) = non_empty("CUSTOM_GPT_API_KEY") {
            self.relay.api_key = Some(key);
        }
    }

    /// Copy safe to print: the upstream API key is masked
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        if let Some(key) = config.relay.api_key.as_mut() {
            *key = mask_key(key);
        }
        config
    }

    /// `~/.madai`
    pub fn home_dir() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Could not find home directory")?;
        Ok(home.join(".madai"))
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::home_dir()?.join("config.toml"))
    }

    pub fn log_path() -> Result<PathBuf> {
        Ok(Self::home_dir()?.join("madai.log"))
    }
}

/// Keep only the last four characters of longer keys
fn mask_key(key: &str) -> String {
    let count = key.chars().count();
    if count <= 8 {
        return "****".to_string();
    }
    let tail: String = key.chars().skip(count - 4).collect();
    format!("****{tail}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.relay.max_tokens, 500);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.endpoint = "http://localhost:9000/chat".to_string();
        config.ui.toast_seconds = 9;
        config.relay.api_key = Some("sk-test".to_string());
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "greeting = \"yo\"\n[relay]\nmodel = \"gpt-4o-mini\"\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.greeting, "yo");
        assert_eq!(config.relay.model, "gpt-4o-mini");
        assert_eq!(config.relay.timeout_secs, 30);
        assert_eq!(config.request_timeout_secs, 60);
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "endpoint = [").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("MADAI_ENDPOINT", "http://example.test/chat"),
            ("CUSTOM_GPT_URL", "http://upstream.test/v1"),
            ("CUSTOM_GPT_API_KEY", "  "),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_env(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.endpoint, "http://example.test/chat");
        assert_eq!(config.relay.upstream_url, "http://upstream.test/v1");
        // blank values are ignored
        assert_eq!(config.relay.api_key, None);
    }

    #[test]
    fn test_redacted_masks_api_key() {
        let mut config = Config::default();
        config.relay.api_key = Some("sk-live-0123456789abcd".to_string());

        let printed = toml::to_string_pretty(&config.redacted()).unwrap();
        assert!(!printed.contains("sk-live-0123456789abcd"));
        assert!(printed.contains("****abcd"));
        assert_eq!(config.relay.api_key.as_deref(), Some("sk-live-0123456789abcd"));

        config.relay.api_key = Some("short".to_string());
        assert_eq!(config.redacted().relay.api_key.as_deref(), Some("****"));

        config.relay.api_key = None;
        assert_eq!(config.redacted(), config);
    }
}
