//! Configuration types and loading.
//!
//! Config is loaded once at startup from a JSON file (e.g. `~/.botline/config.json`)
//! and passed by reference into the clients; credentials come from the environment
//! and override file values. Nothing re-reads the environment per call.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Direct Line endpoint, credentials, and identity settings.
    #[serde(default)]
    pub directline: DirectLineConfig,

    /// Hosted-model inference relay settings.
    #[serde(default)]
    pub relay: RelayConfig,

    /// Send/poll exchange loop settings.
    #[serde(default)]
    pub exchange: ExchangeConfig,
}

/// Direct Line service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectLineConfig {
    /// Service base URL (default the public Direct Line v3 endpoint).
    #[serde(default = "default_directline_endpoint")]
    pub endpoint: String,

    /// Per-request timeout in seconds (default 120).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Channel secret. Overridden by DIRECT_LINE_SECRET env when set.
    pub secret: Option<String>,

    /// Bot identifier sent in the conversation-start payload. Overridden by BotIdentifier env.
    pub bot_id: Option<String>,

    /// User authentication token forwarded to bots behind OAuth sign-in. Overridden by USER_TOKEN env.
    pub user_token: Option<String>,

    /// Sender id attached to outgoing activities (default "user123").
    #[serde(default = "default_user_id")]
    pub user_id: String,

    /// Locale attached to outgoing message activities (default "en-US").
    #[serde(default = "default_locale")]
    pub locale: String,
}

/// Hosted-model inference relay settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayConfig {
    /// Inference API base URL (default the public Hugging Face inference endpoint).
    #[serde(default = "default_relay_endpoint")]
    pub endpoint: String,

    /// Model id appended to the endpoint path.
    #[serde(default = "default_relay_model")]
    pub model: String,

    /// API token. Overridden by HUGGINGFACE_API_TOKEN env when set.
    pub api_token: Option<String>,

    /// Per-request timeout in seconds (default 120).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Exchange loop settings: fixed-interval polling with a bounded overall wait.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeConfig {
    /// Delay between activity polls in milliseconds (default 1000).
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Overall wait for a bot reply in seconds (default 30).
    #[serde(default = "default_reply_timeout_secs")]
    pub reply_timeout_secs: u64,
}

fn default_directline_endpoint() -> String {
    "https://directline.botframework.com/v3/directline".to_string()
}

fn default_relay_endpoint() -> String {
    "https://api-inference.huggingface.co".to_string()
}

fn default_relay_model() -> String {
    "mistralai/Mistral-7B-Instruct-v0.3".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_user_id() -> String {
    "user123".to_string()
}

fn default_locale() -> String {
    "en-US".to_string()
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_reply_timeout_secs() -> u64 {
    30
}

impl Default for DirectLineConfig {
    fn default() -> Self {
        Self {
            endpoint: default_directline_endpoint(),
            timeout_secs: default_timeout_secs(),
            secret: None,
            bot_id: None,
            user_token: None,
            user_id: default_user_id(),
            locale: default_locale(),
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            endpoint: default_relay_endpoint(),
            model: default_relay_model(),
            api_token: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            reply_timeout_secs: default_reply_timeout_secs(),
        }
    }
}

impl ExchangeConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn reply_timeout(&self) -> Duration {
        Duration::from_secs(self.reply_timeout_secs)
    }
}

fn env_nonempty(name: &str) -> Option<String> {
    std::env::var(name).ok().and_then(|s| {
        let t = s.trim();
        if t.is_empty() {
            None
        } else {
            Some(t.to_string())
        }
    })
}

fn config_nonempty(value: &Option<String>) -> Option<String> {
    value
        .as_ref()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Resolve the Direct Line secret: env DIRECT_LINE_SECRET overrides config.
pub fn resolve_secret(config: &Config) -> Option<String> {
    env_nonempty("DIRECT_LINE_SECRET").or_else(|| config_nonempty(&config.directline.secret))
}

/// Resolve the bot identifier: env BotIdentifier overrides config.
pub fn resolve_bot_id(config: &Config) -> Option<String> {
    env_nonempty("BotIdentifier").or_else(|| config_nonempty(&config.directline.bot_id))
}

/// Resolve the user authentication token: env USER_TOKEN overrides config.
pub fn resolve_user_token(config: &Config) -> Option<String> {
    env_nonempty("USER_TOKEN").or_else(|| config_nonempty(&config.directline.user_token))
}

/// Resolve the relay API token: env HUGGINGFACE_API_TOKEN overrides config.
pub fn resolve_relay_token(config: &Config) -> Option<String> {
    env_nonempty("HUGGINGFACE_API_TOKEN").or_else(|| config_nonempty(&config.relay.api_token))
}

/// Resolve config path from env or default (`~/.botline/config.json`).
pub fn default_config_path() -> PathBuf {
    std::env::var("BOTLINE_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .map(|h| h.join(".botline").join("config.json"))
                .unwrap_or_else(|| PathBuf::from("config.json"))
        })
}

/// Load config from the default path (or BOTLINE_CONFIG_PATH). Missing file => default config.
/// Returns the config and the path that was used.
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
