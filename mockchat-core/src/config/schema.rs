//! Configuration schema definitions

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration for mockchat
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Key-value storage configuration
    #[serde(default)]
    pub storage: StorageConfig,
    /// Mock authentication configuration
    #[serde(default)]
    pub auth: AuthConfig,
    /// Chat configuration
    #[serde(default)]
    pub chat: ChatConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (text, json)
    #[serde(default = "default_log_format")]
    pub format: String,
    /// Directory for log files
    #[serde(default = "default_log_dir")]
    pub dir: String,
    /// Module-specific overrides
    #[serde(default)]
    pub overrides: HashMap<String, String>,
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            dir: default_log_dir(),
            overrides: HashMap::new(),
        }
    }
}

/// Where the key-value store keeps its files
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StorageConfig {
    /// Storage directory. Empty means `<config dir>/storage`.
    #[serde(default)]
    pub dir: String,
}

impl StorageConfig {
    /// Resolve the storage directory against the config directory
    pub fn resolve_dir(&self, config_dir: &Path) -> PathBuf {
        let dir = self.dir.trim();
        if dir.is_empty() {
            return config_dir.join("storage");
        }
        if let Some(rest) = dir.strip_prefix("~/") {
            if let Some(home) = dirs::home_dir() {
                return home.join(rest);
            }
        }
        PathBuf::from(dir)
    }
}

/// Mock authentication settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AuthConfig {
    /// Simulated round-trip for register/login, in milliseconds
    #[serde(default)]
    pub latency_ms: u64,
}

impl AuthConfig {
    pub fn latency(&self) -> Duration {
        Duration::from_millis(self.latency_ms)
    }
}

pub const DEFAULT_CANNED_REPLY: &str = "I'm here to assist you! This is a demo response. \
In your production version, this would connect to your actual chatbot backend.";

/// Chat settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Delay before the canned reply is appended, in milliseconds
    #[serde(default = "default_reply_delay_ms")]
    pub reply_delay_ms: u64,
    /// Text of the canned assistant reply
    #[serde(default = "default_canned_reply")]
    pub canned_reply: String,
    /// Banner shown when the chat view opens. Never stored as a message.
    #[serde(default = "default_greeting")]
    pub greeting: String,
    /// Title given to new conversations
    #[serde(default = "default_placeholder_title")]
    pub placeholder_title: String,
    /// Maximum characters kept in a conversation preview
    #[serde(default = "default_preview_len")]
    pub preview_len: usize,
    /// Maximum characters of a title derived from the first message
    #[serde(default = "default_title_len")]
    pub title_len: usize,
    /// Model labels offered for selection
    #[serde(default = "default_models")]
    pub models: Vec<String>,
    /// Model selected on startup
    #[serde(default = "default_model")]
    pub default_model: String,
}

fn default_reply_delay_ms() -> u64 {
    1500
}

fn default_canned_reply() -> String {
    DEFAULT_CANNED_REPLY.to_string()
}

fn default_greeting() -> String {
    "Hello! I'm your AI assistant. How can I help you today?".to_string()
}

fn default_placeholder_title() -> String {
    "New Conversation".to_string()
}

fn default_preview_len() -> usize {
    60
}

fn default_title_len() -> usize {
    40
}

fn default_models() -> Vec<String> {
    [
        "GPT-4",
        "GPT-4 Turbo",
        "GPT-3.5 Turbo",
        "Claude 3 Opus",
        "Claude 3 Sonnet",
        "Gemini Pro",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_model() -> String {
    "GPT-4".to_string()
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            reply_delay_ms: default_reply_delay_ms(),
            canned_reply: default_canned_reply(),
            greeting: default_greeting(),
            placeholder_title: default_placeholder_title(),
            preview_len: default_preview_len(),
            title_len: default_title_len(),
            models: default_models(),
            default_model: default_model(),
        }
    }
}

impl ChatConfig {
    pub fn reply_delay(&self) -> Duration {
        Duration::from_millis(self.reply_delay_ms)
    }
}
