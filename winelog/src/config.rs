//! Library configuration
//!
//! [`Config`] collects everything the library needs from the environment:
//! where entries are stored, how much storage is available, and where the
//! chat and public snapshot endpoints live.

use std::path::PathBuf;

use crate::constants::{
    CHAT_KEY_ENV, CHAT_URL_ENV, DATA_DIR_ENV, DEFAULT_CHAT_URL, DEFAULT_HISTORY_TURNS,
    DEFAULT_PUBLIC_URL, DEFAULT_STORAGE_QUOTA, PUBLIC_URL_ENV,
};

/// File name of the key-value storage inside the data directory
pub const STORAGE_FILE_NAME: &str = "storage.json";

/// Configuration for winelog.
///
/// ```rust
/// use winelog::prelude::*;
///
/// let config = Config::default()
///     .storage_quota(1024 * 1024)
///     .public_url("https://example.com/wine");
/// assert_eq!(config.storage_quota, 1024 * 1024);
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Path of the key-value storage file.
    /// Defaults to `$WINELOG_DATA_DIR/storage.json`, or `./storage.json`
    /// when the variable is not set.
    pub storage_path: PathBuf,

    /// Maximum size of the storage file in bytes (0 disables the cap).
    pub storage_quota: u64,

    /// Base url hosting `public.json`
    pub public_url: String,

    /// Chat assist settings
    pub chat: ChatConfig,
}

/// Settings for the chat assist endpoint
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Endpoint receiving the generate request
    pub url: String,

    /// Optional api key, sent as the `key` query parameter
    pub api_key: Option<String>,

    /// Number of most recent turns forwarded with each request
    pub history_turns: usize,

    pub temperature: f32,

    pub max_output_tokens: u32,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            url: std::env::var(CHAT_URL_ENV).unwrap_or_else(|_| DEFAULT_CHAT_URL.to_string()),
            api_key: std::env::var(CHAT_KEY_ENV).ok().filter(|key| !key.is_empty()),
            history_turns: DEFAULT_HISTORY_TURNS,
            temperature: 0.7,
            max_output_tokens: 512,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let dir = std::env::var(DATA_DIR_ENV).map_or_else(|_| PathBuf::from("."), PathBuf::from);
        Self {
            storage_path: dir.join(STORAGE_FILE_NAME),
            storage_quota: DEFAULT_STORAGE_QUOTA,
            public_url: std::env::var(PUBLIC_URL_ENV)
                .unwrap_or_else(|_| DEFAULT_PUBLIC_URL.to_string()),
            chat: ChatConfig::default(),
        }
    }
}

impl Config {
    /// Places the storage file inside `dir`.
    pub fn data_dir(self, dir: impl Into<PathBuf>) -> Self {
        Self {
            storage_path: dir.into().join(STORAGE_FILE_NAME),
            ..self
        }
    }

    pub fn storage_quota(self, storage_quota: u64) -> Self {
        Self {
            storage_quota,
            ..self
        }
    }

    pub fn public_url(self, url: impl Into<String>) -> Self {
        Self {
            public_url: url.into(),
            ..self
        }
    }

    pub fn chat(self, chat: ChatConfig) -> Self {
        Self { chat, ..self }
    }
}

impl ChatConfig {
    pub fn url(self, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..self
        }
    }

    pub fn api_key(self, api_key: Option<String>) -> Self {
        Self { api_key, ..self }
    }

    pub fn history_turns(self, history_turns: usize) -> Self {
        Self {
            history_turns,
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_dir_sets_storage_file() {
        let config = Config::default().data_dir("/tmp/wine");
        assert_eq!(config.storage_path, PathBuf::from("/tmp/wine/storage.json"));
    }

    #[test]
    fn chat_builder_keeps_other_fields() {
        let chat = ChatConfig::default()
            .url("http://localhost:1/chat")
            .history_turns(4);
        assert_eq!(chat.url, "http://localhost:1/chat");
        assert_eq!(chat.history_turns, 4);
        assert_eq!(chat.max_output_tokens, 512);
    }
}
