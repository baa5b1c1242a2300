use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Settings saved by `wlog config set`. Command line flags and environment
/// variables take precedence.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CliConfig {
    pub data_dir: Option<PathBuf>,
    pub chat_url: Option<String>,
    pub chat_key: Option<String>,
    pub public_url: Option<String>,
    pub storage_quota: Option<u64>,
}

impl CliConfig {
    pub fn path() -> Result<PathBuf> {
        let base = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        Ok(base.join("winelog").join("cli.json"))
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::path()?)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::path()?)
    }

    pub fn reset() -> Result<()> {
        let path = Self::path()?;
        if path.exists() {
            fs::remove_file(&path).with_context(|| format!("remove {}", path.display()))?;
        }
        Ok(())
    }

    fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        let config = serde_json::from_str(&data).context("parse cli config")?;
        Ok(config)
    }

    fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
        }
        let data = serde_json::to_string_pretty(self).context("serialize cli config")?;
        fs::write(path, data).with_context(|| format!("write {}", path.display()))?;
        Ok(())
    }

    /// Same config with the chat key hidden, for display
    pub fn redacted(&self) -> Self {
        Self {
            chat_key: self.chat_key.as_ref().map(|_| "********".to_string()),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_default() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = CliConfig::load_from(&dir.path().join("nope.json")).expect("load");
        assert_eq!(config, CliConfig::default());
    }

    #[test]
    fn saved_config_loads_back() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("winelog").join("cli.json");
        let config = CliConfig {
            data_dir: Some(PathBuf::from("/srv/wine")),
            chat_url: Some("http://localhost:8787/api/chat".into()),
            storage_quota: Some(1024),
            ..CliConfig::default()
        };
        config.save_to(&path).expect("save");
        assert_eq!(CliConfig::load_from(&path).expect("load"), config);
    }

    #[test]
    fn redacted_hides_key() {
        let config = CliConfig {
            chat_key: Some("secret".into()),
            ..CliConfig::default()
        };
        assert_eq!(config.redacted().chat_key.as_deref(), Some("********"));
        assert_eq!(CliConfig::default().redacted().chat_key, None);
    }
}
