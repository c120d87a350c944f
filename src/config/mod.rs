use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory scanned for linkable documents; defaults to the
    /// platform documents folder when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documents_dir: Option<PathBuf>,

    /// Reopen the last-open conversation on startup
    #[serde(default)]
    pub reopen_last: bool,

    /// Conversation that was open when the app last exited
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_opened: Option<String>,

    /// Desktop notifications for CLI operations
    #[serde(default = "default_true")]
    pub notifications: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            documents_dir: None,
            reopen_last: false,
            last_opened: None,
            notifications: true,
        }
    }
}

impl AppConfig {
    /// Get the config file path
    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?
            .join("kaiwa");

        if let Err(e) = std::fs::create_dir_all(&config_dir) {
            tracing::warn!("Could not create config directory: {}", e);
        }

        Ok(config_dir.join("config.toml"))
    }

    /// Load config from file, or create default
    pub fn load() -> Result<Self> {
        let path = match Self::config_path() {
            Ok(p) => p,
            Err(_) => return Ok(AppConfig::default()),
        };

        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(content) => match toml::from_str(&content) {
                    Ok(config) => return Ok(config),
                    Err(e) => tracing::warn!("Failed to parse config: {}", e),
                },
                Err(e) => tracing::warn!("Failed to read config: {}", e),
            }
        }

        let config = AppConfig::default();
        let _ = config.save();
        Ok(config)
    }

    /// Save config to file
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;

        // Drop an empty last_opened rather than writing ""
        let mut clean_config = self.clone();
        if clean_config
            .last_opened
            .as_ref()
            .map(|id| id.is_empty())
            .unwrap_or(false)
        {
            clean_config.last_opened = None;
        }

        let content = toml::to_string_pretty(&clean_config)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// The documents directory for this run: CLI override first, then the
    /// configured directory, then the platform documents folder.
    pub fn resolve_documents_dir(&self, cli_override: Option<PathBuf>) -> PathBuf {
        cli_override
            .or_else(|| self.documents_dir.clone())
            .or_else(dirs::document_dir)
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_serialization() {
        let config = AppConfig {
            documents_dir: Some(PathBuf::from("/home/me/papers")),
            reopen_last: true,
            last_opened: Some("chat-1700000000000".to_string()),
            notifications: false,
        };

        let serialized = toml::to_string_pretty(&config).unwrap();
        let deserialized: AppConfig = toml::from_str(&serialized).unwrap();

        assert_eq!(config.documents_dir, deserialized.documents_dir);
        assert_eq!(config.reopen_last, deserialized.reopen_last);
        assert_eq!(config.last_opened, deserialized.last_opened);
        assert_eq!(config.notifications, deserialized.notifications);
    }

    #[test]
    fn test_notifications_default_on() {
        let config: AppConfig = toml::from_str("reopen_last = true").unwrap();
        assert!(config.notifications);
        assert!(config.reopen_last);
        assert!(config.last_opened.is_none());
    }

    #[test]
    fn test_cli_override_wins() {
        let config = AppConfig {
            documents_dir: Some(PathBuf::from("/configured")),
            ..AppConfig::default()
        };

        let resolved = config.resolve_documents_dir(Some(PathBuf::from("/from-cli")));
        assert_eq!(resolved, PathBuf::from("/from-cli"));

        let resolved = config.resolve_documents_dir(None);
        assert_eq!(resolved, PathBuf::from("/configured"));
    }
}
