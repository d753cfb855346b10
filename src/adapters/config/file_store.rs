use crate::ports::{AppConfig, ConfigError, ConfigResult, ConfigStore};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

const APP_DIR: &str = "kanban-board";
const KEYRING_SERVICE: &str = "kanban-board";
const TOKEN_ENV: &str = "KANBAN_TOKEN";
pub const API_URL_ENV: &str = "KANBAN_API_URL";

#[derive(Debug, Default, Serialize, Deserialize)]
struct ConfigFile {
    api_base_url: Option<String>,
    request_timeout_secs: Option<u64>,
    cache_ttl_seconds: Option<u64>,
    reconcile_on_settle: Option<bool>,
}

/// JSON settings under the user config directory; the API token lives in
/// the OS keyring, or in a private `.token` file next to the settings.
pub struct FileConfigStore {
    config_path: PathBuf,
    use_keyring: bool,
}

impl FileConfigStore {
    pub fn new() -> ConfigResult<Self> {
        let config_dir = dirs::config_dir().ok_or_else(|| {
            ConfigError::ReadError("Cannot determine config directory".to_string())
        })?;

        Ok(Self {
            config_path: config_dir.join(APP_DIR).join("config.json"),
            use_keyring: true,
        })
    }

    /// Store everything below `dir`, keyring disabled
    pub fn at(dir: impl AsRef<Path>) -> Self {
        Self {
            config_path: dir.as_ref().join("config.json"),
            use_keyring: false,
        }
    }

    fn config_dir(&self) -> &Path {
        self.config_path.parent().unwrap_or_else(|| Path::new("."))
    }

    async fn ensure_config_dir(&self) -> ConfigResult<()> {
        fs::create_dir_all(self.config_dir())
            .await
            .map_err(|e| ConfigError::WriteError(e.to_string()))
    }

    fn token_file_path(&self) -> PathBuf {
        self.config_dir().join(".token")
    }

    async fn get_token_from_file(&self) -> ConfigResult<Option<String>> {
        match fs::read_to_string(self.token_file_path()).await {
            Ok(token) if !token.trim().is_empty() => Ok(Some(token.trim().to_string())),
            _ => Ok(None),
        }
    }

    async fn set_token_in_file(&self, token: &str) -> ConfigResult<()> {
        self.ensure_config_dir().await?;
        let token_path = self.token_file_path();
        fs::write(&token_path, token)
            .await
            .map_err(|e| ConfigError::WriteError(e.to_string()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = fs::metadata(&token_path)
                .await
                .map_err(|e| ConfigError::WriteError(e.to_string()))?
                .permissions();
            perms.set_mode(0o600);
            fs::set_permissions(&token_path, perms)
                .await
                .map_err(|e| ConfigError::WriteError(e.to_string()))?;
        }

        Ok(())
    }

    fn keyring_entry(&self) -> Option<keyring::Entry> {
        if !self.use_keyring {
            return None;
        }
        match keyring::Entry::new(KEYRING_SERVICE, "api_token") {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!("Keyring not available, using file storage: {}", e);
                None
            }
        }
    }
}

#[async_trait]
impl ConfigStore for FileConfigStore {
    async fn load_config(&self) -> ConfigResult<AppConfig> {
        let defaults = AppConfig::default();

        let config_file = match fs::read_to_string(&self.config_path).await {
            Ok(content) => serde_json::from_str::<ConfigFile>(&content)
                .map_err(|e| ConfigError::InvalidFormat(e.to_string()))?,
            Err(_) => ConfigFile::default(),
        };

        let mut api_token = self.get_api_token().await?;
        if let Ok(env_token) = std::env::var(TOKEN_ENV) {
            api_token = Some(env_token);
        }

        let api_base_url = std::env::var(API_URL_ENV)
            .ok()
            .or(config_file.api_base_url)
            .unwrap_or(defaults.api_base_url);

        Ok(AppConfig {
            api_base_url,
            api_token,
            request_timeout_secs: config_file
                .request_timeout_secs
                .unwrap_or(defaults.request_timeout_secs),
            cache_ttl_seconds: config_file
                .cache_ttl_seconds
                .unwrap_or(defaults.cache_ttl_seconds),
            reconcile_on_settle: config_file
                .reconcile_on_settle
                .unwrap_or(defaults.reconcile_on_settle),
        })
    }

    async fn save_config(&self, config: &AppConfig) -> ConfigResult<()> {
        self.ensure_config_dir().await?;

        let config_file = ConfigFile {
            api_base_url: Some(config.api_base_url.clone()),
            request_timeout_secs: Some(config.request_timeout_secs),
            cache_ttl_seconds: Some(config.cache_ttl_seconds),
            reconcile_on_settle: Some(config.reconcile_on_settle),
        };

        let content = serde_json::to_string_pretty(&config_file)
            .map_err(|e| ConfigError::WriteError(e.to_string()))?;

        fs::write(&self.config_path, content)
            .await
            .map_err(|e| ConfigError::WriteError(e.to_string()))?;

        if let Some(token) = &config.api_token {
            self.set_api_token(token).await?;
        }

        Ok(())
    }

    async fn get_api_token(&self) -> ConfigResult<Option<String>> {
        if let Some(entry) = self.keyring_entry() {
            match entry.get_password() {
                Ok(token) => return Ok(Some(token)),
                Err(keyring::Error::NoEntry) => {}
                Err(e) => {
                    tracing::warn!("Keyring lookup failed, falling back to file storage: {}", e);
                }
            }
        }

        self.get_token_from_file().await
    }

    async fn set_api_token(&self, token: &str) -> ConfigResult<()> {
        if let Some(entry) = self.keyring_entry() {
            match entry.set_password(token) {
                Ok(()) => return Ok(()),
                Err(e) => {
                    tracing::warn!("Failed to store in keyring, falling back to file storage: {}", e);
                }
            }
        }

        self.set_token_in_file(token).await
    }
}
