//! Uploader configuration management.
//!
//! Configuration is stored as TOML:
//! - Linux: `~/.config/harufilm/uploader.toml`
//! - Windows: `%APPDATA%/harufilm/uploader.toml`
//!
//! `HARUFILM_API_URL` and `HARUFILM_ACCESS_TOKEN` override the file.

use std::path::{Path, PathBuf};

use harufilm_session_store::default_store_dir;
use harufilm_uploader::{FileKeyStrategy, UploadMode, UploaderConfig};
use serde::{Deserialize, Serialize};

const DEFAULT_API_URL: &str = "https://api.harufilm.app";
const DEFAULT_PART_SIZE: u64 = 5 * 1024 * 1024;

pub const ENV_API_URL: &str = "HARUFILM_API_URL";
pub const ENV_ACCESS_TOKEN: &str = "HARUFILM_ACCESS_TOKEN";

/// CLI configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CliConfig {
    /// Base URL of the HaruFilm REST API.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Bearer token sent to the API.
    #[serde(default)]
    pub access_token: String,

    /// Bytes per multipart part.
    #[serde(default = "default_part_size")]
    pub part_size: u64,

    #[serde(default)]
    pub mode: UploadMode,

    #[serde(default)]
    pub file_key: FileKeyStrategy,

    /// Directory for persisted upload sessions (platform default when empty).
    #[serde(default)]
    pub session_dir: String,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.into()
}

fn default_part_size() -> u64 {
    DEFAULT_PART_SIZE
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            access_token: String::new(),
            part_size: default_part_size(),
            mode: UploadMode::default(),
            file_key: FileKeyStrategy::default(),
            session_dir: String::new(),
        }
    }
}

impl CliConfig {
    /// Loads `path`, creating it with defaults when missing.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: CliConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            let config = CliConfig::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    /// Loads the default config file.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        // Restrict permissions on Unix (contains the access token).
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
        }

        tracing::debug!(path = %path.display(), "configuration saved");
        Ok(())
    }

    /// Applies environment overrides read through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_API_URL).filter(|v| !v.is_empty()) {
            self.api_url = url;
        }
        if let Some(token) = lookup(ENV_ACCESS_TOKEN).filter(|v| !v.is_empty()) {
            self.access_token = token;
        }
    }

    /// Token to send, if one is configured.
    pub fn token(&self) -> Option<&str> {
        Some(self.access_token.as_str()).filter(|t| !t.is_empty())
    }

    /// Where sessions are persisted.
    pub fn session_dir(&self) -> anyhow::Result<PathBuf> {
        if !self.session_dir.is_empty() {
            return Ok(PathBuf::from(&self.session_dir));
        }
        default_store_dir()
            .ok_or_else(|| anyhow::anyhow!("cannot determine session directory; set session_dir"))
    }

    /// Orchestrator settings derived from this file.
    pub fn uploader_config(&self) -> UploaderConfig {
        UploaderConfig {
            part_size: self.part_size,
            file_key: self.file_key,
            ..UploaderConfig::default()
        }
    }
}

/// Returns the platform-specific configuration file path.
pub fn config_path() -> anyhow::Result<PathBuf> {
    #[cfg(target_os = "linux")]
    {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        Ok(PathBuf::from(home)
            .join(".config")
            .join("harufilm")
            .join("uploader.toml"))
    }

    #[cfg(target_os = "windows")]
    {
        let appdata =
            std::env::var("APPDATA").unwrap_or_else(|_| "C:\\Users\\Default\\AppData".into());
        Ok(PathBuf::from(appdata).join("harufilm").join("uploader.toml"))
    }

    #[cfg(not(any(target_os = "linux", target_os = "windows")))]
    {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        Ok(PathBuf::from(home)
            .join(".config")
            .join("harufilm")
            .join("uploader.toml"))
    }
}
