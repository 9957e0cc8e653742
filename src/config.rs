use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub content: ContentConfig,
    #[serde(default)]
    pub progress: ProgressConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RemoteConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_upload_base")]
    pub upload_base: String,
    #[serde(default = "default_token_url")]
    pub token_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            upload_base: default_upload_base(),
            token_url: default_token_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_api_base() -> String {
    "https://www.googleapis.com/drive/v3".to_string()
}
fn default_upload_base() -> String {
    "https://www.googleapis.com/upload/drive/v3".to_string()
}
fn default_token_url() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct ContentConfig {
    /// Directory attachment filenames are resolved against.
    #[serde(default = "default_attachments_root")]
    pub attachments_root: PathBuf,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            attachments_root: default_attachments_root(),
        }
    }
}

fn default_attachments_root() -> PathBuf {
    PathBuf::from(".")
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProgressConfig {
    /// `auto` (human on a tty, JSON otherwise), `human`, or `json`.
    #[serde(default = "default_format")]
    pub format: String,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            format: default_format(),
        }
    }
}

fn default_format() -> String {
    "auto".to_string()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.remote.api_base.trim().is_empty() {
        anyhow::bail!("remote.api_base must not be empty");
    }
    if config.remote.upload_base.trim().is_empty() {
        anyhow::bail!("remote.upload_base must not be empty");
    }
    if config.remote.timeout_secs == 0 {
        anyhow::bail!("remote.timeout_secs must be > 0");
    }
    match config.progress.format.as_str() {
        "auto" | "human" | "json" => {}
        other => anyhow::bail!(
            "Unknown progress format: '{}'. Must be auto, human, or json.",
            other
        ),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_gets_defaults() {
        let config: Config = toml::from_str("").unwrap();
        validate(&config).unwrap();
        assert_eq!(config.remote.api_base, "https://www.googleapis.com/drive/v3");
        assert_eq!(config.remote.timeout_secs, 30);
        assert_eq!(config.content.attachments_root, PathBuf::from("."));
        assert_eq!(config.progress.format, "auto");
    }

    #[test]
    fn rejects_unknown_progress_format() {
        let config: Config = toml::from_str("[progress]\nformat = \"xml\"\n").unwrap();
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("Unknown progress format"));
    }

    #[test]
    fn rejects_zero_timeout() {
        let config: Config = toml::from_str("[remote]\ntimeout_secs = 0\n").unwrap();
        assert!(validate(&config).is_err());
    }
}
