use anyhow::{Context, Result};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Default loopback endpoint. Browser extensions hardcode this address.
pub const DEFAULT_IMPORT_BIND: &str = "127.0.0.1:27777";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub settings: SettingsConfig,
    #[serde(default)]
    pub import: ImportConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SettingsConfig {
    #[serde(default = "default_settings_path")]
    pub path: PathBuf,
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            path: default_settings_path(),
        }
    }
}

fn default_settings_path() -> PathBuf {
    PathBuf::from("./settings.json")
}

#[derive(Debug, Deserialize, Clone)]
pub struct ImportConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    #[serde(default = "default_preview_max_width")]
    pub preview_max_width: u32,
    #[serde(default = "default_preview_max_height")]
    pub preview_max_height: u32,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            bind: default_bind(),
            max_body_bytes: default_max_body_bytes(),
            preview_max_width: default_preview_max_width(),
            preview_max_height: default_preview_max_height(),
        }
    }
}

fn default_enabled() -> bool {
    true
}
fn default_bind() -> String {
    DEFAULT_IMPORT_BIND.to_string()
}
fn default_max_body_bytes() -> usize {
    32 * 1024 * 1024
}
fn default_preview_max_width() -> u32 {
    560
}
fn default_preview_max_height() -> u32 {
    800
}

impl ImportConfig {
    /// Parses `bind` and checks that it names a loopback interface.
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        let addr: SocketAddr = self
            .bind
            .parse()
            .with_context(|| format!("import.bind is not a socket address: '{}'", self.bind))?;
        if !addr.ip().is_loopback() {
            anyhow::bail!(
                "import.bind must be a loopback address (e.g. {}), got '{}'",
                DEFAULT_IMPORT_BIND,
                self.bind
            );
        }
        Ok(addr)
    }
}

impl Config {
    /// All defaults. Used when no config file exists yet.
    pub fn minimal() -> Self {
        Self::default()
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    validate(&config)?;

    Ok(config)
}

/// Loads `path` when it exists, otherwise falls back to [`Config::minimal`].
pub fn load_or_default(path: &Path) -> Result<Config> {
    if path.exists() {
        load_config(path)
    } else {
        Ok(Config::minimal())
    }
}

fn validate(config: &Config) -> Result<()> {
    config.import.bind_addr()?;

    if config.import.max_body_bytes == 0 {
        anyhow::bail!("import.max_body_bytes must be > 0");
    }

    if config.import.preview_max_width == 0 || config.import.preview_max_height == 0 {
        anyhow::bail!("import.preview_max_width and import.preview_max_height must be > 0");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> Result<Config> {
        let config: Config = toml::from_str(src)?;
        validate(&config)?;
        Ok(config)
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = parse("").unwrap();
        assert!(config.import.enabled);
        assert_eq!(config.import.bind, "127.0.0.1:27777");
        assert_eq!(config.import.preview_max_width, 560);
        assert_eq!(config.import.preview_max_height, 800);
        assert_eq!(config.settings.path, PathBuf::from("./settings.json"));
    }

    #[test]
    fn test_overrides() {
        let config = parse(
            r#"
[settings]
path = "/tmp/qbank/settings.json"

[import]
enabled = false
bind = "127.0.0.1:0"
preview_max_width = 300
"#,
        )
        .unwrap();
        assert!(!config.import.enabled);
        assert_eq!(config.import.bind_addr().unwrap().port(), 0);
        assert_eq!(config.import.preview_max_width, 300);
        assert_eq!(config.import.preview_max_height, 800);
    }

    #[test]
    fn test_wildcard_bind_rejected() {
        let err = parse("[import]\nbind = \"0.0.0.0:27777\"\n").unwrap_err();
        assert!(err.to_string().contains("loopback"));
    }

    #[test]
    fn test_ipv6_loopback_accepted() {
        let config = parse("[import]\nbind = \"[::1]:27777\"\n").unwrap();
        assert!(config.import.bind_addr().unwrap().ip().is_loopback());
    }

    #[test]
    fn test_garbage_bind_rejected() {
        assert!(parse("[import]\nbind = \"localhost\"\n").is_err());
    }

    #[test]
    fn test_zero_preview_box_rejected() {
        assert!(parse("[import]\npreview_max_height = 0\n").is_err());
    }

    #[test]
    fn test_missing_file_falls_back_to_minimal() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = load_or_default(&tmp.path().join("absent.toml")).unwrap();
        assert_eq!(config.import.bind, DEFAULT_IMPORT_BIND);
    }
}
