//! Configuration loading
//!
//! Values come from, in order of precedence: command-line flags and
//! `EAUDIT_*` environment variables (both handled by clap), the TOML config
//! file, then built-in defaults.

use eaudit_scanner::scan::DEFAULT_BATCH_SIZE;
use eaudit_scanner::{client::DEFAULT_TIMEOUT, Credentials, ScanOptions};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("Failed to read config {path}: {message}")]
    Read { path: PathBuf, message: String },

    /// Config file is not valid TOML or has unexpected fields
    #[error("Invalid config {path}: {message}")]
    Parse { path: PathBuf, message: String },

    /// A required value was not provided anywhere
    #[error("Missing {field}; set it in the config file, with --{flag}, or via {env}")]
    Missing {
        field: &'static str,
        flag: &'static str,
        env: &'static str,
    },

    /// A value is out of range
    #[error("Invalid setting: {0}")]
    Invalid(String),
}

impl ConfigError {
    /// Stable code for the error kind
    pub fn code(&self) -> &'static str {
        match self {
            Self::Read { .. } => "CONFIG_READ",
            Self::Parse { .. } => "CONFIG_PARSE",
            Self::Missing { .. } => "CONFIG_MISSING",
            Self::Invalid(_) => "CONFIG_INVALID",
        }
    }
}

/// Scan tunables section of the config file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScanSection {
    pub batch_size: Option<usize>,
    pub timeout_secs: Option<u64>,
}

/// Contents of `config.toml`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub url: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub include_mobile: bool,
    pub scan: ScanSection,
}

impl FileConfig {
    /// Load a config file.
    ///
    /// A missing file is only an error when the path was given explicitly.
    pub fn load(path: &Path, explicit: bool) -> Result<Self, ConfigError> {
        if !path.exists() {
            if explicit {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    message: "file not found".to_string(),
                });
            }
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}

/// Values supplied on the command line or through the environment
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub url: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

/// Effective configuration after merging every source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub url: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub include_mobile: bool,
    pub options: ScanOptions,
    /// File the settings were read from
    pub source: PathBuf,
}

impl Settings {
    /// Merge overrides on top of a file config
    pub fn resolve(
        file: FileConfig,
        overrides: Overrides,
        source: PathBuf,
    ) -> Result<Self, ConfigError> {
        let batch_size = file.scan.batch_size.unwrap_or(DEFAULT_BATCH_SIZE);
        if batch_size == 0 {
            return Err(ConfigError::Invalid("scan.batch_size must be at least 1".to_string()));
        }
        let timeout = match file.scan.timeout_secs {
            Some(0) => {
                return Err(ConfigError::Invalid("scan.timeout_secs must be at least 1".to_string()))
            }
            Some(secs) => Duration::from_secs(secs),
            None => DEFAULT_TIMEOUT,
        };

        Ok(Self {
            url: overrides.url.or(file.url),
            client_id: overrides.client_id.or(file.client_id),
            client_secret: overrides.client_secret.or(file.client_secret),
            include_mobile: file.include_mobile,
            options: ScanOptions {
                batch_size,
                timeout,
            },
            source,
        })
    }

    /// Credentials for the token exchange; every field is required
    pub fn credentials(&self) -> Result<Credentials, ConfigError> {
        let url = self.url.clone().ok_or(ConfigError::Missing {
            field: "server URL",
            flag: "url",
            env: "EAUDIT_URL",
        })?;
        let client_id = self.client_id.clone().ok_or(ConfigError::Missing {
            field: "client id",
            flag: "client-id",
            env: "EAUDIT_CLIENT_ID",
        })?;
        let client_secret = self.client_secret.clone().ok_or(ConfigError::Missing {
            field: "client secret",
            flag: "client-secret",
            env: "EAUDIT_CLIENT_SECRET",
        })?;
        Ok(Credentials::new(url, client_id, client_secret))
    }
}

/// Default config file location
///
/// Priority:
/// 1. $HOME/.eaudit/config.toml
/// 2. Platform home directory
/// 3. Current directory
pub fn default_config_path() -> PathBuf {
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".eaudit").join("config.toml");
    }
    dirs::home_dir()
        .map(|home| home.join(".eaudit").join("config.toml"))
        .unwrap_or_else(|| PathBuf::from("eaudit.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(content: &str) -> FileConfig {
        toml::from_str(content).unwrap()
    }

    #[test]
    fn test_parse_full_config() {
        let file = parse(
            r#"
url = "https://example.jamfcloud.com"
client_id = "abc"
client_secret = "shh"
include_mobile = true

[scan]
batch_size = 10
timeout_secs = 45
"#,
        );
        let settings = Settings::resolve(file, Overrides::default(), PathBuf::from("c.toml")).unwrap();
        assert_eq!(settings.url.as_deref(), Some("https://example.jamfcloud.com"));
        assert!(settings.include_mobile);
        assert_eq!(settings.options.batch_size, 10);
        assert_eq!(settings.options.timeout, Duration::from_secs(45));
        assert!(settings.credentials().is_ok());
    }

    #[test]
    fn test_overrides_win() {
        let file = parse("url = \"https://file.example\"\nclient_id = \"file-id\"\n");
        let overrides = Overrides {
            url: Some("https://flag.example".to_string()),
            client_id: None,
            client_secret: Some("env-secret".to_string()),
        };
        let settings = Settings::resolve(file, overrides, PathBuf::new()).unwrap();
        assert_eq!(settings.url.as_deref(), Some("https://flag.example"));
        assert_eq!(settings.client_id.as_deref(), Some("file-id"));
        assert_eq!(settings.client_secret.as_deref(), Some("env-secret"));
    }

    #[test]
    fn test_defaults_and_missing_credentials() {
        let settings =
            Settings::resolve(FileConfig::default(), Overrides::default(), PathBuf::new()).unwrap();
        assert_eq!(settings.options, ScanOptions::default());
        assert!(!settings.include_mobile);

        let err = settings.credentials().unwrap_err();
        assert_eq!(err.code(), "CONFIG_MISSING");
        assert!(err.to_string().contains("EAUDIT_URL"));
    }

    #[test]
    fn test_rejects_zero_batch_size_and_unknown_keys() {
        let file = parse("[scan]\nbatch_size = 0\n");
        assert!(matches!(
            Settings::resolve(file, Overrides::default(), PathBuf::new()),
            Err(ConfigError::Invalid(_))
        ));
        assert!(toml::from_str::<FileConfig>("colour = \"blue\"").is_err());
    }

    #[test]
    fn test_missing_default_file_is_empty() {
        let path = PathBuf::from("/nonexistent/eaudit/config.toml");
        assert_eq!(FileConfig::load(&path, false).unwrap(), FileConfig::default());
        assert!(matches!(
            FileConfig::load(&path, true),
            Err(ConfigError::Read { .. })
        ));
    }
}
