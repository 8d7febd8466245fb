//! Configuration loaded from a TOML file
//!
//! The encryption key is never part of the file. Only the name of the
//! environment variable that carries it is configured.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::access::EncryptionKey;
use crate::domain::audit::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use crate::error::{Error, Result};
use crate::infrastructure::{DatabaseConfig, default_database_path};

/// Environment variable that overrides the config directory
pub const CONFIG_DIR_ENV: &str = "WARDEN_CONFIG_DIR";

/// Default environment variable carrying the base64 encryption key
pub const DEFAULT_KEY_ENV: &str = "WARDEN_ENCRYPTION_KEY";

/// Warden configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseSettings,
    pub audit: AuditSettings,
    pub logging: LoggingConfig,
    pub encryption: EncryptionSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    pub path: PathBuf,
    pub max_connections: u32,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            max_connections: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditSettings {
    pub default_page_size: u32,
    pub max_page_size: u32,
}

impl Default for AuditSettings {
    fn default() -> Self {
        Self {
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: MAX_PAGE_SIZE,
        }
    }
}

/// Log output settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, overridden by `RUST_LOG`
    pub filter: String,
    pub ansi: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "warden=info".to_string(),
            ansi: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncryptionSettings {
    /// Name of the environment variable holding the base64 key
    pub key_env: String,
    /// Read only so that validation can reject it
    #[serde(skip_serializing)]
    pub key: Option<String>,
}

impl Default for EncryptionSettings {
    fn default() -> Self {
        Self {
            key_env: DEFAULT_KEY_ENV.to_string(),
            key: None,
        }
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> Result<PathBuf> {
        if let Ok(custom_dir) = env::var(CONFIG_DIR_ENV) {
            return Ok(PathBuf::from(custom_dir));
        }
        dirs::config_dir()
            .map(|dir| dir.join("warden"))
            .ok_or_else(|| Error::Configuration("could not determine config directory".to_string()))
    }

    /// Get the config file path
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load from the default location; a missing file yields defaults
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load from an explicit path; a missing file yields defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents).map_err(|e| {
            Error::Configuration(format!("failed to parse {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.encryption.key.is_some() {
            return Err(Error::Configuration(format!(
                "the encryption key must not be stored in configuration; set {} instead",
                self.encryption.key_env
            )));
        }
        if self.encryption.key_env.trim().is_empty() {
            return Err(Error::Configuration(
                "encryption.key_env must not be empty".to_string(),
            ));
        }
        if self.database.max_connections == 0 {
            return Err(Error::Configuration(
                "database.max_connections must be at least 1".to_string(),
            ));
        }
        if self.audit.default_page_size == 0 || self.audit.max_page_size == 0 {
            return Err(Error::Configuration(
                "audit page sizes must be at least 1".to_string(),
            ));
        }
        if self.audit.default_page_size > self.audit.max_page_size {
            return Err(Error::Configuration(
                "audit.default_page_size must not exceed audit.max_page_size".to_string(),
            ));
        }
        Ok(())
    }

    /// Read and decode the key from the configured environment variable
    pub fn load_encryption_key(&self) -> Result<EncryptionKey> {
        self.load_encryption_key_with(|name| env::var(name).ok())
    }

    /// Same as [`Config::load_encryption_key`] with an injectable lookup
    pub fn load_encryption_key_with(
        &self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<EncryptionKey> {
        let name = &self.encryption.key_env;
        let encoded = lookup(name)
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| {
                Error::Configuration(format!("encryption key variable {} is not set", name))
            })?;
        EncryptionKey::from_base64(encoded.trim()).map_err(|e| {
            Error::Configuration(format!("encryption key in {} is invalid: {}", name, e))
        })
    }

    /// Connection settings for [`crate::infrastructure::Database`]
    pub fn database_config(&self) -> DatabaseConfig {
        DatabaseConfig::with_path(&self.database.path).max_connections(self.database.max_connections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{Engine, engine::general_purpose::STANDARD};

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.audit.default_page_size, 20);
        assert_eq!(config.audit.max_page_size, 100);
        assert_eq!(config.logging.filter, "warden=info");
        assert_eq!(config.encryption.key_env, "WARDEN_ENCRYPTION_KEY");
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "[audit]\nmax_page_size = 50\n\n[database]\npath = \"/tmp/w.db\"\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.audit.max_page_size, 50);
        assert_eq!(config.audit.default_page_size, 20);
        assert_eq!(config.database.path, PathBuf::from("/tmp/w.db"));
        assert_eq!(config.database.max_connections, 5);
    }

    #[test]
    fn test_embedded_key_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[encryption]\nkey = \"c2VjcmV0\"\n").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_key_is_never_serialized() {
        let mut config = Config::default();
        config.encryption.key = Some("secret".to_string());
        let toml = toml::to_string(&config).unwrap();
        assert!(!toml.contains("secret"));
    }

    #[test]
    fn test_validate_rejects_bad_page_sizes() {
        let mut config = Config::default();
        config.audit.default_page_size = 200;
        assert!(config.validate().is_err());

        config.audit.default_page_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_encryption_key() {
        let config = Config::default();
        let encoded = STANDARD.encode([7u8; 32]);

        let key = config
            .load_encryption_key_with(|name| {
                (name == "WARDEN_ENCRYPTION_KEY").then(|| encoded.clone())
            })
            .unwrap();
        assert_eq!(key.to_base64(), encoded);
    }

    #[test]
    fn test_missing_or_short_key_fails_fast() {
        let config = Config::default();

        let missing = config.load_encryption_key_with(|_| None).unwrap_err();
        assert!(matches!(missing, Error::Configuration(_)));

        let short = STANDARD.encode([7u8; 16]);
        let err = config
            .load_encryption_key_with(|_| Some(short.clone()))
            .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
        assert_eq!(err.code(), "E100");
    }
}
