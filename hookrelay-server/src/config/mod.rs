//! Configuration loading for hookrelay-server.
//!
//! Reads the TOML file, applies CLI overrides, validates, and hashes a
//! plaintext admin secret on first load.

pub mod file;
pub mod runtime;

use crate::config::file::FileConfig;
use crate::config::runtime::{AdminConfig, DeliveryConfig, ServerConfig};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("password hashing error: {0}")]
    HashError(String),
}

pub struct LoadedConfig {
    pub server: ServerConfig,
    pub admin: AdminConfig,
    pub delivery: DeliveryConfig,
}

pub struct ConfigLoader {
    config_path: PathBuf,
    listen_override: Option<SocketAddr>,
}

impl ConfigLoader {
    pub fn new(config_path: impl AsRef<Path>, listen_override: Option<SocketAddr>) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
            listen_override,
        }
    }

    /// Load and process the configuration.
    ///
    /// 1. Read the TOML file
    /// 2. Apply CLI overrides
    /// 3. Validate
    /// 4. Hash the admin secret if it's plaintext (and rewrite the file)
    pub fn load(&self) -> Result<LoadedConfig, ConfigError> {
        let config_content = std::fs::read_to_string(&self.config_path)?;
        let mut file_config: FileConfig = toml::from_str(&config_content)?;

        if let Some(listen) = self.listen_override {
            file_config.server.listen = listen;
        }

        validate(&file_config)?;

        let secret_hash = if file_config.is_admin_secret_hashed() {
            file_config.admin.secret.clone()
        } else {
            let hash = hash_secret(&file_config.admin.secret)?;
            file_config.admin.secret = hash.clone();
            self.rewrite_config(&file_config)?;
            tracing::info!("Admin secret hashed and config file updated");
            hash
        };

        Ok(build_loaded_config(file_config, secret_hash))
    }

    /// Reload on SIGHUP. Same steps as [`load`](Self::load).
    pub fn reload(&self) -> Result<LoadedConfig, ConfigError> {
        self.load()
    }

    fn rewrite_config(&self, config: &FileConfig) -> Result<(), ConfigError> {
        let toml_string = toml::to_string_pretty(config)?;

        // Write to a sibling temp file, then rename over the original.
        let temp_path = self.config_path.with_extension("toml.tmp");
        std::fs::write(&temp_path, toml_string)?;
        std::fs::rename(&temp_path, &self.config_path)?;

        Ok(())
    }
}

fn validate(config: &FileConfig) -> Result<(), ConfigError> {
    if config.admin.secret.is_empty() {
        return Err(ConfigError::ValidationError(
            "admin.secret must not be empty".to_string(),
        ));
    }
    let delivery = &config.delivery;
    if delivery.default_max_attempts == Some(0) {
        return Err(ConfigError::ValidationError(
            "delivery.default_max_attempts must be at least 1".to_string(),
        ));
    }
    if delivery.default_timeout_secs == Some(0) {
        return Err(ConfigError::ValidationError(
            "delivery.default_timeout_secs must be positive".to_string(),
        ));
    }
    if delivery.user_agent.as_deref().is_some_and(|ua| ua.trim().is_empty()) {
        return Err(ConfigError::ValidationError(
            "delivery.user_agent must not be blank".to_string(),
        ));
    }
    Ok(())
}

fn hash_secret(plaintext: &str) -> Result<String, ConfigError> {
    use argon2::{
        Argon2, PasswordHasher,
        password_hash::{SaltString, rand_core::OsRng},
    };

    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plaintext.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ConfigError::HashError(e.to_string()))
}

fn build_loaded_config(file_config: FileConfig, secret_hash: String) -> LoadedConfig {
    let defaults = DeliveryConfig::default();
    let delivery = file_config.delivery;

    LoadedConfig {
        server: ServerConfig {
            listen: file_config.server.listen,
        },
        admin: AdminConfig::new(secret_hash),
        delivery: DeliveryConfig {
            default_max_attempts: delivery
                .default_max_attempts
                .unwrap_or(defaults.default_max_attempts),
            default_attempt_timeout: delivery
                .default_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.default_attempt_timeout),
            user_agent: delivery.user_agent.unwrap_or(defaults.user_agent),
        },
    }
}
