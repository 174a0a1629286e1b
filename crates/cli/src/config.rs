//! `prestasi serve` configuration: a TOML file, then flag/env overrides.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use ed25519_dalek::VerifyingKey;
use prestasi_core::{LecturerRecord, StudentRecord, UserRecord};
use serde::Deserialize;

use crate::trust::keygen;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("error reading config '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("error parsing config '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("no token verifying key configured (set [auth] public_key, public_key_path, or PRESTASI_PUBLIC_KEY)")]
    MissingKey,
    #[error("{0}")]
    InvalidKey(String),
    #[error("invalid [server] api_prefix '{0}': must start with '/' and not end with '/'")]
    InvalidPrefix(String),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub uploads: UploadsConfig,
    pub directory: DirectorySeed,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen: SocketAddr,
    /// Maximum request body size in bytes.
    pub body_limit_bytes: usize,
    pub api_prefix: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([0, 0, 0, 0], 8080)),
            body_limit_bytes: 10 * 1024 * 1024,
            api_prefix: "/api/v1".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Base64 Ed25519 verifying key. Wins over `public_key_path`.
    pub public_key: Option<String>,
    pub public_key_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UploadsConfig {
    pub dir: PathBuf,
    pub url_prefix: String,
}

impl Default for UploadsConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("uploads/achievements"),
            url_prefix: "/uploads/achievements".to_string(),
        }
    }
}

/// Seed records for the in-memory directory.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DirectorySeed {
    pub users: Vec<UserRecord>,
    pub students: Vec<StudentRecord>,
    pub lecturers: Vec<LecturerRecord>,
}

/// Values from flags or their environment fallbacks.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub listen: Option<SocketAddr>,
    pub public_key: Option<String>,
    pub upload_dir: Option<PathBuf>,
}

impl Config {
    /// Read `path` if given, otherwise start from defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;
                Self::parse(&raw, path)
            }
            None => Ok(Self::default()),
        }
    }

    fn parse(raw: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn apply(&mut self, overrides: Overrides) {
        if let Some(listen) = overrides.listen {
            self.server.listen = listen;
        }
        if let Some(key) = overrides.public_key {
            self.auth.public_key = Some(key);
        }
        if let Some(dir) = overrides.upload_dir {
            self.uploads.dir = dir;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let prefix = &self.server.api_prefix;
        if !prefix.starts_with('/') || (prefix.len() > 1 && prefix.ends_with('/')) {
            return Err(ConfigError::InvalidPrefix(prefix.clone()));
        }
        self.verifying_key().map(|_| ())
    }

    pub fn verifying_key(&self) -> Result<VerifyingKey, ConfigError> {
        let encoded = match (&self.auth.public_key, &self.auth.public_key_path) {
            (Some(key), _) => key.clone(),
            (None, Some(path)) => std::fs::read_to_string(path).map_err(|source| {
                ConfigError::Read {
                    path: path.clone(),
                    source,
                }
            })?,
            (None, None) => return Err(ConfigError::MissingKey),
        };
        keygen::decode_public_key(&encoded).map_err(ConfigError::InvalidKey)
    }
}
