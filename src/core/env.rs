//! Environment configuration loaded from a dotenv-style file

use crate::core::{connection::ConnectionInfo, mask::SecretMasker};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Key looked up when the pipeline file does not name one
pub const DEFAULT_REQUIRED_KEY: &str = "DATABASE_URL";

/// Errors raised before any step runs
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file not found: {}", .path.display())]
    ConfigNotFound { path: PathBuf },

    #[error("required key '{key}' is missing from {}", .path.display())]
    MissingRequiredKey { key: String, path: PathBuf },

    #[error("failed to parse {}: {reason}", .path.display())]
    ConfigParse { path: PathBuf, reason: String },
}

/// Key-value settings read from the configuration file
#[derive(Debug, Clone)]
pub struct EnvironmentConfig {
    path: PathBuf,
    values: BTreeMap<String, String>,
    required_key: String,
}

impl EnvironmentConfig {
    /// Load and validate the configuration file
    ///
    /// Fails with [`ConfigError::ConfigNotFound`] when the file is absent and
    /// with [`ConfigError::MissingRequiredKey`] when `required_key` is not set
    /// or empty.
    pub fn load<P: AsRef<Path>>(path: P, required_key: &str) -> Result<Self, ConfigError> {
        let path = path.as_ref().to_path_buf();
        if !path.is_file() {
            return Err(ConfigError::ConfigNotFound { path });
        }

        let iter = dotenvy::from_path_iter(&path).map_err(|e| match e {
            dotenvy::Error::Io(ref io) if io.kind() == std::io::ErrorKind::NotFound => {
                ConfigError::ConfigNotFound { path: path.clone() }
            }
            other => parse_failure(&path, other),
        })?;

        let mut values = BTreeMap::new();
        for item in iter {
            let (key, value) = item.map_err(|e| parse_failure(&path, e))?;
            values.insert(key, value);
        }

        debug!("Loaded {} keys from {}", values.len(), path.display());
        Self::from_values(path, values, required_key)
    }

    /// Build a config from already-parsed values, enforcing the required key
    pub fn from_values(
        path: PathBuf,
        values: BTreeMap<String, String>,
        required_key: &str,
    ) -> Result<Self, ConfigError> {
        match values.get(required_key) {
            Some(value) if !value.trim().is_empty() => Ok(Self {
                path,
                values,
                required_key: required_key.to_string(),
            }),
            _ => Err(ConfigError::MissingRequiredKey {
                key: required_key.to_string(),
                path,
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn values(&self) -> &BTreeMap<String, String> {
        &self.values
    }

    pub fn required_key(&self) -> &str {
        &self.required_key
    }

    /// Value of the required key (the datastore connection string)
    pub fn connection_string(&self) -> &str {
        self.values
            .get(&self.required_key)
            .map(String::as_str)
            .unwrap_or_default()
    }

    /// Structured view of the connection string, if it is URL shaped
    pub fn connection_info(&self) -> Option<ConnectionInfo> {
        ConnectionInfo::parse(self.connection_string())
    }

    /// Register secrets that live in this config: values of `secret_keys`
    /// and the connection string's password component
    pub fn collect_secrets(&self, secret_keys: &[String], masker: &mut SecretMasker) {
        for key in secret_keys {
            if let Some(value) = self.values.get(key) {
                masker.add(value.clone());
            }
        }
        if let Some(password) = self.connection_info().and_then(|info| info.password) {
            masker.add(password);
        }
    }

    /// The one line shown to the user: `KEY=value` with secrets masked
    pub fn display_line(&self, masker: &SecretMasker) -> String {
        masker.mask(&format!("{}={}", self.required_key, self.connection_string()))
    }
}

/// Turn a dotenv error into [`ConfigError::ConfigParse`]
///
/// The parser reports malformed entries with the raw line attached, and that
/// line may hold the very secret being protected, so only its number is kept.
fn parse_failure(path: &Path, error: dotenvy::Error) -> ConfigError {
    let reason = match error {
        dotenvy::Error::LineParse(line, _) => match line_number(path, &line) {
            Some(number) => format!("malformed entry on line {}", number),
            None => "malformed entry".to_string(),
        },
        other => other.to_string(),
    };
    ConfigError::ConfigParse {
        path: path.to_path_buf(),
        reason,
    }
}

/// 1-based line of `path` where the entry `text` starts
fn line_number(path: &Path, text: &str) -> Option<usize> {
    let first = text.lines().next()?.trim();
    let contents = std::fs::read_to_string(path).ok()?;
    contents
        .lines()
        .position(|line| line.trim() == first)
        .map(|index| index + 1)
}
