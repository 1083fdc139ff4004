//! Application configuration management.
//!
//! Settings are layered with `figment`, lowest priority first:
//!
//! 1. Built-in defaults
//! 2. `dupefind.toml` in the platform config directory, or the file given
//!    with `--config`
//! 3. `DUPEFIND_*` environment variables (e.g. `DUPEFIND_CHUNK_SIZE=65536`)
//! 4. Command-line flags
//!
//! ```toml
//! output = "/tmp/dupes.csv"
//! chunk_size = 65536
//! hash_workers = 8
//! verify_workers = 2
//! page_size = 256
//! ```

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::duplicates::hash_stage::HASH_WORKERS;
use crate::duplicates::verify::VERIFY_WORKERS;
use crate::duplicates::FinderConfig;
use crate::scanner::{WalkerConfig, DEFAULT_CHUNK_SIZE, DEFAULT_PAGE_SIZE};

/// Default name of the result file.
pub const DEFAULT_OUTPUT: &str = "duplifind_result.csv";

/// File name looked up in the platform config directory.
pub const CONFIG_FILE_NAME: &str = "dupefind.toml";

/// Prefix for environment variable overrides.
pub const ENV_PREFIX: &str = "DUPEFIND_";

/// Errors from loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An explicitly requested config file does not exist.
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    /// A layer could not be parsed or had the wrong type.
    #[error("Invalid configuration: {0}")]
    Invalid(#[from] Box<figment::Error>),

    /// A value is out of range.
    #[error("Invalid value for '{field}': must be greater than 0")]
    Zero {
        /// Name of the offending field
        field: &'static str,
    },
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Invalid(Box::new(err))
    }
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// File the duplicate groups are appended to.
    pub output: PathBuf,
    /// Bytes per read when hashing and verifying.
    pub chunk_size: usize,
    /// Number of hashing workers.
    pub hash_workers: usize,
    /// Number of byte verification workers.
    pub verify_workers: usize,
    /// Directory entries listed per page during the walk.
    pub page_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output: PathBuf::from(DEFAULT_OUTPUT),
            chunk_size: DEFAULT_CHUNK_SIZE,
            hash_workers: HASH_WORKERS,
            verify_workers: VERIFY_WORKERS,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Values given on the command line; `None` leaves the lower layers alone.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Overrides {
    /// Result file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
    /// Chunk size in bytes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunk_size: Option<usize>,
    /// Hashing workers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash_workers: Option<usize>,
    /// Verification workers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verify_workers: Option<usize>,
}

impl Config {
    /// Load the configuration from every layer.
    ///
    /// With `explicit_file = None` the default config file is used if it
    /// exists.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if an explicit file is missing, a layer does
    /// not parse, or a value is out of range.
    pub fn load(explicit_file: Option<&Path>, overrides: &Overrides) -> Result<Self, ConfigError> {
        let file = match explicit_file {
            Some(path) if !path.is_file() => return Err(ConfigError::NotFound(path.to_path_buf())),
            Some(path) => Some(path.to_path_buf()),
            None => Self::default_path().filter(|p| p.is_file()),
        };

        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(ref path) = file {
            log::debug!("Loading config from {}", path.display());
            figment = figment.merge(Toml::file(path));
        }
        let config: Self = figment
            .merge(Env::prefixed(ENV_PREFIX))
            .merge(Serialized::defaults(overrides))
            .extract()?;

        config.validate()?;
        log::debug!("Effective configuration: {:?}", config);
        Ok(config)
    }

    /// Reject values the pipeline cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Zero`] naming the first zero field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fields = [
            ("chunk_size", self.chunk_size),
            ("hash_workers", self.hash_workers),
            ("verify_workers", self.verify_workers),
            ("page_size", self.page_size),
        ];
        match fields.iter().find(|(_, value)| *value == 0) {
            Some(&(field, _)) => Err(ConfigError::Zero { field }),
            None => Ok(()),
        }
    }

    /// Build the finder configuration these settings describe.
    #[must_use]
    pub fn finder_config(&self) -> FinderConfig {
        FinderConfig::default()
            .with_chunk_size(self.chunk_size)
            .with_hash_workers(self.hash_workers)
            .with_verify_workers(self.verify_workers)
            .with_walker_config(WalkerConfig::default().with_page_size(self.page_size))
    }

    /// Get the default platform-specific configuration path.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "dupefind").map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert_eq!(config.output, PathBuf::from("duplifind_result.csv"));
        assert_eq!(config.chunk_size, 104_856);
        assert_eq!(config.hash_workers, 16);
        assert_eq!(config.verify_workers, 4);
        assert_eq!(config.page_size, 128);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero() {
        let config = Config {
            verify_workers: 0,
            ..Config::default()
        };
        match config.validate() {
            Err(ConfigError::Zero { field }) => assert_eq!(field, "verify_workers"),
            other => panic!("Expected Zero error, got {other:?}"),
        }
    }

    #[test]
    fn test_finder_config_mapping() {
        let config = Config {
            chunk_size: 512,
            hash_workers: 3,
            verify_workers: 2,
            page_size: 9,
            ..Config::default()
        };
        let finder = config.finder_config();

        assert_eq!(finder.chunk_size, 512);
        assert_eq!(finder.hash_workers, 3);
        assert_eq!(finder.verify_workers, 2);
        assert_eq!(finder.walker_config.page_size, 9);
    }

    #[test]
    fn test_overrides_serialize_only_set_fields() {
        let overrides = Overrides {
            chunk_size: Some(10),
            ..Overrides::default()
        };
        let json = serde_json::to_value(&overrides).unwrap();
        assert_eq!(json, serde_json::json!({ "chunk_size": 10 }));
    }
}
