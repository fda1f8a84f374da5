//! Run configuration
//!
//! Configuration is written in RON. Every field is optional:
//!
//! ```ron
//! (
//!     output_dir: "output",
//!     record_reasons: true,
//!     checks: [Syntax, Strictness, Resolvability, AntiSpoof],
//!     dns: (
//!         timeout_secs: 5,
//!         min_cache_ttl_secs: 60,
//!         max_cache_ttl_secs: 3600,
//!     ),
//! )
//! ```

use std::{
    ffi::OsString,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use tracing::debug;

use crate::{check::CheckKind, dns::DnsConfig, error::ConfigError};

pub const CONFIG_ENV: &str = "EMPATH_VERIFY_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "empath-verify.config.ron";

#[derive(Debug, Clone, Deserialize)]
pub struct VerifyConfig {
    /// Directory the result files are written into
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Append the rejection reason to each line of `badEmails.csv`
    #[serde(default = "default_record_reasons")]
    pub record_reasons: bool,

    /// Checks to run, in order
    #[serde(default = "default_checks")]
    pub checks: Vec<CheckKind>,

    #[serde(default)]
    pub dns: DnsConfig,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

const fn default_record_reasons() -> bool {
    true
}

fn default_checks() -> Vec<CheckKind> {
    CheckKind::ALL.to_vec()
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            record_reasons: default_record_reasons(),
            checks: default_checks(),
            dns: DnsConfig::default(),
        }
    }
}

impl VerifyConfig {
    /// Parse a configuration from RON text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if the text is not a valid configuration.
    pub fn from_ron(content: &str, origin: &Path) -> Result<Self, ConfigError> {
        ron::from_str(content).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })
    }

    /// Read a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] if the file cannot be read, or
    /// [`ConfigError::Parse`] if it is not a valid configuration.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_ron(&content, path)
    }

    /// Load the configuration the binary should use, falling back to the
    /// defaults when no configuration file exists.
    ///
    /// # Errors
    ///
    /// See [`find_config_file`] and [`VerifyConfig::from_path`].
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match find_config_file(explicit)? {
            Some(path) => {
                debug!("Loading configuration from {}", path.display());
                Self::from_path(&path)
            }
            None => {
                debug!("No configuration file found, using defaults");
                Ok(Self::default())
            }
        }
    }
}

/// Find the configuration file using the following precedence:
/// 1. `explicit`, from the command line
/// 2. `EMPATH_VERIFY_CONFIG` environment variable
/// 3. `./empath-verify.config.ron` (current working directory)
///
/// # Errors
///
/// Returns [`ConfigError::MissingEnvPath`] if the environment variable names a
/// file that does not exist.
pub fn find_config_file(explicit: Option<&Path>) -> Result<Option<PathBuf>, ConfigError> {
    locate(explicit, std::env::var_os(CONFIG_ENV), Path::new(DEFAULT_CONFIG_FILE))
}

fn locate(
    explicit: Option<&Path>,
    env_path: Option<OsString>,
    default_path: &Path,
) -> Result<Option<PathBuf>, ConfigError> {
    if let Some(path) = explicit {
        return Ok(Some(path.to_path_buf()));
    }

    if let Some(env_path) = env_path {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(Some(path));
        }
        return Err(ConfigError::MissingEnvPath(path));
    }

    Ok(default_path.exists().then(|| default_path.to_path_buf()))
}
