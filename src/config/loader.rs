use crate::config::schema::{FormatConfig, ValidationError};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Project-level config file, looked up from the start directory upwards.
pub const PROJECT_CONFIG_NAME: &str = ".format-on-save.toml";

/// User-level config file, relative to the home directory.
const USER_CONFIG_PATH: &str = ".config/format-on-save/config.toml";

/// Where a config came from. Every [`ConfigError`] carries one, so messages
/// say which of several candidate files was at fault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigOrigin {
    /// Passed in as a string
    Inline,
    /// Named on the command line
    Explicit(PathBuf),
    /// Found by walking up from the project directory
    Project(PathBuf),
    /// Found in the user's home directory
    User(PathBuf),
}

impl ConfigOrigin {
    pub fn path(&self) -> Option<&Path> {
        match self {
            ConfigOrigin::Inline => None,
            ConfigOrigin::Explicit(path)
            | ConfigOrigin::Project(path)
            | ConfigOrigin::User(path) => Some(path),
        }
    }
}

impl fmt::Display for ConfigOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigOrigin::Inline => write!(f, "inline config"),
            ConfigOrigin::Explicit(path) => write!(f, "config {}", path.display()),
            ConfigOrigin::Project(path) => write!(f, "project config {}", path.display()),
            ConfigOrigin::User(path) => write!(f, "user config {}", path.display()),
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {origin}: {source}")]
    Read {
        origin: ConfigOrigin,
        source: std::io::Error,
    },

    #[error("failed to parse {origin}: {source}")]
    Parse {
        origin: ConfigOrigin,
        source: toml_edit::de::Error,
    },

    #[error("invalid {origin}: {source}")]
    Invalid {
        origin: ConfigOrigin,
        source: ValidationError,
    },
}

impl ConfigError {
    pub fn origin(&self) -> &ConfigOrigin {
        match self {
            ConfigError::Read { origin, .. }
            | ConfigError::Parse { origin, .. }
            | ConfigError::Invalid { origin, .. } => origin,
        }
    }
}

fn parse(input: &str, origin: ConfigOrigin) -> Result<FormatConfig, ConfigError> {
    let config: FormatConfig = match toml_edit::de::from_str(input) {
        Ok(config) => config,
        Err(source) => return Err(ConfigError::Parse { origin, source }),
    };
    match config.validate() {
        Ok(()) => Ok(config),
        Err(source) => Err(ConfigError::Invalid { origin, source }),
    }
}

/// Read and parse the file an origin points at.
fn load(origin: ConfigOrigin) -> Result<FormatConfig, ConfigError> {
    let Some(path) = origin.path() else {
        return Ok(FormatConfig::default());
    };
    match fs::read_to_string(path) {
        Ok(contents) => parse(&contents, origin),
        Err(source) => Err(ConfigError::Read { origin, source }),
    }
}

pub fn load_from_str(input: &str) -> Result<FormatConfig, ConfigError> {
    parse(input, ConfigOrigin::Inline)
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<FormatConfig, ConfigError> {
    load(ConfigOrigin::Explicit(path.as_ref().to_path_buf()))
}

/// Locate the config that applies to `start_dir`.
///
/// Priority order:
/// 1. `.format-on-save.toml` in `start_dir` or its nearest ancestor
/// 2. `~/.config/format-on-save/config.toml`
pub fn find_config(start_dir: &Path) -> Option<ConfigOrigin> {
    let project = start_dir
        .ancestors()
        .map(|dir| dir.join(PROJECT_CONFIG_NAME))
        .find(|candidate| candidate.is_file());
    if let Some(path) = project {
        return Some(ConfigOrigin::Project(path));
    }

    home::home_dir()
        .map(|home| home.join(USER_CONFIG_PATH))
        .filter(|candidate| candidate.is_file())
        .map(ConfigOrigin::User)
}

/// Load the config that applies to `start_dir`, falling back to defaults.
pub fn discover(start_dir: &Path) -> Result<FormatConfig, ConfigError> {
    match find_config(start_dir) {
        Some(origin) => {
            log::info!("using {origin}");
            load(origin)
        }
        None => {
            log::debug!("no config found from {}, using defaults", start_dir.display());
            Ok(FormatConfig::default())
        }
    }
}
