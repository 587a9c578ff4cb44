//! fil.toml configuration parser.
//!
//! Config is optional and layered: files found in the standard locations
//! are merged in order, later files overriding earlier ones key by key.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::dest::AliasTable;

pub const CONFIG_FILE_NAME: &str = "fil.toml";

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Capacity of a printer slot location with no explicit entry.
pub const DEFAULT_SLOT_CAPACITY: u32 = 1;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilConfig {
    /// Base URL of the Spoolman instance, e.g. `http://spoolman.local:7912`.
    pub api_base: Option<String>,
    /// Directory searched for plan files in addition to the working directory.
    pub plans_dir: Option<PathBuf>,
    pub request_timeout_secs: Option<u64>,
    /// Alias (matched case-insensitively) to location name.
    pub location_aliases: HashMap<String, String>,
    /// Printer name to the ordered slot locations it controls.
    pub printers: BTreeMap<String, Vec<String>>,
    /// Slot capacity per location; slots default to 1.
    pub location_capacity: HashMap<String, u32>,
}

impl FilConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load and merge every config file found in the standard locations.
    ///
    /// Returns the default config when none exist.
    pub fn load_merged() -> Result<Self, ConfigError> {
        let mut merged = FilConfig::default();
        for path in discover_config_paths() {
            debug!(path = %path.display(), "loading config layer");
            merged.merge(FilConfig::from_file(&path)?);
        }
        Ok(merged)
    }

    /// Load an explicit path, or the merged standard locations when `None`.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => Self::load_merged()?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Overlay `other` on top of `self`. Scalars override when set, maps merge by key.
    pub fn merge(&mut self, other: FilConfig) {
        if other.api_base.is_some() {
            self.api_base = other.api_base;
        }
        if other.plans_dir.is_some() {
            self.plans_dir = other.plans_dir;
        }
        if other.request_timeout_secs.is_some() {
            self.request_timeout_secs = other.request_timeout_secs;
        }
        self.location_aliases.extend(other.location_aliases);
        self.printers.extend(other.printers);
        self.location_capacity.extend(other.location_capacity);
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some((location, _)) = self.location_capacity.iter().find(|(_, cap)| **cap == 0) {
            return Err(ConfigError::Invalid(format!(
                "location_capacity for '{location}' must be at least 1"
            )));
        }
        if let Some((printer, _)) = self.printers.iter().find(|(_, slots)| slots.is_empty()) {
            return Err(ConfigError::Invalid(format!(
                "printer '{printer}' has no slot locations"
            )));
        }
        Ok(())
    }

    pub fn api_base(&self) -> Result<&str, ConfigError> {
        self.api_base
            .as_deref()
            .filter(|base| !base.trim().is_empty())
            .ok_or_else(|| ConfigError::Invalid("api_base is not configured".to_string()))
    }

    pub fn request_timeout_secs(&self) -> u64 {
        self.request_timeout_secs
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS)
    }

    pub fn aliases(&self) -> AliasTable {
        AliasTable::new(&self.location_aliases)
    }

    /// Capacity of a slot location, defaulting to [`DEFAULT_SLOT_CAPACITY`].
    pub fn slot_capacity(&self, location: &str) -> u32 {
        self.location_capacity
            .get(location)
            .copied()
            .unwrap_or(DEFAULT_SLOT_CAPACITY)
    }

    /// Printer owning a slot location, if any.
    pub fn printer_for_location(&self, location: &str) -> Option<&str> {
        self.printers
            .iter()
            .find(|(_, slots)| slots.iter().any(|slot| slot == location))
            .map(|(name, _)| name.as_str())
    }

    pub fn is_printer_slot(&self, location: &str) -> bool {
        self.printer_for_location(location).is_some()
    }
}

/// Existing config paths in merge order: home, XDG, working directory.
pub fn discover_config_paths() -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    if let Some(home) = dirs::home_dir() {
        candidates.push(home.join(".config").join("fil").join(CONFIG_FILE_NAME));
    }
    if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME").filter(|v| !v.is_empty()) {
        candidates.push(PathBuf::from(xdg).join("fil").join(CONFIG_FILE_NAME));
    }
    if let Ok(cwd) = std::env::current_dir() {
        candidates.push(cwd.join(CONFIG_FILE_NAME));
    }

    let mut found: Vec<PathBuf> = Vec::new();
    for path in candidates {
        if path.is_file() && !found.contains(&path) {
            found.push(path);
        }
    }
    found
}
