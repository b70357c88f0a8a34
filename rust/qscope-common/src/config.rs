//! Configuration shared by the restriction resolver, the restriction cache and
//! the subcorpus store.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::{Result, error::Error};

/// Tunables for scope resolution and the storage it relies on.
///
/// Every field has a default, so a configuration file only needs to name the
/// values it overrides:
///
/// ```toml
/// cache_directory = "/var/lib/qscope/cache"
/// restriction_cache_max_bytes = 1073741824
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScopeConfig {
    /// Directory holding subcorpus dumpfiles and the temporary dumpfiles used
    /// to activate restrictions in the query engine.
    pub cache_directory: PathBuf,

    /// When the restriction cache table grows beyond this many bytes,
    /// eviction starts.
    pub restriction_cache_max_bytes: u64,

    /// Eviction stops once the restriction cache table is at or below this
    /// many bytes.
    pub restriction_cache_floor_bytes: u64,

    /// Number of matches fetched per `tabulate` command while materializing
    /// multi-field condition sets.
    pub tabulate_batch_size: usize,

    /// Maximum length of an item identifier accepted in an item list.
    pub max_item_id_length: usize,
}

impl Default for ScopeConfig {
    fn default() -> Self {
        ScopeConfig {
            cache_directory: std::env::temp_dir().join("qscope"),
            restriction_cache_max_bytes: 512 * 1024 * 1024,
            restriction_cache_floor_bytes: 384 * 1024 * 1024,
            tabulate_batch_size: 1000,
            max_item_id_length: 255,
        }
    }
}

impl ScopeConfig {
    /// Parses a TOML document and validates the result.
    pub fn from_toml_str(text: &str) -> Result<ScopeConfig> {
        let config: ScopeConfig =
            toml::from_str(text).map_err(|e| Error::config("parse scope config", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a TOML configuration file.
    pub fn load(path: &Path) -> Result<ScopeConfig> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::io(format!("read config {}", path.display()), e))?;
        Self::from_toml_str(&text)
    }

    pub fn with_cache_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_directory = dir.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.tabulate_batch_size == 0 {
            return Err(Error::invalid_arg(
                "tabulate_batch_size",
                "batch size must be positive",
            ));
        }
        if self.restriction_cache_floor_bytes > self.restriction_cache_max_bytes {
            return Err(Error::invalid_arg(
                "restriction_cache_floor_bytes",
                format!(
                    "floor ({}) exceeds the limit ({})",
                    self.restriction_cache_floor_bytes, self.restriction_cache_max_bytes
                ),
            ));
        }
        if self.max_item_id_length == 0 {
            return Err(Error::invalid_arg(
                "max_item_id_length",
                "identifier length limit must be positive",
            ));
        }
        Ok(())
    }
}
