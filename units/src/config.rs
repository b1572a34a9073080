//! Unit system configuration
//!
//! Supports loading from the `[units]` section of a `sounio.toml` manifest,
//! or from a standalone `units.toml` / `units.json` file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::exponents::UnitReplacements;

/// Unit system configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Definition files, applied in order; empty selects the bundled set
    #[serde(default)]
    pub definitions: Vec<PathBuf>,

    /// Track dimensions; when off, quantities collapse to plain numbers
    #[serde(default = "default_use_quantities")]
    pub use_quantities: bool,

    /// Search depth for display-unit simplification when formatting
    #[serde(default = "default_simplification_level")]
    pub simplification_level: usize,

    /// Per-style display substitutions
    #[serde(default)]
    pub unit_replacements: UnitReplacements,
}

fn default_use_quantities() -> bool {
    true
}
fn default_simplification_level() -> usize {
    2
}

impl Default for Config {
    fn default() -> Self {
        Config {
            definitions: Vec::new(),
            use_quantities: default_use_quantities(),
            simplification_level: default_simplification_level(),
            unit_replacements: UnitReplacements::default(),
        }
    }
}

impl Config {
    /// Load from a `.toml` or `.json` file
    ///
    /// Relative definition paths are resolved against the file's directory.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;

        let mut config: Config = if path.extension().is_some_and(|e| e == "toml") {
            toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?
        } else if path.extension().is_some_and(|e| e == "json") {
            serde_json::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?
        } else {
            return Err(ConfigError::Parse("Unknown config file format".to_string()));
        };
        config.resolve_relative_to(path);
        Ok(config)
    }

    /// Find a config in the directory hierarchy above `start`
    pub fn find_config(start: &Path) -> Option<Self> {
        let mut dir = if start.is_file() {
            start.parent()?.to_path_buf()
        } else {
            start.to_path_buf()
        };

        loop {
            let manifest = dir.join("sounio.toml");
            if manifest.exists()
                && let Ok(Some(config)) = Self::from_manifest(&manifest)
            {
                return Some(config);
            }

            for name in ["units.toml", "units.json"] {
                let file = dir.join(name);
                if file.exists()
                    && let Ok(config) = Self::from_file(&file)
                {
                    return Some(config);
                }
            }

            if !dir.pop() {
                break;
            }
        }

        None
    }

    /// Load the `[units]` section of a project manifest, if it has one
    pub fn from_manifest(path: &Path) -> Result<Option<Self>, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;

        let manifest: toml::Value =
            toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;

        match manifest.get("units") {
            Some(units) => {
                let mut config: Config = units
                    .clone()
                    .try_into()
                    .map_err(|e: toml::de::Error| ConfigError::Parse(e.to_string()))?;
                config.resolve_relative_to(path);
                Ok(Some(config))
            }
            None => Ok(None),
        }
    }

    fn resolve_relative_to(&mut self, file: &Path) {
        let Some(base) = file.parent() else {
            return;
        };
        for definition in &mut self.definitions {
            if definition.is_relative() {
                *definition = base.join(&*definition);
            }
        }
    }

    /// Config with dimension tracking switched off
    pub fn without_quantities() -> Self {
        Config {
            use_quantities: false,
            ..Config::default()
        }
    }
}

/// Configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Parse error: {0}")]
    Parse(String),
}
