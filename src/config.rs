//! Optional YAML configuration file
//!
//! Values here are defaults; command-line flags win over them.

use crate::category::CategorySet;
use crate::request::OutputLayout;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Config file picked up from the working directory when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = "unity-ripper.yaml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Output directory
    #[serde(default)]
    pub output: Option<PathBuf>,

    /// Categories to extract; all when absent
    #[serde(default)]
    pub categories: Option<CategorySet>,

    #[serde(default)]
    pub layout: Option<OutputLayout>,

    /// Python interpreter hosting UnityPy
    #[serde(default)]
    pub python: Option<PathBuf>,

    /// Extra file extensions treated as asset containers while scanning
    #[serde(default)]
    pub extra_extensions: Vec<String>,

    /// Append log output to this file
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

impl Config {
    /// Load the given config file, or the default one if it exists.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.is_file() {
                    Self::from_file(default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        Self::parse(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn parse(contents: &str) -> Result<Self> {
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(contents)?)
    }
}
