//! Backend trait for the Unity asset parser that does the actual decoding

use crate::category::CategorySet;
use anyhow::Result;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// One object the backend decoded and staged as a file.
#[derive(Debug, Clone, Deserialize)]
pub struct ExportedObject {
    /// Unity class name, e.g. `Texture2D`
    #[serde(rename = "class")]
    pub class_name: String,
    pub path_id: i64,
    #[serde(default)]
    pub name: Option<String>,
    /// Path of the payload, relative to the staging directory
    pub file: PathBuf,
    /// Payload format hint: `png`, `wav`, `obj`, `json`, `text`, `font`, ...
    pub format: String,
}

/// An object the backend found but could not decode.
#[derive(Debug, Clone, Deserialize)]
pub struct ObjectError {
    #[serde(rename = "class")]
    pub class_name: String,
    pub path_id: i64,
    pub message: String,
}

/// Everything a backend produced for one source file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BackendExport {
    #[serde(default)]
    pub unity_version: Option<String>,
    #[serde(default)]
    pub objects: Vec<ExportedObject>,
    /// Objects left alone because their class was not requested, by class name
    #[serde(default)]
    pub skipped: BTreeMap<String, usize>,
    #[serde(default)]
    pub errors: Vec<ObjectError>,
}

/// A Unity asset parser able to stage decoded objects on disk.
pub trait AssetBackend {
    /// Human readable backend name, used in logs
    fn name(&self) -> &str;

    /// Decode objects of the enabled categories from `source` into `staging`.
    fn export(&self, source: &Path, categories: &CategorySet, staging: &Path)
        -> Result<BackendExport>;

    /// Unity version of `source`, if the backend can tell.
    fn unity_version(&self, _source: &Path) -> Result<Option<String>> {
        Ok(None)
    }
}
