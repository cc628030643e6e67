//! Extraction request: what to read, where to write, and which categories to export

use crate::category::CategorySet;
use crate::error::RipperError;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// How extracted files are arranged under each source folder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputLayout {
    /// `<output>/<source>/<category>/<file>`
    #[default]
    Categorized,
    /// `<output>/<source>/<file>`
    Flat,
}

/// A single extraction run. Built once from user input and never mutated.
#[derive(Debug, Clone)]
pub struct ExtractionRequest {
    input: PathBuf,
    output: PathBuf,
    categories: CategorySet,
    verbose: bool,
    layout: OutputLayout,
}

impl ExtractionRequest {
    pub fn new(
        input: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
        categories: CategorySet,
        verbose: bool,
    ) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            categories,
            verbose,
            layout: OutputLayout::default(),
        }
    }

    pub fn with_layout(mut self, layout: OutputLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn input(&self) -> &Path {
        &self.input
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    pub fn categories(&self) -> &CategorySet {
        &self.categories
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }

    pub fn layout(&self) -> OutputLayout {
        self.layout
    }

    /// Check that the input can be read and the output can be used.
    ///
    /// Nothing is created on disk; the output directory is only checked for
    /// conflicts (an existing regular file, or a location inside the input).
    pub fn validate(&self) -> Result<(), RipperError> {
        let meta = match fs::metadata(&self.input) {
            Ok(meta) => meta,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(RipperError::InputNotFound(self.input.clone()));
            }
            Err(source) => {
                return Err(RipperError::InputUnreadable {
                    path: self.input.clone(),
                    source,
                });
            }
        };

        let readable = if meta.is_dir() {
            fs::read_dir(&self.input).map(|_| ())
        } else {
            fs::File::open(&self.input).map(|_| ())
        };
        readable.map_err(|source| RipperError::InputUnreadable {
            path: self.input.clone(),
            source,
        })?;

        if let Ok(out_meta) = fs::metadata(&self.output) {
            if !out_meta.is_dir() {
                return Err(RipperError::OutputNotWritable {
                    path: self.output.clone(),
                    source: io::Error::new(io::ErrorKind::AlreadyExists, "not a directory"),
                });
            }
        }

        let input_abs = absolutize(&self.input).map_err(|source| RipperError::InputUnreadable {
            path: self.input.clone(),
            source,
        })?;
        let output_abs =
            absolutize(&self.output).map_err(|source| RipperError::OutputNotWritable {
                path: self.output.clone(),
                source,
            })?;

        if meta.is_dir() && output_abs.starts_with(&input_abs) {
            return Err(RipperError::OutputInsideInput {
                input: self.input.clone(),
                output: self.output.clone(),
            });
        }

        Ok(())
    }
}

/// Resolve a path that may not exist yet, canonicalizing its deepest existing ancestor.
fn absolutize(path: &Path) -> io::Result<PathBuf> {
    let path = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };

    let mut existing = path.as_path();
    let mut rest = Vec::new();
    loop {
        if existing.exists() {
            let mut resolved = existing.canonicalize()?;
            for part in rest.iter().rev() {
                resolved.push(part);
            }
            return Ok(resolved);
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                rest.push(name.to_os_string());
                existing = parent;
            }
            _ => return Ok(path.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::AssetCategory;
    use tempfile::TempDir;

    fn request(input: &Path, output: &Path) -> ExtractionRequest {
        ExtractionRequest::new(input, output, CategorySet::all(), false)
    }

    #[test]
    fn test_missing_input_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let err = request(&tmp.path().join("nope"), &tmp.path().join("out"))
            .validate()
            .unwrap_err();
        assert!(matches!(err, RipperError::InputNotFound(_)));
    }

    #[test]
    fn test_output_inside_input_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("Game_Data");
        fs::create_dir(&input).unwrap();

        let err = request(&input, &input.join("nested/out"))
            .validate()
            .unwrap_err();
        assert!(matches!(err, RipperError::OutputInsideInput { .. }));

        request(&input, &tmp.path().join("out")).validate().unwrap();
    }

    #[test]
    fn test_output_that_is_a_file_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("Game_Data");
        fs::create_dir(&input).unwrap();
        let output = tmp.path().join("out.txt");
        fs::write(&output, b"x").unwrap();

        let err = request(&input, &output).validate().unwrap_err();
        assert!(matches!(err, RipperError::OutputNotWritable { .. }));
    }

    #[test]
    fn test_single_file_input_allows_sibling_output() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("level0");
        fs::write(&input, b"data").unwrap();
        request(&input, tmp.path()).validate().unwrap();
    }

    #[test]
    fn test_validate_creates_nothing() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("Game_Data");
        fs::create_dir(&input).unwrap();
        let output = tmp.path().join("out");

        let req = ExtractionRequest::new(
            &input,
            &output,
            [AssetCategory::Textures].into_iter().collect(),
            true,
        )
        .with_layout(OutputLayout::Flat);
        req.validate().unwrap();

        assert!(!output.exists());
        assert!(req.verbose());
        assert_eq!(req.layout(), OutputLayout::Flat);
        assert!(req.categories().contains(AssetCategory::Textures));
    }
}
