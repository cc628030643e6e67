//! Extraction dispatcher
//!
//! Drives an [`AssetBackend`] over every candidate file of a request, then
//! moves the staged payloads into the output tree. Only categories enabled
//! in the request are ever written, and nothing is written outside the
//! output directory.

use crate::category::AssetCategory;
use crate::error::RipperError;
use crate::extractor::{AssetBackend, ExportedObject};
use crate::naming::{resolve_extension, sanitize_name, unique_path};
use crate::report::{ExtractionReport, FailedFile};
use crate::request::{ExtractionRequest, OutputLayout};
use crate::scan;
use crate::version::{check_compatibility, detect_unity_version};
use anyhow::{Context, Result};
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::Read;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Bytes of each payload inspected when choosing its extension
const HEAD_LEN: u64 = 128;

enum Placement {
    Written(AssetCategory, PathBuf),
    Rejected(String),
}

pub struct Dispatcher<'a> {
    backend: &'a dyn AssetBackend,
    extra_extensions: Vec<String>,
}

impl<'a> Dispatcher<'a> {
    pub fn new(backend: &'a dyn AssetBackend) -> Self {
        Self {
            backend,
            extra_extensions: Vec::new(),
        }
    }

    /// Extra extensions accepted by the scanner.
    pub fn with_extra_extensions(mut self, extensions: Vec<String>) -> Self {
        self.extra_extensions = extensions;
        self
    }

    /// Run a full extraction.
    ///
    /// Request-level problems (unreadable input, unusable output, no asset
    /// files) are returned as [`RipperError`]s. Failures of individual files
    /// are logged and recorded in the report.
    pub fn run(&self, request: &ExtractionRequest) -> Result<ExtractionReport> {
        let mut report = ExtractionReport::default();
        if !check_request(request)? {
            return Ok(report);
        }

        let input = request.input();
        let sources = if input.is_file() {
            vec![input.to_path_buf()]
        } else {
            scan::find_input_files(input, &self.extra_extensions)
        };
        if sources.is_empty() {
            let e = RipperError::NoAssetFiles(input.to_path_buf());
            error!("{}", e);
            return Err(e.into());
        }
        report.files_scanned = sources.len();

        if let Some(version) = detect_unity_version(&sources[0], Some(self.backend)) {
            let compatibility = check_compatibility(&version.version);
            info!(
                "Detected Unity version: {} (from {})",
                version.version, version.detected_from
            );
            if compatibility.is_compatible() {
                info!("Compatibility: {}", compatibility);
            } else {
                warn!("Compatibility: {}", compatibility);
            }
            report.unity_version = Some(version.version);
        }

        fs::create_dir_all(request.output()).map_err(|source| {
            let e = RipperError::OutputNotWritable {
                path: request.output().to_path_buf(),
                source,
            };
            error!("{}", e);
            e
        })?;

        info!(
            "Extracting [{}] with {} from {} files into {}",
            request.categories(),
            self.backend.name(),
            sources.len(),
            request.output().display()
        );

        let mut used_dirs = HashSet::new();
        for source in &sources {
            let source_dir = source_output_dir(request.output(), source, &mut used_dirs);
            match self.extract_file(request, source, &source_dir, &mut report) {
                Ok(()) => report.files_processed += 1,
                Err(e) => {
                    error!("  ! Failed processing {}: {:#}", source.display(), e);
                    report.failed_files.push(FailedFile {
                        path: source.clone(),
                        error: format!("{:#}", e),
                    });
                }
            }
        }

        info!("{}", report.summary());
        Ok(report)
    }

    fn extract_file(
        &self,
        request: &ExtractionRequest,
        source: &Path,
        source_dir: &Path,
        report: &mut ExtractionReport,
    ) -> Result<()> {
        info!("[+] Processing: {}", source.display());

        let staging = tempfile::Builder::new()
            .prefix("unity-ripper-")
            .tempdir()
            .context("Failed to create staging directory")?;

        let export = self
            .backend
            .export(source, request.categories(), staging.path())?;

        if report.unity_version.is_none() {
            report.unity_version.clone_from(&export.unity_version);
        }

        for (class_name, count) in &export.skipped {
            debug!("    skipped {} x{}", class_name, count);
            report.other += count;
        }

        for err in &export.errors {
            warn!(
                "    ! {} (path id {}): {}",
                err.class_name, err.path_id, err.message
            );
        }
        report.object_errors += export.errors.len();

        for object in &export.objects {
            match self.place(request, object, staging.path(), source_dir) {
                Ok(Placement::Written(category, path)) => {
                    if request.verbose() {
                        info!("    - {} saved: {}", object.class_name, path.display());
                    } else {
                        debug!("    - {} saved: {}", object.class_name, path.display());
                    }
                    report.record_extracted(category, path);
                }
                Ok(Placement::Rejected(reason)) => {
                    warn!(
                        "    ! Dropped {} (path id {}): {}",
                        object.class_name, object.path_id, reason
                    );
                    report.rejected += 1;
                }
                Err(e) => {
                    error!(
                        "    ! Could not save {} (path id {}): {:#}",
                        object.class_name, object.path_id, e
                    );
                    report.object_errors += 1;
                }
            }
        }

        Ok(())
    }

    /// Move one staged payload into the output tree.
    fn place(
        &self,
        request: &ExtractionRequest,
        object: &ExportedObject,
        staging: &Path,
        source_dir: &Path,
    ) -> Result<Placement> {
        let category = match AssetCategory::from_class_name(&object.class_name) {
            Some(category) if request.categories().contains(category) => category,
            Some(category) => {
                return Ok(Placement::Rejected(format!(
                    "category {} not requested",
                    category
                )))
            }
            None => {
                return Ok(Placement::Rejected(format!(
                    "unknown class {}",
                    object.class_name
                )))
            }
        };

        if !is_plain_relative(&object.file) {
            return Ok(Placement::Rejected(format!(
                "staged path {} escapes the staging directory",
                object.file.display()
            )));
        }
        let staged = staging.join(&object.file);
        if !staged.is_file() {
            return Ok(Placement::Rejected(format!(
                "staged file {} is missing",
                object.file.display()
            )));
        }

        let head = read_head(&staged)?;
        let ext = resolve_extension(category, &object.format, &head);

        let dir = match request.layout() {
            OutputLayout::Categorized => source_dir.join(category.as_str()),
            OutputLayout::Flat => source_dir.to_path_buf(),
        };
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;

        let base = object
            .name
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or(&object.class_name);
        let stem = format!("{}_{}", sanitize_name(base), object.path_id);
        let dest = unique_path(&dir, &stem, &ext);

        move_file(&staged, &dest)?;
        Ok(Placement::Written(category, dest))
    }
}

/// Validate a request before any backend is involved.
///
/// Returns `false` when no category is enabled, meaning there is nothing to do.
pub fn check_request(request: &ExtractionRequest) -> Result<bool, RipperError> {
    if let Err(e) = request.validate() {
        error!("{}", e);
        return Err(e);
    }
    if request.categories().is_empty() {
        info!("No asset categories enabled; nothing to extract.");
        return Ok(false);
    }
    Ok(true)
}

/// Output folder for one source file, unique within the run and never an existing file.
fn source_output_dir(output: &Path, source: &Path, used: &mut HashSet<String>) -> PathBuf {
    let base = sanitize_name(
        &source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
    );
    let mut name = base.clone();
    let mut n = 1;
    loop {
        let candidate = output.join(&name);
        // A single-file input may sit directly in the output directory.
        let blocked = candidate.exists() && !candidate.is_dir();
        if !blocked && used.insert(name.clone()) {
            return candidate;
        }
        name = format!("{}_{}", base, n);
        n += 1;
    }
}

fn is_plain_relative(path: &Path) -> bool {
    path.components().next().is_some()
        && path
            .components()
            .all(|component| matches!(component, Component::Normal(_)))
}

fn read_head(path: &Path) -> Result<Vec<u8>> {
    let mut head = Vec::new();
    File::open(path)
        .and_then(|f| f.take(HEAD_LEN).read_to_end(&mut head))
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(head)
}

/// Rename, falling back to copy when staging and output are on different filesystems.
fn move_file(from: &Path, to: &Path) -> Result<()> {
    if fs::rename(from, to).is_ok() {
        return Ok(());
    }
    fs::copy(from, to)
        .with_context(|| format!("Failed to write {}", to.display()))?;
    if let Err(e) = fs::remove_file(from) {
        debug!("Could not remove staged {}: {}", from.display(), e);
    }
    Ok(())
}
