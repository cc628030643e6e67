//! Run statistics produced by the dispatcher

use crate::category::AssetCategory;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// A source file that could not be processed.
#[derive(Debug, Clone, Serialize)]
pub struct FailedFile {
    pub path: PathBuf,
    pub error: String,
}

/// Outcome of one extraction run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExtractionReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unity_version: Option<String>,

    /// Candidate files found in the input
    pub files_scanned: usize,

    /// Files the backend loaded successfully
    pub files_processed: usize,

    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub failed_files: Vec<FailedFile>,

    /// Files written, per category
    pub extracted: BTreeMap<AssetCategory, usize>,

    /// Objects of classes outside the enabled categories
    pub other: usize,

    /// Objects the backend failed to decode
    pub object_errors: usize,

    /// Backend outputs refused by the dispatcher
    pub rejected: usize,

    /// Files written, in write order
    #[serde(skip)]
    pub written: Vec<PathBuf>,
}

impl ExtractionReport {
    pub fn record_extracted(&mut self, category: AssetCategory, path: PathBuf) {
        *self.extracted.entry(category).or_insert(0) += 1;
        self.written.push(path);
    }

    pub fn total_extracted(&self) -> usize {
        self.extracted.values().sum()
    }

    pub fn count(&self, category: AssetCategory) -> usize {
        self.extracted.get(&category).copied().unwrap_or(0)
    }

    /// One-line human summary for the log.
    pub fn summary(&self) -> String {
        let per_category: Vec<String> = AssetCategory::ALL
            .into_iter()
            .filter_map(|category| {
                let n = self.count(category);
                (n > 0).then(|| format!("{}={}", category, n))
            })
            .collect();
        format!(
            "Extracted {} files from {}/{} sources ({}), other={}, errors={}, failed sources={}",
            self.total_extracted(),
            self.files_processed,
            self.files_scanned,
            if per_category.is_empty() {
                "nothing".to_string()
            } else {
                per_category.join(", ")
            },
            self.other,
            self.object_errors,
            self.failed_files.len()
        )
    }
}
