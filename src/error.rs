//! Errors raised while validating a request or driving the backend

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RipperError {
    #[error("input path does not exist: {}", .0.display())]
    InputNotFound(PathBuf),

    #[error("input path is not readable: {}", .path.display())]
    InputUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("output directory {} lies inside the input {}", .output.display(), .input.display())]
    OutputInsideInput { input: PathBuf, output: PathBuf },

    #[error("output directory is not writable: {}", .path.display())]
    OutputNotWritable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no Unity asset files found in {}", .0.display())]
    NoAssetFiles(PathBuf),

    #[error("asset backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("{backend} failed on {}: {message}", .path.display())]
    BackendFailed {
        backend: String,
        path: PathBuf,
        message: String,
    },

    #[error("malformed backend output: {0}")]
    Protocol(String),
}
