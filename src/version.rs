//! Unity engine version detection and compatibility checks

use crate::extractor::AssetBackend;
use regex::bytes::Regex;
use serde::Serialize;
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::OnceLock;
use tracing::{debug, warn};

/// Bytes of the file header searched for a version string.
const HEADER_LEN: u64 = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionSource {
    Backend,
    Header,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnityVersion {
    pub version: String,
    pub detected_from: String,
    pub source: VersionSource,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Compatibility {
    Supported,
    Partial(&'static str),
    Unsupported(&'static str),
    Inconclusive,
}

impl Compatibility {
    pub fn is_compatible(&self) -> bool {
        !matches!(self, Compatibility::Unsupported(_))
    }
}

impl fmt::Display for Compatibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Compatibility::Supported => f.write_str("Fully supported"),
            Compatibility::Partial(msg) | Compatibility::Unsupported(msg) => f.write_str(msg),
            Compatibility::Inconclusive => f.write_str("Version check inconclusive"),
        }
    }
}

fn header_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            r"(\d+\.\d+\.\d+[a-z0-9]*)",
            r"Unity (\d+\.\d+\.\d+)",
            r"(?s-u)UnityFS.*?(\d+\.\d+)",
        ]
        .iter()
        .filter_map(|p| Regex::new(p).ok())
        .collect()
    })
}

/// Detect the Unity version of an asset file.
///
/// The backend is asked first; the raw header is searched when it has no answer.
pub fn detect_unity_version(path: &Path, backend: Option<&dyn AssetBackend>) -> Option<UnityVersion> {
    let detected_from = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    if let Some(backend) = backend {
        match backend.unity_version(path) {
            Ok(Some(version)) if !version.is_empty() => {
                return Some(UnityVersion {
                    version,
                    detected_from,
                    source: VersionSource::Backend,
                });
            }
            Ok(_) => debug!("{} reported no version for {}", backend.name(), path.display()),
            Err(e) => warn!("Could not detect Unity version from {}: {:#}", path.display(), e),
        }
    }

    let mut header = Vec::new();
    let read = File::open(path).and_then(|f| f.take(HEADER_LEN).read_to_end(&mut header));
    if let Err(e) = read {
        warn!("Could not read header of {}: {}", path.display(), e);
        return None;
    }

    version_from_header(&header).map(|version| UnityVersion {
        version,
        detected_from,
        source: VersionSource::Header,
    })
}

/// Search a file header for the first version-like string.
pub fn version_from_header(header: &[u8]) -> Option<String> {
    header_patterns().iter().find_map(|pattern| {
        pattern
            .captures(header)
            .and_then(|caps| caps.get(1))
            .map(|m| String::from_utf8_lossy(m.as_bytes()).into_owned())
    })
}

/// Classify how well a Unity version is supported by the backend.
pub fn check_compatibility(version: &str) -> Compatibility {
    let mut parts = version.split('.');
    let major = parts.next().and_then(|p| p.parse::<u32>().ok());
    let minor = parts.next().and_then(|p| {
        let digits: String = p.chars().take_while(char::is_ascii_digit).collect();
        digits.parse::<u32>().ok()
    });

    match (major, minor) {
        (Some(major), Some(minor)) => {
            if major < 3 || (major == 3 && minor < 4) {
                Compatibility::Unsupported("Unity version too old (< 3.4)")
            } else if major > 2023 {
                Compatibility::Partial("Newer version - may have limited support")
            } else {
                Compatibility::Supported
            }
        }
        _ => Compatibility::Inconclusive,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_version_from_header() {
        let mut header = b"UnityFS\0\0\0\0\x065.x.x\02021.3.5f1\0".to_vec();
        header.extend_from_slice(&[0u8; 32]);
        assert_eq!(version_from_header(&header).as_deref(), Some("2021.3.5f1"));

        assert_eq!(
            version_from_header(b"\0\0\0\0\x112019.4.31f1\0\0").as_deref(),
            Some("2019.4.31f1")
        );
        assert_eq!(version_from_header(b"no version here"), None);
    }

    #[test]
    fn test_check_compatibility() {
        assert_eq!(check_compatibility("2021.3.5f1"), Compatibility::Supported);
        assert_eq!(check_compatibility("3.4.0"), Compatibility::Supported);
        assert!(!check_compatibility("3.3.0").is_compatible());
        assert!(!check_compatibility("2.6.1").is_compatible());
        assert!(matches!(
            check_compatibility("6000.0.23f1"),
            Compatibility::Partial(_)
        ));
        assert_eq!(check_compatibility("Unknown"), Compatibility::Inconclusive);
        assert_eq!(check_compatibility("5"), Compatibility::Inconclusive);
    }

    #[test]
    fn test_detect_from_header_without_backend() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"\0\0\0\x082018.4.36f1\0rest").unwrap();

        let version = detect_unity_version(file.path(), None).unwrap();
        assert_eq!(version.version, "2018.4.36f1");
        assert_eq!(version.source, VersionSource::Header);
    }

    #[test]
    fn test_detect_missing_file() {
        assert_eq!(
            detect_unity_version(Path::new("/definitely/not/here.assets"), None),
            None
        );
    }
}
