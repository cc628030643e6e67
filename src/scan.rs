//! Discovery of Unity asset files inside a game data directory

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Extensions (lowercase, without dot) that mark a file as a Unity asset container.
pub const DEFAULT_EXTENSIONS: &[&str] = &[
    "assets",
    "unity3d",
    "assetbundle",
    "bundle",
    "ress",
    "sharedassets",
    "resources",
    "resource",
    "dat",
];

/// Fragments of a lowercase file name that mark it as a Unity asset container.
const NAME_HINTS: &[&str] = &[
    "sharedassets",
    "resources",
    ".unity3d",
    "assetbundle",
    "globalgamemanagers",
    "level",
];

/// Find candidate asset files below `root`.
///
/// Falls back to every regular file directly inside `root` when nothing
/// looks like a Unity container. Results are sorted.
pub fn find_input_files(root: &Path, extra_extensions: &[String]) -> Vec<PathBuf> {
    info!("Scanning {} for asset files...", root.display());

    let extra: Vec<String> = extra_extensions
        .iter()
        .map(|e| e.trim_start_matches('.').to_lowercase())
        .collect();

    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Error scanning {}: {}", root.display(), e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(walkdir::DirEntry::into_path)
        .filter(|path| is_candidate(path, &extra))
        .collect();

    if files.is_empty() {
        info!("No candidates found - checking top-level files.");
        files = WalkDir::new(root)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .map(walkdir::DirEntry::into_path)
            .collect();
    }

    files.sort();
    info!("Found {} candidate files.", files.len());
    for file in &files {
        debug!("  candidate: {}", file.display());
    }
    files
}

/// Whether a path looks like something the backend can load.
pub fn is_candidate(path: &Path, extra_extensions: &[String]) -> bool {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase);
    if let Some(ext) = ext.as_deref() {
        if DEFAULT_EXTENSIONS.contains(&ext) || extra_extensions.iter().any(|e| e == ext) {
            return true;
        }
    }

    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();
    NAME_HINTS.iter().any(|hint| name.contains(hint))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, b"").unwrap();
    }

    #[test]
    fn test_is_candidate() {
        let none: Vec<String> = Vec::new();
        assert!(is_candidate(Path::new("data.unity3d"), &none));
        assert!(is_candidate(Path::new("sharedassets0.assets.resS"), &none));
        assert!(is_candidate(Path::new("globalgamemanagers"), &none));
        assert!(is_candidate(Path::new("level12"), &none));
        assert!(is_candidate(Path::new("UI.BUNDLE"), &none));
        assert!(!is_candidate(Path::new("UnityPlayer.dll"), &none));
        assert!(!is_candidate(Path::new("app.info"), &none));
        assert!(is_candidate(Path::new("app.info"), &["INFO".to_lowercase()]));
    }

    #[test]
    fn test_find_input_files_walks_recursively() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        touch(&root.join("globalgamemanagers"));
        touch(&root.join("sharedassets0.assets"));
        touch(&root.join("StreamingAssets/aa/ui.bundle"));
        touch(&root.join("Managed/Assembly-CSharp.dll"));

        let files = find_input_files(root, &[]);
        assert_eq!(
            files,
            vec![
                root.join("StreamingAssets/aa/ui.bundle"),
                root.join("globalgamemanagers"),
                root.join("sharedassets0.assets"),
            ]
        );
    }

    #[test]
    fn test_find_input_files_falls_back_to_top_level() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        touch(&root.join("b.bin"));
        touch(&root.join("a.bin"));
        touch(&root.join("nested/c.bin"));

        let files = find_input_files(root, &[]);
        assert_eq!(files, vec![root.join("a.bin"), root.join("b.bin")]);
    }

    #[test]
    fn test_extra_extensions_accept_leading_dot() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        touch(&root.join("x.pak"));
        touch(&root.join("y.txt"));

        let files = find_input_files(root, &[".PAK".to_string()]);
        assert_eq!(files, vec![root.join("x.pak")]);
    }
}
