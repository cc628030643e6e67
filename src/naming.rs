//! Output file naming: sanitizing object names and picking extensions

use crate::category::AssetCategory;
use std::path::{Path, PathBuf};

const PUNCTUATION: &str = "-_.() ";

/// Replace characters unsafe for file names with `_`.
///
/// ASCII letters and digits, `-_.() ` and Cyrillic letters survive.
pub fn sanitize_name(name: &str) -> String {
    if name.is_empty() {
        return "unnamed".to_string();
    }
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || PUNCTUATION.contains(c) || is_cyrillic_letter(c) {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn is_cyrillic_letter(c: char) -> bool {
    matches!(c, 'а'..='я' | 'А'..='Я' | 'ё' | 'Ё')
}

/// Pick the final file extension for an exported payload.
///
/// `format` is the backend's hint; `head` is the first bytes of the payload.
pub fn resolve_extension(category: AssetCategory, format: &str, head: &[u8]) -> String {
    match (category, format) {
        (AssetCategory::Fonts, _) => {
            if head.starts_with(b"OTTO") {
                "otf".to_string()
            } else {
                "ttf".to_string()
            }
        }
        (AssetCategory::Scripts, "text") => {
            if looks_like_csharp(head) {
                "cs".to_string()
            } else {
                "txt".to_string()
            }
        }
        (_, "text") => "txt".to_string(),
        (_, "png" | "wav" | "obj" | "json") => format.to_string(),
        (_, other) => {
            let cleaned: String = other
                .chars()
                .filter(char::is_ascii_alphanumeric)
                .map(|c| c.to_ascii_lowercase())
                .collect();
            if cleaned.is_empty() {
                "bin".to_string()
            } else {
                cleaned
            }
        }
    }
}

fn looks_like_csharp(head: &[u8]) -> bool {
    let prefix = String::from_utf8_lossy(&head[..head.len().min(100)]);
    ["using ", "namespace ", "class "]
        .iter()
        .any(|marker| prefix.contains(marker))
}

/// Return `dir/stem.ext`, or `dir/stem_N.ext` for the first `N` not yet taken.
pub fn unique_path(dir: &Path, stem: &str, ext: &str) -> PathBuf {
    let file_name = |suffix: Option<usize>| match (suffix, ext.is_empty()) {
        (None, true) => stem.to_string(),
        (None, false) => format!("{}.{}", stem, ext),
        (Some(n), true) => format!("{}_{}", stem, n),
        (Some(n), false) => format!("{}_{}.{}", stem, n, ext),
    };

    let candidate = dir.join(file_name(None));
    if !candidate.exists() {
        return candidate;
    }
    (1..)
        .map(|n| dir.join(file_name(Some(n))))
        .find(|p| !p.exists())
        .unwrap_or(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("Hero_Diffuse (1).v2"), "Hero_Diffuse (1).v2");
        assert_eq!(sanitize_name("ui/icons:star*"), "ui_icons_star_");
        assert_eq!(sanitize_name("Меч героя"), "Меч героя");
        assert_eq!(sanitize_name("日本"), "__");
        assert_eq!(sanitize_name(""), "unnamed");
    }

    #[test]
    fn test_font_extension_follows_magic() {
        assert_eq!(resolve_extension(AssetCategory::Fonts, "font", b"OTTO\0\x01"), "otf");
        assert_eq!(resolve_extension(AssetCategory::Fonts, "font", b"\0\x01\0\0"), "ttf");
    }

    #[test]
    fn test_script_extension_detects_csharp() {
        let source = b"using UnityEngine;\npublic class Player : MonoBehaviour {}";
        assert_eq!(resolve_extension(AssetCategory::Scripts, "text", source), "cs");
        assert_eq!(resolve_extension(AssetCategory::Scripts, "text", b"hello"), "txt");
        assert_eq!(resolve_extension(AssetCategory::Scripts, "json", b"{}"), "json");
        assert_eq!(resolve_extension(AssetCategory::Texts, "text", source), "txt");
    }

    #[test]
    fn test_unknown_formats_are_cleaned() {
        assert_eq!(resolve_extension(AssetCategory::Audio, "wav", b""), "wav");
        assert_eq!(resolve_extension(AssetCategory::Audio, "../FSB", b""), "fsb");
        assert_eq!(resolve_extension(AssetCategory::Meshes, "", b""), "bin");
    }

    #[test]
    fn test_unique_path_appends_counter() {
        let tmp = TempDir::new().unwrap();
        let first = unique_path(tmp.path(), "clip_12", "wav");
        assert_eq!(first, tmp.path().join("clip_12.wav"));
        std::fs::write(&first, b"").unwrap();

        let second = unique_path(tmp.path(), "clip_12", "wav");
        assert_eq!(second, tmp.path().join("clip_12_1.wav"));
        std::fs::write(&second, b"").unwrap();

        assert_eq!(
            unique_path(tmp.path(), "clip_12", "wav"),
            tmp.path().join("clip_12_2.wav")
        );
    }
}
