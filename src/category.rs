//! Asset categories and the Unity classes that belong to each

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// A kind of asset the ripper knows how to export.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum AssetCategory {
    Textures,
    Sprites,
    Audio,
    Meshes,
    Texts,
    Fonts,
    Scripts,
    Materials,
}

impl AssetCategory {
    pub const ALL: [AssetCategory; 8] = [
        AssetCategory::Textures,
        AssetCategory::Sprites,
        AssetCategory::Audio,
        AssetCategory::Meshes,
        AssetCategory::Texts,
        AssetCategory::Fonts,
        AssetCategory::Scripts,
        AssetCategory::Materials,
    ];

    /// Lowercase name, also used as the output subfolder.
    pub fn as_str(self) -> &'static str {
        match self {
            AssetCategory::Textures => "textures",
            AssetCategory::Sprites => "sprites",
            AssetCategory::Audio => "audio",
            AssetCategory::Meshes => "meshes",
            AssetCategory::Texts => "texts",
            AssetCategory::Fonts => "fonts",
            AssetCategory::Scripts => "scripts",
            AssetCategory::Materials => "materials",
        }
    }

    /// Unity class names exported under this category.
    pub fn class_names(self) -> &'static [&'static str] {
        match self {
            AssetCategory::Textures => &["Texture2D"],
            AssetCategory::Sprites => &["Sprite"],
            AssetCategory::Audio => &["AudioClip"],
            AssetCategory::Meshes => &["Mesh"],
            AssetCategory::Texts => &["TextAsset"],
            AssetCategory::Fonts => &["Font"],
            AssetCategory::Scripts => &["MonoBehaviour", "MonoScript"],
            AssetCategory::Materials => &["Material"],
        }
    }

    /// Classify a Unity class name. Returns `None` for classes the ripper ignores.
    pub fn from_class_name(class_name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|category| category.class_names().contains(&class_name))
    }
}

impl fmt::Display for AssetCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The set of categories enabled for a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategorySet(BTreeSet<AssetCategory>);

impl CategorySet {
    pub fn all() -> Self {
        Self(AssetCategory::ALL.into_iter().collect())
    }

    pub fn empty() -> Self {
        Self(BTreeSet::new())
    }

    pub fn insert(&mut self, category: AssetCategory) -> bool {
        self.0.insert(category)
    }

    pub fn remove(&mut self, category: AssetCategory) -> bool {
        self.0.remove(&category)
    }

    pub fn contains(&self, category: AssetCategory) -> bool {
        self.0.contains(&category)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = AssetCategory> + '_ {
        self.0.iter().copied()
    }

    /// All Unity class names covered by the enabled categories.
    pub fn class_names(&self) -> Vec<&'static str> {
        self.iter()
            .flat_map(|category| category.class_names().iter().copied())
            .collect()
    }
}

impl FromIterator<AssetCategory> for CategorySet {
    fn from_iter<I: IntoIterator<Item = AssetCategory>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for CategorySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("(none)");
        }
        let names: Vec<&str> = self.iter().map(AssetCategory::as_str).collect();
        f.write_str(&names.join(", "))
    }
}
