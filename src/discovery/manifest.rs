//! Project manifest (montage.yaml) parsing.
//!
//! The manifest declares the sprites in a project along with the
//! project-wide defaults each sprite inherits.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{MontageError, Result};

/// Project manifest loaded from montage.yaml.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Manifest {
    /// Default number of transparent rows between images.
    pub padding: u32,

    /// Default URL template for generated sprites.
    pub url: String,

    /// Default save-path template for generated sprites.
    pub to: String,

    /// Cache file, relative to the project root.
    pub cache: PathBuf,

    /// Where to write the generated stylesheet, if anywhere.
    pub sass: Option<PathBuf>,

    /// Sprite definitions.
    pub sprites: Vec<SpriteEntry>,
}

/// A single sprite definition in the manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpriteEntry {
    /// Source pattern, relative to the project root.
    pub source: String,

    /// Save-path template; falls back to the manifest default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,

    /// Explicit sprite name, for patterns without `:name`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub padding: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

pub const DEFAULT_PADDING: u32 = 20;
pub const DEFAULT_URL: &str = "/images/:filename";
pub const DEFAULT_TO: &str = "public/images/:name.png";
pub const DEFAULT_CACHE: &str = ".montage_cache";

impl Default for Manifest {
    fn default() -> Self {
        Self {
            padding: DEFAULT_PADDING,
            url: DEFAULT_URL.to_string(),
            to: DEFAULT_TO.to_string(),
            cache: PathBuf::from(DEFAULT_CACHE),
            sass: None,
            sprites: vec![],
        }
    }
}

impl Manifest {
    /// Load manifest from a montage.yaml file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| MontageError::Io {
            path: path.to_path_buf(),
            message: format!("Failed to read manifest: {}", e),
        })?;

        Self::parse(&content)
    }

    /// Parse manifest from YAML string.
    pub fn parse(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_yaml::from_str(content).map_err(|e| MontageError::Parse {
            message: format!("Invalid manifest: {}", e),
            help: Some("Check montage.yaml syntax".to_string()),
        })
    }

    /// Render the manifest back to YAML.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| MontageError::Build {
            message: format!("Failed to serialize manifest: {}", e),
            help: None,
        })
    }
}
