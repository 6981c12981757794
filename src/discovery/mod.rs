//! Project discovery and sprite definitions.
//!
//! A project is a directory containing a `montage.yaml` manifest. Each
//! manifest entry becomes a `SpriteDefinition`, and definitions expand into
//! sprites using whatever source files are on disk at the time.
//!
//! # Example
//!
//! ```ignore
//! use montage::discovery::Project;
//!
//! let project = Project::find(".")?;
//! for sprite in project.sprites()? {
//!     println!("{} ({} sources)", sprite.name(), sprite.sources().len());
//! }
//! ```

mod definition;
mod manifest;
mod pattern;

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::error::{MontageError, Result};
use crate::sprite::Sprite;

pub use definition::{Defaults, SpriteDefinition, SpriteOptions, FILENAME_TOKEN};
pub use manifest::{Manifest, SpriteEntry, DEFAULT_CACHE, DEFAULT_PADDING, DEFAULT_TO, DEFAULT_URL};
pub use pattern::{Pattern, SourceGroups, NAME_TOKEN};

pub(crate) use pattern::to_slash;

/// The name of the manifest file.
pub const MANIFEST_FILENAME: &str = "montage.yaml";

/// File name used when the `sass` setting names a directory.
pub const STYLESHEET_FILENAME: &str = "_montage.scss";

/// A loaded montage project.
#[derive(Debug)]
pub struct Project {
    root: PathBuf,
    manifest: Manifest,
    definitions: Vec<SpriteDefinition>,
}

impl Project {
    /// Find the project containing `start`.
    ///
    /// Looks for a `montage.yaml` in `start` and then in each parent
    /// directory in turn.
    pub fn find(start: impl AsRef<Path>) -> Result<Self> {
        let start = start.as_ref();
        let absolute = start.canonicalize().map_err(|e| MontageError::Io {
            path: start.to_path_buf(),
            message: format!("Failed to resolve directory: {}", e),
        })?;

        let root = absolute
            .ancestors()
            .find(|dir| dir.join(MANIFEST_FILENAME).is_file())
            .ok_or_else(|| MontageError::MissingProject {
                start: absolute.clone(),
            })?;

        tracing::debug!(root = %root.display(), "found project");
        Self::load(root)
    }

    /// Load the project whose manifest lives directly in `root`.
    pub fn load(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let manifest = Manifest::load(&root.join(MANIFEST_FILENAME))?;
        Self::from_manifest(root, manifest)
    }

    /// Build a project from an already parsed manifest.
    ///
    /// Every definition is validated here, so naming mistakes surface before
    /// any work is done.
    pub fn from_manifest(root: impl Into<PathBuf>, manifest: Manifest) -> Result<Self> {
        let root = root.into();
        let defaults = Defaults::from(&manifest);

        let definitions = manifest
            .sprites
            .iter()
            .map(|entry| {
                SpriteDefinition::new(&root, &entry.source, SpriteOptions::from(entry), &defaults)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            root,
            manifest,
            definitions,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(MANIFEST_FILENAME)
    }

    pub fn definitions(&self) -> &[SpriteDefinition] {
        &self.definitions
    }

    /// Location of the cache file.
    pub fn cache_path(&self) -> PathBuf {
        self.root.join(&self.manifest.cache)
    }

    /// Location of the generated stylesheet, if one is configured.
    pub fn stylesheet_path(&self) -> Option<PathBuf> {
        let sass = self.root.join(self.manifest.sass.as_ref()?);
        if sass.is_dir() || sass.extension().is_none() {
            Some(sass.join(STYLESHEET_FILENAME))
        } else {
            Some(sass)
        }
    }

    /// Expand every definition into sprites.
    ///
    /// Fails if two sprites end up with the same name.
    pub fn sprites(&self) -> Result<Vec<Sprite>> {
        let mut seen = HashSet::new();
        let mut sprites = Vec::new();

        for definition in &self.definitions {
            for sprite in definition.to_sprites() {
                if !seen.insert(sprite.name().to_string()) {
                    return Err(MontageError::DuplicateSprite {
                        name: sprite.name().to_string(),
                    });
                }
                sprites.push(sprite);
            }
        }

        Ok(sprites)
    }

    /// Whether a change to `path` could affect the build.
    pub fn is_source(&self, path: &Path) -> bool {
        path == self.manifest_path() || self.definitions.iter().any(|d| d.is_source(path))
    }
}
