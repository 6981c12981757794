//! Sprite definitions.
//!
//! A definition pairs a source pattern with the options from one manifest
//! entry. Expanding it against the file system yields one sprite per
//! captured name (or a single sprite for patterns without `:name`).

use std::path::{Path, PathBuf};

use crate::error::{MontageError, Result};
use crate::sprite::Sprite;

use super::manifest::{Manifest, SpriteEntry};
use super::pattern::{Pattern, NAME_TOKEN};

/// Token replaced with the file name of the generated image.
pub const FILENAME_TOKEN: &str = ":filename";

/// Per-definition overrides.
#[derive(Debug, Clone, Default)]
pub struct SpriteOptions {
    pub name: Option<String>,
    pub to: Option<String>,
    pub padding: Option<u32>,
    pub url: Option<String>,
}

impl From<&SpriteEntry> for SpriteOptions {
    fn from(entry: &SpriteEntry) -> Self {
        Self {
            name: entry.name.clone(),
            to: entry.to.clone(),
            padding: entry.padding,
            url: entry.url.clone(),
        }
    }
}

/// Project-wide values used for any option a definition leaves unset.
#[derive(Debug, Clone)]
pub struct Defaults {
    pub padding: u32,
    pub url: String,
    pub to: String,
}

impl From<&Manifest> for Defaults {
    fn from(manifest: &Manifest) -> Self {
        Self {
            padding: manifest.padding,
            url: manifest.url.clone(),
            to: manifest.to.clone(),
        }
    }
}

/// A validated sprite definition.
#[derive(Debug, Clone)]
pub struct SpriteDefinition {
    root: PathBuf,
    pattern: Pattern,
    name: Option<String>,
    to: String,
    padding: u32,
    url: String,
}

impl SpriteDefinition {
    /// Build a definition, validating how its sprites will be named.
    pub fn new(
        root: impl Into<PathBuf>,
        pattern: &str,
        options: SpriteOptions,
        defaults: &Defaults,
    ) -> Result<Self> {
        let pattern = Pattern::compile(pattern)?;
        let to = options.to.unwrap_or_else(|| defaults.to.clone());

        match (pattern.has_capture(), &options.name) {
            (true, Some(_)) => {
                return Err(MontageError::NamingConflict {
                    pattern: pattern.to_string(),
                });
            }
            (false, None) => {
                return Err(MontageError::MissingName {
                    pattern: pattern.to_string(),
                    message: "has no :name segment, so the sprite needs a `name` option".to_string(),
                });
            }
            (true, None) if !to.contains(NAME_TOKEN) => {
                return Err(MontageError::MissingName {
                    pattern: pattern.to_string(),
                    message: format!(
                        "captures :name, but its save path `{}` doesn't use :name",
                        to
                    ),
                });
            }
            _ => {}
        }

        Ok(Self {
            root: root.into(),
            pattern,
            name: options.name,
            to,
            padding: options.padding.unwrap_or(defaults.padding),
            url: options.url.unwrap_or_else(|| defaults.url.clone()),
        })
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    /// Whether `path` is a potential source for this definition.
    pub fn is_source(&self, path: &Path) -> bool {
        self.pattern.matches(&self.root, path)
    }

    /// Expand the definition into sprites using the files currently on disk.
    pub fn to_sprites(&self) -> Vec<Sprite> {
        let groups = self.pattern.matching_sources(&self.root);

        if groups.is_empty() {
            tracing::warn!(pattern = %self.pattern, "sprite pattern matched no files");
        }

        groups
            .into_iter()
            .filter_map(|(captured, sources)| {
                let name = captured.or_else(|| self.name.clone())?;
                let save_path = self.root.join(self.to.replace(NAME_TOKEN, &name));
                let filename = save_path
                    .file_name()
                    .map(|f| f.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let url = self
                    .url
                    .replace(FILENAME_TOKEN, &filename)
                    .replace(NAME_TOKEN, &name);

                Some(Sprite::new(name, sources, save_path, self.padding, url))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::tempdir;

    fn defaults() -> Defaults {
        Defaults::from(&Manifest::default())
    }

    fn touch(root: &Path, relative: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, relative).unwrap();
    }

    #[test]
    fn test_capture_with_name_conflicts() {
        let options = SpriteOptions {
            name: Some("fry".to_string()),
            ..Default::default()
        };

        let err = SpriteDefinition::new("/p", "src/:name/*", options, &defaults()).unwrap_err();
        assert!(matches!(err, MontageError::NamingConflict { .. }));
    }

    #[test]
    fn test_no_capture_without_name() {
        let err = SpriteDefinition::new("/p", "src/*", SpriteOptions::default(), &defaults())
            .unwrap_err();
        assert!(matches!(err, MontageError::MissingName { .. }));
    }

    #[test]
    fn test_capture_without_name_in_save_path() {
        let options = SpriteOptions {
            to: Some("public/sprite.png".to_string()),
            ..Default::default()
        };

        let err = SpriteDefinition::new("/p", "src/:name/*", options, &defaults()).unwrap_err();
        assert!(matches!(err, MontageError::MissingName { .. }));
    }

    #[test]
    fn test_to_sprites_with_capture() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "src/big/one.png");
        touch(dir.path(), "src/small/one.png");
        touch(dir.path(), "src/small/two.png");

        let definition =
            SpriteDefinition::new(dir.path(), "src/:name/*.png", SpriteOptions::default(), &defaults())
                .unwrap();
        let sprites = definition.to_sprites();

        let names: Vec<&str> = sprites.iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["big", "small"]);
        assert_eq!(sprites[1].sources().len(), 2);
        assert_eq!(sprites[0].save_path(), dir.path().join("public/images/big.png"));
        assert_eq!(sprites[0].url(), "/images/big.png");
        assert_eq!(sprites[0].padding(), 20);
    }

    #[test]
    fn test_to_sprites_with_explicit_name() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "flags/uk.png");
        touch(dir.path(), "flags/fr.png");

        let options = SpriteOptions {
            name: Some("flags".to_string()),
            to: Some("out/all-:name.png".to_string()),
            padding: Some(2),
            url: Some("/img/:name/:filename".to_string()),
        };
        let definition = SpriteDefinition::new(dir.path(), "flags/*.png", options, &defaults()).unwrap();
        let sprites = definition.to_sprites();

        assert_eq!(sprites.len(), 1);
        let sprite = &sprites[0];
        assert_eq!(sprite.name(), "flags");
        assert_eq!(sprite.padding(), 2);
        assert_eq!(sprite.save_path(), dir.path().join("out/all-flags.png"));
        assert_eq!(sprite.url(), "/img/flags/all-flags.png");

        let sources: Vec<&str> = sprite.sources().iter().map(|s| s.name()).collect();
        assert_eq!(sources, vec!["fr", "uk"]);
    }

    #[test]
    fn test_to_sprites_no_matches() {
        let dir = tempdir().unwrap();
        let options = SpriteOptions {
            name: Some("empty".to_string()),
            ..Default::default()
        };
        let definition = SpriteDefinition::new(dir.path(), "nothing/*.png", options, &defaults()).unwrap();

        assert!(definition.to_sprites().is_empty());
    }

    #[test]
    fn test_options_from_entry() {
        let entry = SpriteEntry {
            source: "a/*".to_string(),
            name: Some("a".to_string()),
            padding: Some(3),
            ..Default::default()
        };
        let options = SpriteOptions::from(&entry);

        assert_eq!(options.name.as_deref(), Some("a"));
        assert_eq!(options.padding, Some(3));
        assert!(options.url.is_none());
    }
}
