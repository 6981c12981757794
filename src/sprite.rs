//! Sprites and their source images.
//!
//! A `Sprite` is an ordered group of source images which are stacked
//! vertically into one PNG. Sprites are rebuilt from disk on every run;
//! only their digest is persisted (in the cache).

use std::cell::OnceCell;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::error::{MontageError, Result};
use crate::render::{compose, write_png};

/// Hex encoded SHA-256 of `bytes`.
pub fn sha256_hex(bytes: impl AsRef<[u8]>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes.as_ref());
    format!("{:x}", hasher.finalize())
}

/// A single image contributing to a sprite.
#[derive(Debug, Clone)]
pub struct SourceImage {
    path: PathBuf,
    name: String,
    digest: OnceCell<String>,
    height: OnceCell<u32>,
}

impl SourceImage {
    /// Create a source for the image at `path`.
    ///
    /// The source's name is the file name without its extension.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        Self {
            path,
            name,
            digest: OnceCell::new(),
            height: OnceCell::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `SHA256(name ++ SHA256(contents))`, hex encoded.
    ///
    /// Renaming a source therefore changes the digest even when its pixels
    /// are unchanged.
    pub fn digest(&self, sprite: &str) -> Result<&str> {
        if let Some(digest) = self.digest.get() {
            return Ok(digest.as_str());
        }

        let bytes = fs::read(&self.path).map_err(|e| self.read_error(sprite, e))?;
        let digest = sha256_hex(format!("{}{}", self.name, sha256_hex(bytes)));
        Ok(self.digest.get_or_init(|| digest).as_str())
    }

    /// Height of the image in pixels.
    pub fn height(&self, sprite: &str) -> Result<u32> {
        if let Some(height) = self.height.get() {
            return Ok(*height);
        }

        if !self.path.is_file() {
            return Err(self.missing(sprite));
        }

        let (_, height) = image::image_dimensions(&self.path).map_err(|e| MontageError::Image {
            path: self.path.clone(),
            message: format!("Failed to read dimensions: {}", e),
        })?;
        Ok(*self.height.get_or_init(|| height))
    }

    fn read_error(&self, sprite: &str, err: std::io::Error) -> MontageError {
        if err.kind() == std::io::ErrorKind::NotFound {
            self.missing(sprite)
        } else {
            MontageError::Io {
                path: self.path.clone(),
                message: format!("Failed to read source image: {}", err),
            }
        }
    }

    fn missing(&self, sprite: &str) -> MontageError {
        MontageError::MissingSource {
            sprite: sprite.to_string(),
            path: self.path.clone(),
        }
    }
}

/// A named group of source images destined for one output PNG.
#[derive(Debug, Clone)]
pub struct Sprite {
    name: String,
    sources: Vec<SourceImage>,
    padding: u32,
    url: String,
    save_path: PathBuf,
    /// Cumulative y offset of each source, computed on first use.
    positions: OnceCell<Vec<u32>>,
}

impl Sprite {
    /// Create a sprite from source paths, in the order given.
    pub fn new(
        name: impl Into<String>,
        sources: impl IntoIterator<Item = PathBuf>,
        save_path: impl Into<PathBuf>,
        padding: u32,
        url: impl Into<String>,
    ) -> Self {
        let sprite = Self {
            name: name.into(),
            sources: sources.into_iter().map(SourceImage::new).collect(),
            padding,
            url: url.into(),
            save_path: save_path.into(),
            positions: OnceCell::new(),
        };

        for duplicate in sprite.duplicate_sources() {
            tracing::warn!(
                sprite = %sprite.name,
                source = duplicate.name(),
                path = %duplicate.path.display(),
                "source name already used in this sprite; lookups by name resolve to the first"
            );
        }

        sprite
    }

    /// Sources whose name repeats an earlier source's, in source order.
    pub fn duplicate_sources(&self) -> Vec<&SourceImage> {
        let mut seen = std::collections::HashSet::new();
        self.sources
            .iter()
            .filter(|s| !seen.insert(s.name.as_str()))
            .collect()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sources(&self) -> &[SourceImage] {
        &self.sources
    }

    pub fn padding(&self) -> u32 {
        self.padding
    }

    /// Public URL of the generated image.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Where the generated image is written.
    pub fn save_path(&self) -> &Path {
        &self.save_path
    }

    /// Look up a source by name.
    pub fn source(&self, name: &str) -> Option<&SourceImage> {
        self.sources.iter().find(|s| s.name == name)
    }

    /// Y offset, in pixels, at which the named source begins.
    pub fn position_of(&self, source: &str) -> Result<u32> {
        let index = self
            .sources
            .iter()
            .position(|s| s.name == source)
            .ok_or_else(|| MontageError::MissingSource {
                sprite: self.name.clone(),
                path: PathBuf::from(source),
            })?;

        Ok(self.positions()?[index])
    }

    /// Y offsets of every source, in source order.
    pub fn positions(&self) -> Result<&[u32]> {
        if let Some(positions) = self.positions.get() {
            return Ok(positions.as_slice());
        }

        let mut positions = Vec::with_capacity(self.sources.len());
        let mut offset = 0;
        for source in &self.sources {
            positions.push(offset);
            offset += source.height(&self.name)? + self.padding;
        }

        Ok(self.positions.get_or_init(|| positions).as_slice())
    }

    /// Digest of the ordered source digests.
    ///
    /// Depends only on the names, contents and order of the sources, never
    /// on timestamps or on the sprite's own name.
    pub fn digest(&self) -> Result<String> {
        let mut hasher = Sha256::new();
        for source in &self.sources {
            hasher.update(source.digest(&self.name)?.as_bytes());
        }
        Ok(format!("{:x}", hasher.finalize()))
    }

    /// Composite the sources and write the result to `save_path`.
    pub fn save(&self) -> Result<()> {
        let mut images = Vec::with_capacity(self.sources.len());
        for source in &self.sources {
            if !source.path.is_file() {
                return Err(source.missing(&self.name));
            }

            let image = image::open(&source.path).map_err(|e| MontageError::Image {
                path: source.path.clone(),
                message: format!("Failed to decode: {}", e),
            })?;
            images.push(image.to_rgba8());
        }

        let sheet = compose(&images, self.padding);
        tracing::debug!(
            sprite = %self.name,
            width = sheet.width(),
            height = sheet.height(),
            "composited sprite"
        );

        write_png(&sheet, &self.save_path)
    }
}

impl fmt::Display for Sprite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
