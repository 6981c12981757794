//! List command implementation.
//!
//! Prints every sprite the project defines along with whether it is up to
//! date.

use std::path::PathBuf;

use clap::Args;
use serde::Serialize;

use crate::cache::Cache;
use crate::discovery::Project;
use crate::error::{MontageError, Result};
use crate::output::{display_path, plural, Printer};
use crate::sprite::Sprite;

/// List the sprites defined by the project
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Directory inside the project (default: current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Print a JSON array to stdout instead of status lines
    #[arg(long)]
    pub json: bool,
}

/// One sprite as reported by `montage list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpriteListing {
    pub name: String,
    pub sources: Vec<String>,
    pub output: String,
    pub url: String,
    pub fresh: bool,
}

impl SpriteListing {
    fn new(project: &Project, sprite: &Sprite, cache: &Cache) -> Result<Self> {
        let relative = |path: &std::path::Path| {
            path.strip_prefix(project.root())
                .unwrap_or(path)
                .display()
                .to_string()
        };

        Ok(Self {
            name: sprite.name().to_string(),
            sources: sprite.sources().iter().map(|s| relative(s.path())).collect(),
            output: relative(sprite.save_path()),
            url: sprite.url().to_string(),
            fresh: cache.fresh(sprite)?,
        })
    }
}

/// Describe every sprite in `project`, in definition order.
pub fn listings(project: &Project) -> Result<Vec<SpriteListing>> {
    let cache = Cache::load(project.cache_path())?;
    project
        .sprites()?
        .iter()
        .map(|sprite| SpriteListing::new(project, sprite, &cache))
        .collect()
}

pub fn run(args: ListArgs, printer: &Printer) -> Result<()> {
    let project = Project::find(&args.path)?;
    let listings = listings(&project)?;

    if args.json {
        let json = serde_json::to_string_pretty(&listings).map_err(|e| MontageError::Build {
            message: format!("Failed to serialize listing: {}", e),
            help: None,
        })?;
        println!("{}", json);
        return Ok(());
    }

    for listing in &listings {
        let state = if listing.fresh { "up to date" } else { "stale" };
        printer.info(
            &listing.name,
            &format!(
                "{} {} {} {}",
                plural(listing.sources.len(), "source", "sources"),
                printer.dim("->"),
                listing.output,
                printer.dim(&format!("({})", state))
            ),
        );
    }

    printer.status(
        "Listed",
        &format!(
            "{} in {}",
            plural(listings.len(), "sprite", "sprites"),
            display_path(project.root())
        ),
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::MANIFEST_FILENAME;
    use image::{Rgba, RgbaImage};
    use pretty_assertions::assert_eq;
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    fn image(root: &Path, relative: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 255]))
            .save(&path)
            .unwrap();
    }

    fn setup() -> tempfile::TempDir {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join(MANIFEST_FILENAME),
            "sprites:\n  - source: \"icons/:name/*.png\"\n    to: \"out/:name.png\"\n",
        )
        .unwrap();
        image(dir.path(), "icons/arrows/up.png");
        image(dir.path(), "icons/arrows/down.png");
        dir
    }

    #[test]
    fn test_listings_before_build() {
        let dir = setup();
        let project = Project::load(dir.path()).unwrap();

        let listings = listings(&project).unwrap();

        assert_eq!(
            listings,
            vec![SpriteListing {
                name: "arrows".to_string(),
                sources: vec!["icons/arrows/down.png".to_string(), "icons/arrows/up.png".to_string()],
                output: "out/arrows.png".to_string(),
                url: "/images/arrows.png".to_string(),
                fresh: false,
            }]
        );
    }

    #[test]
    fn test_listings_after_build() {
        let dir = setup();
        let project = Project::load(dir.path()).unwrap();

        let mut cache = Cache::load(project.cache_path()).unwrap();
        for sprite in project.sprites().unwrap() {
            sprite.save().unwrap();
            cache.set(&sprite).unwrap();
        }
        cache.write().unwrap();

        let listings = listings(&project).unwrap();
        assert!(listings.iter().all(|l| l.fresh));
    }

    #[test]
    fn test_listing_json_shape() {
        let listing = SpriteListing {
            name: "fry".to_string(),
            sources: vec!["src/fry/one.png".to_string()],
            output: "public/images/fry.png".to_string(),
            url: "/images/fry.png".to_string(),
            fresh: true,
        };

        insta::assert_json_snapshot!(listing, @r#"
        {
          "name": "fry",
          "sources": [
            "src/fry/one.png"
          ],
          "output": "public/images/fry.png",
          "url": "/images/fry.png",
          "fresh": true
        }
        "#);
    }
}
