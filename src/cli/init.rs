//! Init command implementation.
//!
//! Writes a starter `montage.yaml` and reports which sprites it would
//! produce.

use std::fs;
use std::path::PathBuf;

use clap::Args;

use crate::discovery::{Manifest, Project, SpriteEntry, MANIFEST_FILENAME};
use crate::error::{MontageError, Result};
use crate::output::{plural, Printer};

/// Source pattern used when none is given.
pub const DEFAULT_SOURCE: &str = "sprites/:name/*.{png,jpg,jpeg,gif}";

/// Initialize a montage project by generating a montage.yaml manifest
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Project root (default: current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Source pattern for the first sprite definition
    #[arg(long, default_value = DEFAULT_SOURCE)]
    pub source: String,

    /// Directory to write the generated stylesheet into
    #[arg(long)]
    pub sass: Option<PathBuf>,

    /// Overwrite existing montage.yaml
    #[arg(long)]
    pub force: bool,
}

pub fn run(args: InitArgs, printer: &Printer) -> Result<()> {
    let manifest_path = args.path.join(MANIFEST_FILENAME);

    if manifest_path.exists() && !args.force {
        return Err(MontageError::Build {
            message: format!("{} already exists", MANIFEST_FILENAME),
            help: Some("Use --force to overwrite".to_string()),
        });
    }

    let manifest = Manifest {
        sass: args.sass,
        sprites: vec![SpriteEntry {
            source: args.source,
            ..SpriteEntry::default()
        }],
        ..Manifest::default()
    };

    // Catch a bad pattern before anything is written
    let project = Project::from_manifest(&args.path, manifest)?;
    let yaml = project.manifest().to_yaml()?;

    fs::create_dir_all(&args.path).map_err(|e| MontageError::write_failed(&args.path, e))?;
    fs::write(&manifest_path, yaml).map_err(|e| MontageError::write_failed(&manifest_path, e))?;

    let sprites = project.sprites()?;
    if !sprites.is_empty() {
        let names: Vec<&str> = sprites.iter().map(|s| s.name()).collect();
        printer.info("Discovered", &names.join(", "));
    }

    printer.success(
        "Created",
        &format!(
            "{} ({} found)",
            MANIFEST_FILENAME,
            plural(sprites.len(), "sprite", "sprites")
        ),
    );

    Ok(())
}
