//! Build command implementation.
//!
//! Regenerates stale sprites, optimises them, rewrites the stylesheet and
//! persists the cache.

use std::path::PathBuf;

use clap::Args;

use crate::cache::Cache;
use crate::discovery::Project;
use crate::error::Result;
use crate::optimise::{Capabilities, Optimised, Optimiser};
use crate::output::{display_path, plural, Printer, Spinner};
use crate::sprite::sha256_hex;
use crate::stylesheet;

/// Generate sprites for the project
#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Directory inside the project (default: current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Rebuild every sprite, even those which are up to date
    #[arg(long)]
    pub force: bool,

    /// Skip PNG optimisation
    #[arg(long)]
    pub no_optimise: bool,

    /// Neither read nor write the cache file
    #[arg(long)]
    pub no_cache: bool,
}

/// Settings for a single build.
#[derive(Debug, Clone, Copy)]
pub struct BuildOptions {
    pub force: bool,
    pub optimise: bool,
    pub use_cache: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            force: false,
            optimise: true,
            use_cache: true,
        }
    }
}

impl From<&BuildArgs> for BuildOptions {
    fn from(args: &BuildArgs) -> Self {
        Self {
            force: args.force,
            optimise: !args.no_optimise,
            use_cache: !args.no_cache,
        }
    }
}

/// What a build did.
#[derive(Debug, Default)]
pub struct BuildReport {
    /// Sprites which were regenerated.
    pub built: Vec<String>,
    /// Sprites which were already up to date.
    pub fresh: Vec<String>,
    /// Bytes removed by the optimisers.
    pub saved: u64,
    /// Set when the stylesheet was rewritten.
    pub stylesheet: Option<PathBuf>,
    /// Whether the cache file was written.
    pub cache_written: bool,
}

pub fn run(args: BuildArgs, printer: &Printer) -> Result<()> {
    let project = Project::find(&args.path)?;
    let options = BuildOptions::from(&args);

    let capabilities = if options.optimise {
        Capabilities::detect()
    } else {
        Capabilities::none()
    };
    tracing::debug!(optimisers = ?capabilities, "detected optimisers");

    let report = build_project(&project, &options, &capabilities, printer)?;

    let mut summary = format!(
        "{} ({} up to date)",
        plural(report.built.len(), "sprite", "sprites"),
        report.fresh.len()
    );
    if report.saved > 0 {
        summary.push_str(&format!(", {} bytes saved", report.saved));
    }
    printer.success("Finished", &summary);

    Ok(())
}

/// Run one build of `project`.
///
/// The first error aborts the build. Sprites written before it stay on
/// disk, but the cache is only persisted once every sprite succeeded, so
/// the next run rebuilds whatever this one did not record.
pub fn build_project(
    project: &Project,
    options: &BuildOptions,
    capabilities: &Capabilities,
    printer: &Printer,
) -> Result<BuildReport> {
    let mut cache = if options.use_cache {
        Cache::load(project.cache_path())?
    } else {
        Cache::in_memory(project.root())
    };

    let sprites = project.sprites()?;
    let optimiser = Optimiser::new(capabilities);
    let mut report = BuildReport::default();
    let mut warned_unavailable = false;

    for sprite in &sprites {
        if !options.force && cache.fresh(sprite)? {
            tracing::debug!(sprite = sprite.name(), "up to date");
            report.fresh.push(sprite.name().to_string());
            continue;
        }

        printer.status(
            "Building",
            &format!(
                "{} ({})",
                sprite.name(),
                plural(sprite.sources().len(), "source", "sources")
            ),
        );
        sprite.save()?;

        if options.optimise {
            let mut spinner = Spinner::new(printer, format!("optimising {}", sprite.name()));
            let outcome = optimiser
                .optimise_file_with_progress(sprite.save_path(), &mut |_| spinner.tick());
            spinner.finish();

            match outcome {
                Optimised::Saved(0) => {}
                Optimised::Saved(bytes) => {
                    printer.info(
                        "Optimised",
                        &format!("{} ({} bytes saved)", sprite.name(), bytes),
                    );
                    report.saved += bytes;
                }
                Optimised::Unavailable if !warned_unavailable => {
                    printer.warning("Warning", "no PNG optimisers installed; skipping optimisation");
                    warned_unavailable = true;
                }
                Optimised::Unavailable => {}
            }
        }

        cache.set(sprite)?;
        report.built.push(sprite.name().to_string());
    }

    if let Some(path) = project.stylesheet_path() {
        // Rendered every run so removed sprites and changed URLs are noticed
        let scss = stylesheet::render(&sprites)?;
        let stale = options.force
            || !report.built.is_empty()
            || !cache.fresh(path.as_path())?
            || cache.recorded(path.as_path()) != Some(sha256_hex(&scss).as_str());

        if stale {
            stylesheet::save(&path, &scss)?;
            cache.set(path.as_path())?;
            printer.status("Generated", &display_path(&path));
            report.stylesheet = Some(path);
        }
    }

    cache.prune(sprites.iter().map(|s| s.name()));
    report.cache_written = cache.write()?;

    Ok(report)
}
