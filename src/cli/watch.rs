//! Watch command implementation.
//!
//! Builds once, then rebuilds whenever a file that could affect the build
//! changes.

use std::path::PathBuf;
use std::sync::mpsc;
use std::time::Duration;

use clap::Args;
use notify::{RecursiveMode, Watcher};

use crate::discovery::Project;
use crate::error::{MontageError, Result};
use crate::optimise::Capabilities;
use crate::output::{display_path, plural, Printer};

use super::build::{build_project, BuildOptions};

/// Events arriving within this window of each other trigger one rebuild.
const DEBOUNCE: Duration = Duration::from_millis(200);

/// Rebuild sprites whenever their sources change
#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Directory inside the project (default: current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Skip PNG optimisation
    #[arg(long)]
    pub no_optimise: bool,
}

pub fn run(args: WatchArgs, printer: &Printer) -> Result<()> {
    let mut project = Project::find(&args.path)?;
    let options = BuildOptions {
        optimise: !args.no_optimise,
        ..BuildOptions::default()
    };
    let capabilities = if options.optimise {
        Capabilities::detect()
    } else {
        Capabilities::none()
    };

    rebuild(&project, &options, &capabilities, printer);

    let (tx, rx) = mpsc::channel();
    let mut watcher = notify::recommended_watcher(tx).map_err(watch_failed)?;
    watcher
        .watch(project.root(), RecursiveMode::Recursive)
        .map_err(watch_failed)?;

    printer.info("Watching", &display_path(project.root()));

    while let Ok(event) = rx.recv() {
        let mut changed = relevant_paths(&project, event);

        // Drain the burst of events a single save tends to produce
        while let Ok(event) = rx.recv_timeout(DEBOUNCE) {
            changed.extend(relevant_paths(&project, event));
        }

        if changed.is_empty() {
            continue;
        }
        tracing::debug!(?changed, "sources changed");

        if changed.contains(&project.manifest_path()) {
            match Project::load(project.root()) {
                Ok(reloaded) => project = reloaded,
                Err(e) => {
                    printer.error("Error", &e.to_string());
                    continue;
                }
            }
        }

        printer.info("Changed", &plural(changed.len(), "file", "files"));
        rebuild(&project, &options, &capabilities, printer);
    }

    Ok(())
}

/// Build, reporting failures without ending the watch.
fn rebuild(project: &Project, options: &BuildOptions, capabilities: &Capabilities, printer: &Printer) {
    match build_project(project, options, capabilities, printer) {
        Ok(report) => printer.success(
            "Finished",
            &format!(
                "{} ({} up to date)",
                plural(report.built.len(), "sprite", "sprites"),
                report.fresh.len()
            ),
        ),
        Err(e) => printer.error("Error", &e.to_string()),
    }
}

fn relevant_paths(project: &Project, event: notify::Result<notify::Event>) -> Vec<PathBuf> {
    match event {
        Ok(event) => event
            .paths
            .into_iter()
            .filter(|path| project.is_source(path))
            .collect(),
        Err(e) => {
            tracing::warn!(error = %e, "file watcher error");
            vec![]
        }
    }
}

fn watch_failed(e: notify::Error) -> MontageError {
    MontageError::Build {
        message: format!("Failed to watch project: {}", e),
        help: None,
    }
}
