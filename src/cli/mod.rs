pub mod build;
pub mod completions;
pub mod init;
pub mod list;
pub mod watch;

use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Environment variable holding a `tracing` filter directive.
pub const LOG_ENV: &str = "MONTAGE_LOG";

/// montage - Sprite sheet and stylesheet generator
#[derive(Parser, Debug)]
#[command(name = "montage")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Log more detail (-v for debug, -vv for trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate stale sprites, optimise them and write the stylesheet
    Build(build::BuildArgs),

    /// Initialize a montage project (generates montage.yaml)
    Init(init::InitArgs),

    /// List the sprites the project defines
    List(list::ListArgs),

    /// Rebuild whenever sprite sources change
    Watch(watch::WatchArgs),

    /// Generate shell completions
    Completions(completions::CompletionsArgs),
}

/// Default filter for a given `-v` count.
pub fn default_log_level(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    }
}

/// Install the global log subscriber.
///
/// `MONTAGE_LOG` takes precedence over `-v` when it is set.
pub fn init_tracing(verbose: u8) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_log_level(verbose)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_build_flags() {
        let cli = Cli::parse_from(["montage", "-vv", "build", "site", "--force", "--no-optimise"]);

        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Build(args) => {
                assert_eq!(args.path, std::path::PathBuf::from("site"));
                assert!(args.force);
                assert!(args.no_optimise);
                assert!(!args.no_cache);
            }
            other => panic!("expected build, got {:?}", other),
        }
    }

    #[test]
    fn test_default_log_level() {
        assert_eq!(default_log_level(0), "warn");
        assert_eq!(default_log_level(1), "debug");
        assert_eq!(default_log_level(5), "trace");
    }
}
