use clap::Parser;
use miette::Result;
use montage::cli::{init_tracing, Cli, Commands};
use montage::output::Printer;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let printer = Printer::new();

    match cli.command {
        Commands::Build(args) => montage::cli::build::run(args, &printer)?,
        Commands::Init(args) => montage::cli::init::run(args, &printer)?,
        Commands::List(args) => montage::cli::list::run(args, &printer)?,
        Commands::Watch(args) => montage::cli::watch::run(args, &printer)?,
        Commands::Completions(args) => montage::cli::completions::run(args)?,
    }

    Ok(())
}
