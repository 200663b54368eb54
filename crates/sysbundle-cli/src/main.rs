//! sysbundle CLI entry point: argument parsing, logging, command dispatch.

use clap::Parser;
use miette::Result;
use sysbundle_cli::{cli, commands, error, logger, ui};

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();

    logger::init_logger(args.verbose, args.quiet, args.no_color);
    ui::init_colors(args.no_color);

    let result = match args.command {
        cli::Command::Build(build_args) => commands::build_execute(build_args).await,
        cli::Command::Classify(classify_args) => commands::classify_execute(classify_args).await,
        cli::Command::CleanCache(clean_args) => commands::clean_cache_execute(clean_args).await,
    };

    result.map_err(error::cli_error_to_miette)
}
