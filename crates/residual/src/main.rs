//! Residual - heap reachability and closure-capture analysis
//!
//! CLI driver: loads a heap snapshot and reports what a residual program
//! would have to re-create.

mod commands;
mod config;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Residual heap analysis
#[derive(Parser, Debug)]
#[command(name = "residual")]
#[command(author, version, about = "Analyze which parts of an abstract heap a residual program needs")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Output format
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Configuration file (defaults to ./residual.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run one analysis pass over a heap snapshot
    Analyze(commands::analyze::AnalyzeArgs),

    /// Explain a diagnostic code
    Explain(commands::explain::ExplainArgs),
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    // Determine if colors should be used
    let use_color = !cli.no_color && !cli.quiet && atty::is(atty::Stream::Stdout);

    let Some(command) = cli.command else {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        cmd.print_help()?;
        println!();
        return Ok(());
    };

    match command {
        Commands::Analyze(args) => {
            let config = config::Config::load(cli.config.as_deref())?;
            commands::analyze::run(args, &config, cli.format, use_color, cli.quiet, cli.verbose)
        }
        Commands::Explain(args) => commands::explain::run(args, cli.format, use_color),
    }
}
