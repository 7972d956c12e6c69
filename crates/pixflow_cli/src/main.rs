// SPDX-License-Identifier: MIT OR Apache-2.0
//! `pixflow` - command-line tools for pixflow graph records.
//!
//! Records are node trees saved as `.ron` or `.json`. The CLI decodes them
//! into a graph to inspect parameters and packed uniforms, converts between
//! formats and runs preview render passes without a GPU.

mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(name = "pixflow")]
#[command(author, version, about = "pixflow graph record tools", long_about = None)]
struct Cli {
    /// Log every render request and dirty transition
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the node tree of a record with parameters and uniforms
    Inspect(commands::inspect::InspectArgs),

    /// Convert a record between RON and JSON
    Convert(commands::convert::ConvertArgs),

    /// Run a preview render pass over a record
    Render(commands::render::RenderArgs),

    /// List node kinds and their parameters
    Kinds(commands::kinds::KindsArgs),
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let result = match cli.command {
        Commands::Inspect(args) => commands::inspect::run(args),
        Commands::Convert(args) => commands::convert::run(args),
        Commands::Render(args) => commands::render::run(args),
        Commands::Kinds(args) => commands::kinds::run(args),
    };

    if let Err(e) = result {
        tracing::error!("{e:#}");
        std::process::exit(1);
    }
}
