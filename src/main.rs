//! Thicket CLI entry point

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;

#[derive(Parser)]
#[command(name = "thicket")]
#[command(about = "Symbol/dependency graph, cycles and complexity hotspots for a source tree", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a project and write the project tree as JSON
    Analyze {
        /// Project root (defaults to current directory)
        #[arg(short, long, default_value = ".")]
        root: PathBuf,

        /// Config file (defaults to <root>/thicket.toml if present)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Write JSON here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Pretty-print the JSON
        #[arg(long)]
        pretty: bool,
    },
    /// Print cycles, unused exports, complexity hotspots and unstable files
    Report {
        /// Project root (defaults to current directory)
        #[arg(short, long, default_value = ".")]
        root: PathBuf,

        /// Config file (defaults to <root>/thicket.toml if present)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Number of hotspots and unstable files to list
        #[arg(short, long, default_value = "10")]
        top: usize,
    },
    /// List registered extensions and how each is analyzed
    Languages {
        /// Config file whose custom languages should be included
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so JSON on stdout stays clean.
    let log_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("thicket={0},thicket_core={0},thicket_indexer={0}", log_level)));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Analyze {
            root,
            config,
            output,
            pretty,
        } => commands::analyze(&root, config.as_deref(), output.as_deref(), pretty),
        Commands::Report { root, config, top } => commands::report(&root, config.as_deref(), top),
        Commands::Languages { config } => commands::languages(config.as_deref()),
    }
}
