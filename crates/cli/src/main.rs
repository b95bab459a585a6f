//! treesnap CLI - snapshot and restore a working tree

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use treesnap_cli::{cmd, util};

/// treesnap - Versioned snapshots of a working tree
#[derive(Parser)]
#[command(name = "treesnap")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Working tree root (default: current directory)
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new version snapshot
    Create {
        /// Short summary for this snapshot
        #[arg(short, long, default_value = "")]
        summary: String,
        /// Version the new snapshot descends from
        #[arg(short, long)]
        parent: Option<String>,
        /// JSON file with a list of ignore patterns (replaces the defaults)
        #[arg(short, long)]
        ignore_file: Option<PathBuf>,
        /// JSON chat file to include (default: chat_history.json in the root)
        #[arg(short, long)]
        chat_file: Option<PathBuf>,
    },
    /// List versions in the archive
    List,
    /// Show the change log
    Log {
        /// Number of entries to show, newest first
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Show one version's details
    Show {
        /// Version id (e.g. v2-1)
        version: String,
    },
    /// Restore the working tree to a version
    Restore {
        /// Version id (e.g. v2-1)
        version: String,
        /// Overwrite existing files when restoring
        #[arg(long)]
        overwrite: bool,
        /// JSON file with a list of ignore patterns (use the one given to create)
        #[arg(short, long)]
        ignore_file: Option<PathBuf>,
    },
    /// View system configuration
    Config {
        /// Print the effective configuration
        #[arg(long)]
        list: bool,
        /// Print one value (e.g. snapshot.chat_file)
        #[arg(long)]
        get: Option<String>,
        /// Print the config file location
        #[arg(long)]
        path: bool,
        /// Print an example config file
        #[arg(long)]
        example: bool,
    },
}

fn main() -> Result<()> {
    // Diagnostics go to stderr; command output stays on stdout
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Create { summary, parent, ignore_file, chat_file } => {
            let root = util::resolve_root(cli.root)?;
            cmd::create::run(&root, &summary, parent.as_deref(), ignore_file, chat_file)
        }
        Commands::List => cmd::list::run(&util::resolve_root(cli.root)?),
        Commands::Log { limit } => cmd::log::run(&util::resolve_root(cli.root)?, limit),
        Commands::Show { version } => cmd::show::run(&util::resolve_root(cli.root)?, &version),
        Commands::Restore { version, overwrite, ignore_file } => {
            cmd::restore::run(&util::resolve_root(cli.root)?, &version, overwrite, ignore_file)
        }
        Commands::Config { list, get, path, example } => cmd::config::run(list, get, path, example),
    }
}
