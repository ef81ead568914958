use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

/// depmon - audit project dependencies for outdated, deprecated, or vulnerable packages
#[derive(Parser)]
#[command(name = "depmon")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Audit all references and report issues
    Audit {
        /// Path to the solution snapshot file
        solution: PathBuf,

        /// Show every reference, not only flagged ones
        #[arg(long)]
        all: bool,
    },

    /// Show per-project transitive dependency trees
    Tree {
        /// Path to the solution snapshot file
        solution: PathBuf,
    },

    /// Compute the manifest edits that move a package to a new version
    Update {
        /// Path to the solution snapshot file
        solution: PathBuf,

        /// Package id to update
        package: String,

        /// Target version (defaults to the newest of matching stability)
        version: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Audit { solution, all } => commands::audit::run(&solution, all).await,
        Commands::Tree { solution } => commands::tree::run(&solution).await,
        Commands::Update {
            solution,
            package,
            version,
        } => commands::update::run(&solution, &package, version.as_deref()).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
