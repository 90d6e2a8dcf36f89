use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "orphan-sweep")]
#[command(about = "Find and remove asset files no database record references", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Report orphaned files, and optionally back them up and delete them
    Clean(CleanArgs),
    /// Create any missing role directories
    MakeDirs,
    /// Display the number of records and unique identifiers in the database
    CountUuids,
    /// Print configuration values
    PrintConfig,
}

#[derive(Debug, clap::Args)]
pub struct CleanArgs {
    /// Directories to reconcile: all, download, emulation or image
    #[arg(short, long, default_value = "all")]
    pub target: String,
    /// Back up and delete orphaned files instead of only listing them
    #[arg(short, long)]
    pub delete: bool,
    /// Print exact byte counts and timestamps
    #[arg(long)]
    pub raw: bool,
    /// Scan directories concurrently
    #[arg(long)]
    pub parallel: bool,
    /// Do not ask for confirmation before deleting
    #[arg(short, long)]
    pub yes: bool,
    /// Write every orphan found to this CSV file
    #[arg(long, value_name = "PATH")]
    pub csv: Option<PathBuf>,
}
