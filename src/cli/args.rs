//! CLI argument definitions using clap derive

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::cli::commands::{completions::CompletionsArgs, init::InitArgs};

#[derive(Parser)]
#[command(name = "connector")]
#[command(author, version, about = "Connector configuration toolkit")]
#[command(long_about = "Expands connector templates into concrete pipe and system configuration, and collapses concrete configuration back into templates.")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[command(flatten)]
    pub global: GlobalOpts,
}

#[derive(clap::Args, Clone, Debug)]
pub struct GlobalOpts {
    /// Name of the system _id placeholder (default: xxxxxx)
    #[arg(long, global = true, value_name = "STRING")]
    pub system_placeholder: Option<String>,

    /// Connector folder to work with
    #[arg(short = 'd', long = "connector-dir", global = true, default_value = ".", value_name = "DIR")]
    pub connector_dir: PathBuf,

    /// Directory to expand the config into (default: .expanded)
    #[arg(short = 'e', long = "expanded-dir", global = true, value_name = "DIR")]
    pub expanded_dir: Option<PathBuf>,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Enable verbose output
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Expand the templates into pipes/ and systems/ of the expanded directory
    Expand,

    /// Collapse pipes/ and systems/ back into templates/ and manifest.json
    Collapse,

    /// Create an empty manifest.json
    Init(InitArgs),

    /// Add a datatype to the connector (not implemented)
    AddType,

    /// Generate shell completions
    Completions(CompletionsArgs),
}
