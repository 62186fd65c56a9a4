//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueHint};

/// Hierarchical selection engine: checkbox trees with parent/child propagation
#[derive(Parser, Debug)]
#[command(name = "checktree")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase log verbosity (-d info, -dd debug, -ddd trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub debug: u8,

    /// Forest document (default: configured forest_file, else the sample forest)
    #[arg(short, long, global = true, value_hint = ValueHint::FilePath)]
    pub file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the forest as a tree
    Show,

    /// Select a node and all its descendants
    Select(ChangeArgs),

    /// Deselect a node and all its descendants
    Deselect(ChangeArgs),

    /// Flip a node's selection
    Toggle(ChangeArgs),

    /// Report parents that disagree with their children
    Check,

    /// List selected leaf ids
    Leaves,

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(clap::Args, Debug)]
pub struct ChangeArgs {
    /// Node id
    pub id: String,

    /// Write the result back to the forest document
    #[arg(short, long)]
    pub write: bool,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show effective configuration
    Show,
    /// Print a config template
    Template,
    /// Show config file locations
    Path,
}
