//! # Factgraph CLI Module
//!
//! This module implements the CLI interface for Factgraph.
//!
//! ## Available Commands
//!
//! - `export` - Export the fact graph to a wire format
//! - `load` - Stage facts from a JSON file into the store
//! - `status` - Show dataset counts

mod commands;

use clap::{Parser, Subcommand};
use factgraph_core::ExportError;
use factgraph_core::primitives::DEFAULT_BATCH_SIZE;
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Factgraph - Fact Graph Exporter
///
/// Streams a content-addressed fact graph out of its backing store into
/// a JSON array or declarative text, predecessors before successors.
#[derive(Parser, Debug)]
#[command(name = "factgraph")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to the fact database
    #[arg(short = 'D', long, global = true, default_value = "factgraph.db")]
    pub database: PathBuf,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Suppress diagnostics below the error level
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Export the fact graph
    Export {
        /// Output wire format (plain-graph, declarative)
        #[arg(short = 't', long, default_value = "plain-graph")]
        format: String,

        /// Output file path (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Rows per cursor batch
        #[arg(short, long, default_value_t = DEFAULT_BATCH_SIZE)]
        batch_size: usize,
    },

    /// Stage facts from a JSON file into the store
    Load {
        /// Path to the input file (JSON array of facts)
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Show dataset counts
    Status,
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub fn execute(cli: Cli) -> Result<(), ExportError> {
    let json_mode = cli.json_mode;

    match cli.command {
        Some(Commands::Export {
            format,
            output,
            batch_size,
        }) => cmd_export(&cli.database, &format, output.as_deref(), batch_size),
        Some(Commands::Load { file }) => cmd_load(&cli.database, &file),
        Some(Commands::Status) => cmd_status(&cli.database, json_mode),
        None => {
            // No subcommand - show status by default
            cmd_status(&cli.database, json_mode)
        }
    }
}
