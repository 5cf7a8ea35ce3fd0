//! # Factgraph - Fact Graph Exporter
//!
//! The main binary for the Factgraph export engine.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                 apps/factgraph (THE BINARY)              │
//! │                                                          │
//! │   ┌───────────┐   stderr: tracing diagnostics            │
//! │   │ CLI (clap)│   stdout/file: exported data only        │
//! │   └─────┬─────┘                                          │
//! │         ▼                                                │
//! │  ┌────────────────┐                                      │
//! │  │ factgraph-core │  cursor -> resolver -> formatter     │
//! │  │  (THE LOGIC)   │                                      │
//! │  └────────────────┘                                      │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Stage facts into a store
//! factgraph -D facts.db load -f facts.json
//!
//! # Export the store
//! factgraph -D facts.db export --format plain-graph > graph.json
//! factgraph -D facts.db export --format declarative -o graph.txt
//! ```

mod cli;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() {
    let cli = cli::Cli::parse();

    // Initialize tracing — FACTGRAPH_LOG_FORMAT=json enables machine-parseable
    // output. Diagnostics always go to stderr; stdout is the data channel.
    let log_format = std::env::var("FACTGRAPH_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let default_filter = if cli.quiet {
        "factgraph=error"
    } else {
        "factgraph=info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                )
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    if let Err(e) = cli::execute(cli) {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}
