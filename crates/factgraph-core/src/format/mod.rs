//! # Output Formatters
//!
//! Rendering of resolved facts into the two wire formats.
//!
//! The format is a strategy selected once per run. The pipeline drives the
//! chosen formatter through `begin` / `render` / `finish` and never
//! branches on the variant itself.

mod declarative;
mod plain_graph;

pub use declarative::DeclarativeTextFormatter;
pub use plain_graph::PlainGraphFormatter;

use crate::types::{ExportError, ResolvedFact};

// =============================================================================
// FORMAT SELECTION
// =============================================================================

/// The two supported wire formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Streamed JSON array of `{hash, type, predecessors, fields}` objects.
    /// Surrogate ids never appear.
    PlainGraph,
    /// Human-readable `let f<id>: <Type> = { ... }` blocks, cross-referenced
    /// by surrogate id, one blank line between blocks.
    DeclarativeText,
}

impl OutputFormat {
    /// Construct the formatter for this variant.
    #[must_use]
    pub fn formatter(self) -> Box<dyn OutputFormatter> {
        match self {
            Self::PlainGraph => Box::new(PlainGraphFormatter::new()),
            Self::DeclarativeText => Box::new(DeclarativeTextFormatter::new()),
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "plain-graph" => Ok(Self::PlainGraph),
            "declarative" => Ok(Self::DeclarativeText),
            other => Err(ExportError::FormatterFailure(format!(
                "Unknown output format: {}. Use: plain-graph, declarative",
                other
            ))),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PlainGraph => write!(f, "plain-graph"),
            Self::DeclarativeText => write!(f, "declarative"),
        }
    }
}

// =============================================================================
// FORMATTER TRAIT
// =============================================================================

/// A polymorphic sink that renders resolved facts into bytes.
///
/// Formatters are stateful only to the extent the wire format demands
/// (element separators). Formatter errors are fatal to the run.
pub trait OutputFormatter {
    /// Bytes emitted once before the first fact.
    fn begin(&mut self) -> Result<Vec<u8>, ExportError>;

    /// Render one fact. Called in emission order.
    fn render(&mut self, fact: &ResolvedFact) -> Result<Vec<u8>, ExportError>;

    /// Bytes emitted once after the last fact.
    fn finish(&mut self) -> Result<Vec<u8>, ExportError>;
}

// =============================================================================
// TESTS
// =============================================================================
