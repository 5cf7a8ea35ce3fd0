//! # Engine Constants
//!
//! Hardcoded runtime constants for the Factgraph export engine.
//!
//! These are compiled into the binary and immutable at runtime.

/// Default number of rows requested per cursor batch.
///
/// Memory use of one export run is bounded by one batch of raw rows plus
/// one batch of rendered output, independent of total dataset size.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Upper bound on the configurable batch size.
///
/// Prevents a misconfigured run from pulling the whole dataset into one
/// batch and defeating the bounded-memory guarantee.
pub const MAX_BATCH_SIZE: usize = 100_000;

/// Indentation used for entries inside a declarative block.
pub const DECLARATIVE_INDENT: &str = "    ";

/// Maximum number of unresolved-reference diagnostics retained per run.
///
/// The dropped-fact counter is always exact; only the per-miss detail list
/// is capped, so a store where most facts are unresolvable cannot grow the
/// run's memory with the dataset.
pub const MAX_UNRESOLVED_REPORTED: usize = 64;
