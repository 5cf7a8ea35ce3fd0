//! # Stream Pipeline
//!
//! Drives RecordSource -> PredecessorResolver -> OutputFormatter under
//! pull-based backpressure.
//!
//! Single logical flow of control: one batch at a time, one row at a
//! time within a batch. Facts are emitted in the exact order the store
//! yields their rows — no reordering, no parallel fan-out — which is what
//! upholds the forward-reference invariant for the declarative format.
//!
//! The sink is a blocking `std::io::Write`; the pipeline does not request
//! the next batch until the sink has accepted the previous batch's bytes.
//! Memory use is one batch of raw rows plus one rendered fact.
//!
//! State machine: `Idle -> Streaming -> Draining -> Closed`, with
//! `Errored` absorbing from any non-`Closed` state. The cursor is closed
//! best-effort on the way to `Errored`; no cursor is left open across a
//! failure path.

use crate::format::{OutputFormat, OutputFormatter};
use crate::primitives::MAX_UNRESOLVED_REPORTED;
use crate::resolver;
use crate::source::{FactCursor, FactStore};
use crate::types::ExportError;
use std::io::Write;

// =============================================================================
// EXPORT SUMMARY
// =============================================================================

/// Counters for one completed export run.
///
/// A fact with an unresolvable reference is dropped without failing the
/// run; `dropped` surfaces how many were, so the silence of the data
/// channel is not total silence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExportSummary {
    /// Facts rendered into the output.
    pub emitted: u64,
    /// Facts discarded because a declared reference had no candidate.
    pub dropped: u64,
}

// =============================================================================
// PIPELINE STATE
// =============================================================================

/// Lifecycle states of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// Cursor not yet opened.
    Idle,
    /// Pulling batches, resolving rows, forwarding to the formatter.
    Streaming,
    /// End of stream seen; flushing output and closing the cursor.
    Draining,
    /// Terminal success.
    Closed,
    /// Terminal failure. The cursor has been closed best-effort.
    Errored,
}

// =============================================================================
// STREAM PIPELINE
// =============================================================================

/// One-pass export of a cursor into a formatter-backed sink.
pub struct StreamPipeline<C: FactCursor, W: Write> {
    cursor: C,
    formatter: Box<dyn OutputFormatter>,
    sink: W,
    batch_size: usize,
    state: PipelineState,
    summary: ExportSummary,
    /// The first misses of the run, capped at `MAX_UNRESOLVED_REPORTED`.
    /// The `dropped` counter stays exact; only the detail list is bounded.
    unresolved: Vec<resolver::UnresolvedReference>,
}

impl<C: FactCursor, W: Write> StreamPipeline<C, W> {
    /// Create a pipeline over an already-opened cursor.
    #[must_use]
    pub fn new(
        cursor: C,
        formatter: Box<dyn OutputFormatter>,
        sink: W,
        batch_size: usize,
    ) -> Self {
        Self {
            cursor,
            formatter,
            sink,
            batch_size,
            state: PipelineState::Idle,
            summary: ExportSummary::default(),
            unresolved: Vec::new(),
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Run the export to completion.
    ///
    /// On success returns the run counters and the unresolved references
    /// that caused drops. On any fatal condition the cursor is closed
    /// best-effort and the error propagated; the sink holds a well-formed
    /// prefix truncated at the failure point.
    ///
    /// # Errors
    ///
    /// `SourceFailure` on a batch read error, `FormatterFailure` /
    /// `SerializationError` on a rendering error, `SinkFailure` when the
    /// sink rejects bytes.
    pub fn run(mut self) -> Result<ExportOutcome, ExportError> {
        match self.drive() {
            Ok(()) => {
                self.state = PipelineState::Closed;
                Ok(ExportOutcome {
                    summary: self.summary,
                    unresolved: self.unresolved,
                })
            }
            Err(e) => {
                self.state = PipelineState::Errored;
                // Best-effort close; the original error is the one reported.
                let _ = self.cursor.close();
                Err(e)
            }
        }
    }

    fn drive(&mut self) -> Result<(), ExportError> {
        self.state = PipelineState::Streaming;

        let head = self.formatter.begin()?;
        self.write(&head)?;

        loop {
            let batch = self.cursor.next_batch(self.batch_size)?;
            if batch.is_empty() {
                break;
            }
            for row in batch {
                match resolver::resolve(row) {
                    Ok(fact) => {
                        let bytes = self.formatter.render(&fact)?;
                        self.write(&bytes)?;
                        self.summary.emitted = self.summary.emitted.saturating_add(1);
                    }
                    Err(unresolved) => {
                        // Drop policy: the fact is not emitted and the
                        // stream continues. The miss is recorded for the
                        // diagnostic channel, up to the retention cap.
                        self.summary.dropped = self.summary.dropped.saturating_add(1);
                        if self.unresolved.len() < MAX_UNRESOLVED_REPORTED {
                            self.unresolved.push(unresolved);
                        }
                    }
                }
            }
        }

        self.state = PipelineState::Draining;
        let tail = self.formatter.finish()?;
        self.write(&tail)?;
        self.sink
            .flush()
            .map_err(|e| ExportError::SinkFailure(e.to_string()))?;
        self.cursor.close()?;
        Ok(())
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), ExportError> {
        self.sink
            .write_all(bytes)
            .map_err(|e| ExportError::SinkFailure(e.to_string()))
    }
}

/// Result of a successful run.
#[derive(Debug)]
pub struct ExportOutcome {
    /// Emission counters.
    pub summary: ExportSummary,
    /// The references whose misses caused drops, in stream order, capped
    /// at `MAX_UNRESOLVED_REPORTED` entries. `summary.dropped` is the
    /// exact total.
    pub unresolved: Vec<resolver::UnresolvedReference>,
}

// =============================================================================
// CONVENIENCE ENTRY POINT
// =============================================================================

/// Export an entire store into `sink` using the selected format.
///
/// Opens the cursor, builds the formatter, and runs the pipeline. A store
/// that cannot be opened is a setup failure reported before any output is
/// produced.
///
/// # Errors
///
/// Propagates any fatal pipeline error; see `StreamPipeline::run`.
pub fn export<S: FactStore, W: Write>(
    store: &S,
    format: OutputFormat,
    sink: W,
    batch_size: usize,
) -> Result<ExportOutcome, ExportError> {
    let cursor = store.open()?;
    StreamPipeline::new(cursor, format.formatter(), sink, batch_size).run()
}

// =============================================================================
// TESTS
// =============================================================================
