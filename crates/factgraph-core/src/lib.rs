//! # factgraph-core
//!
//! The streaming export engine for Factgraph - THE LOGIC.
//!
//! This crate reconstructs a content-addressed fact graph from a flat,
//! paginated stream of rows and serializes it into one of two portable
//! wire representations. Given rows that each carry their own identity,
//! field data, declared predecessor references, and an unordered bag of
//! available predecessor candidates, the engine:
//!
//! - resolves every declared reference to a concrete predecessor record,
//! - drops facts whose predecessor context is incomplete (counted, never
//!   emitted as dangling references),
//! - emits each fact in store order, which satisfies the
//!   predecessors-before-successors constraint the declarative format
//!   needs,
//! - holds only a bounded window of the dataset in memory at any time.
//!
//! ## Architectural Constraints
//!
//! The engine:
//! - Is pure Rust: no async, no network dependencies
//! - Never re-orders: emission order equals store order
//! - Treats surrogate ids as opaque run-scoped labels; identity is always
//!   the `(fact type, content hash)` pair
//! - Reaches the backing store only through the `FactStore` trait

// =============================================================================
// MODULES
// =============================================================================

pub mod format;
pub mod pipeline;
pub mod primitives;
pub mod resolver;
pub mod source;
pub mod storage;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    ContentHash, DeclaredRole, ExportError, FactType, FieldValue, PredecessorRef, ResolvedFact,
    ResolvedPredecessor, ResolvedRole, SurrogateId,
};

// =============================================================================
// RE-EXPORTS: Engine
// =============================================================================

pub use format::{DeclarativeTextFormatter, OutputFormat, OutputFormatter, PlainGraphFormatter};
pub use pipeline::{ExportOutcome, ExportSummary, PipelineState, StreamPipeline, export};
pub use resolver::{UnresolvedReference, resolve};
pub use source::{FactCursor, FactDraft, FactStore, MemoryFactStore, RawFactRow};
pub use storage::RedbFactStore;
