//! # Core Type Definitions
//!
//! This module contains all core types for the Factgraph export engine:
//! - Fact identity (`SurrogateId`, `ContentHash`, `FactType`)
//! - Field data (`FieldValue`)
//! - Predecessor links (`PredecessorRef`, `ResolvedPredecessor`,
//!   `DeclaredRole`, `ResolvedRole`)
//! - The resolved unit of export (`ResolvedFact`)
//! - Error types (`ExportError`)
//!
//! ## Identity Guarantees
//!
//! A fact's identity is always the `(FactType, ContentHash)` pair.
//! `SurrogateId` is a run-scoped integer label assigned by the backing
//! store; it is monotonically increasing with emission order, used only
//! for human-readable cross-referencing, and never persisted semantics.

use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// FACT IDENTIFIERS
// =============================================================================

/// Run-local integer label for a fact, assigned by the backing store.
///
/// Surrogate ids are opaque to the engine. The store guarantees they are
/// monotonically increasing with emission order and causally respect the
/// edge relation (predecessors carry smaller ids than their successors).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SurrogateId(pub u64);

/// Globally unique identity of a fact's content.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ContentHash(pub String);

impl ContentHash {
    /// Create a new content hash from a string.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the hash as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Namespaced type name of a fact.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FactType(pub String);

impl FactType {
    /// Create a new fact type from a string.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the type name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// =============================================================================
// FIELD VALUES
// =============================================================================

/// Scalar value of a fact field.
///
/// Fields carry string, number, boolean, or absence. Non-finite floats
/// have no JSON representation and are rejected by the formatters as an
/// unsupported field value shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    /// A UTF-8 string value.
    Text(String),
    /// An integer value.
    Integer(i64),
    /// A floating-point value. Must be finite to be emitted.
    Float(f64),
    /// A boolean value.
    Boolean(bool),
    /// Explicit absence, emitted as JSON `null`.
    Absent,
}

impl FieldValue {
    /// Convert to a JSON value.
    ///
    /// Returns `None` for non-finite floats, which cannot be represented
    /// as JSON literals.
    #[must_use]
    pub fn to_json(&self) -> Option<serde_json::Value> {
        match self {
            Self::Text(s) => Some(serde_json::Value::String(s.clone())),
            Self::Integer(i) => Some(serde_json::Value::Number((*i).into())),
            Self::Float(f) => serde_json::Number::from_f64(*f).map(serde_json::Value::Number),
            Self::Boolean(b) => Some(serde_json::Value::Bool(*b)),
            Self::Absent => Some(serde_json::Value::Null),
        }
    }
}

// =============================================================================
// PREDECESSOR LINKS
// =============================================================================

/// A declared, unresolved predecessor reference.
///
/// Identity is the `(fact_type, content_hash)` pair; no other field
/// participates in matching.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PredecessorRef {
    /// Type of the referenced fact.
    pub fact_type: FactType,
    /// Content hash of the referenced fact.
    pub content_hash: ContentHash,
}

impl PredecessorRef {
    /// Create a new predecessor reference.
    #[must_use]
    pub fn new(fact_type: FactType, content_hash: ContentHash) -> Self {
        Self {
            fact_type,
            content_hash,
        }
    }
}

/// A predecessor reference augmented with the matched surrogate id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedPredecessor {
    /// The run-local label of the matched fact.
    pub surrogate_id: SurrogateId,
    /// Type of the referenced fact.
    pub fact_type: FactType,
    /// Content hash of the referenced fact.
    pub content_hash: ContentHash,
}

impl ResolvedPredecessor {
    /// Create a new resolved predecessor.
    #[must_use]
    pub fn new(surrogate_id: SurrogateId, fact_type: FactType, content_hash: ContentHash) -> Self {
        Self {
            surrogate_id,
            fact_type,
            content_hash,
        }
    }

    /// The identity pair this record matches against.
    #[must_use]
    pub fn key(&self) -> (&FactType, &ContentHash) {
        (&self.fact_type, &self.content_hash)
    }

    /// Strip the surrogate id back to the declared reference shape.
    #[must_use]
    pub fn to_ref(&self) -> PredecessorRef {
        PredecessorRef::new(self.fact_type.clone(), self.content_hash.clone())
    }
}

/// Role value as declared: one reference or an ordered sequence.
///
/// Cardinality is fixed per role by declaration, never inferred. A role
/// declared as a sequence stays a sequence even when it holds one (or
/// zero) references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeclaredRole {
    /// Exactly one predecessor reference.
    Single(PredecessorRef),
    /// An ordered sequence of predecessor references (possibly empty).
    Multi(Vec<PredecessorRef>),
}

/// Role value after resolution, mirroring the declared cardinality.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResolvedRole {
    /// Exactly one resolved predecessor.
    Single(ResolvedPredecessor),
    /// An ordered sequence of resolved predecessors, original order kept.
    Multi(Vec<ResolvedPredecessor>),
}

// =============================================================================
// RESOLVED FACT
// =============================================================================

/// The unit of export: a fact whose every declared predecessor reference
/// has been matched against its candidate set.
///
/// Resolved facts are ephemeral. They are constructed per batch, rendered,
/// and discarded; no fact is mutated after resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedFact {
    /// Run-local label, used only by the declarative output format.
    pub surrogate_id: SurrogateId,
    /// Content identity of the fact.
    pub content_hash: ContentHash,
    /// Namespaced type name.
    pub fact_type: FactType,
    /// Field data in declaration order.
    pub fields: Vec<(String, FieldValue)>,
    /// Predecessor roles in declaration order. Role names are unique.
    pub predecessors: Vec<(String, ResolvedRole)>,
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the Factgraph export engine.
///
/// - No silent failures except the documented drop-on-unresolved policy,
///   which is an ordinary outcome and not an error
/// - Use `Result<T, ExportError>` for fallible operations
/// - The engine never panics; all errors are propagated
#[derive(Debug, Error)]
pub enum ExportError {
    /// A batch read from the backing store failed. Fatal to the pipeline.
    #[error("Source failure: {0}")]
    SourceFailure(String),

    /// A fact could not be rendered into the selected wire format.
    #[error("Formatter failure: {0}")]
    FormatterFailure(String),

    /// The output sink rejected emitted bytes.
    #[error("Sink failure: {0}")]
    SinkFailure(String),

    /// The backing store rejected an operation or is inconsistent.
    #[error("Storage error: {0}")]
    StorageError(String),

    /// A serialization or deserialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// A fact violates a structural invariant (duplicate role name,
    /// reference to an unknown fact at insertion time).
    #[error("Invalid fact: {0}")]
    InvalidFact(String),
}

// =============================================================================
// TESTS
// =============================================================================
