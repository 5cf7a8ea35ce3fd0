//! # Record Source
//!
//! Pull-based access to the backing store.
//!
//! The store yields flat, paginated `RawFactRow` batches. Each row carries
//! the fact's own identity and fields plus two predecessor views computed
//! by the store:
//! - `declared_predecessors`: role -> reference(s), exactly as recorded
//! - `candidate_predecessors`: the facts reachable as *direct* predecessors
//!   of this row per the store's edge relation, with surrogate ids attached
//!
//! The candidate set is the universe the resolver matches against. It is
//! per-row; cross-fact candidate leakage is forbidden.
//!
//! This module also provides `MemoryFactStore`, an in-memory store with the
//! same contract as the persistent redb backend. It backs the unit and
//! property tests and doubles as a staging buffer.

use crate::types::{
    ContentHash, DeclaredRole, ExportError, FactType, FieldValue, PredecessorRef,
    ResolvedPredecessor, SurrogateId,
};
use std::collections::{BTreeMap, BTreeSet};

// =============================================================================
// RAW FACT ROW
// =============================================================================

/// One row of the paginated export stream, as supplied by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct RawFactRow {
    /// Run-local label assigned by the store, monotone in emission order.
    pub surrogate_id: SurrogateId,
    /// Content identity of the fact.
    pub content_hash: ContentHash,
    /// Namespaced type name.
    pub fact_type: FactType,
    /// Field data in declaration order.
    pub fields: Vec<(String, FieldValue)>,
    /// Predecessor roles exactly as recorded, in declaration order.
    pub declared_predecessors: Vec<(String, DeclaredRole)>,
    /// Direct-predecessor candidates for this row, surrogate ids attached.
    /// Unordered; duplicates with the same identity pair are permitted.
    pub candidate_predecessors: Vec<ResolvedPredecessor>,
}

// =============================================================================
// STORE TRAITS
// =============================================================================

/// A queryable backing store that can be exported.
///
/// Connection establishment and schema verification happen before a value
/// of this type exists; the engine only pulls rows through it.
pub trait FactStore {
    /// The cursor type produced by `open`.
    type Cursor: FactCursor;

    /// Total number of facts in the dataset.
    ///
    /// Backs the setup-failure path: a store that cannot answer this is
    /// reported once, fatally, before any output is produced.
    fn fact_count(&self) -> Result<u64, ExportError>;

    /// Open a cursor over all rows in surrogate-id order.
    fn open(&self) -> Result<Self::Cursor, ExportError>;
}

/// A paged cursor over `RawFactRow`s.
///
/// An empty batch signals end of stream; after that the cursor must be
/// closed. Any batch read failure is fatal to the whole pipeline — there
/// is no partial-batch retry.
pub trait FactCursor {
    /// Fetch up to `batch_size` rows. An empty result means exhaustion.
    fn next_batch(&mut self, batch_size: usize) -> Result<Vec<RawFactRow>, ExportError>;

    /// Release the cursor. Idempotent; reads after close are a
    /// `SourceFailure`.
    fn close(&mut self) -> Result<(), ExportError>;
}

// =============================================================================
// FACT DRAFT (insertion shape)
// =============================================================================

/// A fact as submitted for insertion, before the store assigns its
/// surrogate id.
#[derive(Debug, Clone, PartialEq)]
pub struct FactDraft {
    /// Content identity of the fact.
    pub content_hash: ContentHash,
    /// Namespaced type name.
    pub fact_type: FactType,
    /// Field data in declaration order.
    pub fields: Vec<(String, FieldValue)>,
    /// Predecessor roles in declaration order.
    pub declared_predecessors: Vec<(String, DeclaredRole)>,
}

impl FactDraft {
    /// All references declared by this draft, in declaration order.
    pub fn references(&self) -> impl Iterator<Item = &PredecessorRef> {
        self.declared_predecessors
            .iter()
            .flat_map(|(_, role)| match role {
                DeclaredRole::Single(r) => std::slice::from_ref(r).iter(),
                DeclaredRole::Multi(rs) => rs.iter(),
            })
    }

    /// Check that role names are unique within the draft.
    pub(crate) fn validate_roles(&self) -> Result<(), ExportError> {
        let mut seen = BTreeSet::new();
        for (role, _) in &self.declared_predecessors {
            if !seen.insert(role.as_str()) {
                return Err(ExportError::InvalidFact(format!(
                    "Duplicate role name: {}",
                    role
                )));
            }
        }
        Ok(())
    }
}

// =============================================================================
// IN-MEMORY STORE
// =============================================================================

/// A stored fact, candidate set already attached at insert time.
#[derive(Debug, Clone)]
struct MemoryRecord {
    row: RawFactRow,
}

/// An in-memory `FactStore`.
///
/// `insert` upholds the same invariants as the persistent backend:
/// - role names unique within a fact
/// - every declared reference resolves to an already-inserted fact, so
///   surrogate ids causally respect the edge relation
/// - insertion of an identity pair already present is idempotent
///
/// `from_rows` bypasses validation entirely. Tests use it to stage
/// inconsistent datasets (missing candidates, pagination edge cases).
#[derive(Debug, Clone)]
pub struct MemoryFactStore {
    /// Records in surrogate-id order.
    records: Vec<MemoryRecord>,
    /// Identity index: (type, hash) -> surrogate id.
    index: BTreeMap<(FactType, ContentHash), SurrogateId>,
    /// Next surrogate id to assign. Ids start at 1.
    next_id: u64,
}

impl Default for MemoryFactStore {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            index: BTreeMap::new(),
            next_id: 1,
        }
    }
}

impl MemoryFactStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from pre-assembled rows, exactly as given.
    ///
    /// No invariant is checked; the rows are served back verbatim.
    #[must_use]
    pub fn from_rows(rows: Vec<RawFactRow>) -> Self {
        let mut index = BTreeMap::new();
        let mut next_id = 1u64;
        for row in &rows {
            index.insert(
                (row.fact_type.clone(), row.content_hash.clone()),
                row.surrogate_id,
            );
            next_id = next_id.max(row.surrogate_id.0.saturating_add(1));
        }
        Self {
            records: rows.into_iter().map(|row| MemoryRecord { row }).collect(),
            index,
            next_id,
        }
    }

    /// Insert a fact, assigning the next surrogate id.
    ///
    /// Re-inserting an identity pair already present returns the existing
    /// id without modifying the store (the dataset is content-addressed).
    ///
    /// # Errors
    ///
    /// Returns `ExportError::InvalidFact` if role names collide or any
    /// declared reference does not name an already-inserted fact.
    pub fn insert(&mut self, draft: FactDraft) -> Result<SurrogateId, ExportError> {
        draft.validate_roles()?;

        let key = (draft.fact_type.clone(), draft.content_hash.clone());
        if let Some(&existing) = self.index.get(&key) {
            return Ok(existing);
        }

        // Resolve every declared reference before touching the store.
        let mut candidate_ids = BTreeSet::new();
        for reference in draft.references() {
            let ref_key = (reference.fact_type.clone(), reference.content_hash.clone());
            let id = self.index.get(&ref_key).ok_or_else(|| {
                ExportError::InvalidFact(format!(
                    "Reference to unknown fact: ({}, {})",
                    reference.fact_type.as_str(),
                    reference.content_hash.as_str()
                ))
            })?;
            candidate_ids.insert(*id);
        }

        let surrogate_id = SurrogateId(self.next_id);
        self.next_id = self.next_id.saturating_add(1);

        let mut candidate_predecessors = Vec::with_capacity(candidate_ids.len());
        for id in &candidate_ids {
            let row = self
                .records
                .iter()
                .find(|r| r.row.surrogate_id == *id)
                .map(|r| &r.row)
                .ok_or_else(|| {
                    ExportError::StorageError(format!("Dangling surrogate id: {}", id.0))
                })?;
            candidate_predecessors.push(ResolvedPredecessor::new(
                *id,
                row.fact_type.clone(),
                row.content_hash.clone(),
            ));
        }

        self.records.push(MemoryRecord {
            row: RawFactRow {
                surrogate_id,
                content_hash: draft.content_hash,
                fact_type: draft.fact_type,
                fields: draft.fields,
                declared_predecessors: draft.declared_predecessors,
                candidate_predecessors,
            },
        });
        self.index.insert(key, surrogate_id);

        Ok(surrogate_id)
    }

    /// Look up a surrogate id by identity pair.
    #[must_use]
    pub fn lookup(&self, fact_type: &FactType, content_hash: &ContentHash) -> Option<SurrogateId> {
        self.index
            .get(&(fact_type.clone(), content_hash.clone()))
            .copied()
    }
}

impl FactStore for MemoryFactStore {
    type Cursor = MemoryCursor;

    fn fact_count(&self) -> Result<u64, ExportError> {
        Ok(self.records.len() as u64)
    }

    fn open(&self) -> Result<Self::Cursor, ExportError> {
        Ok(MemoryCursor {
            rows: self.records.iter().map(|r| r.row.clone()).collect(),
            position: 0,
            closed: false,
        })
    }
}

/// Cursor over a `MemoryFactStore` snapshot.
#[derive(Debug)]
pub struct MemoryCursor {
    rows: Vec<RawFactRow>,
    position: usize,
    closed: bool,
}

impl FactCursor for MemoryCursor {
    fn next_batch(&mut self, batch_size: usize) -> Result<Vec<RawFactRow>, ExportError> {
        if self.closed {
            return Err(ExportError::SourceFailure(
                "Cursor is closed".to_string(),
            ));
        }
        let end = self.position.saturating_add(batch_size).min(self.rows.len());
        let batch = self.rows[self.position..end].to_vec();
        self.position = end;
        Ok(batch)
    }

    fn close(&mut self) -> Result<(), ExportError> {
        self.closed = true;
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
