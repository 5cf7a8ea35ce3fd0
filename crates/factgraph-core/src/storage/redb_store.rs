//! # redb-backed Fact Store
//!
//! A disk-backed `FactStore` using the redb embedded database, providing:
//! - ACID transactions
//! - Crash safety (copy-on-write B-trees)
//! - MVCC (one read snapshot per cursor, stable across batches)
//!
//! ## Schema
//!
//! - `facts`: surrogate id (u64) -> postcard-encoded `StoredFact`
//! - `hash_index`: (fact type, content hash) -> surrogate id
//! - `edges`: (successor id, predecessor id) -> ()
//! - `metadata`: key string -> value u64 (surrogate id counter)
//!
//! The edge relation is what lets the cursor attach each row's
//! direct-predecessor candidate set: a range scan keyed by the fact's own
//! surrogate id, joined back through `facts`. Insertion order guarantees
//! that surrogate ids are monotone and causally respect the edge relation,
//! which is the ordering invariant the export pipeline trusts.

use crate::source::{FactCursor, FactDraft, FactStore, RawFactRow};
use crate::types::{
    ContentHash, DeclaredRole, ExportError, FactType, FieldValue, ResolvedPredecessor, SurrogateId,
};
use redb::{
    Database, ReadTransaction, ReadableDatabase, ReadableTable, ReadableTableMetadata,
    TableDefinition,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

/// Table for facts: surrogate id -> serialized StoredFact bytes.
const FACTS: TableDefinition<u64, &[u8]> = TableDefinition::new("facts");

/// Table for the identity index: (fact type, content hash) -> surrogate id.
const HASH_INDEX: TableDefinition<(&str, &str), u64> = TableDefinition::new("hash_index");

/// Table for the edge relation: (successor id, predecessor id) -> ().
const EDGES: TableDefinition<(u64, u64), ()> = TableDefinition::new("edges");

/// Table for metadata: key string -> value u64.
const METADATA: TableDefinition<&str, u64> = TableDefinition::new("metadata");

/// Metadata key holding the next surrogate id to assign.
const NEXT_SURROGATE_ID: &str = "next_surrogate_id";

/// Surrogate ids start at 1; 0 is never assigned.
const FIRST_SURROGATE_ID: u64 = 1;

// =============================================================================
// STORED FACT
// =============================================================================

/// The persisted shape of one fact, minus its surrogate id (the table key).
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredFact {
    content_hash: ContentHash,
    fact_type: FactType,
    fields: Vec<(String, FieldValue)>,
    declared_predecessors: Vec<(String, DeclaredRole)>,
}

// =============================================================================
// REDB FACT STORE
// =============================================================================

/// A disk-backed fact store using redb.
pub struct RedbFactStore {
    /// The redb database handle.
    db: Database,
}

impl std::fmt::Debug for RedbFactStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbFactStore").finish_non_exhaustive()
    }
}

impl RedbFactStore {
    /// Open or create a fact database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ExportError> {
        let db =
            Database::create(path.as_ref()).map_err(|e| ExportError::StorageError(e.to_string()))?;

        // Initialize tables if they don't exist
        {
            let write_txn = db
                .begin_write()
                .map_err(|e| ExportError::StorageError(e.to_string()))?;
            let _ = write_txn
                .open_table(FACTS)
                .map_err(|e| ExportError::StorageError(e.to_string()))?;
            let _ = write_txn
                .open_table(HASH_INDEX)
                .map_err(|e| ExportError::StorageError(e.to_string()))?;
            let _ = write_txn
                .open_table(EDGES)
                .map_err(|e| ExportError::StorageError(e.to_string()))?;
            let _ = write_txn
                .open_table(METADATA)
                .map_err(|e| ExportError::StorageError(e.to_string()))?;
            write_txn
                .commit()
                .map_err(|e| ExportError::StorageError(e.to_string()))?;
        }

        Ok(Self { db })
    }

    /// Insert a batch of facts in a single ACID transaction.
    ///
    /// Drafts are processed in order; a draft may reference any fact
    /// inserted earlier, including earlier drafts of the same batch. The
    /// whole batch commits or none of it does.
    ///
    /// Re-inserting an identity pair already present is idempotent and
    /// returns the existing surrogate id for that position.
    ///
    /// # Errors
    ///
    /// Returns `ExportError::InvalidFact` if any draft has duplicate role
    /// names or references an unknown fact; the batch is rejected whole.
    pub fn insert_batch(&mut self, drafts: &[FactDraft]) -> Result<Vec<SurrogateId>, ExportError> {
        if drafts.is_empty() {
            return Ok(Vec::new());
        }

        // Validate structure before opening the transaction.
        for draft in drafts {
            draft.validate_roles()?;
        }

        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| ExportError::StorageError(e.to_string()))?;

        let mut assigned = Vec::with_capacity(drafts.len());
        {
            let mut facts_table = write_txn
                .open_table(FACTS)
                .map_err(|e| ExportError::StorageError(e.to_string()))?;
            let mut index_table = write_txn
                .open_table(HASH_INDEX)
                .map_err(|e| ExportError::StorageError(e.to_string()))?;
            let mut edges_table = write_txn
                .open_table(EDGES)
                .map_err(|e| ExportError::StorageError(e.to_string()))?;
            let mut meta_table = write_txn
                .open_table(METADATA)
                .map_err(|e| ExportError::StorageError(e.to_string()))?;

            let mut next_id = meta_table
                .get(NEXT_SURROGATE_ID)
                .map_err(|e| ExportError::StorageError(e.to_string()))?
                .map(|v| v.value())
                .unwrap_or(FIRST_SURROGATE_ID);

            for draft in drafts {
                let key = (draft.fact_type.as_str(), draft.content_hash.as_str());
                if let Some(existing) = index_table
                    .get(key)
                    .map_err(|e| ExportError::StorageError(e.to_string()))?
                {
                    assigned.push(SurrogateId(existing.value()));
                    continue;
                }

                // Resolve every declared reference; unknown facts reject
                // the batch (this is what keeps surrogate ids causal).
                let mut predecessor_ids = BTreeSet::new();
                for reference in draft.references() {
                    let ref_key = (
                        reference.fact_type.as_str(),
                        reference.content_hash.as_str(),
                    );
                    let id = index_table
                        .get(ref_key)
                        .map_err(|e| ExportError::StorageError(e.to_string()))?
                        .map(|v| v.value())
                        .ok_or_else(|| {
                            ExportError::InvalidFact(format!(
                                "Reference to unknown fact: ({}, {})",
                                reference.fact_type.as_str(),
                                reference.content_hash.as_str()
                            ))
                        })?;
                    predecessor_ids.insert(id);
                }

                let surrogate_id = next_id;
                next_id = next_id.saturating_add(1);

                let stored = StoredFact {
                    content_hash: draft.content_hash.clone(),
                    fact_type: draft.fact_type.clone(),
                    fields: draft.fields.clone(),
                    declared_predecessors: draft.declared_predecessors.clone(),
                };
                let bytes = postcard::to_allocvec(&stored)
                    .map_err(|e| ExportError::SerializationError(e.to_string()))?;

                facts_table
                    .insert(surrogate_id, bytes.as_slice())
                    .map_err(|e| ExportError::StorageError(e.to_string()))?;
                index_table
                    .insert(key, surrogate_id)
                    .map_err(|e| ExportError::StorageError(e.to_string()))?;
                for predecessor in predecessor_ids {
                    edges_table
                        .insert((surrogate_id, predecessor), ())
                        .map_err(|e| ExportError::StorageError(e.to_string()))?;
                }

                assigned.push(SurrogateId(surrogate_id));
            }

            meta_table
                .insert(NEXT_SURROGATE_ID, next_id)
                .map_err(|e| ExportError::StorageError(e.to_string()))?;
        }

        write_txn
            .commit()
            .map_err(|e| ExportError::StorageError(e.to_string()))?;

        Ok(assigned)
    }

    /// Insert a single fact. See `insert_batch`.
    pub fn insert(&mut self, draft: FactDraft) -> Result<SurrogateId, ExportError> {
        let mut ids = self.insert_batch(std::slice::from_ref(&draft))?;
        ids.pop()
            .ok_or_else(|| ExportError::StorageError("Insert assigned no id".to_string()))
    }

    /// Total number of edges in the store.
    pub fn edge_count(&self) -> Result<u64, ExportError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| ExportError::StorageError(e.to_string()))?;
        let table = read_txn
            .open_table(EDGES)
            .map_err(|e| ExportError::StorageError(e.to_string()))?;
        table
            .len()
            .map_err(|e| ExportError::StorageError(e.to_string()))
    }
}

impl FactStore for RedbFactStore {
    type Cursor = RedbCursor;

    fn fact_count(&self) -> Result<u64, ExportError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| ExportError::StorageError(e.to_string()))?;
        let table = read_txn
            .open_table(FACTS)
            .map_err(|e| ExportError::StorageError(e.to_string()))?;
        table
            .len()
            .map_err(|e| ExportError::StorageError(e.to_string()))
    }

    fn open(&self) -> Result<Self::Cursor, ExportError> {
        let txn = self
            .db
            .begin_read()
            .map_err(|e| ExportError::SourceFailure(e.to_string()))?;
        Ok(RedbCursor {
            txn: Some(txn),
            next_key: 0,
        })
    }
}

// =============================================================================
// CURSOR
// =============================================================================

/// Paged cursor over a single MVCC read snapshot.
///
/// All batches of one export run observe the same committed state; writes
/// that land mid-export are invisible to it.
pub struct RedbCursor {
    /// The read snapshot. `None` after close.
    txn: Option<ReadTransaction>,
    /// First surrogate id not yet returned.
    next_key: u64,
}

impl std::fmt::Debug for RedbCursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbCursor")
            .field("next_key", &self.next_key)
            .field("closed", &self.txn.is_none())
            .finish()
    }
}

impl FactCursor for RedbCursor {
    fn next_batch(&mut self, batch_size: usize) -> Result<Vec<RawFactRow>, ExportError> {
        let txn = self
            .txn
            .as_ref()
            .ok_or_else(|| ExportError::SourceFailure("Cursor is closed".to_string()))?;

        let facts_table = txn
            .open_table(FACTS)
            .map_err(|e| ExportError::SourceFailure(e.to_string()))?;
        let edges_table = txn
            .open_table(EDGES)
            .map_err(|e| ExportError::SourceFailure(e.to_string()))?;

        let mut rows = Vec::new();
        let range = facts_table
            .range(self.next_key..)
            .map_err(|e| ExportError::SourceFailure(e.to_string()))?;

        for entry in range.take(batch_size) {
            let (key, value) = entry.map_err(|e| ExportError::SourceFailure(e.to_string()))?;
            let surrogate_id = key.value();
            let stored: StoredFact = postcard::from_bytes(value.value())
                .map_err(|e| ExportError::SerializationError(e.to_string()))?;

            // Resolve the edge relation for this fact: its candidate set
            // is exactly its direct predecessors, surrogate ids attached.
            let mut candidates = Vec::new();
            let edge_range = edges_table
                .range((surrogate_id, 0)..=(surrogate_id, u64::MAX))
                .map_err(|e| ExportError::SourceFailure(e.to_string()))?;
            for edge in edge_range {
                let (edge_key, _) = edge.map_err(|e| ExportError::SourceFailure(e.to_string()))?;
                let (_, predecessor_id) = edge_key.value();
                let predecessor_bytes = facts_table
                    .get(predecessor_id)
                    .map_err(|e| ExportError::SourceFailure(e.to_string()))?
                    .ok_or_else(|| {
                        ExportError::StorageError(format!(
                            "Dangling edge: {} -> {}",
                            surrogate_id, predecessor_id
                        ))
                    })?;
                let predecessor: StoredFact = postcard::from_bytes(predecessor_bytes.value())
                    .map_err(|e| ExportError::SerializationError(e.to_string()))?;
                candidates.push(ResolvedPredecessor::new(
                    SurrogateId(predecessor_id),
                    predecessor.fact_type,
                    predecessor.content_hash,
                ));
            }

            rows.push(RawFactRow {
                surrogate_id: SurrogateId(surrogate_id),
                content_hash: stored.content_hash,
                fact_type: stored.fact_type,
                fields: stored.fields,
                declared_predecessors: stored.declared_predecessors,
                candidate_predecessors: candidates,
            });
            self.next_key = surrogate_id.saturating_add(1);
        }

        Ok(rows)
    }

    fn close(&mut self) -> Result<(), ExportError> {
        self.txn = None;
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::types::PredecessorRef;
    use tempfile::NamedTempFile;

    fn draft(fact_type: &str, hash: &str) -> FactDraft {
        FactDraft {
            content_hash: ContentHash::new(hash),
            fact_type: FactType::new(fact_type),
            fields: vec![("k".to_string(), FieldValue::Text(hash.to_string()))],
            declared_predecessors: Vec::new(),
        }
    }

    fn open_store() -> (RedbFactStore, NamedTempFile) {
        let file = NamedTempFile::new().expect("temp file");
        let store = RedbFactStore::open(file.path()).expect("open store");
        (store, file)
    }

    #[test]
    fn insert_and_count() {
        let (mut store, _file) = open_store();
        store.insert(draft("Site", "h1")).unwrap();
        store.insert(draft("Post", "h2")).unwrap();

        assert_eq!(store.fact_count().unwrap(), 2);
        assert_eq!(store.edge_count().unwrap(), 0);
    }

    #[test]
    fn surrogate_ids_survive_reopen() {
        let file = NamedTempFile::new().expect("temp file");
        {
            let mut store = RedbFactStore::open(file.path()).unwrap();
            assert_eq!(store.insert(draft("Site", "h1")).unwrap(), SurrogateId(1));
        }
        {
            let mut store = RedbFactStore::open(file.path()).unwrap();
            assert_eq!(store.insert(draft("Post", "h2")).unwrap(), SurrogateId(2));
            assert_eq!(store.fact_count().unwrap(), 2);
        }
    }

    #[test]
    fn batch_may_reference_earlier_drafts() {
        let (mut store, _file) = open_store();

        let mut post = draft("Post", "h2");
        post.declared_predecessors = vec![(
            "site".to_string(),
            DeclaredRole::Single(PredecessorRef::new(
                FactType::new("Site"),
                ContentHash::new("h1"),
            )),
        )];

        let ids = store.insert_batch(&[draft("Site", "h1"), post]).unwrap();
        assert_eq!(ids, vec![SurrogateId(1), SurrogateId(2)]);
        assert_eq!(store.edge_count().unwrap(), 1);
    }

    #[test]
    fn batch_with_unknown_reference_commits_nothing() {
        let (mut store, _file) = open_store();

        let mut post = draft("Post", "h2");
        post.declared_predecessors = vec![(
            "site".to_string(),
            DeclaredRole::Single(PredecessorRef::new(
                FactType::new("Site"),
                ContentHash::new("missing"),
            )),
        )];

        let result = store.insert_batch(&[draft("Site", "h1"), post]);
        assert!(matches!(result, Err(ExportError::InvalidFact(_))));
        assert_eq!(store.fact_count().unwrap(), 0);
    }

    #[test]
    fn cursor_attaches_candidate_sets_from_edges() {
        let (mut store, _file) = open_store();

        let mut post = draft("Post", "h2");
        post.declared_predecessors = vec![(
            "site".to_string(),
            DeclaredRole::Single(PredecessorRef::new(
                FactType::new("Site"),
                ContentHash::new("h1"),
            )),
        )];
        store.insert_batch(&[draft("Site", "h1"), post]).unwrap();

        let mut cursor = store.open().unwrap();
        let rows = cursor.next_batch(10).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows[0].candidate_predecessors.is_empty());
        assert_eq!(rows[1].candidate_predecessors.len(), 1);
        assert_eq!(
            rows[1].candidate_predecessors[0].surrogate_id,
            SurrogateId(1)
        );
        assert_eq!(rows[1].candidate_predecessors[0].fact_type.as_str(), "Site");
        cursor.close().unwrap();
    }

    #[test]
    fn cursor_snapshot_ignores_mid_export_writes() {
        let (mut store, _file) = open_store();
        store.insert(draft("Site", "h1")).unwrap();

        let mut cursor = store.open().unwrap();
        store.insert(draft("Post", "h2")).unwrap();

        let rows = cursor.next_batch(10).unwrap();
        assert_eq!(rows.len(), 1);
        assert!(cursor.next_batch(10).unwrap().is_empty());
        cursor.close().unwrap();
    }

    #[test]
    fn idempotent_insert_returns_existing_id() {
        let (mut store, _file) = open_store();
        let first = store.insert(draft("Site", "h1")).unwrap();
        let second = store.insert(draft("Site", "h1")).unwrap();

        assert_eq!(first, second);
        assert_eq!(store.fact_count().unwrap(), 1);
    }

    #[test]
    fn read_after_close_is_a_source_failure() {
        let (store, _file) = open_store();
        let mut cursor = store.open().unwrap();
        cursor.close().unwrap();

        assert!(matches!(
            cursor.next_batch(1),
            Err(ExportError::SourceFailure(_))
        ));
    }
}
