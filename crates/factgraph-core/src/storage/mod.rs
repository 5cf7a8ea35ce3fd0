//! # Storage Backends
//!
//! Persistent backing store implementations of the `FactStore` contract.

mod redb_store;

pub use redb_store::{RedbCursor, RedbFactStore};
