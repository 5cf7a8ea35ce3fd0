//! # DeclarativeText Formatter
//!
//! Human-readable block output.
//!
//! Per fact:
//!
//! ```text
//! let f<surrogateId>: <factType> = {
//!     <fieldKey>: <json-literal>,
//!     <roleKey>: f<predecessorId>,
//!     <roleKey>: [f<id1>, f<id2>]
//! }
//! ```
//!
//! Field entries precede predecessor entries; within each group, original
//! declaration order is preserved. No comma follows the last entry. Each
//! block is terminated by a blank line. Surrogate ids are the only
//! cross-references, which is why this format requires every predecessor's
//! block to have been emitted before its successors — a guarantee the
//! engine inherits from the store's row order and does not re-establish.

use super::OutputFormatter;
use crate::primitives::DECLARATIVE_INDENT;
use crate::types::{ExportError, ResolvedFact, ResolvedRole};

/// Formatter for the declarative text wire format.
#[derive(Debug, Default)]
pub struct DeclarativeTextFormatter;

impl DeclarativeTextFormatter {
    /// Create a new formatter.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl OutputFormatter for DeclarativeTextFormatter {
    fn begin(&mut self) -> Result<Vec<u8>, ExportError> {
        Ok(Vec::new())
    }

    fn render(&mut self, fact: &ResolvedFact) -> Result<Vec<u8>, ExportError> {
        let mut entries = Vec::with_capacity(fact.fields.len() + fact.predecessors.len());

        for (key, value) in &fact.fields {
            let literal = value.to_json().ok_or_else(|| {
                ExportError::FormatterFailure(format!(
                    "Unsupported field value shape for '{}' in fact {}",
                    key,
                    fact.content_hash.as_str()
                ))
            })?;
            let literal = serde_json::to_string(&literal)
                .map_err(|e| ExportError::SerializationError(e.to_string()))?;
            entries.push(format!("{}{}: {}", DECLARATIVE_INDENT, key, literal));
        }

        for (role, resolved) in &fact.predecessors {
            let literal = match resolved {
                ResolvedRole::Single(p) => format!("f{}", p.surrogate_id.0),
                ResolvedRole::Multi(ps) => {
                    let members: Vec<String> =
                        ps.iter().map(|p| format!("f{}", p.surrogate_id.0)).collect();
                    format!("[{}]", members.join(", "))
                }
            };
            entries.push(format!("{}{}: {}", DECLARATIVE_INDENT, role, literal));
        }

        let mut block = format!(
            "let f{}: {} = {{\n",
            fact.surrogate_id.0,
            fact.fact_type.as_str()
        );
        if !entries.is_empty() {
            block.push_str(&entries.join(",\n"));
            block.push('\n');
        }
        block.push_str("}\n\n");

        Ok(block.into_bytes())
    }

    fn finish(&mut self) -> Result<Vec<u8>, ExportError> {
        Ok(Vec::new())
    }
}

// =============================================================================
// TESTS
// =============================================================================
