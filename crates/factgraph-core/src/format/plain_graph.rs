//! # PlainGraph Formatter
//!
//! Streamed JSON array output.
//!
//! One compact object per fact with keys `hash`, `type`, `predecessors`,
//! `fields` in that order. Predecessors are reduced back to their declared
//! `{hash, type}` shape — surrogate ids are stripped entirely and never
//! appear anywhere in this format, not even for the fact's own identity.
//!
//! The array is written incrementally (`[`, comma-separated elements, `]`)
//! as facts become available; it is never materialized in memory.

use super::OutputFormatter;
use crate::types::{ExportError, ResolvedFact, ResolvedPredecessor, ResolvedRole};
use serde_json::{Map, Value};

/// Formatter for the PlainGraph JSON wire format.
#[derive(Debug, Default)]
pub struct PlainGraphFormatter {
    /// Whether any element has been rendered yet (drives separators).
    started: bool,
}

impl PlainGraphFormatter {
    /// Create a new formatter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl OutputFormatter for PlainGraphFormatter {
    fn begin(&mut self) -> Result<Vec<u8>, ExportError> {
        Ok(b"[\n".to_vec())
    }

    fn render(&mut self, fact: &ResolvedFact) -> Result<Vec<u8>, ExportError> {
        let element = render_element(fact)?;
        let mut bytes = Vec::with_capacity(element.len() + 2);
        if self.started {
            bytes.extend_from_slice(b",\n");
        }
        self.started = true;
        bytes.extend_from_slice(element.as_bytes());
        Ok(bytes)
    }

    fn finish(&mut self) -> Result<Vec<u8>, ExportError> {
        if self.started {
            Ok(b"\n]\n".to_vec())
        } else {
            Ok(b"]\n".to_vec())
        }
    }
}

/// Render one fact as a compact JSON object.
///
/// `serde_json` is built with `preserve_order`, so map insertion order is
/// emission order — field and role declaration order survives.
fn render_element(fact: &ResolvedFact) -> Result<String, ExportError> {
    let mut predecessors = Map::new();
    for (role, resolved) in &fact.predecessors {
        let value = match resolved {
            ResolvedRole::Single(p) => predecessor_object(p),
            ResolvedRole::Multi(ps) => Value::Array(ps.iter().map(predecessor_object).collect()),
        };
        predecessors.insert(role.clone(), value);
    }

    let mut fields = Map::new();
    for (key, value) in &fact.fields {
        let literal = value.to_json().ok_or_else(|| {
            ExportError::FormatterFailure(format!(
                "Unsupported field value shape for '{}' in fact {}",
                key,
                fact.content_hash.as_str()
            ))
        })?;
        fields.insert(key.clone(), literal);
    }

    let mut element = Map::new();
    element.insert(
        "hash".to_string(),
        Value::String(fact.content_hash.as_str().to_string()),
    );
    element.insert(
        "type".to_string(),
        Value::String(fact.fact_type.as_str().to_string()),
    );
    element.insert("predecessors".to_string(), Value::Object(predecessors));
    element.insert("fields".to_string(), Value::Object(fields));

    serde_json::to_string(&Value::Object(element))
        .map_err(|e| ExportError::SerializationError(e.to_string()))
}

/// The `{hash, type}` shape of one predecessor. No surrogate id.
fn predecessor_object(p: &ResolvedPredecessor) -> Value {
    let mut object = Map::new();
    object.insert(
        "hash".to_string(),
        Value::String(p.content_hash.as_str().to_string()),
    );
    object.insert(
        "type".to_string(),
        Value::String(p.fact_type.as_str().to_string()),
    );
    Value::Object(object)
}

// =============================================================================
// TESTS
// =============================================================================
