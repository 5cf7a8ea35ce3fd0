//! # Predecessor Resolver
//!
//! Pure resolution of declared predecessor references against a row's own
//! candidate set.
//!
//! Matching is exact equality on the `(fact_type, content_hash)` pair.
//! No partial or fuzzy matching. If the candidate set contains duplicate
//! entries with the same identity pair, any one may be chosen — the
//! candidates are content-addressed, so the ties are not semantically
//! distinguishable.
//!
//! The first lookup miss fails the whole fact. Failure is an ordinary
//! outcome, not an error: the pipeline drops the fact and continues.

use crate::source::RawFactRow;
use crate::types::{
    DeclaredRole, PredecessorRef, ResolvedFact, ResolvedPredecessor, ResolvedRole, SurrogateId,
};

// =============================================================================
// RESOLUTION FAILURE
// =============================================================================

/// A declared reference with no matching entry in the fact's candidate set.
///
/// Carries enough context for the diagnostic channel; the offending fact
/// itself is discarded without being emitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedReference {
    /// The fact whose resolution failed.
    pub fact: SurrogateId,
    /// The role under which the missing reference was declared.
    pub role: String,
    /// The reference that found no candidate.
    pub reference: PredecessorRef,
}

impl std::fmt::Display for UnresolvedReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "fact f{} role '{}' references ({}, {}) with no matching candidate",
            self.fact.0,
            self.role,
            self.reference.fact_type.as_str(),
            self.reference.content_hash.as_str()
        )
    }
}

// =============================================================================
// RESOLUTION
// =============================================================================

/// Resolve every declared predecessor reference of a raw row.
///
/// On success the returned fact carries the same fields and a predecessor
/// structure that exactly mirrors the declared one: same roles, same
/// cardinality, same order for sequences, with surrogate ids substituted
/// from the candidate set.
///
/// # Errors
///
/// Returns `UnresolvedReference` for the first declared reference with no
/// candidate whose identity pair matches.
pub fn resolve(row: RawFactRow) -> Result<ResolvedFact, UnresolvedReference> {
    let mut predecessors = Vec::with_capacity(row.declared_predecessors.len());

    for (role, declared) in row.declared_predecessors {
        let resolved = match declared {
            DeclaredRole::Single(reference) => ResolvedRole::Single(lookup(
                &reference,
                &row.candidate_predecessors,
                row.surrogate_id,
                &role,
            )?),
            DeclaredRole::Multi(references) => {
                let mut members = Vec::with_capacity(references.len());
                for reference in references {
                    members.push(lookup(
                        &reference,
                        &row.candidate_predecessors,
                        row.surrogate_id,
                        &role,
                    )?);
                }
                ResolvedRole::Multi(members)
            }
        };
        predecessors.push((role, resolved));
    }

    Ok(ResolvedFact {
        surrogate_id: row.surrogate_id,
        content_hash: row.content_hash,
        fact_type: row.fact_type,
        fields: row.fields,
        predecessors,
    })
}

/// Find the candidate whose identity pair equals the reference's.
fn lookup(
    reference: &PredecessorRef,
    candidates: &[ResolvedPredecessor],
    fact: SurrogateId,
    role: &str,
) -> Result<ResolvedPredecessor, UnresolvedReference> {
    candidates
        .iter()
        .find(|c| c.key() == (&reference.fact_type, &reference.content_hash))
        .cloned()
        .ok_or_else(|| UnresolvedReference {
            fact,
            role: role.to_string(),
            reference: reference.clone(),
        })
}

// =============================================================================
// TESTS
// =============================================================================
