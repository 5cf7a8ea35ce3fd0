//! # Property-Based Tests
//!
//! Randomized datasets exercised through the full pipeline.
//!
//! These tests pin down the engine's behavioral properties: resolution
//! mirrors declaration, drops are local, emission order is store order,
//! and the configured batch size is invisible in the output.

#![allow(clippy::unwrap_used, clippy::panic)]

use factgraph_core::{
    ContentHash, DeclaredRole, FactDraft, FactType, FieldValue, MemoryFactStore, OutputFormat,
    PredecessorRef, RawFactRow, SurrogateId, export,
};
use proptest::collection::vec;
use proptest::prelude::*;

// =============================================================================
// DATASET GENERATION
// =============================================================================

/// Build a consistent store from a shape description.
///
/// Fact `i` gets hash `h<i>`, a type drawn from three names, one field,
/// and a `deps` sequence referencing earlier facts picked by `choices[i]`
/// (values are reduced modulo `i`, so the dataset is always causal).
fn build_store(choices: &[Vec<usize>]) -> MemoryFactStore {
    let mut store = MemoryFactStore::new();
    for (i, picks) in choices.iter().enumerate() {
        let references: Vec<PredecessorRef> = if i == 0 {
            Vec::new()
        } else {
            picks
                .iter()
                .map(|p| {
                    let target = p % i;
                    PredecessorRef::new(
                        FactType::new(type_name(target)),
                        ContentHash::new(format!("h{}", target)),
                    )
                })
                .collect()
        };

        store
            .insert(FactDraft {
                content_hash: ContentHash::new(format!("h{}", i)),
                fact_type: FactType::new(type_name(i)),
                fields: vec![("index".to_string(), FieldValue::Integer(i as i64))],
                declared_predecessors: vec![("deps".to_string(), DeclaredRole::Multi(references))],
            })
            .expect("insert");
    }
    store
}

fn type_name(i: usize) -> &'static str {
    ["Site", "Post", "Title"][i % 3]
}

fn export_bytes(store: &MemoryFactStore, format: OutputFormat, batch_size: usize) -> Vec<u8> {
    let mut out = Vec::new();
    export(store, format, &mut out, batch_size).expect("export");
    out
}

// =============================================================================
// PROPERTY TESTS
// =============================================================================

proptest! {
    /// The final emitted sequence is identical regardless of batch size.
    #[test]
    fn batch_size_independence(
        choices in vec(vec(0usize..100, 0..4), 1..12)
    ) {
        let store = build_store(&choices);

        for format in [OutputFormat::PlainGraph, OutputFormat::DeclarativeText] {
            let reference = export_bytes(&store, format, 1000);
            for batch_size in [1usize, 7] {
                prop_assert_eq!(
                    &export_bytes(&store, format, batch_size),
                    &reference,
                    "batch size {} diverged for {}", batch_size, format
                );
            }
        }
    }

    /// Emitted predecessor structure exactly mirrors the declared one:
    /// same role, same cardinality, same order, ids substituted.
    #[test]
    fn resolution_mirrors_declaration(
        choices in vec(vec(0usize..100, 0..4), 2..10)
    ) {
        let store = build_store(&choices);
        let text = String::from_utf8(
            export_bytes(&store, OutputFormat::DeclarativeText, 1000)
        ).expect("utf-8");

        for (i, picks) in choices.iter().enumerate().skip(1) {
            // Surrogate ids are assigned 1.. in insertion order, so fact i
            // is f<i+1> and its dep on earlier fact t is f<t+1>.
            let expected: Vec<String> = picks
                .iter()
                .map(|p| format!("f{}", (p % i) + 1))
                .collect();
            let line = format!("    deps: [{}]", expected.join(", "));
            prop_assert!(
                text.contains(&line),
                "missing '{}' in output:\n{}", line, text
            );
        }
    }

    /// Every predecessor's block appears strictly before its successor's.
    #[test]
    fn declarative_order_is_causal(
        choices in vec(vec(0usize..100, 0..4), 1..12)
    ) {
        let store = build_store(&choices);
        let text = String::from_utf8(
            export_bytes(&store, OutputFormat::DeclarativeText, 3)
        ).expect("utf-8");

        for (i, picks) in choices.iter().enumerate().skip(1) {
            let successor = text.find(&format!("let f{}:", i + 1)).expect("block");
            for p in picks {
                let predecessor = text.find(&format!("let f{}:", (p % i) + 1)).expect("block");
                prop_assert!(predecessor < successor);
            }
        }
    }

    /// The `(hash, type)` pairs of PlainGraph equal the declarations of
    /// DeclarativeText.
    #[test]
    fn format_equivalence(
        choices in vec(vec(0usize..100, 0..4), 1..12)
    ) {
        let store = build_store(&choices);

        let json = String::from_utf8(
            export_bytes(&store, OutputFormat::PlainGraph, 1000)
        ).expect("utf-8");
        let parsed: serde_json::Value = serde_json::from_str(&json).expect("valid JSON");
        let mut json_types: Vec<String> = parsed
            .as_array()
            .expect("array")
            .iter()
            .map(|e| e["type"].as_str().expect("type").to_string())
            .collect();
        json_types.sort();

        let text = String::from_utf8(
            export_bytes(&store, OutputFormat::DeclarativeText, 1000)
        ).expect("utf-8");
        let mut declared_types: Vec<String> = text
            .lines()
            .filter_map(|line| line.strip_prefix("let f"))
            .filter_map(|rest| rest.split_once(": "))
            .map(|(_, tail)| tail.split_whitespace().next().expect("type").to_string())
            .collect();
        declared_types.sort();

        prop_assert_eq!(json_types.len(), choices.len());
        prop_assert_eq!(json_types, declared_types);
    }

    /// A fact with an unresolvable reference never appears in the output,
    /// and every other fact still does.
    #[test]
    fn drops_are_local(
        choices in vec(vec(0usize..100, 0..4), 1..10),
        poison_at in 0usize..10
    ) {
        let store = build_store(&choices);

        // Re-stage the consistent rows and splice in one dangling row.
        let mut cursor = {
            use factgraph_core::FactStore;
            store.open().expect("open")
        };
        use factgraph_core::FactCursor;
        let mut rows = cursor.next_batch(1000).expect("batch");
        cursor.close().expect("close");

        let position = poison_at % (rows.len() + 1);
        let poison_id = SurrogateId(rows.len() as u64 + 1);
        rows.insert(position, RawFactRow {
            surrogate_id: poison_id,
            content_hash: ContentHash::new("poison"),
            fact_type: FactType::new("Poison"),
            fields: Vec::new(),
            declared_predecessors: vec![(
                "gone".to_string(),
                DeclaredRole::Single(PredecessorRef::new(
                    FactType::new("Nowhere"),
                    ContentHash::new("missing"),
                )),
            )],
            candidate_predecessors: Vec::new(),
        });

        let staged = MemoryFactStore::from_rows(rows);
        let mut out = Vec::new();
        let outcome = export(&staged, OutputFormat::PlainGraph, &mut out, 4).expect("export");

        prop_assert_eq!(outcome.summary.dropped, 1);
        prop_assert_eq!(outcome.summary.emitted, choices.len() as u64);

        let text = String::from_utf8(out).expect("utf-8");
        prop_assert!(!text.contains("poison"));
        for i in 0..choices.len() {
            let needle = format!("\"hash\":\"h{}\"", i);
            prop_assert!(text.contains(&needle));
        }
    }
}
