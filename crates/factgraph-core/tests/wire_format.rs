//! # Wire Format Tests
//!
//! End-to-end export of a small dataset through both formats, checking
//! exact bytes, format equivalence, and surrogate-id absence.

#![allow(clippy::unwrap_used, clippy::panic)]

use factgraph_core::{
    ContentHash, DeclaredRole, FactDraft, FactType, FieldValue, MemoryFactStore, OutputFormat,
    PredecessorRef, export,
};

// =============================================================================
// FIXTURE
// =============================================================================

/// Three facts: a site, a post on the site, a title on the post.
///
/// The title also declares an empty `prior` sequence.
fn site_post_title() -> MemoryFactStore {
    let mut store = MemoryFactStore::new();

    store
        .insert(FactDraft {
            content_hash: ContentHash::new("aaa"),
            fact_type: FactType::new("Site"),
            fields: vec![(
                "domain".to_string(),
                FieldValue::Text("example.com".to_string()),
            )],
            declared_predecessors: Vec::new(),
        })
        .expect("insert site");

    store
        .insert(FactDraft {
            content_hash: ContentHash::new("bbb"),
            fact_type: FactType::new("Post"),
            fields: vec![(
                "createdAt".to_string(),
                FieldValue::Text("2023-05-20T10:30:00Z".to_string()),
            )],
            declared_predecessors: vec![(
                "site".to_string(),
                DeclaredRole::Single(PredecessorRef::new(
                    FactType::new("Site"),
                    ContentHash::new("aaa"),
                )),
            )],
        })
        .expect("insert post");

    store
        .insert(FactDraft {
            content_hash: ContentHash::new("ccc"),
            fact_type: FactType::new("Title"),
            fields: vec![("value".to_string(), FieldValue::Text("Hello".to_string()))],
            declared_predecessors: vec![
                (
                    "post".to_string(),
                    DeclaredRole::Single(PredecessorRef::new(
                        FactType::new("Post"),
                        ContentHash::new("bbb"),
                    )),
                ),
                ("prior".to_string(), DeclaredRole::Multi(Vec::new())),
            ],
        })
        .expect("insert title");

    store
}

fn export_string(store: &MemoryFactStore, format: OutputFormat) -> String {
    let mut out = Vec::new();
    export(store, format, &mut out, 1000).expect("export");
    String::from_utf8(out).expect("utf-8 output")
}

// =============================================================================
// DECLARATIVE TEXT
// =============================================================================

#[test]
fn declarative_output_is_bit_exact() {
    let store = site_post_title();
    let text = export_string(&store, OutputFormat::DeclarativeText);

    let expected = "\
let f1: Site = {
    domain: \"example.com\"
}

let f2: Post = {
    createdAt: \"2023-05-20T10:30:00Z\",
    site: f1
}

let f3: Title = {
    value: \"Hello\",
    post: f2,
    prior: []
}

";
    assert_eq!(text, expected);
}

#[test]
fn declarative_predecessor_blocks_come_first() {
    let store = site_post_title();
    let text = export_string(&store, OutputFormat::DeclarativeText);

    // Every cross-reference points at a block that appears earlier.
    let pos_f1 = text.find("let f1:").expect("f1 block");
    let pos_f2 = text.find("let f2:").expect("f2 block");
    let pos_f3 = text.find("let f3:").expect("f3 block");
    let use_f1 = text.find("site: f1").expect("f1 use");
    let use_f2 = text.find("post: f2").expect("f2 use");

    assert!(pos_f1 < use_f1);
    assert!(pos_f2 < use_f2);
    assert!(pos_f2 < pos_f3);
}

// =============================================================================
// PLAIN GRAPH
// =============================================================================

#[test]
fn plain_graph_output_is_bit_exact() {
    let store = site_post_title();
    let text = export_string(&store, OutputFormat::PlainGraph);

    let expected = r#"[
{"hash":"aaa","type":"Site","predecessors":{},"fields":{"domain":"example.com"}},
{"hash":"bbb","type":"Post","predecessors":{"site":{"hash":"aaa","type":"Site"}},"fields":{"createdAt":"2023-05-20T10:30:00Z"}},
{"hash":"ccc","type":"Title","predecessors":{"post":{"hash":"bbb","type":"Post"},"prior":[]},"fields":{"value":"Hello"}}
]
"#;
    assert_eq!(text, expected);
}

#[test]
fn plain_graph_contains_no_numbers_at_all() {
    let store = site_post_title();
    let text = export_string(&store, OutputFormat::PlainGraph);
    let parsed: serde_json::Value = serde_json::from_str(&text).expect("valid JSON");

    fn assert_no_numbers(value: &serde_json::Value) {
        match value {
            serde_json::Value::Number(n) => {
                panic!("surrogate-id leak: numeric value {} in PlainGraph output", n)
            }
            serde_json::Value::Array(items) => items.iter().for_each(assert_no_numbers),
            serde_json::Value::Object(map) => map.values().for_each(assert_no_numbers),
            _ => {}
        }
    }
    assert_no_numbers(&parsed);
}

// =============================================================================
// FORMAT EQUIVALENCE
// =============================================================================

#[test]
fn both_formats_declare_the_same_facts() {
    let store = site_post_title();

    let json = export_string(&store, OutputFormat::PlainGraph);
    let parsed: serde_json::Value = serde_json::from_str(&json).expect("valid JSON");
    let mut json_pairs: Vec<(String, String)> = parsed
        .as_array()
        .expect("array")
        .iter()
        .map(|e| {
            (
                e["hash"].as_str().expect("hash").to_string(),
                e["type"].as_str().expect("type").to_string(),
            )
        })
        .collect();
    json_pairs.sort();

    let text = export_string(&store, OutputFormat::DeclarativeText);
    let mut declared_types: Vec<String> = text
        .lines()
        .filter_map(|line| line.strip_prefix("let f"))
        .filter_map(|rest| rest.split_once(": "))
        .map(|(_, tail)| {
            tail.split_whitespace()
                .next()
                .expect("type name")
                .to_string()
        })
        .collect();
    declared_types.sort();

    let mut json_types: Vec<String> = json_pairs.iter().map(|(_, t)| t.clone()).collect();
    json_types.sort();

    assert_eq!(json_pairs.len(), 3);
    assert_eq!(declared_types, json_types);
}

// =============================================================================
// BATCH SIZE INDEPENDENCE (fixed fixture)
// =============================================================================

#[test]
fn batch_size_does_not_change_the_output() {
    let store = site_post_title();

    for format in [OutputFormat::PlainGraph, OutputFormat::DeclarativeText] {
        let reference = {
            let mut out = Vec::new();
            export(&store, format, &mut out, 1000).expect("export");
            out
        };
        for batch_size in [1usize, 2, 3, 7] {
            let mut out = Vec::new();
            export(&store, format, &mut out, batch_size).expect("export");
            assert_eq!(out, reference, "batch size {} diverged", batch_size);
        }
    }
}
