//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use factgraph_core::{
    ContentHash, DeclaredRole, ExportError, FactDraft, FactStore, FactType, FieldValue,
    OutputFormat, PredecessorRef, RedbFactStore, export,
    primitives::MAX_BATCH_SIZE,
};
use std::path::{Path, PathBuf};

// =============================================================================
// FILE SIZE LIMITS
// =============================================================================

/// Maximum file size for loading (100 MB).
///
/// This prevents memory exhaustion from malicious or accidental large files.
const MAX_LOAD_FILE_SIZE: u64 = 100 * 1024 * 1024;

/// Validate file size before reading.
fn validate_file_size(path: &Path, max_size: u64) -> Result<(), ExportError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| ExportError::StorageError(format!("Cannot read file metadata: {}", e)))?;

    if metadata.len() > max_size {
        return Err(ExportError::InvalidFact(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Validate an input file path.
///
/// Canonicalizes the path to resolve symlinks and "..", ensures it exists,
/// and ensures it is a regular file rather than a directory.
fn validate_file_path(path: &Path) -> Result<PathBuf, ExportError> {
    let canonical = path.canonicalize().map_err(|e| {
        ExportError::StorageError(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(ExportError::StorageError(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

/// Validate an output path: the parent directory must exist.
fn validate_output_path(path: &Path) -> Result<PathBuf, ExportError> {
    let parent = path.parent().unwrap_or(Path::new("."));

    let canonical_parent = parent.canonicalize().map_err(|e| {
        ExportError::StorageError(format!(
            "Invalid output directory '{}': {}",
            parent.display(),
            e
        ))
    })?;

    if !canonical_parent.is_dir() {
        return Err(ExportError::StorageError(format!(
            "Output directory '{}' is not a valid directory",
            parent.display()
        )));
    }

    let filename = path
        .file_name()
        .ok_or_else(|| ExportError::StorageError("Output path has no filename".to_string()))?;

    Ok(canonical_parent.join(filename))
}

// =============================================================================
// EXPORT COMMAND
// =============================================================================

/// Export the fact graph to stdout or a file.
///
/// An unopenable database is a setup failure reported before any output
/// bytes are produced; once streaming begins, a fatal condition leaves the
/// sink holding a well-formed prefix truncated at the failure point.
pub fn cmd_export(
    db_path: &Path,
    format: &str,
    output: Option<&Path>,
    batch_size: usize,
) -> Result<(), ExportError> {
    let format: OutputFormat = format.parse()?;

    if !db_path.exists() {
        return Err(ExportError::StorageError(format!(
            "Database '{}' does not exist. Run 'load' first.",
            db_path.display()
        )));
    }

    let batch_size = batch_size.clamp(1, MAX_BATCH_SIZE);
    let store = RedbFactStore::open(db_path)?;

    tracing::info!(
        "Exporting {:?} as {} (batch size {})",
        db_path,
        format,
        batch_size
    );

    let outcome = match output {
        Some(path) => {
            let validated = validate_output_path(path)?;
            let file = std::fs::File::create(&validated)
                .map_err(|e| ExportError::SinkFailure(format!("Create output file: {}", e)))?;
            export(
                &store,
                format,
                std::io::BufWriter::new(file),
                batch_size,
            )?
        }
        None => {
            let stdout = std::io::stdout();
            export(
                &store,
                format,
                std::io::BufWriter::new(stdout.lock()),
                batch_size,
            )?
        }
    };

    tracing::info!(
        "Export complete: {} facts emitted, {} dropped",
        outcome.summary.emitted,
        outcome.summary.dropped
    );
    for unresolved in &outcome.unresolved {
        tracing::warn!("Dropped fact: {}", unresolved);
    }
    let reported = outcome.unresolved.len() as u64;
    if outcome.summary.dropped > reported {
        tracing::warn!(
            "{} further dropped facts not individually reported",
            outcome.summary.dropped - reported
        );
    }

    Ok(())
}

// =============================================================================
// LOAD COMMAND
// =============================================================================

/// Stage facts from a JSON file into the store.
///
/// The input is a JSON array of objects with `hash`, `type`, optional
/// `fields`, and optional `predecessors`. A predecessor role whose value
/// is a single `{hash, type}` object is a required reference; an array of
/// such objects is an ordered sequence. Facts must appear after the facts
/// they reference.
pub fn cmd_load(db_path: &Path, file: &Path) -> Result<(), ExportError> {
    let validated_path = validate_file_path(file)?;
    validate_file_size(&validated_path, MAX_LOAD_FILE_SIZE)?;

    let contents = std::fs::read(&validated_path)
        .map_err(|e| ExportError::StorageError(format!("Read file: {}", e)))?;

    let entries: Vec<serde_json::Value> = serde_json::from_slice(&contents)
        .map_err(|e| ExportError::SerializationError(format!("Parse fact file: {}", e)))?;

    let mut drafts = Vec::with_capacity(entries.len());
    for entry in &entries {
        drafts.push(parse_fact_entry(entry)?);
    }

    let count = drafts.len();
    let mut store = RedbFactStore::open(db_path)?;
    store.insert_batch(&drafts)?;

    println!("Loaded {} facts", count);
    println!(
        "Store now has {} facts, {} edges",
        store.fact_count()?,
        store.edge_count()?
    );

    Ok(())
}

/// Parse one fact object from the load file into a draft.
fn parse_fact_entry(entry: &serde_json::Value) -> Result<FactDraft, ExportError> {
    let hash = entry["hash"]
        .as_str()
        .ok_or_else(|| ExportError::InvalidFact("Fact is missing 'hash'".to_string()))?;
    let fact_type = entry["type"]
        .as_str()
        .ok_or_else(|| ExportError::InvalidFact("Fact is missing 'type'".to_string()))?;

    if hash.is_empty() || fact_type.is_empty() {
        return Err(ExportError::InvalidFact(
            "Fact 'hash' and 'type' must be non-empty".to_string(),
        ));
    }

    let mut fields = Vec::new();
    if let Some(map) = entry["fields"].as_object() {
        for (name, value) in map {
            fields.push((name.clone(), parse_field_value(name, value)?));
        }
    }

    let mut declared_predecessors = Vec::new();
    if let Some(map) = entry["predecessors"].as_object() {
        for (role, value) in map {
            let declared = match value {
                serde_json::Value::Object(_) => {
                    DeclaredRole::Single(parse_predecessor_ref(role, value)?)
                }
                serde_json::Value::Array(items) => {
                    let mut references = Vec::with_capacity(items.len());
                    for item in items {
                        references.push(parse_predecessor_ref(role, item)?);
                    }
                    DeclaredRole::Multi(references)
                }
                _ => {
                    return Err(ExportError::InvalidFact(format!(
                        "Role '{}' must be an object or an array of objects",
                        role
                    )));
                }
            };
            declared_predecessors.push((role.clone(), declared));
        }
    }

    Ok(FactDraft {
        content_hash: ContentHash::new(hash),
        fact_type: FactType::new(fact_type),
        fields,
        declared_predecessors,
    })
}

fn parse_field_value(name: &str, value: &serde_json::Value) -> Result<FieldValue, ExportError> {
    match value {
        serde_json::Value::String(s) => Ok(FieldValue::Text(s.clone())),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(FieldValue::Integer(i))
            } else if let Some(f) = n.as_f64() {
                Ok(FieldValue::Float(f))
            } else {
                Err(ExportError::InvalidFact(format!(
                    "Field '{}' has an unrepresentable numeric value",
                    name
                )))
            }
        }
        serde_json::Value::Bool(b) => Ok(FieldValue::Boolean(*b)),
        serde_json::Value::Null => Ok(FieldValue::Absent),
        _ => Err(ExportError::InvalidFact(format!(
            "Field '{}' must be a string, number, boolean, or null",
            name
        ))),
    }
}

fn parse_predecessor_ref(
    role: &str,
    value: &serde_json::Value,
) -> Result<PredecessorRef, ExportError> {
    let hash = value["hash"].as_str().ok_or_else(|| {
        ExportError::InvalidFact(format!("Reference in role '{}' is missing 'hash'", role))
    })?;
    let fact_type = value["type"].as_str().ok_or_else(|| {
        ExportError::InvalidFact(format!("Reference in role '{}' is missing 'type'", role))
    })?;

    Ok(PredecessorRef::new(
        FactType::new(fact_type),
        ContentHash::new(hash),
    ))
}

// =============================================================================
// STATUS COMMAND
// =============================================================================

/// Show dataset counts.
pub fn cmd_status(db_path: &Path, json_mode: bool) -> Result<(), ExportError> {
    if !db_path.exists() {
        if json_mode {
            let output = serde_json::json!({
                "database": db_path.to_string_lossy(),
                "exists": false
            });
            println!(
                "{}",
                serde_json::to_string_pretty(&output).unwrap_or_default()
            );
        } else {
            println!("Database {:?} does not exist yet", db_path);
        }
        return Ok(());
    }

    let store = RedbFactStore::open(db_path)?;
    let fact_count = store.fact_count()?;
    let edge_count = store.edge_count()?;

    if json_mode {
        let output = serde_json::json!({
            "database": db_path.to_string_lossy(),
            "exists": true,
            "fact_count": fact_count,
            "edge_count": edge_count
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_default()
        );
        return Ok(());
    }

    println!("Factgraph Store Status");
    println!("======================");
    println!("Database: {:?}", db_path);
    println!();
    println!("Facts: {}", fact_count);
    println!("Edges: {}", edge_count);

    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
