//! Offline enrichment of a microcontent dataset with embeddings.
//!
//! The dataset is a JSON object whose `microcontents` key holds an array of
//! content records. [`precompute_file`] embeds every record in a single batch
//! and rewrites the file in place. Nothing is written unless the whole batch
//! succeeded, and the model is only loaded when at least one record needs it.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::embedding::LazyModel;
use crate::record::build_embedding_text;

pub const RECORDS_KEY: &str = "microcontents";
pub const EMBEDDING_KEY: &str = "embedding";
pub const CALCULATED_KEY: &str = "embeddingCalculated";

#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("dataset must be a JSON object with a `microcontents` key")]
    MissingRecords,
    #[error("`microcontents` must be an array")]
    NotAnArray,
    #[error("record {index} is not a JSON object")]
    NotAnObject { index: usize },
    #[error("record {index}: {source}")]
    Record {
        index: usize,
        #[source]
        source: crate::record::RecordError,
    },
    #[error("provider returned {got} embeddings for {expected} texts")]
    CountMismatch { expected: usize, got: usize },
    #[error("record {index}: embedding has {got} dimensions, model declares {expected}")]
    DimensionMismatch {
        index: usize,
        expected: usize,
        got: usize,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrecomputeOptions {
    /// Only embed records whose `embeddingCalculated` is not `true`.
    pub missing_only: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrecomputeReport {
    pub total: usize,
    pub embedded: usize,
    pub skipped: usize,
    /// Dimension of the computed vectors; `None` when nothing was embedded.
    pub dimensions: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmbeddingStats {
    pub total: usize,
    pub with_embedding: usize,
    pub without_embedding: usize,
    pub completion_percentage: u32,
}

/// Borrow the record array of a dataset document.
fn records_mut(doc: &mut Value) -> Result<&mut Vec<Value>, DatasetError> {
    doc.as_object_mut()
        .and_then(|obj| obj.get_mut(RECORDS_KEY))
        .ok_or(DatasetError::MissingRecords)?
        .as_array_mut()
        .ok_or(DatasetError::NotAnArray)
}

fn records(doc: &Value) -> Result<&Vec<Value>, DatasetError> {
    doc.as_object()
        .and_then(|obj| obj.get(RECORDS_KEY))
        .ok_or(DatasetError::MissingRecords)?
        .as_array()
        .ok_or(DatasetError::NotAnArray)
}

fn is_calculated(record: &Map<String, Value>) -> bool {
    record.get(CALCULATED_KEY).and_then(Value::as_bool) == Some(true)
}

/// Embed the records of an in-memory dataset document.
///
/// The model is loaded only if some record needs an embedding. On error the
/// document is left unmodified.
pub fn enrich_document(
    doc: &mut Value,
    model: &LazyModel,
    options: PrecomputeOptions,
) -> Result<PrecomputeReport> {
    let records = records_mut(doc)?;
    let total = records.len();

    let mut targets = Vec::new();
    let mut texts = Vec::new();
    for (index, record) in records.iter().enumerate() {
        let obj = record
            .as_object()
            .ok_or(DatasetError::NotAnObject { index })?;
        if options.missing_only && is_calculated(obj) {
            continue;
        }
        let text = build_embedding_text(record)
            .map_err(|source| DatasetError::Record { index, source })?;
        targets.push(index);
        texts.push(text);
    }

    tracing::info!(total, to_embed = texts.len(), "computing embeddings");

    if texts.is_empty() {
        return Ok(PrecomputeReport {
            total,
            embedded: 0,
            skipped: total,
            dimensions: None,
        });
    }

    let provider = model.get()?;
    let text_refs: Vec<&str> = texts.iter().map(String::as_str).collect();
    let embeddings = provider
        .embed_batch(&text_refs)
        .context("embedding batch failed")?;

    if embeddings.len() != targets.len() {
        return Err(DatasetError::CountMismatch {
            expected: targets.len(),
            got: embeddings.len(),
        }
        .into());
    }

    let expected = provider.dimensions();
    if let Some((index, got)) = targets
        .iter()
        .zip(&embeddings)
        .find(|(_, e)| e.len() != expected)
        .map(|(index, e)| (*index, e.len()))
    {
        return Err(DatasetError::DimensionMismatch {
            index,
            expected,
            got,
        }
        .into());
    }

    for (index, embedding) in targets.iter().zip(embeddings) {
        if let Some(obj) = records[*index].as_object_mut() {
            obj.insert(EMBEDDING_KEY.into(), Value::from(embedding));
            obj.insert(CALCULATED_KEY.into(), Value::Bool(true));
        }
    }

    Ok(PrecomputeReport {
        total,
        embedded: targets.len(),
        skipped: total - targets.len(),
        dimensions: Some(expected),
    })
}

/// Serialize a document with 4-space indentation.
pub fn to_pretty_json(doc: &Value) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    doc.serialize(&mut ser).context("failed to serialize dataset")?;
    Ok(buf)
}

fn read_document(path: &Path) -> Result<Value> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read dataset: {}", path.display()))?;
    serde_json::from_str(&json)
        .with_context(|| format!("failed to parse dataset JSON: {}", path.display()))
}

/// Read `path`, embed its records, and overwrite it with the enriched document.
pub fn precompute_file(
    path: &Path,
    model: &LazyModel,
    options: PrecomputeOptions,
) -> Result<PrecomputeReport> {
    let mut doc = read_document(path)?;
    let report = enrich_document(&mut doc, model, options)?;

    let bytes = to_pretty_json(&doc)?;
    std::fs::write(path, bytes)
        .with_context(|| format!("failed to write dataset: {}", path.display()))?;

    tracing::info!(
        path = %path.display(),
        embedded = report.embedded,
        skipped = report.skipped,
        "dataset updated"
    );
    Ok(report)
}

/// Count how many records of a dataset already carry an embedding.
pub fn embedding_stats(doc: &Value) -> Result<EmbeddingStats, DatasetError> {
    let records = records(doc)?;
    let total = records.len();
    let with_embedding = records
        .iter()
        .filter(|r| r.as_object().is_some_and(is_calculated))
        .count();
    let completion_percentage = if total > 0 {
        (with_embedding as f64 / total as f64 * 100.0).round() as u32
    } else {
        0
    };

    Ok(EmbeddingStats {
        total,
        with_embedding,
        without_embedding: total - with_embedding,
        completion_percentage,
    })
}

pub fn embedding_stats_file(path: &Path) -> Result<EmbeddingStats> {
    let doc = read_document(path)?;
    Ok(embedding_stats(&doc)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn pretty_json_uses_four_spaces_and_keeps_unicode() {
        let doc = json!({"microcontents": [{"title": "Café"}]});
        let out = String::from_utf8(to_pretty_json(&doc).unwrap()).unwrap();
        assert_eq!(
            out,
            "{\n    \"microcontents\": [\n        {\n            \"title\": \"Café\"\n        }\n    ]\n}"
        );
    }

    #[test]
    fn shape_errors() {
        assert!(matches!(
            embedding_stats(&json!([])).unwrap_err(),
            DatasetError::MissingRecords
        ));
        assert!(matches!(
            embedding_stats(&json!({"microcontents": {}})).unwrap_err(),
            DatasetError::NotAnArray
        ));
    }

    #[test]
    fn stats_count_calculated_flag() {
        let doc = json!({"microcontents": [
            {"title": "a", "embeddingCalculated": true},
            {"title": "b", "embeddingCalculated": false},
            {"title": "c"},
        ]});
        let stats = embedding_stats(&doc).unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.with_embedding, 1);
        assert_eq!(stats.without_embedding, 2);
        assert_eq!(stats.completion_percentage, 33);
    }

    #[test]
    fn stats_of_empty_dataset() {
        let stats = embedding_stats(&json!({"microcontents": []})).unwrap();
        assert_eq!(stats.completion_percentage, 0);
        assert_eq!(stats.total, 0);
    }
}
