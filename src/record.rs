//! Content records and the text fed to the embedding model.
//!
//! [`ContentRecord::embedding_text`] is the only place the model input for a
//! record is built. The HTTP service, the precompute command, and any
//! downstream caller must go through it so that stored and freshly computed
//! embeddings stay comparable.

use serde::Deserialize;
use serde_json::Value;

/// Number of leading semantic keywords that contribute to the text.
pub const MAX_KEYWORDS: usize = 5;

#[derive(Debug, thiserror::Error)]
#[error("malformed content record: {0}")]
pub struct RecordError(#[from] serde_json::Error);

/// The fields of a content record that contribute to its embedding text.
///
/// Absent and `null` fields are both treated as missing; every other field of
/// the source object is ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentRecord {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub learning_outcomes: Option<Vec<String>>,
    #[serde(default)]
    pub semantic_keywords: Option<Vec<String>>,
}

impl ContentRecord {
    /// Read the text-relevant fields out of a JSON record.
    pub fn from_value(value: &Value) -> Result<Self, RecordError> {
        Ok(Self::deserialize(value)?)
    }

    /// `title`, then the learning outcomes, then the first five keywords,
    /// each non-empty part separated by a single space.
    pub fn embedding_text(&self) -> String {
        let mut text = self.title.clone().unwrap_or_default();

        if let Some(outcomes) = self.learning_outcomes.as_deref().filter(|o| !o.is_empty()) {
            text.push(' ');
            text.push_str(&outcomes.join(" "));
        }

        if let Some(keywords) = self.semantic_keywords.as_deref().filter(|k| !k.is_empty()) {
            let top = &keywords[..keywords.len().min(MAX_KEYWORDS)];
            text.push(' ');
            text.push_str(&top.join(" "));
        }

        text
    }
}

/// Build the embedding text straight from a JSON record.
pub fn build_embedding_text(value: &Value) -> Result<String, RecordError> {
    Ok(ContentRecord::from_value(value)?.embedding_text())
}
