//! Core data shapes shared by the stores, the retriever and the prompt builder

use std::collections::BTreeMap;
use std::ops::Deref;

use serde::Deserialize;
use serde::Serialize;

/// Metadata key holding the raw patient record text
pub const USER_KEY: &str = "user";
/// Metadata key holding the condition explanation
pub const EXPLANATION_KEY: &str = "explanation";

/// String metadata attached to a record, ordered by key
pub type Metadata = BTreeMap<String, String>;

/// A stored patient record with its embedding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    pub embedding: Vec<f64>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl Record {
    pub fn new(id: impl Into<String>, embedding: Vec<f64>) -> Self {
        Self {
            id: id.into(),
            embedding,
            metadata: Metadata::new(),
        }
    }

    /// Builder-style metadata insertion
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn dimension(&self) -> usize {
        self.embedding.len()
    }

    /// Metadata value or empty string when absent
    pub fn field(&self, key: &str) -> &str {
        self.metadata.get(key).map_or("", String::as_str)
    }

    pub fn user(&self) -> &str {
        self.field(USER_KEY)
    }

    pub fn explanation(&self) -> &str {
        self.field(EXPLANATION_KEY)
    }
}

/// Free-text query and its externally computed embedding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub text: String,
    pub embedding: Vec<f64>,
}

impl Query {
    pub fn new(text: impl Into<String>, embedding: Vec<f64>) -> Self {
        Self {
            text: text.into(),
            embedding,
        }
    }
}

/// A record paired with its similarity to the query (higher is closer)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub record: Record,
    pub score: f64,
}

impl RetrievalResult {
    /// Cosine distance, as reported by collection-style query surfaces
    pub fn distance(&self) -> f64 {
        1.0 - self.score
    }
}

/// Results ordered by descending score; ties keep insertion order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RankedResultSet(Vec<RetrievalResult>);

impl RankedResultSet {
    /// Wrap results that are already ranked
    pub fn from_ranked(results: Vec<RetrievalResult>) -> Self {
        Self(results)
    }

    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn ids(&self) -> Vec<&str> {
        self.0.iter().map(|r| r.record.id.as_str()).collect()
    }

    pub fn scores(&self) -> Vec<f64> {
        self.0.iter().map(|r| r.score).collect()
    }

    pub fn top(&self) -> Option<&RetrievalResult> {
        self.0.first()
    }

    pub fn into_inner(self) -> Vec<RetrievalResult> {
        self.0
    }
}

impl Deref for RankedResultSet {
    type Target = [RetrievalResult];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl IntoIterator for RankedResultSet {
    type Item = RetrievalResult;
    type IntoIter = std::vec::IntoIter<RetrievalResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a RankedResultSet {
    type Item = &'a RetrievalResult;
    type IntoIter = std::slice::Iter<'a, RetrievalResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_metadata_reads_as_empty() {
        let record = Record::new("1", vec![1.0, 0.0]).with_metadata(USER_KEY, "patient text");
        assert_eq!(record.user(), "patient text");
        assert_eq!(record.explanation(), "");
        assert_eq!(record.dimension(), 2);
    }

    #[test]
    fn test_distance_is_complement_of_score() {
        let result = RetrievalResult {
            record: Record::new("a", vec![1.0]),
            score: 0.75,
        };
        assert!((result.distance() - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_ranked_set_accessors() {
        let set = RankedResultSet::from_ranked(vec![
            RetrievalResult {
                record: Record::new("a", vec![1.0]),
                score: 0.9,
            },
            RetrievalResult {
                record: Record::new("b", vec![1.0]),
                score: 0.4,
            },
        ]);
        assert_eq!(set.len(), 2);
        assert_eq!(set.ids(), vec!["a", "b"]);
        assert_eq!(set.top().map(|r| r.record.id.as_str()), Some("a"));
        assert!(RankedResultSet::empty().is_empty());
    }

    #[test]
    fn test_record_serializes_with_metadata() {
        let record = Record::new("7", vec![0.5, 0.5]).with_metadata(EXPLANATION_KEY, "migraine");
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["id"], "7");
        assert_eq!(json["metadata"]["explanation"], "migraine");
    }
}
