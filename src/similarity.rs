//! Cosine similarity and top-k ranking shared by every store backend

use std::cmp::Ordering;

use crate::models::RankedResultSet;
use crate::models::Record;
use crate::models::RetrievalResult;
use crate::PatientRagError;
use crate::Result;

/// Scale a vector to unit L2 norm; zero vectors stay zero
pub fn l2_normalize(v: &[f64]) -> Vec<f64> {
    let norm = v.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm == 0.0 {
        return v.to_vec();
    }
    v.iter().map(|x| x / norm).collect()
}

/// Dot product of the L2-normalized inputs.
///
/// Returns 0.0 when either side has zero norm or the lengths differ.
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f64>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)
    }
}

/// Check an embedding is usable before it touches a store
pub fn validate_embedding(embedding: &[f64], expected_dim: Option<usize>) -> Result<()> {
    if embedding.is_empty() {
        return Err(PatientRagError::Validation(
            "embedding must not be empty".to_string(),
        ));
    }
    if let Some(position) = embedding.iter().position(|v| !v.is_finite()) {
        return Err(PatientRagError::Validation(format!(
            "embedding component {position} is not a finite number"
        )));
    }
    if let Some(dim) = expected_dim {
        if embedding.len() != dim {
            return Err(PatientRagError::Validation(format!(
                "embedding has dimension {}, corpus dimension is {dim}",
                embedding.len()
            )));
        }
    }
    Ok(())
}

/// Parse a comma-separated literal such as `"0.1, 0.2,0.3"` into an embedding
pub fn parse_vector(raw: &str) -> Result<Vec<f64>> {
    if raw.trim().is_empty() {
        return Err(PatientRagError::Validation(
            "query vector must not be empty".to_string(),
        ));
    }

    raw.split(',')
        .map(|component| {
            component.trim().parse::<f64>().map_err(|_| {
                PatientRagError::Validation(format!(
                    "query vector component '{}' is not a number",
                    component.trim()
                ))
            })
        })
        .collect()
}

/// Score every candidate against `query` and keep the best `k`.
///
/// Candidates must arrive in insertion order: the sort is stable, so equal
/// scores keep the earliest-inserted record first.
pub fn rank_top_k<'a, I>(query: &[f64], candidates: I, k: usize) -> RankedResultSet
where
    I: IntoIterator<Item = &'a Record>,
{
    if k == 0 {
        return RankedResultSet::empty();
    }

    let query = l2_normalize(query);
    let mut scored: Vec<(f64, &Record)> = candidates
        .into_iter()
        .map(|record| (cosine_similarity(&query, &record.embedding), record))
        .collect();

    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));
    scored.truncate(k);

    RankedResultSet::from_ranked(
        scored
            .into_iter()
            .map(|(score, record)| RetrievalResult {
                record: record.clone(),
                score,
            })
            .collect(),
    )
}
