//! Vector-representation scoring: label embeddings compared by Euclidean
//! distance with a hard cutoff.
//!
//! The embedding table is an opaque oracle produced elsewhere; this module
//! only looks vectors up and measures distances.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::error::{LoadError, MeasureError, MeasureResult};

use super::normalize_label;

/// Distance cutoff used when none is configured.
pub const DEFAULT_DISTANCE_CUTOFF: f64 = 100.0;

/// Label → vector table.
#[derive(Debug, Clone, Default)]
pub struct Embeddings {
    vectors: HashMap<String, Vec<f64>>,
}

impl Embeddings {
    /// Build from `(label, vector)` pairs. Keys are stored as given and
    /// looked up both verbatim and normalized.
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, Vec<f64>)>,
        S: Into<String>,
    {
        let mut vectors = HashMap::new();
        for (label, vec) in pairs {
            let label: String = label.into();
            let normalized = normalize_label(&label);
            if normalized != label {
                vectors.entry(normalized).or_insert_with(|| vec.clone());
            }
            vectors.insert(label, vec);
        }
        Self { vectors }
    }

    /// Load a JSON object mapping labels to vectors: `{"paper": [0.1, ...]}`.
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let content = std::fs::read_to_string(path).map_err(|e| LoadError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        let table: HashMap<String, Vec<f64>> =
            serde_json::from_str(&content).map_err(|e| LoadError::Parse {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
        let embeddings = Self::from_pairs(table);
        tracing::info!(
            path = %path.display(),
            labels = embeddings.len(),
            "loaded embeddings"
        );
        Ok(embeddings)
    }

    /// The vector for a label, trying the verbatim label first.
    pub fn get(&self, label: &str) -> Option<&[f64]> {
        self.vectors
            .get(label)
            .or_else(|| self.vectors.get(&normalize_label(label)))
            .map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }
}

/// Euclidean distance over the vectors' own length.
///
/// `None` if the lengths differ or any component is not finite.
pub fn euclidean_distance(a: &[f64], b: &[f64]) -> Option<f64> {
    if a.len() != b.len() {
        return None;
    }
    let sum: f64 = a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum();
    sum.is_finite().then(|| sum.sqrt())
}

/// Score derived from a distance: `1 / (1 + d)`, in `(0, 1]`.
pub fn distance_to_score(distance: f64) -> f64 {
    1.0 / (1.0 + distance)
}

/// Embedding lookup plus a hard distance cutoff.
#[derive(Debug, Clone)]
pub struct VectorDistance {
    embeddings: Arc<Embeddings>,
    cutoff: f64,
}

impl VectorDistance {
    pub fn new(embeddings: Arc<Embeddings>, cutoff: f64) -> MeasureResult<Self> {
        if !cutoff.is_finite() || cutoff < 0.0 {
            return Err(MeasureError::InvalidCutoff { value: cutoff });
        }
        Ok(Self { embeddings, cutoff })
    }

    pub fn cutoff(&self) -> f64 {
        self.cutoff
    }

    /// The vector for a concept label; `None` means "no representation".
    pub fn lookup(&self, label: &str) -> Option<&[f64]> {
        self.embeddings.get(label)
    }

    /// Score two vectors, or `None` if the pair is excluded.
    ///
    /// Pairs farther apart than the cutoff are excluded outright rather than
    /// given a low score.
    pub fn score_vectors(&self, a: &[f64], b: &[f64]) -> Option<f64> {
        let d = euclidean_distance(a, b)?;
        (d <= self.cutoff).then(|| distance_to_score(d))
    }

    /// Score two labels; `None` if either has no vector or the pair is cut off.
    pub fn score_labels(&self, a: &str, b: &str) -> Option<f64> {
        self.score_vectors(self.lookup(a)?, self.lookup(b)?)
    }
}
