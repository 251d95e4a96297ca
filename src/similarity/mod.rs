//! Similarity measures: pluggable strategies scoring two concepts in `[0, 1]`.
//!
//! A label measure implements [`SimilarityMeasure`]. Measures compose by
//! holding sub-measures (see [`blend::WeightedBlend`]) rather than by
//! extending one another. Measures that work on precomputed vectors go
//! through [`vector::VectorDistance`] instead, which the scorer drives once
//! per distinct label. [`Scoring`] is the tagged variant over both.
//!
//! Measures never fail for a valid pair: anything they cannot compare scores
//! 0 (label measures) or is excluded (vector measures).

pub mod blend;
pub mod string;
pub mod synonym;
pub mod vector;

use std::path::PathBuf;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

use crate::concept::{Concept, ConceptId, ConceptKind};
use crate::error::{MeasureError, MeasureResult};

use blend::WeightedBlend;
use string::{LevenshteinSimilarity, SubstringSimilarity};
use synonym::SynonymService;
use vector::{Embeddings, VectorDistance};

static CAMEL_BOUNDARY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([\p{Ll}\p{Nd}])(\p{Lu})").expect("camel-case boundary regex is valid")
});

static SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\s_\-.:/#]+").expect("separator regex is valid"));

/// Normalize a concept label for comparison.
///
/// NFKC-folds, splits camelCase and `snake_case`/`kebab-case` into words,
/// lower-cases, and collapses whitespace: `"hasFirst_Name"` → `"has first name"`.
pub fn normalize_label(label: &str) -> String {
    let folded: String = label.nfkc().collect();
    let split = CAMEL_BOUNDARY.replace_all(&folded, "$1 $2");
    let spaced = SEPARATORS.replace_all(&split, " ");
    spaced.trim().to_lowercase()
}

/// The parts of a concept a measure may look at.
#[derive(Debug, Clone, Copy)]
pub struct ConceptView<'a> {
    pub id: &'a ConceptId,
    pub label: &'a str,
    pub kind: ConceptKind,
}

impl<'a> From<&'a Concept> for ConceptView<'a> {
    fn from(concept: &'a Concept) -> Self {
        Self {
            id: &concept.id,
            label: &concept.label,
            kind: concept.kind,
        }
    }
}

/// A similarity function over two concepts.
///
/// Implementations must be pure with respect to their inputs; they may read
/// shared auxiliary state that was built once (e.g. a synonym index).
pub trait SimilarityMeasure: Send + Sync {
    /// Short identifier used in logs and reports.
    fn name(&self) -> &str;

    /// Score in `[0, 1]`. Undefined comparisons score 0.
    fn score(&self, a: ConceptView<'_>, b: ConceptView<'_>) -> f64;
}

/// Coerce a raw measure output into `[0, 1]`; NaN becomes 0.
pub fn sanitize_score(raw: f64) -> f64 {
    if raw.is_nan() { 0.0 } else { raw.clamp(0.0, 1.0) }
}

/// How pairs are scored: a label measure applied per pair, or a vector
/// distance with a hard cutoff.
#[derive(Clone)]
pub enum Scoring {
    Label(Arc<dyn SimilarityMeasure>),
    Vector(Arc<VectorDistance>),
}

impl Scoring {
    pub fn name(&self) -> &str {
        match self {
            Scoring::Label(m) => m.name(),
            Scoring::Vector(_) => MeasureKind::Vector.name(),
        }
    }
}

impl std::fmt::Debug for Scoring {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scoring::Label(m) => f.debug_tuple("Label").field(&m.name()).finish(),
            Scoring::Vector(v) => f.debug_tuple("Vector").field(v).finish(),
        }
    }
}

/// Built-in measures selectable by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MeasureKind {
    Substring,
    Levenshtein,
    SubEditSynonym,
    Vector,
}

impl MeasureKind {
    pub const ALL: [MeasureKind; 4] = [
        MeasureKind::Substring,
        MeasureKind::Levenshtein,
        MeasureKind::SubEditSynonym,
        MeasureKind::Vector,
    ];

    pub fn name(self) -> &'static str {
        match self {
            MeasureKind::Substring => "substring",
            MeasureKind::Levenshtein => "levenshtein",
            MeasureKind::SubEditSynonym => "sub-edit-synonym",
            MeasureKind::Vector => "vector",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            MeasureKind::Substring => {
                "Common-substring ratio of the normalized labels: repeatedly removes \
                 the longest shared substring and scores 2*shared/(|a|+|b|)."
            }
            MeasureKind::Levenshtein => "Normalized Levenshtein similarity of the labels.",
            MeasureKind::SubEditSynonym => {
                "0.65 * substring + 0.35 * levenshtein, overridden to 1.0 when the \
                 synonym index lists the two labels as synonyms."
            }
            MeasureKind::Vector => {
                "Euclidean distance between label embeddings; pairs farther apart \
                 than the cutoff are excluded, the rest score 1/(1+distance)."
            }
        }
    }

    /// Auxiliary resources this measure consults.
    pub fn resource(self) -> Option<&'static str> {
        match self {
            MeasureKind::SubEditSynonym => Some("a synonym file"),
            MeasureKind::Vector => Some("an embeddings file"),
            _ => None,
        }
    }
}

impl std::fmt::Display for MeasureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for MeasureKind {
    type Err = MeasureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MeasureKind::ALL
            .into_iter()
            .find(|k| k.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| MeasureError::UnknownMeasure { name: s.to_string() })
    }
}

/// Auxiliary resources a measure may be built with.
#[derive(Debug, Clone, Default)]
pub struct MeasureResources {
    pub synonyms: Option<Arc<SynonymService>>,
    pub embeddings: Option<Arc<Embeddings>>,
    pub vector_cutoff: Option<f64>,
}

impl MeasureResources {
    /// Resources backed by files; nothing is read until first use.
    pub fn from_paths(
        synonyms: Option<PathBuf>,
        embeddings: Option<Arc<Embeddings>>,
        vector_cutoff: Option<f64>,
    ) -> Self {
        Self {
            synonyms: synonyms.map(|p| Arc::new(SynonymService::from_file(p))),
            embeddings,
            vector_cutoff,
        }
    }
}

/// Build the scoring strategy for a measure kind.
pub fn build_scoring(kind: MeasureKind, resources: &MeasureResources) -> MeasureResult<Scoring> {
    let missing = || MeasureError::MissingResource {
        name: kind.name().to_string(),
        resource: kind.resource().unwrap_or("a resource").to_string(),
    };

    let scoring = match kind {
        MeasureKind::Substring => Scoring::Label(Arc::new(SubstringSimilarity)),
        MeasureKind::Levenshtein => Scoring::Label(Arc::new(LevenshteinSimilarity)),
        MeasureKind::SubEditSynonym => {
            let synonyms = resources.synonyms.clone().ok_or_else(missing)?;
            Scoring::Label(Arc::new(WeightedBlend::sub_edit_synonym(synonyms)))
        }
        MeasureKind::Vector => {
            let embeddings = resources.embeddings.clone().ok_or_else(missing)?;
            let cutoff = resources
                .vector_cutoff
                .unwrap_or(vector::DEFAULT_DISTANCE_CUTOFF);
            Scoring::Vector(Arc::new(VectorDistance::new(embeddings, cutoff)?))
        }
    };
    tracing::debug!(measure = kind.name(), "built similarity measure");
    Ok(scoring)
}
