//! Composite measures: fixed-weight blends with an optional exact-match override.

use std::sync::Arc;

use crate::error::{MeasureError, MeasureResult};

use super::string::{LevenshteinSimilarity, SubstringSimilarity};
use super::synonym::SynonymService;
use super::{ConceptView, SimilarityMeasure, sanitize_score};

/// Weight of the substring measure in the reference blend.
pub const SUB_EDIT_PRIMARY_WEIGHT: f64 = 0.65;
/// Weight of the Levenshtein measure in the reference blend.
pub const SUB_EDIT_SECONDARY_WEIGHT: f64 = 0.35;

/// Condition under which a blend short-circuits to 1.0.
#[derive(Debug, Clone)]
pub enum OverrideRule {
    None,
    /// The two labels are synonyms according to the lexical index.
    Synonyms(Arc<SynonymService>),
}

impl OverrideRule {
    fn fires(&self, a: ConceptView<'_>, b: ConceptView<'_>) -> bool {
        match self {
            OverrideRule::None => false,
            OverrideRule::Synonyms(service) => service.are_synonyms(a.label, b.label),
        }
    }
}

/// `primary_weight * primary + secondary_weight * secondary`, unless the
/// override fires.
///
/// Weights and override are part of the measure's identity and fixed at
/// construction.
pub struct WeightedBlend {
    name: String,
    primary: Arc<dyn SimilarityMeasure>,
    secondary: Arc<dyn SimilarityMeasure>,
    primary_weight: f64,
    secondary_weight: f64,
    override_rule: OverrideRule,
}

impl WeightedBlend {
    pub fn new(
        name: impl Into<String>,
        primary: Arc<dyn SimilarityMeasure>,
        primary_weight: f64,
        secondary: Arc<dyn SimilarityMeasure>,
        secondary_weight: f64,
        override_rule: OverrideRule,
    ) -> MeasureResult<Self> {
        let valid = |w: f64| w.is_finite() && w >= 0.0;
        if !valid(primary_weight)
            || !valid(secondary_weight)
            || ((primary_weight + secondary_weight) - 1.0).abs() > 1e-9
        {
            return Err(MeasureError::InvalidWeights {
                primary: primary_weight,
                secondary: secondary_weight,
            });
        }
        Ok(Self {
            name: name.into(),
            primary,
            secondary,
            primary_weight,
            secondary_weight,
            override_rule,
        })
    }

    /// The reference blend: 0.65 substring + 0.35 Levenshtein, overridden to
    /// 1.0 when the labels are synonyms.
    pub fn sub_edit_synonym(synonyms: Arc<SynonymService>) -> Self {
        Self {
            name: "sub-edit-synonym".into(),
            primary: Arc::new(SubstringSimilarity),
            secondary: Arc::new(LevenshteinSimilarity),
            primary_weight: SUB_EDIT_PRIMARY_WEIGHT,
            secondary_weight: SUB_EDIT_SECONDARY_WEIGHT,
            override_rule: OverrideRule::Synonyms(synonyms),
        }
    }

    pub fn weights(&self) -> (f64, f64) {
        (self.primary_weight, self.secondary_weight)
    }

    pub fn override_rule(&self) -> &OverrideRule {
        &self.override_rule
    }
}

impl SimilarityMeasure for WeightedBlend {
    fn name(&self) -> &str {
        &self.name
    }

    fn score(&self, a: ConceptView<'_>, b: ConceptView<'_>) -> f64 {
        if self.override_rule.fires(a, b) {
            return 1.0;
        }
        let primary = sanitize_score(self.primary.score(a, b));
        let secondary = sanitize_score(self.secondary.score(a, b));
        sanitize_score(self.primary_weight * primary + self.secondary_weight * secondary)
    }
}

impl std::fmt::Debug for WeightedBlend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeightedBlend")
            .field("name", &self.name)
            .field("primary", &self.primary.name())
            .field("primary_weight", &self.primary_weight)
            .field("secondary", &self.secondary.name())
            .field("secondary_weight", &self.secondary_weight)
            .field("override", &self.override_rule)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::concept::Concept;
    use crate::similarity::string::{levenshtein_similarity, substring_similarity};

    fn service() -> Arc<SynonymService> {
        Arc::new(SynonymService::from_sets(vec![vec![
            "article".into(),
            "paper".into(),
        ]]))
    }

    #[test]
    fn synonym_override_scores_one() {
        let blend = WeightedBlend::sub_edit_synonym(service());
        let a = Concept::class("a", "Paper");
        let b = Concept::class("b", "Article");
        assert_eq!(blend.score((&a).into(), (&b).into()), 1.0);
    }

    #[test]
    fn non_synonyms_use_fixed_weights() {
        let blend = WeightedBlend::sub_edit_synonym(service());
        let a = Concept::class("a", "Reviewer");
        let b = Concept::class("b", "Review");
        let expected = 0.65 * substring_similarity("reviewer", "review")
            + 0.35 * levenshtein_similarity("reviewer", "review");
        let got = blend.score((&a).into(), (&b).into());
        assert!((got - expected).abs() < 1e-12, "expected {expected}, got {got}");
        assert_eq!(blend.weights(), (0.65, 0.35));
    }

    #[test]
    fn weights_must_sum_to_one() {
        let err = WeightedBlend::new(
            "bad",
            Arc::new(SubstringSimilarity),
            0.7,
            Arc::new(LevenshteinSimilarity),
            0.7,
            OverrideRule::None,
        );
        assert!(matches!(err, Err(MeasureError::InvalidWeights { .. })));

        let ok = WeightedBlend::new(
            "even",
            Arc::new(SubstringSimilarity),
            0.5,
            Arc::new(LevenshteinSimilarity),
            0.5,
            OverrideRule::None,
        );
        assert!(ok.is_ok());
    }

    #[test]
    fn unavailable_index_falls_back_to_blend() {
        let blend =
            WeightedBlend::sub_edit_synonym(Arc::new(SynonymService::from_file("/no/such/file")));
        let a = Concept::class("a", "Paper");
        let b = Concept::class("b", "Article");
        let got = blend.score((&a).into(), (&b).into());
        assert!(got < 1.0);
    }
}
