//! Pairwise scoring of concept partitions into similarity matrices.
//!
//! Rows (source concepts) are scored in parallel with rayon and collected in
//! source order, so the resulting matrix does not depend on scheduling.
//! Cancellation is checked before each row.

use std::collections::HashMap;

use dashmap::DashMap;
use rayon::prelude::*;

use crate::concept::{Concept, ConceptKind};
use crate::error::TaskError;
use crate::matrix::SimilarityMatrix;
use crate::similarity::vector::VectorDistance;
use crate::similarity::{ConceptView, Scoring, SimilarityMeasure, sanitize_score};
use crate::task::CancellationToken;

/// Result type for scoring; the only failure is cancellation.
pub type ScoreResult<T> = std::result::Result<T, TaskError>;

/// Scores every (source, target) pair of a partition.
#[derive(Debug, Clone)]
pub struct NodePairScorer {
    scoring: Scoring,
    cancel: CancellationToken,
    prune_below: f64,
}

impl NodePairScorer {
    pub fn new(scoring: Scoring, cancel: CancellationToken) -> Self {
        Self {
            scoring,
            cancel,
            prune_below: 0.0,
        }
    }

    /// Leave pairs scoring strictly below `floor` unset.
    pub fn with_prune_below(mut self, floor: f64) -> Self {
        self.prune_below = sanitize_score(floor);
        self
    }

    pub fn scoring(&self) -> &Scoring {
        &self.scoring
    }

    /// Score one partition into a dense matrix.
    pub fn score_partition(
        &self,
        kind: ConceptKind,
        sources: &[Concept],
        targets: &[Concept],
    ) -> ScoreResult<SimilarityMatrix> {
        let span = tracing::debug_span!(
            "score_partition",
            %kind,
            measure = self.scoring.name(),
            sources = sources.len(),
            targets = targets.len()
        );
        let _guard = span.enter();

        let rows = match &self.scoring {
            Scoring::Label(measure) => self.score_labels(measure.as_ref(), sources, targets)?,
            Scoring::Vector(distance) => self.score_vectors(distance, sources, targets)?,
        };
        let matrix = SimilarityMatrix::from_rows(kind, targets.len(), rows);
        tracing::debug!(
            scored = matrix.scored_count(),
            unset = matrix.unset_count(),
            "partition scored"
        );
        Ok(matrix)
    }

    fn keep(&self, score: f64) -> Option<f64> {
        let score = sanitize_score(score);
        (score >= self.prune_below).then_some(score)
    }

    fn score_labels(
        &self,
        measure: &dyn SimilarityMeasure,
        sources: &[Concept],
        targets: &[Concept],
    ) -> ScoreResult<Vec<Vec<Option<f64>>>> {
        sources
            .par_iter()
            .map(|source| -> ScoreResult<Vec<Option<f64>>> {
                self.cancel.check()?;
                let a = ConceptView::from(source);
                Ok(targets
                    .iter()
                    .map(|target| self.keep(measure.score(a, ConceptView::from(target))))
                    .collect())
            })
            .collect()
    }

    /// Vector path: resolve each distinct label once, and compute each
    /// distinct label pair's distance once.
    fn score_vectors(
        &self,
        distance: &VectorDistance,
        sources: &[Concept],
        targets: &[Concept],
    ) -> ScoreResult<Vec<Vec<Option<f64>>>> {
        let (source_slots, source_vectors) = distinct_vectors(distance, sources);
        let (target_slots, target_vectors) = distinct_vectors(distance, targets);

        let missing = source_vectors.iter().filter(|v| v.is_none()).count()
            + target_vectors.iter().filter(|v| v.is_none()).count();
        if missing > 0 {
            tracing::debug!(missing, "labels without a vector representation are excluded");
        }

        let memo: DashMap<(usize, usize), Option<f64>> = DashMap::new();

        source_slots
            .par_iter()
            .map(|&s| -> ScoreResult<Vec<Option<f64>>> {
                self.cancel.check()?;
                Ok(target_slots
                    .iter()
                    .map(|&t| {
                        let score = *memo.entry((s, t)).or_insert_with(|| {
                            let (a, b) = (source_vectors[s]?, target_vectors[t]?);
                            distance.score_vectors(a, b)
                        });
                        score.and_then(|v| self.keep(v))
                    })
                    .collect())
            })
            .collect()
    }
}

/// Map each concept to a slot per distinct label, with that label's vector.
fn distinct_vectors<'a>(
    distance: &'a VectorDistance,
    concepts: &'a [Concept],
) -> (Vec<usize>, Vec<Option<&'a [f64]>>) {
    let mut slot_of: HashMap<&str, usize> = HashMap::new();
    let mut vectors = Vec::new();
    let slots = concepts
        .iter()
        .map(|c| {
            *slot_of.entry(c.label.as_str()).or_insert_with(|| {
                vectors.push(distance.lookup(&c.label));
                vectors.len() - 1
            })
        })
        .collect();
    (slots, vectors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::similarity::string::LevenshteinSimilarity;
    use crate::similarity::vector::Embeddings;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn classes(labels: &[&str]) -> Vec<Concept> {
        labels
            .iter()
            .enumerate()
            .map(|(i, l)| Concept::class(format!("c{i}"), *l))
            .collect()
    }

    #[test]
    fn label_scoring_fills_dense_matrix() {
        let scorer = NodePairScorer::new(
            Scoring::Label(Arc::new(LevenshteinSimilarity)),
            CancellationToken::new(),
        );
        let m = scorer
            .score_partition(
                ConceptKind::Class,
                &classes(&["Paper", "Author"]),
                &classes(&["paper", "Writer", "Review"]),
            )
            .unwrap();
        assert_eq!((m.rows(), m.cols()), (2, 3));
        assert_eq!(m.unset_count(), 0);
        assert_eq!(m.get(0, 0), Some(1.0));
    }

    #[test]
    fn prune_floor_leaves_cells_unset() {
        let scorer = NodePairScorer::new(
            Scoring::Label(Arc::new(LevenshteinSimilarity)),
            CancellationToken::new(),
        )
        .with_prune_below(0.5);
        let m = scorer
            .score_partition(ConceptKind::Class, &classes(&["Paper"]), &classes(&["Paper", "Xyz"]))
            .unwrap();
        assert_eq!(m.get(0, 0), Some(1.0));
        assert_eq!(m.get(0, 1), None);
    }

    #[test]
    fn cancelled_token_aborts_scan() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let scorer = NodePairScorer::new(Scoring::Label(Arc::new(LevenshteinSimilarity)), cancel);
        let result = scorer.score_partition(ConceptKind::Class, &classes(&["a"]), &classes(&["b"]));
        assert!(matches!(result, Err(TaskError::Cancelled)));
    }

    #[test]
    fn vector_scoring_excludes_missing_and_far_pairs() {
        let embeddings = Arc::new(Embeddings::from_pairs(vec![
            ("paper", vec![0.0, 0.0]),
            ("article", vec![0.0, 1.0]),
            ("banana", vec![50.0, 50.0]),
        ]));
        let distance = VectorDistance::new(embeddings, 2.0).unwrap();
        let scorer = NodePairScorer::new(Scoring::Vector(Arc::new(distance)), CancellationToken::new());
        let m = scorer
            .score_partition(
                ConceptKind::Class,
                &classes(&["paper", "unknown"]),
                &classes(&["article", "banana"]),
            )
            .unwrap();
        assert_eq!(m.get(0, 0), Some(0.5));
        assert_eq!(m.get(0, 1), None); // beyond cutoff
        assert_eq!(m.get(1, 0), None); // no vector
        assert_eq!(m.get(1, 1), None);
    }

    #[test]
    fn vector_lookup_happens_once_per_distinct_label() {
        let embeddings = Embeddings::from_pairs(vec![("paper", vec![1.0])]);
        let distance = VectorDistance::new(Arc::new(embeddings), 1.0).unwrap();
        let concepts = classes(&["paper", "paper", "other", "paper"]);
        let (slots, vectors) = distinct_vectors(&distance, &concepts);
        assert_eq!(slots, [0, 0, 1, 0]);
        assert_eq!(vectors.len(), 2);
        assert!(vectors[1].is_none());
    }

    struct CountingMeasure(AtomicUsize);

    impl SimilarityMeasure for CountingMeasure {
        fn name(&self) -> &str {
            "counting"
        }

        fn score(&self, _: ConceptView<'_>, _: ConceptView<'_>) -> f64 {
            self.0.fetch_add(1, Ordering::Relaxed);
            0.5
        }
    }

    #[test]
    fn every_pair_is_scored_once() {
        let measure = Arc::new(CountingMeasure(AtomicUsize::new(0)));
        let scorer = NodePairScorer::new(Scoring::Label(measure.clone()), CancellationToken::new());
        scorer
            .score_partition(
                ConceptKind::Property,
                &classes(&["a", "b", "c"]),
                &classes(&["x", "y"]),
            )
            .unwrap();
        assert_eq!(measure.0.load(Ordering::Relaxed), 6);
    }
}
