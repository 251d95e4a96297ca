//! Alignment extraction: turn score matrices into a cardinality-constrained
//! mapping set.
//!
//! 1. Collect every cell with `score >= threshold` from the partitions in scope.
//! 2. Sort by score descending; ties go to classes before properties, then
//!    matrix order, then source index, then target index.
//! 3. Accept greedily while both endpoints are under their caps.
//!
//! The sort key is total, so the same matrices and parameters always yield
//! the same alignment.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::concept::{Concept, ConceptId, ConceptKind, OntologyId};
use crate::error::MatrixError;
use crate::mapping::{Alignment, Mapping, Relation};
use crate::matrix::SimilarityMatrix;
use crate::params::MatchParameters;

/// A scored matrix together with the concept lists its rows and columns follow.
#[derive(Debug, Clone, Copy)]
pub struct ScoredPartition<'a> {
    pub matrix: &'a SimilarityMatrix,
    pub sources: &'a [Concept],
    pub targets: &'a [Concept],
}

impl<'a> ScoredPartition<'a> {
    pub fn new(matrix: &'a SimilarityMatrix, sources: &'a [Concept], targets: &'a [Concept]) -> Self {
        Self {
            matrix,
            sources,
            targets,
        }
    }

    fn check_dimensions(&self) -> Result<(), MatrixError> {
        if self.matrix.rows() != self.sources.len() || self.matrix.cols() != self.targets.len() {
            return Err(MatrixError::DimensionMismatch {
                kind: self.matrix.kind().to_string(),
                rows: self.matrix.rows(),
                cols: self.matrix.cols(),
                sources: self.sources.len(),
                targets: self.targets.len(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
struct RankedCandidate {
    partition: usize,
    row: usize,
    col: usize,
    score: f64,
}

/// Greedy, cardinality-capped extraction.
#[derive(Debug, Clone)]
pub struct AlignmentExtractor<'p> {
    params: &'p MatchParameters,
}

impl<'p> AlignmentExtractor<'p> {
    /// `params` must already be validated.
    pub fn new(params: &'p MatchParameters) -> Self {
        Self { params }
    }

    /// Extract the final alignment from one or more scored partitions.
    pub fn extract(
        &self,
        source_ontology: &OntologyId,
        target_ontology: &OntologyId,
        partitions: &[ScoredPartition<'_>],
    ) -> Result<Alignment, MatrixError> {
        for p in partitions {
            p.check_dimensions()?;
        }

        let in_scope: Vec<(usize, &ScoredPartition<'_>)> = partitions
            .iter()
            .enumerate()
            .filter(|(_, p)| self.in_scope(p))
            .collect();

        let mut candidates: Vec<RankedCandidate> = Vec::new();
        for &(i, p) in &in_scope {
            candidates.extend(
                p.matrix
                    .candidates(self.params.threshold)
                    .into_iter()
                    .map(|c| RankedCandidate {
                        partition: i,
                        row: c.row,
                        col: c.col,
                        score: c.score,
                    }),
            );
        }
        let considered = candidates.len();

        candidates.sort_by(|a, b| Self::rank(partitions, a, b));

        let mut source_taken: HashMap<&ConceptId, usize> = HashMap::new();
        let mut target_taken: HashMap<&ConceptId, usize> = HashMap::new();
        let mut alignment = Alignment::new(source_ontology.clone(), target_ontology.clone());
        let unbounded_hierarchy = self.params.hierarchical_unbounded();

        for c in candidates {
            let p = &partitions[c.partition];
            let relation = p.matrix.relation();
            let source = &p.sources[c.row];
            let target = &p.targets[c.col];

            let capped = !(unbounded_hierarchy && relation.is_hierarchical());
            if capped {
                let s_count = source_taken.get(&source.id).copied().unwrap_or(0);
                let t_count = target_taken.get(&target.id).copied().unwrap_or(0);
                if !self.params.max_source_align.admits(s_count)
                    || !self.params.max_target_align.admits(t_count)
                {
                    continue;
                }
            }

            let inserted = alignment.insert(Mapping::new(
                source.id.clone(),
                target.id.clone(),
                p.matrix.kind(),
                c.score,
                relation,
            ));
            if inserted && capped {
                *source_taken.entry(&source.id).or_insert(0) += 1;
                *target_taken.entry(&target.id).or_insert(0) += 1;
            }
        }

        tracing::debug!(
            partitions = in_scope.len(),
            considered,
            accepted = alignment.len(),
            threshold = self.params.threshold,
            "alignment extracted"
        );
        Ok(alignment)
    }

    fn in_scope(&self, p: &ScoredPartition<'_>) -> bool {
        let skipped = match p.matrix.kind() {
            ConceptKind::Class => self.params.skip_classes,
            ConceptKind::Property => self.params.skip_properties,
        };
        let relation_ok = !self.params.only_equivalence
            || p.matrix.relation() == Relation::Equivalence;
        !skipped && relation_ok
    }

    fn rank(partitions: &[ScoredPartition<'_>], a: &RankedCandidate, b: &RankedCandidate) -> Ordering {
        b.score
            .total_cmp(&a.score)
            .then_with(|| {
                partitions[a.partition]
                    .matrix
                    .kind()
                    .cmp(&partitions[b.partition].matrix.kind())
            })
            .then_with(|| a.partition.cmp(&b.partition))
            .then_with(|| a.row.cmp(&b.row))
            .then_with(|| a.col.cmp(&b.col))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::Cardinality;

    fn concepts(prefix: &str, n: usize) -> Vec<Concept> {
        (0..n)
            .map(|i| Concept::class(format!("{prefix}{i}"), format!("{prefix}{i}")))
            .collect()
    }

    fn ids() -> (OntologyId, OntologyId) {
        (OntologyId::new("s"), OntologyId::new("t"))
    }

    fn matrix(rows: Vec<Vec<Option<f64>>>) -> SimilarityMatrix {
        let cols = rows.first().map_or(0, Vec::len);
        SimilarityMatrix::from_rows(ConceptKind::Class, cols, rows)
    }

    #[test]
    fn below_threshold_is_excluded_regardless_of_caps() {
        let (s, t) = ids();
        let src = concepts("a", 1);
        let tgt = concepts("x", 1);
        let m = matrix(vec![vec![Some(0.89)]]);
        let params = MatchParameters {
            threshold: 0.9,
            max_source_align: Cardinality::Any,
            max_target_align: Cardinality::Any,
            ..Default::default()
        };
        let alignment = AlignmentExtractor::new(&params)
            .extract(&s, &t, &[ScoredPartition::new(&m, &src, &tgt)])
            .unwrap();
        assert!(alignment.is_empty());
    }

    #[test]
    fn source_cap_keeps_best_candidate() {
        let (s, t) = ids();
        let src = concepts("a", 1);
        let tgt = concepts("x", 2);
        let m = matrix(vec![vec![Some(0.80), Some(0.95)]]);
        let params = MatchParameters {
            threshold: 0.5,
            max_source_align: Cardinality::Bounded(1),
            max_target_align: Cardinality::Any,
            ..Default::default()
        };
        let alignment = AlignmentExtractor::new(&params)
            .extract(&s, &t, &[ScoredPartition::new(&m, &src, &tgt)])
            .unwrap();
        assert_eq!(alignment.len(), 1);
        assert_eq!(alignment.mappings()[0].target.as_str(), "x1");
        assert_eq!(alignment.mappings()[0].score, 0.95);
    }

    #[test]
    fn greedy_assignment_respects_both_caps() {
        let (s, t) = ids();
        let src = concepts("a", 2);
        let tgt = concepts("x", 2);
        // a0-x0 is best; a1 can then only take x1.
        let m = matrix(vec![
            vec![Some(0.9), Some(0.8)],
            vec![Some(0.85), Some(0.6)],
        ]);
        let params = MatchParameters::one_to_one(0.5);
        let alignment = AlignmentExtractor::new(&params)
            .extract(&s, &t, &[ScoredPartition::new(&m, &src, &tgt)])
            .unwrap();
        let pairs: Vec<(&str, &str)> = alignment
            .iter()
            .map(|m| (m.source.as_str(), m.target.as_str()))
            .collect();
        assert_eq!(pairs, [("a0", "x0"), ("a1", "x1")]);
    }

    #[test]
    fn ties_break_by_source_then_target_index() {
        let (s, t) = ids();
        let src = concepts("a", 2);
        let tgt = concepts("x", 2);
        let m = matrix(vec![vec![Some(0.7), Some(0.7)], vec![Some(0.7), Some(0.7)]]);
        let params = MatchParameters::one_to_one(0.5);
        let alignment = AlignmentExtractor::new(&params)
            .extract(&s, &t, &[ScoredPartition::new(&m, &src, &tgt)])
            .unwrap();
        let pairs: Vec<(&str, &str)> = alignment
            .iter()
            .map(|m| (m.source.as_str(), m.target.as_str()))
            .collect();
        assert_eq!(pairs, [("a0", "x0"), ("a1", "x1")]);
    }

    #[test]
    fn extraction_is_deterministic() {
        let (s, t) = ids();
        let src = concepts("a", 4);
        let tgt = concepts("x", 4);
        let m = matrix(
            (0..4)
                .map(|i| (0..4).map(|j| Some(((i * 7 + j * 3) % 5) as f64 / 5.0)).collect())
                .collect(),
        );
        let params = MatchParameters {
            threshold: 0.2,
            max_source_align: Cardinality::Bounded(2),
            max_target_align: Cardinality::Bounded(2),
            ..Default::default()
        };
        let extractor = AlignmentExtractor::new(&params);
        let first = extractor
            .extract(&s, &t, &[ScoredPartition::new(&m, &src, &tgt)])
            .unwrap();
        let second = extractor
            .extract(&s, &t, &[ScoredPartition::new(&m, &src, &tgt)])
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(first.mappings(), second.mappings());
        for count in first.source_counts().values() {
            assert!(*count <= 2);
        }
    }

    #[test]
    fn skip_and_equivalence_filters_apply() {
        let (s, t) = ids();
        let src = concepts("a", 1);
        let tgt = concepts("x", 1);
        let eq = matrix(vec![vec![Some(0.9)]]);
        let sub = matrix(vec![vec![Some(0.9)]]).with_relation(Relation::SubclassOf);

        let params = MatchParameters::one_to_one(0.5);
        let alignment = AlignmentExtractor::new(&params)
            .extract(
                &s,
                &t,
                &[
                    ScoredPartition::new(&eq, &src, &tgt),
                    ScoredPartition::new(&sub, &src, &tgt),
                ],
            )
            .unwrap();
        assert_eq!(alignment.len(), 1);
        assert_eq!(alignment.mappings()[0].relation, Relation::Equivalence);

        let skip = MatchParameters {
            skip_classes: true,
            ..MatchParameters::one_to_one(0.5)
        };
        let alignment = AlignmentExtractor::new(&skip)
            .extract(&s, &t, &[ScoredPartition::new(&eq, &src, &tgt)])
            .unwrap();
        assert!(alignment.is_empty());
    }

    #[test]
    fn hierarchical_relations_can_be_unbounded() {
        let (s, t) = ids();
        let src = concepts("a", 1);
        let tgt = concepts("x", 3);
        let sub = matrix(vec![vec![Some(0.9), Some(0.8), Some(0.7)]]).with_relation(Relation::SubclassOf);
        let eq = matrix(vec![vec![Some(0.95), Some(0.6), Some(0.6)]]);

        let params = MatchParameters {
            only_equivalence: false,
            hierarchical_any: true,
            ..MatchParameters::one_to_one(0.5)
        };
        let alignment = AlignmentExtractor::new(&params)
            .extract(
                &s,
                &t,
                &[
                    ScoredPartition::new(&eq, &src, &tgt),
                    ScoredPartition::new(&sub, &src, &tgt),
                ],
            )
            .unwrap();
        let eq_count = alignment
            .iter()
            .filter(|m| m.relation == Relation::Equivalence)
            .count();
        let sub_count = alignment
            .iter()
            .filter(|m| m.relation == Relation::SubclassOf)
            .count();
        assert_eq!(eq_count, 1);
        assert_eq!(sub_count, 3);

        let capped = MatchParameters {
            hierarchical_any: false,
            ..params
        };
        let alignment = AlignmentExtractor::new(&capped)
            .extract(
                &s,
                &t,
                &[
                    ScoredPartition::new(&eq, &src, &tgt),
                    ScoredPartition::new(&sub, &src, &tgt),
                ],
            )
            .unwrap();
        assert_eq!(alignment.len(), 1);
    }

    #[test]
    fn classes_win_ties_against_properties() {
        let (s, t) = ids();
        let cls_src = concepts("c", 1);
        let cls_tgt = concepts("y", 1);
        let prop_src = vec![Concept::property("p0", "p0")];
        let prop_tgt = vec![Concept::property("q0", "q0")];
        let props =
            SimilarityMatrix::from_rows(ConceptKind::Property, 1, vec![vec![Some(0.8)]]);
        let classes = matrix(vec![vec![Some(0.8)]]);
        let params = MatchParameters::one_to_one(0.5);
        let alignment = AlignmentExtractor::new(&params)
            .extract(
                &s,
                &t,
                &[
                    ScoredPartition::new(&props, &prop_src, &prop_tgt),
                    ScoredPartition::new(&classes, &cls_src, &cls_tgt),
                ],
            )
            .unwrap();
        assert_eq!(alignment.len(), 2);
        assert_eq!(alignment.mappings()[0].kind, ConceptKind::Class);
    }

    #[test]
    fn dimension_mismatch_is_an_error() {
        let (s, t) = ids();
        let src = concepts("a", 2);
        let tgt = concepts("x", 1);
        let m = matrix(vec![vec![Some(0.9)]]);
        let params = MatchParameters::one_to_one(0.5);
        let result = AlignmentExtractor::new(&params).extract(&s, &t, &[ScoredPartition::new(&m, &src, &tgt)]);
        assert!(matches!(result, Err(MatrixError::DimensionMismatch { .. })));
    }
}
