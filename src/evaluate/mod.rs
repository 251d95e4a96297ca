//! Reference evaluation: precision, recall and F-measure of a discovered
//! alignment against a gold-standard one.
//!
//! A discovered mapping is correct when the reference holds a mapping with
//! the same (source, target) pair and, if the evaluator is relation
//! sensitive, a compatible relation (see [`Relation::compatible_with`]).
//! The discovered alignment is narrowed to the partitions the reference
//! covers before counting.

pub mod batch;

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::concept::{ConceptId, ConceptKind, Ontology, OntologyId};
use crate::mapping::{Alignment, Mapping, Relation};

/// Partitions a reference alignment covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceScope {
    Classes,
    Properties,
    Both,
    Empty,
}

impl ReferenceScope {
    /// Detect the scope from the reference's content.
    pub fn of(reference: &Alignment) -> Self {
        match (
            reference.has_kind(ConceptKind::Class),
            reference.has_kind(ConceptKind::Property),
        ) {
            (true, true) => ReferenceScope::Both,
            (true, false) => ReferenceScope::Classes,
            (false, true) => ReferenceScope::Properties,
            (false, false) => ReferenceScope::Empty,
        }
    }

    /// The discovered mappings comparable against a reference of this scope.
    pub fn select(self, discovered: &Alignment) -> Alignment {
        match self {
            ReferenceScope::Classes => discovered.of_kind(ConceptKind::Class),
            ReferenceScope::Properties => discovered.of_kind(ConceptKind::Property),
            ReferenceScope::Both | ReferenceScope::Empty => discovered.clone(),
        }
    }
}

impl std::fmt::Display for ReferenceScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReferenceScope::Classes => write!(f, "classes"),
            ReferenceScope::Properties => write!(f, "properties"),
            ReferenceScope::Both => write!(f, "classes + properties"),
            ReferenceScope::Empty => write!(f, "empty"),
        }
    }
}

/// Outcome of comparing one discovered alignment with a reference.
#[derive(Debug, Clone, Serialize)]
pub struct ReferenceEvaluationResult {
    pub source_ontology: OntologyId,
    pub target_ontology: OntologyId,
    pub scope: ReferenceScope,
    pub precision: f64,
    pub recall: f64,
    pub fmeasure: f64,
    /// Discovered mappings within the reference's scope.
    pub discovered: Vec<Mapping>,
    /// Reference mappings counted in the recall denominator.
    pub reference: Vec<Mapping>,
    /// Discovered mappings confirmed by the reference.
    pub correct: Vec<Mapping>,
    /// Distinct reference mappings confirmed by some discovered mapping.
    pub matched: Vec<Mapping>,
    /// Reference mappings naming concepts absent from the loaded ontologies.
    pub excluded: Vec<Mapping>,
}

impl ReferenceEvaluationResult {
    pub fn discovered_count(&self) -> usize {
        self.discovered.len()
    }

    pub fn reference_count(&self) -> usize {
        self.reference.len()
    }

    pub fn correct_count(&self) -> usize {
        self.correct.len()
    }

    pub fn matched_count(&self) -> usize {
        self.matched.len()
    }

    /// Human-readable summary with one-decimal percentages.
    pub fn report(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "Reference evaluation: {} -> {}\n",
            self.source_ontology, self.target_ontology
        ));
        out.push_str(&format!("Scope: {}\n", self.scope));
        out.push_str(&format!(
            "Discovered: {}  Reference: {}  Correct: {}  Matched reference: {}\n",
            self.discovered_count(),
            self.reference_count(),
            self.correct_count(),
            self.matched_count()
        ));
        if !self.excluded.is_empty() {
            out.push_str(&format!(
                "Excluded reference mappings (unknown concepts): {}\n",
                self.excluded.len()
            ));
        }
        out.push_str(&metrics_lines(self.precision, self.recall, self.fmeasure));
        out
    }
}

/// Format a ratio as a one-decimal percentage: `0.6667` → `"66.7%"`.
pub fn percent(value: f64) -> String {
    format!("{:.1}%", value * 100.0)
}

pub(crate) fn metrics_lines(precision: f64, recall: f64, fmeasure: f64) -> String {
    format!(
        "Precision = Correct/Discovered: {}\n\
         Recall = Correct/Reference: {}\n\
         Fmeasure = 2(precision*recall)/(precision+recall): {}\n",
        percent(precision),
        percent(recall),
        percent(fmeasure)
    )
}

/// `numerator / denominator`, or 0 for an empty denominator.
fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// Harmonic mean of precision and recall; 0 when both are 0.
pub fn fmeasure(precision: f64, recall: f64) -> f64 {
    let denom = precision + recall;
    if denom == 0.0 {
        0.0
    } else {
        2.0 * precision * recall / denom
    }
}

/// Compares discovered alignments with a reference alignment.
#[derive(Debug, Clone, Copy)]
pub struct ReferenceEvaluator<'o> {
    relation_sensitive: bool,
    ontologies: Option<(&'o Ontology, &'o Ontology)>,
}

impl Default for ReferenceEvaluator<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'o> ReferenceEvaluator<'o> {
    /// A relation-sensitive evaluator that does not check concept existence.
    pub fn new() -> Self {
        Self {
            relation_sensitive: true,
            ontologies: None,
        }
    }

    /// Match on (source, target) only, ignoring relations.
    pub fn relation_insensitive(mut self) -> Self {
        self.relation_sensitive = false;
        self
    }

    /// Exclude reference mappings whose concepts are not in these ontologies.
    pub fn with_ontologies(mut self, source: &'o Ontology, target: &'o Ontology) -> Self {
        self.ontologies = Some((source, target));
        self
    }

    pub fn is_relation_sensitive(&self) -> bool {
        self.relation_sensitive
    }

    /// Compare `discovered` against `reference`.
    pub fn compare(&self, discovered: &Alignment, reference: &Alignment) -> ReferenceEvaluationResult {
        let (counted, excluded) = self.partition_reference(reference);
        let counted_alignment = Alignment::from_mappings(
            reference.source_ontology().clone(),
            reference.target_ontology().clone(),
            counted.iter().cloned(),
        );

        let scope = ReferenceScope::of(&counted_alignment);
        let scoped = scope.select(discovered);

        let mut by_pair: HashMap<(&ConceptId, &ConceptId), Vec<usize>> = HashMap::new();
        for (i, m) in counted.iter().enumerate() {
            by_pair.entry((&m.source, &m.target)).or_default().push(i);
        }

        // Several discovered mappings may confirm the same reference mapping
        // (e.g. `<` and `>` on one pair); recall counts it once.
        let mut hit: HashSet<usize> = HashSet::new();
        let mut correct: Vec<Mapping> = Vec::new();
        for m in scoped.iter() {
            let Some(candidates) = by_pair.get(&(&m.source, &m.target)) else {
                continue;
            };
            let matches: Vec<usize> = candidates
                .iter()
                .copied()
                .filter(|&i| !self.relation_sensitive || m.relation.compatible_with(counted[i].relation))
                .collect();
            if !matches.is_empty() {
                hit.extend(matches);
                correct.push(m.clone());
            }
        }
        let mut matched_idx: Vec<usize> = hit.into_iter().collect();
        matched_idx.sort_unstable();
        let matched: Vec<Mapping> = matched_idx.into_iter().map(|i| counted[i].clone()).collect();

        let precision = ratio(correct.len(), scoped.len());
        let recall = ratio(matched.len(), counted.len());
        let fmeasure = fmeasure(precision, recall);

        tracing::info!(
            source = %discovered.source_ontology(),
            target = %discovered.target_ontology(),
            %scope,
            discovered = scoped.len(),
            reference = counted.len(),
            correct = correct.len(),
            matched = matched.len(),
            precision,
            recall,
            fmeasure,
            "reference evaluation complete"
        );

        ReferenceEvaluationResult {
            source_ontology: discovered.source_ontology().clone(),
            target_ontology: discovered.target_ontology().clone(),
            scope,
            precision,
            recall,
            fmeasure,
            discovered: scoped.mappings().to_vec(),
            reference: counted,
            correct,
            matched,
            excluded,
        }
    }

    /// Split the reference into counted mappings and mappings naming unknown
    /// concepts. Counted mappings take their kind from the source ontology,
    /// since reference files usually do not record it.
    fn partition_reference(&self, reference: &Alignment) -> (Vec<Mapping>, Vec<Mapping>) {
        let Some((source, target)) = self.ontologies else {
            return (reference.mappings().to_vec(), Vec::new());
        };
        let mut counted = Vec::with_capacity(reference.len());
        let mut excluded = Vec::new();
        for m in reference.iter() {
            match (source.lookup(&m.source), target.contains(&m.target)) {
                (Some(concept), true) => counted.push(Mapping {
                    kind: concept.kind,
                    ..m.clone()
                }),
                _ => {
                    tracing::warn!(
                        source = %m.source,
                        target = %m.target,
                        "reference mapping names a concept absent from the loaded ontologies; excluded"
                    );
                    excluded.push(m.clone());
                }
            }
        }
        (counted, excluded)
    }
}

/// Relation-sensitive comparison without concept checks.
pub fn compare(discovered: &Alignment, reference: &Alignment) -> ReferenceEvaluationResult {
    ReferenceEvaluator::new().compare(discovered, reference)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::concept::Concept;

    fn ids() -> (OntologyId, OntologyId) {
        (OntologyId::new("src"), OntologyId::new("tgt"))
    }

    fn eq(s: &str, t: &str) -> Mapping {
        Mapping::class_equivalence(s, t, 1.0)
    }

    fn alignment(mappings: Vec<Mapping>) -> Alignment {
        let (s, t) = ids();
        Alignment::from_mappings(s, t, mappings)
    }

    #[test]
    fn half_precision_full_recall() {
        let reference = alignment(vec![eq("A", "X")]);
        let discovered = alignment(vec![eq("A", "X"), eq("B", "Y")]);
        let result = compare(&discovered, &reference);
        assert_eq!(result.correct_count(), 1);
        assert_eq!(result.correct[0], eq("A", "X"));
        assert!((result.precision - 0.5).abs() < 1e-12);
        assert!((result.recall - 1.0).abs() < 1e-12);
        assert_eq!(format!("{:.3}", result.fmeasure), "0.667");
    }

    #[test]
    fn identical_alignments_score_perfectly() {
        let mappings = vec![eq("A", "X"), eq("B", "Y"), eq("C", "Z")];
        let result = compare(&alignment(mappings.clone()), &alignment(mappings));
        assert_eq!(result.precision, 1.0);
        assert_eq!(result.recall, 1.0);
        assert_eq!(result.fmeasure, 1.0);
    }

    #[test]
    fn empty_sets_yield_zero_not_nan() {
        let result = compare(&alignment(vec![]), &alignment(vec![]));
        assert_eq!(result.precision, 0.0);
        assert_eq!(result.recall, 0.0);
        assert_eq!(result.fmeasure, 0.0);
        assert_eq!(result.scope, ReferenceScope::Empty);

        let result = compare(&alignment(vec![eq("A", "X")]), &alignment(vec![eq("B", "Y")]));
        assert_eq!(result.fmeasure, 0.0);
    }

    #[test]
    fn equivalence_does_not_match_subclass() {
        let reference = alignment(vec![Mapping::new(
            "A",
            "X",
            ConceptKind::Class,
            1.0,
            Relation::SubclassOf,
        )]);
        let discovered = alignment(vec![eq("A", "X")]);
        assert_eq!(compare(&discovered, &reference).correct_count(), 0);

        let insensitive = ReferenceEvaluator::new()
            .relation_insensitive()
            .compare(&discovered, &reference);
        assert_eq!(insensitive.correct_count(), 1);
    }

    #[test]
    fn hierarchical_relations_match_either_direction() {
        let reference = alignment(vec![Mapping::new(
            "A",
            "X",
            ConceptKind::Class,
            1.0,
            Relation::SuperclassOf,
        )]);
        let discovered = alignment(vec![Mapping::new(
            "A",
            "X",
            ConceptKind::Class,
            0.7,
            Relation::SubclassOf,
        )]);
        assert_eq!(compare(&discovered, &reference).correct_count(), 1);
    }

    #[test]
    fn class_only_reference_scopes_discovered_set() {
        let reference = alignment(vec![eq("A", "X")]);
        let discovered = alignment(vec![
            eq("A", "X"),
            Mapping::new("p", "q", ConceptKind::Property, 0.9, Relation::Equivalence),
        ]);
        let result = compare(&discovered, &reference);
        assert_eq!(result.scope, ReferenceScope::Classes);
        assert_eq!(result.discovered_count(), 1);
        assert_eq!(result.precision, 1.0);
    }

    #[test]
    fn property_only_reference_scopes_discovered_set() {
        let reference = alignment(vec![Mapping::new(
            "p",
            "q",
            ConceptKind::Property,
            1.0,
            Relation::Equivalence,
        )]);
        let discovered = alignment(vec![
            eq("A", "X"),
            Mapping::new("p", "q", ConceptKind::Property, 0.9, Relation::Equivalence),
        ]);
        let result = compare(&discovered, &reference);
        assert_eq!(result.scope, ReferenceScope::Properties);
        assert_eq!(result.discovered_count(), 1);
        assert_eq!(result.fmeasure, 1.0);
    }

    #[test]
    fn unknown_reference_concepts_leave_the_denominator() {
        let source = Ontology::new("src", vec![Concept::class("A", "a")], vec![]);
        let target = Ontology::new("tgt", vec![Concept::class("X", "x")], vec![]);
        let reference = alignment(vec![eq("A", "X"), eq("Ghost", "X")]);
        let discovered = alignment(vec![eq("A", "X")]);

        let result = ReferenceEvaluator::new()
            .with_ontologies(&source, &target)
            .compare(&discovered, &reference);
        assert_eq!(result.reference_count(), 1);
        assert_eq!(result.excluded.len(), 1);
        assert_eq!(result.recall, 1.0);
    }

    #[test]
    fn report_lists_percentages_and_identity() {
        let reference = alignment(vec![eq("A", "X")]);
        let discovered = alignment(vec![eq("A", "X"), eq("B", "Y")]);
        let report = compare(&discovered, &reference).report();
        assert!(report.contains("src -> tgt"));
        assert!(report.contains("Precision = Correct/Discovered: 50.0%"));
        assert!(report.contains("Recall = Correct/Reference: 100.0%"));
        assert!(report.contains("Fmeasure = 2(precision*recall)/(precision+recall): 66.7%"));
    }

    #[test]
    fn metrics_stay_in_unit_interval() {
        let reference = alignment(vec![eq("A", "X"), eq("B", "Y"), eq("C", "Z")]);
        for discovered in [
            vec![],
            vec![eq("A", "X")],
            vec![eq("A", "Y"), eq("B", "X")],
            vec![eq("A", "X"), eq("B", "Y"), eq("C", "Z"), eq("D", "W")],
        ] {
            let r = compare(&alignment(discovered), &reference);
            for v in [r.precision, r.recall, r.fmeasure] {
                assert!((0.0..=1.0).contains(&v));
            }
            if r.precision == 0.0 && r.recall == 0.0 {
                assert_eq!(r.fmeasure, 0.0);
            }
        }
    }

    fn class(s: &str, t: &str, relation: Relation) -> Mapping {
        Mapping::new(s, t, ConceptKind::Class, 1.0, relation)
    }

    #[test]
    fn mixed_relations_on_one_pair_count_the_reference_once() {
        let reference = alignment(vec![class("A", "X", Relation::SubclassOf)]);
        let discovered = alignment(vec![
            class("A", "X", Relation::SubclassOf),
            class("A", "X", Relation::SuperclassOf),
        ]);
        let r = compare(&discovered, &reference);
        assert_eq!(r.correct_count(), 2);
        assert_eq!(r.matched_count(), 1);
        assert_eq!(r.precision, 1.0);
        assert_eq!(r.recall, 1.0);
        assert_eq!(r.fmeasure, 1.0);

        let reference = alignment(vec![eq("A", "X")]);
        let discovered = alignment(vec![eq("A", "X"), class("A", "X", Relation::SubclassOf)]);
        let r = ReferenceEvaluator::new()
            .relation_insensitive()
            .compare(&discovered, &reference);
        assert_eq!(r.matched_count(), 1);
        assert_eq!(r.recall, 1.0);
        for v in [r.precision, r.recall, r.fmeasure] {
            assert!((0.0..=1.0).contains(&v));
        }

        // Two reference relations on one pair, one discovered mapping.
        let reference = alignment(vec![eq("A", "X"), class("A", "X", Relation::SubclassOf)]);
        let r = compare(&alignment(vec![eq("A", "X")]), &reference);
        assert_eq!(r.matched_count(), 1);
        assert_eq!(r.recall, 0.5);
    }

    #[test]
    fn reference_kinds_come_from_the_ontologies() {
        let source = Ontology::new(
            "src",
            vec![Concept::class("a#Paper", "Paper")],
            vec![Concept::property("a#hasAuthor", "hasAuthor")],
        );
        let target = Ontology::new(
            "tgt",
            vec![Concept::class("b#Paper", "Paper")],
            vec![Concept::property("b#hasAuthor", "hasAuthor")],
        );
        // Reference files carry no kind; every mapping arrives as a class.
        let reference = alignment(vec![eq("a#Paper", "b#Paper"), eq("a#hasAuthor", "b#hasAuthor")]);
        let discovered = alignment(vec![
            eq("a#Paper", "b#Paper"),
            Mapping::new("a#hasAuthor", "b#hasAuthor", ConceptKind::Property, 1.0, Relation::Equivalence),
        ]);

        let r = ReferenceEvaluator::new()
            .with_ontologies(&source, &target)
            .compare(&discovered, &reference);
        assert_eq!(r.scope, ReferenceScope::Both);
        assert_eq!(r.discovered_count(), 2);
        assert_eq!(r.correct_count(), 2);
        assert_eq!(r.recall, 1.0);
        assert_eq!(r.reference[1].kind, ConceptKind::Property);
    }
}
