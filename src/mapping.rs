//! Mappings and alignments.
//!
//! A [`Mapping`] is one proposed correspondence between a source and a target
//! concept. An [`Alignment`] is the set of mappings produced by one match run
//! (or loaded from a reference file) for a fixed pair of ontologies.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::concept::{ConceptId, ConceptKind, OntologyId};

/// Semantic relation asserted by a mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Relation {
    /// `source ≡ target`.
    Equivalence,
    /// `source ⊑ target`.
    SubclassOf,
    /// `source ⊒ target`.
    SuperclassOf,
    /// Overlapping but neither subsumes the other.
    Overlap,
}

impl Relation {
    /// Subclass and superclass relations.
    pub fn is_hierarchical(self) -> bool {
        matches!(self, Relation::SubclassOf | Relation::SuperclassOf)
    }

    /// Whether a discovered relation satisfies a reference relation.
    ///
    /// Equivalence only matches equivalence. Hierarchical relations match in
    /// either direction, since the reference treats them ANY-to-ANY.
    pub fn compatible_with(self, reference: Relation) -> bool {
        if self.is_hierarchical() && reference.is_hierarchical() {
            return true;
        }
        self == reference
    }

    /// The relation seen from the other side of the mapping.
    pub fn inverse(self) -> Relation {
        match self {
            Relation::SubclassOf => Relation::SuperclassOf,
            Relation::SuperclassOf => Relation::SubclassOf,
            other => other,
        }
    }

    /// Short symbol used in reports and OAEI-style files.
    pub fn symbol(self) -> &'static str {
        match self {
            Relation::Equivalence => "=",
            Relation::SubclassOf => "<",
            Relation::SuperclassOf => ">",
            Relation::Overlap => "%",
        }
    }
}

impl std::fmt::Display for Relation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Relation::Equivalence => write!(f, "equivalence"),
            Relation::SubclassOf => write!(f, "subclass-of"),
            Relation::SuperclassOf => write!(f, "superclass-of"),
            Relation::Overlap => write!(f, "overlap"),
        }
    }
}

impl std::str::FromStr for Relation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "=" | "equivalence" | "equivalent" => Ok(Relation::Equivalence),
            "<" | "subclass-of" | "subclass" => Ok(Relation::SubclassOf),
            ">" | "superclass-of" | "superclass" => Ok(Relation::SuperclassOf),
            "%" | "overlap" => Ok(Relation::Overlap),
            other => Err(format!("unknown relation: {other}")),
        }
    }
}

/// One correspondence between a source and a target concept.
///
/// Equality and hashing use `(source, target, relation)` only; the score and
/// partition are payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mapping {
    pub source: ConceptId,
    pub target: ConceptId,
    /// Partition both endpoints belong to.
    pub kind: ConceptKind,
    /// Similarity in `[0, 1]`.
    pub score: f64,
    pub relation: Relation,
}

impl Mapping {
    pub fn new(
        source: impl Into<ConceptId>,
        target: impl Into<ConceptId>,
        kind: ConceptKind,
        score: f64,
        relation: Relation,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            kind,
            score: score.clamp(0.0, 1.0),
            relation,
        }
    }

    /// An equivalence mapping between two classes.
    pub fn class_equivalence(source: &str, target: &str, score: f64) -> Self {
        Self::new(source, target, ConceptKind::Class, score, Relation::Equivalence)
    }

    fn key(&self) -> (&ConceptId, &ConceptId, Relation) {
        (&self.source, &self.target, self.relation)
    }
}

impl PartialEq for Mapping {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Mapping {}

impl std::hash::Hash for Mapping {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl std::fmt::Display for Mapping {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} {} ({:.3})",
            self.source,
            self.relation.symbol(),
            self.target,
            self.score
        )
    }
}

/// A duplicate-free set of mappings between two ontologies.
///
/// Insertion order is preserved, which keeps exports and reports stable.
#[derive(Debug, Clone)]
pub struct Alignment {
    source_ontology: OntologyId,
    target_ontology: OntologyId,
    mappings: Vec<Mapping>,
    seen: HashSet<(ConceptId, ConceptId, Relation)>,
}

impl Alignment {
    pub fn new(source_ontology: OntologyId, target_ontology: OntologyId) -> Self {
        Self {
            source_ontology,
            target_ontology,
            mappings: Vec::new(),
            seen: HashSet::new(),
        }
    }

    /// Build an alignment from mappings, dropping duplicate triples.
    pub fn from_mappings(
        source_ontology: OntologyId,
        target_ontology: OntologyId,
        mappings: impl IntoIterator<Item = Mapping>,
    ) -> Self {
        let mut alignment = Self::new(source_ontology, target_ontology);
        for m in mappings {
            alignment.insert(m);
        }
        alignment
    }

    /// Insert a mapping. Returns `false` if the triple was already present.
    pub fn insert(&mut self, mapping: Mapping) -> bool {
        let key = (
            mapping.source.clone(),
            mapping.target.clone(),
            mapping.relation,
        );
        if !self.seen.insert(key) {
            return false;
        }
        self.mappings.push(mapping);
        true
    }

    pub fn source_ontology(&self) -> &OntologyId {
        &self.source_ontology
    }

    pub fn target_ontology(&self) -> &OntologyId {
        &self.target_ontology
    }

    pub fn mappings(&self) -> &[Mapping] {
        &self.mappings
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Mapping> {
        self.mappings.iter()
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    pub fn contains(&self, mapping: &Mapping) -> bool {
        self.seen.contains(&(
            mapping.source.clone(),
            mapping.target.clone(),
            mapping.relation,
        ))
    }

    /// Whether any mapping of the given partition is present.
    pub fn has_kind(&self, kind: ConceptKind) -> bool {
        self.mappings.iter().any(|m| m.kind == kind)
    }

    /// The sub-alignment restricted to one partition.
    pub fn of_kind(&self, kind: ConceptKind) -> Alignment {
        Alignment::from_mappings(
            self.source_ontology.clone(),
            self.target_ontology.clone(),
            self.mappings.iter().filter(|m| m.kind == kind).cloned(),
        )
    }

    /// Number of mappings each source concept participates in.
    pub fn source_counts(&self) -> HashMap<&ConceptId, usize> {
        let mut counts = HashMap::new();
        for m in &self.mappings {
            *counts.entry(&m.source).or_insert(0) += 1;
        }
        counts
    }

    /// Number of mappings each target concept participates in.
    pub fn target_counts(&self) -> HashMap<&ConceptId, usize> {
        let mut counts = HashMap::new();
        for m in &self.mappings {
            *counts.entry(&m.target).or_insert(0) += 1;
        }
        counts
    }
}

impl PartialEq for Alignment {
    fn eq(&self, other: &Self) -> bool {
        self.source_ontology == other.source_ontology
            && self.target_ontology == other.target_ontology
            && self.mappings.len() == other.mappings.len()
            && self.mappings.iter().all(|m| other.contains(m))
    }
}

impl<'a> IntoIterator for &'a Alignment {
    type Item = &'a Mapping;
    type IntoIter = std::slice::Iter<'a, Mapping>;

    fn into_iter(self) -> Self::IntoIter {
        self.mappings.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids() -> (OntologyId, OntologyId) {
        (OntologyId::new("src"), OntologyId::new("tgt"))
    }

    #[test]
    fn mapping_equality_ignores_score() {
        let a = Mapping::class_equivalence("A", "X", 0.9);
        let b = Mapping::class_equivalence("A", "X", 0.2);
        assert_eq!(a, b);

        let c = Mapping::new("A", "X", ConceptKind::Class, 0.9, Relation::SubclassOf);
        assert_ne!(a, c);
    }

    #[test]
    fn alignment_rejects_duplicate_triples() {
        let (s, t) = ids();
        let mut alignment = Alignment::new(s, t);
        assert!(alignment.insert(Mapping::class_equivalence("A", "X", 0.9)));
        assert!(!alignment.insert(Mapping::class_equivalence("A", "X", 0.5)));
        assert!(alignment.insert(Mapping::new(
            "A",
            "X",
            ConceptKind::Class,
            0.5,
            Relation::SubclassOf
        )));
        assert_eq!(alignment.len(), 2);
        // First insertion wins.
        assert_eq!(alignment.mappings()[0].score, 0.9);
    }

    #[test]
    fn of_kind_scopes_partition() {
        let (s, t) = ids();
        let alignment = Alignment::from_mappings(
            s,
            t,
            vec![
                Mapping::class_equivalence("A", "X", 0.9),
                Mapping::new("p", "q", ConceptKind::Property, 0.8, Relation::Equivalence),
            ],
        );
        assert!(alignment.has_kind(ConceptKind::Property));
        let classes = alignment.of_kind(ConceptKind::Class);
        assert_eq!(classes.len(), 1);
        assert!(!classes.has_kind(ConceptKind::Property));
    }

    #[test]
    fn hierarchical_relations_are_mutually_compatible() {
        assert!(Relation::SubclassOf.compatible_with(Relation::SuperclassOf));
        assert!(Relation::SuperclassOf.compatible_with(Relation::SubclassOf));
        assert!(!Relation::Equivalence.compatible_with(Relation::SubclassOf));
        assert!(!Relation::SubclassOf.compatible_with(Relation::Equivalence));
        assert!(Relation::Equivalence.compatible_with(Relation::Equivalence));
    }

    #[test]
    fn relation_parses_symbols_and_names() {
        assert_eq!("=".parse::<Relation>().unwrap(), Relation::Equivalence);
        assert_eq!("subclass-of".parse::<Relation>().unwrap(), Relation::SubclassOf);
        assert!("sibling".parse::<Relation>().is_err());
    }

    #[test]
    fn mapping_score_is_clamped() {
        let m = Mapping::class_equivalence("A", "X", 1.7);
        assert_eq!(m.score, 1.0);
    }
}
