//! Core concept types for the ontomatch engine.
//!
//! An [`Ontology`] is an ordered collection of [`Concept`]s, pre-partitioned
//! into classes and properties by the external loader. The order of each
//! partition is significant: similarity matrices index rows and columns by
//! position in these lists, and extraction breaks ties by that position.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Stable identifier of a concept, usually its URI.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConceptId(String);

impl ConceptId {
    pub fn new(raw: impl Into<String>) -> Self {
        ConceptId(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ConceptId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConceptId {
    fn from(raw: &str) -> Self {
        ConceptId::new(raw)
    }
}

impl From<String> for ConceptId {
    fn from(raw: String) -> Self {
        ConceptId(raw)
    }
}

/// Identity of an ontology (its URI).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OntologyId(String);

impl OntologyId {
    pub fn new(uri: impl Into<String>) -> Self {
        OntologyId(uri.into())
    }

    /// Placeholder identity for alignments not bound to a loaded ontology.
    pub fn none() -> Self {
        OntologyId(String::new())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_none(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for OntologyId {
    fn default() -> Self {
        OntologyId::none()
    }
}

impl std::fmt::Display for OntologyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0.is_empty() {
            write!(f, "<none>")
        } else {
            f.write_str(&self.0)
        }
    }
}

/// Partition a concept belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConceptKind {
    Class,
    Property,
}

impl std::fmt::Display for ConceptKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConceptKind::Class => write!(f, "classes"),
            ConceptKind::Property => write!(f, "properties"),
        }
    }
}

/// A class or property of an ontology. Immutable after load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Concept {
    pub id: ConceptId,
    pub label: String,
    pub kind: ConceptKind,
    /// Owning ontology; set when the concept is added to an [`Ontology`].
    #[serde(default)]
    pub ontology: OntologyId,
}

impl Concept {
    pub fn new(id: impl Into<String>, label: impl Into<String>, kind: ConceptKind) -> Self {
        Self {
            id: ConceptId::new(id),
            label: label.into(),
            kind,
            ontology: OntologyId::none(),
        }
    }

    pub fn class(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(id, label, ConceptKind::Class)
    }

    pub fn property(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(id, label, ConceptKind::Property)
    }
}

/// A read-only concept graph: URI plus ordered class and property lists.
#[derive(Debug, Clone)]
pub struct Ontology {
    id: OntologyId,
    classes: Vec<Concept>,
    properties: Vec<Concept>,
    index: HashMap<ConceptId, (ConceptKind, usize)>,
}

impl Ontology {
    /// Build an ontology from its partitions.
    ///
    /// Concepts whose `kind` disagrees with the partition they are passed in
    /// are re-tagged; the partition wins. Every concept is stamped with this
    /// ontology's id. Later duplicates of an id shadow
    /// earlier ones in [`Ontology::lookup`] but keep their list position.
    pub fn new(uri: impl Into<String>, classes: Vec<Concept>, properties: Vec<Concept>) -> Self {
        let id = OntologyId::new(uri);
        let classes: Vec<Concept> = classes
            .into_iter()
            .map(|c| Concept {
                kind: ConceptKind::Class,
                ontology: id.clone(),
                ..c
            })
            .collect();
        let properties: Vec<Concept> = properties
            .into_iter()
            .map(|c| Concept {
                kind: ConceptKind::Property,
                ontology: id.clone(),
                ..c
            })
            .collect();

        let mut index = HashMap::with_capacity(classes.len() + properties.len());
        for (i, c) in classes.iter().enumerate() {
            index.insert(c.id.clone(), (ConceptKind::Class, i));
        }
        for (i, p) in properties.iter().enumerate() {
            index.insert(p.id.clone(), (ConceptKind::Property, i));
        }

        Self {
            id,
            classes,
            properties,
            index,
        }
    }

    pub fn id(&self) -> &OntologyId {
        &self.id
    }

    pub fn classes(&self) -> &[Concept] {
        &self.classes
    }

    pub fn properties(&self) -> &[Concept] {
        &self.properties
    }

    /// The ordered concept list of one partition.
    pub fn partition(&self, kind: ConceptKind) -> &[Concept] {
        match kind {
            ConceptKind::Class => &self.classes,
            ConceptKind::Property => &self.properties,
        }
    }

    /// Look up a concept by id in either partition.
    pub fn lookup(&self, id: &ConceptId) -> Option<&Concept> {
        let (kind, pos) = self.index.get(id)?;
        self.partition(*kind).get(*pos)
    }

    pub fn contains(&self, id: &ConceptId) -> bool {
        self.index.contains_key(id)
    }

    /// Total number of concepts across both partitions.
    pub fn len(&self) -> usize {
        self.classes.len() + self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty() && self.properties.is_empty()
    }
}
