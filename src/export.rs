//! JSON interchange for ontologies and alignments.
//!
//! OWL/RDF parsing lives outside this crate; callers hand us ontologies and
//! reference alignments already flattened into these shapes:
//!
//! ```json
//! { "uri": "http://cmt", "classes": [{"id": "cmt#Paper", "label": "Paper"}], "properties": [] }
//! ```
//!
//! ```json
//! { "source": "http://cmt", "target": "http://conference",
//!   "mappings": [{"source": "cmt#Paper", "target": "conf#Paper", "relation": "="}] }
//! ```

use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::concept::{Concept, ConceptKind, Ontology, OntologyId};
use crate::error::LoadError;
use crate::mapping::{Alignment, Mapping, Relation};

/// A concept as it appears in an ontology file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConceptEntry {
    pub id: String,
    /// Defaults to the id when absent.
    #[serde(default)]
    pub label: Option<String>,
}

/// Flattened ontology: URI plus ordered class and property lists.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OntologyFile {
    pub uri: String,
    pub classes: Vec<ConceptEntry>,
    pub properties: Vec<ConceptEntry>,
}

impl OntologyFile {
    pub fn into_ontology(self) -> Ontology {
        let concepts = |entries: Vec<ConceptEntry>, kind| {
            entries
                .into_iter()
                .map(|e| {
                    let label = e.label.unwrap_or_else(|| e.id.clone());
                    Concept::new(e.id, label, kind)
                })
                .collect()
        };
        Ontology::new(
            self.uri,
            concepts(self.classes, ConceptKind::Class),
            concepts(self.properties, ConceptKind::Property),
        )
    }

    pub fn from_ontology(ontology: &Ontology) -> Self {
        let entries = |concepts: &[Concept]| {
            concepts
                .iter()
                .map(|c| ConceptEntry {
                    id: c.id.to_string(),
                    label: Some(c.label.clone()),
                })
                .collect()
        };
        Self {
            uri: ontology.id().as_str().to_string(),
            classes: entries(ontology.classes()),
            properties: entries(ontology.properties()),
        }
    }
}

fn default_kind() -> ConceptKind {
    ConceptKind::Class
}

fn default_score() -> f64 {
    1.0
}

fn default_relation() -> String {
    Relation::Equivalence.symbol().to_string()
}

/// Exported mapping. `relation` accepts either a symbol (`=`, `<`, `>`, `%`)
/// or a relation name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingExport {
    pub source: String,
    pub target: String,
    #[serde(default = "default_kind")]
    pub kind: ConceptKind,
    #[serde(default = "default_score")]
    pub score: f64,
    #[serde(default = "default_relation")]
    pub relation: String,
}

/// Exported alignment between two ontologies.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignmentFile {
    pub source: String,
    pub target: String,
    pub mappings: Vec<MappingExport>,
}

impl AlignmentFile {
    pub fn from_alignment(alignment: &Alignment) -> Self {
        Self {
            source: alignment.source_ontology().as_str().to_string(),
            target: alignment.target_ontology().as_str().to_string(),
            mappings: alignment
                .iter()
                .map(|m| MappingExport {
                    source: m.source.to_string(),
                    target: m.target.to_string(),
                    kind: m.kind,
                    score: m.score,
                    relation: m.relation.symbol().to_string(),
                })
                .collect(),
        }
    }

    /// Convert to an alignment. Duplicate mappings collapse to the first.
    pub fn into_alignment(self) -> Result<Alignment, String> {
        let mut mappings = Vec::with_capacity(self.mappings.len());
        for m in self.mappings {
            let relation: Relation = m.relation.parse().map_err(|_| {
                format!(
                    "unknown relation {:?} in {} -> {}",
                    m.relation, m.source, m.target
                )
            })?;
            mappings.push(Mapping::new(m.source, m.target, m.kind, m.score, relation));
        }
        Ok(Alignment::from_mappings(
            ontology_id(self.source),
            ontology_id(self.target),
            mappings,
        ))
    }
}

fn ontology_id(uri: String) -> OntologyId {
    if uri.is_empty() {
        OntologyId::none()
    } else {
        OntologyId::new(uri)
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, LoadError> {
    let content = std::fs::read_to_string(path).map_err(|e| LoadError::Read {
        path: path.display().to_string(),
        source: e,
    })?;
    serde_json::from_str(&content).map_err(|e| LoadError::Parse {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), LoadError> {
    let content = serde_json::to_string_pretty(value).map_err(|e| LoadError::Parse {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    std::fs::write(path, content).map_err(|e| LoadError::Write {
        path: path.display().to_string(),
        source: e,
    })
}

/// Load an ontology from a JSON file.
pub fn load_ontology(path: &Path) -> Result<Ontology, LoadError> {
    let file: OntologyFile = read_json(path)?;
    let ontology = file.into_ontology();
    tracing::debug!(
        path = %path.display(),
        classes = ontology.classes().len(),
        properties = ontology.properties().len(),
        "loaded ontology"
    );
    Ok(ontology)
}

/// Load an alignment (discovered or reference) from a JSON file.
pub fn load_alignment(path: &Path) -> Result<Alignment, LoadError> {
    let file: AlignmentFile = read_json(path)?;
    file.into_alignment().map_err(|message| LoadError::Parse {
        path: path.display().to_string(),
        message,
    })
}

pub fn save_alignment(path: &Path, alignment: &Alignment) -> Result<(), LoadError> {
    write_json(path, &AlignmentFile::from_alignment(alignment))
}

pub fn save_ontology(path: &Path, ontology: &Ontology) -> Result<(), LoadError> {
    write_json(path, &OntologyFile::from_ontology(ontology))
}
