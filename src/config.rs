//! Match configuration files.
//!
//! A `MatchConfig` bundles the parameters of a run with the measure to use
//! and the paths of any auxiliary resources:
//!
//! ```toml
//! measure = "sub-edit-synonym"
//!
//! [params]
//! threshold = 0.75
//! max_source_align = 1
//! max_target_align = "any"
//!
//! [resources]
//! synonyms = "synonyms.json"
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{AlignResult, LoadError};
use crate::params::MatchParameters;
use crate::similarity::vector::Embeddings;
use crate::similarity::{MeasureKind, MeasureResources, Scoring, build_scoring};

/// Paths of auxiliary resources consulted by some measures.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceConfig {
    /// JSON array of synonym sets.
    pub synonyms: Option<PathBuf>,
    /// JSON object mapping labels to vectors.
    pub embeddings: Option<PathBuf>,
    /// Euclidean distance cutoff for the vector measure.
    pub vector_cutoff: Option<f64>,
}

/// Everything needed to configure a match run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    pub measure: MeasureKind,
    /// Pairs scoring below this are never stored in the matrix.
    pub prune_below: f64,
    /// Require compatible relations when evaluating against a reference.
    pub relation_sensitive: bool,
    pub params: MatchParameters,
    pub resources: ResourceConfig,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            measure: MeasureKind::SubEditSynonym,
            prune_below: 0.0,
            relation_sensitive: true,
            params: MatchParameters::default(),
            resources: ResourceConfig::default(),
        }
    }
}

impl MatchConfig {
    /// Load from a TOML file.
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let content = std::fs::read_to_string(path).map_err(|e| LoadError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        let config: MatchConfig = toml::from_str(&content).map_err(|e| LoadError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        Ok(config.resolved_against(base))
    }

    /// Make relative resource paths relative to `base` instead.
    pub fn resolved_against(mut self, base: &Path) -> Self {
        let resolve = |p: PathBuf| if p.is_absolute() { p } else { base.join(p) };
        self.resources.synonyms = self.resources.synonyms.map(resolve);
        self.resources.embeddings = self.resources.embeddings.map(resolve);
        self
    }

    /// Save to a TOML file.
    pub fn save(&self, path: &Path) -> Result<(), LoadError> {
        let content = toml::to_string_pretty(self).map_err(|e| LoadError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| LoadError::Write {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
        std::fs::write(path, content).map_err(|e| LoadError::Write {
            path: path.display().to_string(),
            source: e,
        })
    }

    /// Resolve resource paths. Embeddings are read now (only when the
    /// configured measure uses them); the synonym index is built on first use.
    pub fn resources(&self) -> AlignResult<MeasureResources> {
        let embeddings = match (&self.resources.embeddings, self.measure) {
            (Some(path), MeasureKind::Vector) => Some(Arc::new(Embeddings::load(path)?)),
            _ => None,
        };
        Ok(MeasureResources::from_paths(
            self.resources.synonyms.clone(),
            embeddings,
            self.resources.vector_cutoff,
        ))
    }

    /// Validate parameters and build the configured measure.
    pub fn build(&self) -> AlignResult<Scoring> {
        self.params.validate()?;
        let resources = self.resources()?;
        Ok(build_scoring(self.measure, &resources)?)
    }
}

/// One ontology pair of a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairEntry {
    /// Display name, e.g. `"cmt-conference"`.
    pub name: String,
    pub source: PathBuf,
    pub target: PathBuf,
    pub reference: PathBuf,
}

/// A list of ontology pairs to match and evaluate together.
///
/// ```toml
/// config = "match.toml"
///
/// [[pairs]]
/// name = "cmt-conference"
/// source = "cmt.json"
/// target = "conference.json"
/// reference = "cmt-conference.json"
/// ```
///
/// Relative paths are resolved against the manifest's directory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchManifest {
    /// Match configuration shared by every pair.
    pub config: Option<PathBuf>,
    pub pairs: Vec<PairEntry>,
}

impl BatchManifest {
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let content = std::fs::read_to_string(path).map_err(|e| LoadError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        let manifest: BatchManifest = toml::from_str(&content).map_err(|e| LoadError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        Ok(manifest.resolved_against(base))
    }

    /// Make every relative path relative to `base` instead.
    pub fn resolved_against(self, base: &Path) -> Self {
        let resolve = |p: PathBuf| if p.is_absolute() { p } else { base.join(p) };
        Self {
            config: self.config.map(resolve),
            pairs: self
                .pairs
                .into_iter()
                .map(|pair| PairEntry {
                    name: pair.name,
                    source: resolve(pair.source),
                    target: resolve(pair.target),
                    reference: resolve(pair.reference),
                })
                .collect(),
        }
    }

    /// The shared configuration, or the default when none is named.
    pub fn match_config(&self) -> Result<MatchConfig, LoadError> {
        match &self.config {
            Some(path) => MatchConfig::load(path),
            None => Ok(MatchConfig::default()),
        }
    }
}
