//! Lexical synonym index with an init-once lifecycle.
//!
//! The [`SynonymService`] owns the recipe for building a [`SynonymIndex`]
//! (a file path or in-memory synonym sets) and builds it on first use.
//! `OnceLock` guarantees a single build even when many scoring threads hit
//! the service at once; after that the index is read-only. Share the service
//! by `Arc` with every measure that needs it.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::{LoadError, MeasureError};

use super::normalize_label;

/// Word → synonym-set membership table.
#[derive(Debug, Clone, Default)]
pub struct SynonymIndex {
    sets: HashMap<String, Vec<usize>>,
    set_count: usize,
}

impl SynonymIndex {
    /// Build from synonym sets; entries are normalized like concept labels.
    pub fn from_sets<I, S, W>(sets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: IntoIterator<Item = W>,
        W: AsRef<str>,
    {
        let mut index: HashMap<String, Vec<usize>> = HashMap::new();
        let mut set_count = 0;
        for set in sets {
            let id = set_count;
            let mut members = 0;
            for word in set {
                let key = normalize_label(word.as_ref());
                if key.is_empty() {
                    continue;
                }
                let ids = index.entry(key).or_default();
                if !ids.contains(&id) {
                    ids.push(id);
                }
                members += 1;
            }
            if members > 0 {
                set_count += 1;
            }
        }
        Self {
            sets: index,
            set_count,
        }
    }

    /// Load a JSON array of synonym sets: `[["car", "automobile"], ...]`.
    pub fn load(path: &std::path::Path) -> Result<Self, LoadError> {
        let content = std::fs::read_to_string(path).map_err(|e| LoadError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        let sets: Vec<Vec<String>> =
            serde_json::from_str(&content).map_err(|e| LoadError::Parse {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
        Ok(Self::from_sets(sets))
    }

    /// Whether two labels share at least one synonym set.
    pub fn are_synonyms(&self, a: &str, b: &str) -> bool {
        let a = normalize_label(a);
        let b = normalize_label(b);
        let (Some(sa), Some(sb)) = (self.sets.get(&a), self.sets.get(&b)) else {
            return false;
        };
        let sa: HashSet<&usize> = sa.iter().collect();
        sb.iter().any(|id| sa.contains(id))
    }

    /// Number of distinct words indexed.
    pub fn word_count(&self) -> usize {
        self.sets.len()
    }

    /// Number of non-empty synonym sets.
    pub fn set_count(&self) -> usize {
        self.set_count
    }
}

enum SynonymSource {
    File(PathBuf),
    Sets(Vec<Vec<String>>),
}

/// Process-scoped, lazily built synonym index.
pub struct SynonymService {
    source: SynonymSource,
    index: OnceLock<Option<SynonymIndex>>,
    builds: AtomicUsize,
}

impl SynonymService {
    /// A service that loads its index from a JSON file on first use.
    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        Self::with_source(SynonymSource::File(path.into()))
    }

    /// A service over in-memory synonym sets.
    pub fn from_sets(sets: Vec<Vec<String>>) -> Self {
        Self::with_source(SynonymSource::Sets(sets))
    }

    fn with_source(source: SynonymSource) -> Self {
        Self {
            source,
            index: OnceLock::new(),
            builds: AtomicUsize::new(0),
        }
    }

    /// The index, building it on first call.
    ///
    /// Returns `None` if building failed; the failure is logged once and the
    /// service then behaves as an empty index.
    pub fn index(&self) -> Option<&SynonymIndex> {
        self.index.get_or_init(|| self.build()).as_ref()
    }

    fn build(&self) -> Option<SynonymIndex> {
        self.builds.fetch_add(1, Ordering::Relaxed);
        let built = match &self.source {
            SynonymSource::Sets(sets) => Ok(SynonymIndex::from_sets(sets)),
            SynonymSource::File(path) => {
                SynonymIndex::load(path).map_err(|e| MeasureError::IndexUnavailable {
                    message: format!("{e}"),
                })
            }
        };
        match built {
            Ok(index) => {
                tracing::info!(
                    words = index.word_count(),
                    sets = index.set_count(),
                    "synonym index initialized"
                );
                Some(index)
            }
            Err(e) => {
                tracing::warn!(error = %e, "synonym index unavailable, synonym overrides disabled");
                None
            }
        }
    }

    /// Whether the two labels are synonyms. `false` if the index is unavailable.
    pub fn are_synonyms(&self, a: &str, b: &str) -> bool {
        self.index().is_some_and(|idx| idx.are_synonyms(a, b))
    }

    pub fn is_initialized(&self) -> bool {
        self.index.get().is_some()
    }

    /// How many times the index was built (at most once).
    pub fn build_count(&self) -> usize {
        self.builds.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for SynonymService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let source = match &self.source {
            SynonymSource::File(p) => p.display().to_string(),
            SynonymSource::Sets(s) => format!("{} in-memory sets", s.len()),
        };
        f.debug_struct("SynonymService")
            .field("source", &source)
            .field("initialized", &self.is_initialized())
            .finish()
    }
}
