// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # ontomatch
//!
//! An ontology matching engine: scores every source/target concept pair with a
//! pluggable similarity measure, extracts an alignment under a threshold and
//! per-node cardinality caps, and evaluates alignments against a reference.
//!
//! ## Architecture
//!
//! - **Concepts** (`concept`, `mapping`): ontologies, mappings, alignments
//! - **Measures** (`similarity`): substring, edit distance, synonym-aware blends,
//!   embedding distance
//! - **Scoring** (`scorer`, `matrix`): parallel pair scoring into similarity matrices
//! - **Extraction** (`extract`): greedy, deterministic cardinality-constrained selection
//! - **Evaluation** (`evaluate`): precision / recall / F-measure, single pair or batch
//! - **Runs** (`task`): the cancellable pipeline tying the stages together
//!
//! ## Library usage
//!
//! ```
//! use std::sync::Arc;
//!
//! use ontomatch::concept::{Concept, Ontology};
//! use ontomatch::params::MatchParameters;
//! use ontomatch::similarity::{MeasureKind, MeasureResources, build_scoring};
//! use ontomatch::task::{CancellationToken, MatchRun};
//!
//! let source = Ontology::new("http://a", vec![Concept::class("a#Paper", "Paper")], vec![]);
//! let target = Ontology::new("http://b", vec![Concept::class("b#Paper", "paper")], vec![]);
//! let scoring = build_scoring(MeasureKind::Levenshtein, &MeasureResources::default()).unwrap();
//!
//! let run = MatchRun::new(Arc::new(source), Arc::new(target), scoring, MatchParameters::one_to_one(0.8));
//! let report = run.run(&CancellationToken::new()).into_result().unwrap();
//! assert_eq!(report.alignment.len(), 1);
//! ```

pub mod concept;
pub mod config;
pub mod error;
pub mod evaluate;
pub mod export;
pub mod extract;
pub mod mapping;
pub mod matrix;
pub mod params;
pub mod scorer;
pub mod similarity;
pub mod task;
