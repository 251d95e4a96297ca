//! Averaged evaluation over many ontology pairs (e.g. an OAEI track).

use serde::Serialize;

use super::{ReferenceEvaluationResult, metrics_lines};

/// What happened to one pair of a batch.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum BatchOutcome {
    Evaluated { result: Box<ReferenceEvaluationResult> },
    Cancelled,
    Failed { reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchEntry {
    /// Pair name, e.g. `"cmt-conference"`.
    pub name: String,
    pub outcome: BatchOutcome,
}

/// Mean metrics over the evaluated pairs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MeanScores {
    pub pairs: usize,
    pub precision: f64,
    pub recall: f64,
    pub fmeasure: f64,
}

/// Accumulates per-pair evaluations.
///
/// Only evaluated pairs enter the mean; cancelled and failed pairs are listed
/// in the report so a partial batch is never mistaken for a complete one.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchEvaluation {
    entries: Vec<BatchEntry>,
}

impl BatchEvaluation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, name: impl Into<String>, result: ReferenceEvaluationResult) {
        self.push(name, BatchOutcome::Evaluated {
            result: Box::new(result),
        });
    }

    pub fn record_cancelled(&mut self, name: impl Into<String>) {
        self.push(name, BatchOutcome::Cancelled);
    }

    pub fn record_failed(&mut self, name: impl Into<String>, reason: impl Into<String>) {
        self.push(name, BatchOutcome::Failed {
            reason: reason.into(),
        });
    }

    fn push(&mut self, name: impl Into<String>, outcome: BatchOutcome) {
        self.entries.push(BatchEntry {
            name: name.into(),
            outcome,
        });
    }

    pub fn entries(&self) -> &[BatchEntry] {
        &self.entries
    }

    fn evaluated(&self) -> impl Iterator<Item = &ReferenceEvaluationResult> {
        self.entries.iter().filter_map(|e| match &e.outcome {
            BatchOutcome::Evaluated { result } => Some(result.as_ref()),
            _ => None,
        })
    }

    /// Mean precision, recall and F-measure; `None` if nothing was evaluated.
    pub fn mean(&self) -> Option<MeanScores> {
        let (mut p, mut r, mut f, mut n) = (0.0, 0.0, 0.0, 0usize);
        for result in self.evaluated() {
            p += result.precision;
            r += result.recall;
            f += result.fmeasure;
            n += 1;
        }
        (n > 0).then(|| MeanScores {
            pairs: n,
            precision: p / n as f64,
            recall: r / n as f64,
            fmeasure: f / n as f64,
        })
    }

    /// Per-pair lines followed by the averaged metrics.
    pub fn report(&self) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            let line = match &entry.outcome {
                BatchOutcome::Evaluated { result } => format!(
                    "{}: P={:.3} R={:.3} F={:.3}",
                    entry.name, result.precision, result.recall, result.fmeasure
                ),
                BatchOutcome::Cancelled => format!("{}: cancelled", entry.name),
                BatchOutcome::Failed { reason } => format!("{}: failed ({reason})", entry.name),
            };
            out.push_str(&line);
            out.push('\n');
        }
        match self.mean() {
            Some(mean) => {
                out.push_str(&format!(
                    "\nEvaluation results ({} of {} pairs):\n",
                    mean.pairs,
                    self.entries.len()
                ));
                out.push_str(&metrics_lines(mean.precision, mean.recall, mean.fmeasure));
            }
            None => out.push_str("\nNo pair was evaluated; no metrics to report.\n"),
        }
        out
    }
}
