//! Match runs: the score → matrix → extract → evaluate pipeline as a
//! cancellable task.
//!
//! A [`MatchRun`] is a sequential pipeline. Cancellation is cooperative: the
//! [`CancellationToken`] is checked before every scoring row and between
//! stages, and a cancelled run yields [`MatchOutcome::Cancelled`] with no
//! partial alignment. [`MatchRun::spawn`] executes the pipeline on a
//! background thread so a caller's UI stays responsive.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;

use serde::Serialize;

use crate::concept::{ConceptKind, Ontology};
use crate::config::{BatchManifest, MatchConfig, PairEntry};
use crate::error::{AlignError, AlignResult, LoadError, TaskError};
use crate::evaluate::batch::BatchEvaluation;
use crate::evaluate::{ReferenceEvaluationResult, ReferenceEvaluator};
use crate::export::{load_alignment, load_ontology};
use crate::extract::{AlignmentExtractor, ScoredPartition};
use crate::mapping::Alignment;
use crate::matrix::{MatrixStats, SimilarityMatrix};
use crate::params::MatchParameters;
use crate::scorer::NodePairScorer;
use crate::similarity::Scoring;

/// Shared flag requesting that a run stop.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// `Err(TaskError::Cancelled)` once cancellation was requested.
    pub fn check(&self) -> Result<(), TaskError> {
        if self.is_cancelled() {
            Err(TaskError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Products of a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct MatchReport {
    /// Name of the measure that scored the pairs.
    pub measure: String,
    #[serde(skip)]
    pub alignment: Alignment,
    pub matrices: Vec<MatrixStats>,
    pub evaluation: Option<ReferenceEvaluationResult>,
}

impl MatchReport {
    /// Summary text; includes the evaluation report when one was requested.
    pub fn summary(&self) -> String {
        let mut out = format!(
            "Matched {} -> {} with {}: {} mappings\n",
            self.alignment.source_ontology(),
            self.alignment.target_ontology(),
            self.measure,
            self.alignment.len()
        );
        for stats in &self.matrices {
            out.push_str(&format!(
                "  {}: {}x{} scored={} unset={} above-threshold={}\n",
                stats.kind, stats.rows, stats.cols, stats.scored, stats.unset, stats.above_threshold
            ));
        }
        if let Some(evaluation) = &self.evaluation {
            out.push('\n');
            out.push_str(&evaluation.report());
        }
        out
    }
}

/// How a run ended.
#[derive(Debug)]
pub enum MatchOutcome {
    Completed(Box<MatchReport>),
    Cancelled,
    Failed(AlignError),
}

impl MatchOutcome {
    fn from_result(result: AlignResult<MatchReport>) -> Self {
        match result {
            Ok(report) => MatchOutcome::Completed(Box::new(report)),
            Err(AlignError::Task(TaskError::Cancelled)) => MatchOutcome::Cancelled,
            Err(e) => MatchOutcome::Failed(e),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, MatchOutcome::Cancelled)
    }

    /// The alignment of a completed run.
    pub fn alignment(&self) -> Option<&Alignment> {
        match self {
            MatchOutcome::Completed(report) => Some(&report.alignment),
            _ => None,
        }
    }

    pub fn into_result(self) -> AlignResult<MatchReport> {
        match self {
            MatchOutcome::Completed(report) => Ok(*report),
            MatchOutcome::Cancelled => Err(TaskError::Cancelled.into()),
            MatchOutcome::Failed(e) => Err(e),
        }
    }
}

/// One configured match run over a pair of ontologies.
#[derive(Debug, Clone)]
pub struct MatchRun {
    source: Arc<Ontology>,
    target: Arc<Ontology>,
    scoring: Scoring,
    params: MatchParameters,
    prune_below: f64,
    reference: Option<Alignment>,
    relation_sensitive: bool,
}

impl MatchRun {
    pub fn new(
        source: Arc<Ontology>,
        target: Arc<Ontology>,
        scoring: Scoring,
        params: MatchParameters,
    ) -> Self {
        Self {
            source,
            target,
            scoring,
            params,
            prune_below: 0.0,
            reference: None,
            relation_sensitive: true,
        }
    }

    /// Evaluate the extracted alignment against this reference.
    pub fn with_reference(mut self, reference: Alignment) -> Self {
        self.reference = Some(reference);
        self
    }

    /// Ignore relations when comparing with the reference.
    pub fn relation_sensitive(mut self, sensitive: bool) -> Self {
        self.relation_sensitive = sensitive;
        self
    }

    /// Cheap pre-filter: pairs scoring below `floor` are never stored.
    pub fn with_prune_below(mut self, floor: f64) -> Self {
        self.prune_below = floor;
        self
    }

    pub fn params(&self) -> &MatchParameters {
        &self.params
    }

    /// Run the pipeline on the current thread.
    pub fn run(&self, cancel: &CancellationToken) -> MatchOutcome {
        let outcome = MatchOutcome::from_result(self.execute(cancel));
        match &outcome {
            MatchOutcome::Completed(report) => tracing::info!(
                mappings = report.alignment.len(),
                "match run complete"
            ),
            MatchOutcome::Cancelled => tracing::info!("match run cancelled"),
            MatchOutcome::Failed(e) => tracing::warn!(error = %e, "match run failed"),
        }
        outcome
    }

    /// Run the pipeline on a background thread.
    pub fn spawn(self) -> MatchHandle {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let thread = std::thread::spawn(move || self.run(&token));
        MatchHandle { cancel, thread }
    }

    fn execute(&self, cancel: &CancellationToken) -> AlignResult<MatchReport> {
        self.params.validate()?;

        let span = tracing::info_span!(
            "match_run",
            source = %self.source.id(),
            target = %self.target.id(),
            measure = self.scoring.name()
        );
        let _guard = span.enter();
        tracing::info!(
            threshold = self.params.threshold,
            max_source = %self.params.max_source_align,
            max_target = %self.params.max_target_align,
            "match run started"
        );

        let scorer = NodePairScorer::new(self.scoring.clone(), cancel.clone())
            .with_prune_below(self.prune_below);

        let mut kinds = Vec::with_capacity(2);
        if !self.params.skip_classes {
            kinds.push(ConceptKind::Class);
        }
        if !self.params.skip_properties {
            kinds.push(ConceptKind::Property);
        }

        let mut matrices: Vec<SimilarityMatrix> = Vec::with_capacity(kinds.len());
        for kind in kinds {
            cancel.check()?;
            let matrix = scorer.score_partition(
                kind,
                self.source.partition(kind),
                self.target.partition(kind),
            )?;
            matrices.push(matrix);
        }
        cancel.check()?;

        let partitions: Vec<ScoredPartition<'_>> = matrices
            .iter()
            .map(|m| {
                ScoredPartition::new(
                    m,
                    self.source.partition(m.kind()),
                    self.target.partition(m.kind()),
                )
            })
            .collect();
        let alignment = AlignmentExtractor::new(&self.params).extract(
            self.source.id(),
            self.target.id(),
            &partitions,
        )?;
        cancel.check()?;

        let evaluation = self.reference.as_ref().map(|reference| {
            let evaluator = ReferenceEvaluator::new().with_ontologies(&self.source, &self.target);
            let evaluator = if self.relation_sensitive {
                evaluator
            } else {
                evaluator.relation_insensitive()
            };
            evaluator.compare(&alignment, reference)
        });

        Ok(MatchReport {
            measure: self.scoring.name().to_string(),
            matrices: matrices
                .iter()
                .map(|m| m.stats(self.params.threshold))
                .collect(),
            alignment,
            evaluation,
        })
    }
}

/// A run executing on a background thread.
#[derive(Debug)]
pub struct MatchHandle {
    cancel: CancellationToken,
    thread: JoinHandle<MatchOutcome>,
}

impl MatchHandle {
    /// Request cancellation; the run stops at its next check.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Wait for the run to end.
    pub fn join(self) -> MatchOutcome {
        match self.thread.join() {
            Ok(outcome) => outcome,
            Err(panic) => {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".into());
                MatchOutcome::Failed(TaskError::WorkerPanicked { message }.into())
            }
        }
    }
}

fn load_pair(pair: &PairEntry) -> Result<(Ontology, Ontology, Alignment), LoadError> {
    Ok((
        load_ontology(&pair.source)?,
        load_ontology(&pair.target)?,
        load_alignment(&pair.reference)?,
    ))
}

/// Match and evaluate every pair of a manifest in order.
///
/// A pair that fails to load or run is recorded as failed and the batch goes
/// on. Once `cancel` fires, the running pair and every later one are recorded
/// as cancelled. Only an invalid configuration aborts the whole batch.
pub fn run_batch(
    manifest: &BatchManifest,
    config: &MatchConfig,
    cancel: &CancellationToken,
) -> AlignResult<BatchEvaluation> {
    let scoring = config.build()?;
    let mut batch = BatchEvaluation::new();

    for pair in &manifest.pairs {
        if cancel.is_cancelled() {
            batch.record_cancelled(&pair.name);
            continue;
        }
        let (source, target, reference) = match load_pair(pair) {
            Ok(loaded) => loaded,
            Err(e) => {
                tracing::warn!(pair = %pair.name, error = %e, "skipping pair");
                batch.record_failed(&pair.name, e.to_string());
                continue;
            }
        };

        let run = MatchRun::new(
            Arc::new(source),
            Arc::new(target),
            scoring.clone(),
            config.params.clone(),
        )
        .with_prune_below(config.prune_below)
        .relation_sensitive(config.relation_sensitive)
        .with_reference(reference);

        match run.run(cancel) {
            MatchOutcome::Completed(report) => match report.evaluation {
                Some(result) => batch.record(&pair.name, result),
                None => batch.record_failed(&pair.name, "no evaluation produced"),
            },
            MatchOutcome::Cancelled => batch.record_cancelled(&pair.name),
            MatchOutcome::Failed(e) => batch.record_failed(&pair.name, e.to_string()),
        }
    }
    Ok(batch)
}
