//! ontomatch CLI: match ontologies and evaluate alignments.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};

use ontomatch::config::{BatchManifest, MatchConfig};
use ontomatch::evaluate::ReferenceEvaluator;
use ontomatch::export::{AlignmentFile, load_alignment, load_ontology, save_alignment};
use ontomatch::params::Cardinality;
use ontomatch::similarity::MeasureKind;
use ontomatch::task::{CancellationToken, MatchHandle, MatchOutcome, MatchRun, run_batch};

#[derive(Parser)]
#[command(name = "ontomatch", version, about = "Ontology matching and alignment evaluation")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Match two ontologies and print the extracted alignment.
    Match {
        /// Source ontology (JSON).
        #[arg(long)]
        source: PathBuf,

        /// Target ontology (JSON).
        #[arg(long)]
        target: PathBuf,

        /// Match configuration (TOML). Flags below override it.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Similarity measure (see `ontomatch measures`).
        #[arg(long)]
        measure: Option<MeasureKind>,

        /// Minimum score for a mapping, in [0, 1].
        #[arg(long)]
        threshold: Option<f64>,

        /// Max mappings per source concept, or "any".
        #[arg(long)]
        max_source: Option<String>,

        /// Max mappings per target concept, or "any".
        #[arg(long)]
        max_target: Option<String>,

        /// Keep non-equivalence mappings too.
        #[arg(long)]
        all_relations: bool,

        #[arg(long)]
        skip_classes: bool,

        #[arg(long)]
        skip_properties: bool,

        /// Synonym sets (JSON array of arrays).
        #[arg(long)]
        synonyms: Option<PathBuf>,

        /// Label embeddings (JSON object of vectors).
        #[arg(long)]
        embeddings: Option<PathBuf>,

        /// Distance cutoff for the vector measure.
        #[arg(long)]
        cutoff: Option<f64>,

        /// Reference alignment to evaluate against.
        #[arg(long)]
        reference: Option<PathBuf>,

        /// Ignore relations when evaluating.
        #[arg(long)]
        relation_insensitive: bool,

        /// Write the alignment here (JSON).
        #[arg(long)]
        output: Option<PathBuf>,

        /// Print the alignment as JSON instead of a summary.
        #[arg(long)]
        json: bool,
    },

    /// Evaluate a discovered alignment against a reference.
    Evaluate {
        /// Discovered alignment (JSON).
        #[arg(long)]
        discovered: PathBuf,

        /// Reference alignment (JSON).
        #[arg(long)]
        reference: PathBuf,

        /// Source ontology; reference mappings unknown to it are excluded.
        #[arg(long, requires = "target")]
        source: Option<PathBuf>,

        /// Target ontology.
        #[arg(long, requires = "source")]
        target: Option<PathBuf>,

        #[arg(long)]
        relation_insensitive: bool,

        /// Print the result as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Match and evaluate every pair of a manifest, then average.
    Batch {
        /// Batch manifest (TOML).
        manifest: PathBuf,

        /// Print per-pair results as JSON.
        #[arg(long)]
        json: bool,
    },

    /// List the available similarity measures.
    Measures,
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Match {
            source,
            target,
            config,
            measure,
            threshold,
            max_source,
            max_target,
            all_relations,
            skip_classes,
            skip_properties,
            synonyms,
            embeddings,
            cutoff,
            reference,
            relation_insensitive,
            output,
            json,
        } => {
            let mut config = match config {
                Some(path) => MatchConfig::load(&path)?,
                None => MatchConfig::default(),
            };
            if let Some(measure) = measure {
                config.measure = measure;
            }
            if let Some(threshold) = threshold {
                config.params.threshold = threshold;
            }
            if let Some(raw) = max_source {
                config.params.max_source_align = Cardinality::parse_for("max-source", &raw)?;
            }
            if let Some(raw) = max_target {
                config.params.max_target_align = Cardinality::parse_for("max-target", &raw)?;
            }
            config.params.only_equivalence &= !all_relations;
            config.params.skip_classes |= skip_classes;
            config.params.skip_properties |= skip_properties;
            config.relation_sensitive &= !relation_insensitive;
            if synonyms.is_some() {
                config.resources.synonyms = synonyms;
            }
            if embeddings.is_some() {
                config.resources.embeddings = embeddings;
            }
            if cutoff.is_some() {
                config.resources.vector_cutoff = cutoff;
            }

            let scoring = config.build()?;
            let source = load_ontology(&source)?;
            let target = load_ontology(&target)?;

            let mut run = MatchRun::new(Arc::new(source), Arc::new(target), scoring, config.params)
                .with_prune_below(config.prune_below)
                .relation_sensitive(config.relation_sensitive);
            if let Some(path) = reference {
                run = run.with_reference(load_alignment(&path)?);
            }

            let report = match wait_for(run.spawn())? {
                MatchOutcome::Completed(report) => report,
                MatchOutcome::Cancelled => {
                    eprintln!("Match cancelled; no alignment produced.");
                    std::process::exit(130);
                }
                MatchOutcome::Failed(e) => return Err(e.into()),
            };

            if let Some(path) = output {
                save_alignment(&path, &report.alignment)?;
                eprintln!("Wrote {} mappings to {}", report.alignment.len(), path.display());
            }
            if json {
                let file = AlignmentFile::from_alignment(&report.alignment);
                println!("{}", serde_json::to_string_pretty(&file).into_diagnostic()?);
            } else {
                print!("{}", report.summary());
                for m in report.alignment.iter() {
                    println!("  {} {} {} ({:.3})", m.source, m.relation.symbol(), m.target, m.score);
                }
            }
        }

        Commands::Evaluate {
            discovered,
            reference,
            source,
            target,
            relation_insensitive,
            json,
        } => {
            let discovered = load_alignment(&discovered)?;
            let reference = load_alignment(&reference)?;
            let ontologies = match (source, target) {
                (Some(s), Some(t)) => Some((load_ontology(&s)?, load_ontology(&t)?)),
                _ => None,
            };

            let mut evaluator = ReferenceEvaluator::new();
            if relation_insensitive {
                evaluator = evaluator.relation_insensitive();
            }
            if let Some((s, t)) = &ontologies {
                evaluator = evaluator.with_ontologies(s, t);
            }
            let result = evaluator.compare(&discovered, &reference);

            if json {
                println!("{}", serde_json::to_string_pretty(&result).into_diagnostic()?);
            } else {
                print!("{}", result.report());
            }
        }

        Commands::Batch { manifest, json } => {
            let manifest = BatchManifest::load(&manifest)?;
            let config = manifest.match_config()?;
            let token = CancellationToken::new();
            let worker = {
                let token = token.clone();
                std::thread::spawn(move || run_batch(&manifest, &config, &token))
            };

            let interrupted = interrupt_flag()?;
            while !worker.is_finished() {
                if interrupted.swap(false, Ordering::SeqCst) {
                    eprintln!("Interrupt received, cancelling remaining pairs...");
                    token.cancel();
                }
                std::thread::sleep(POLL_INTERVAL);
            }
            let batch = worker
                .join()
                .map_err(|_| miette::miette!("batch worker panicked"))??;

            if json {
                println!("{}", serde_json::to_string_pretty(&batch).into_diagnostic()?);
            } else {
                print!("{}", batch.report());
            }
        }

        Commands::Measures => {
            println!("Similarity measures:");
            for kind in MeasureKind::ALL {
                let resource = kind
                    .resource()
                    .map(|r| format!(" [requires {r}]"))
                    .unwrap_or_default();
                println!("  {:<18} {}{}", kind.name(), kind.description(), resource);
            }
        }
    }

    Ok(())
}

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Flag raised on SIGINT instead of terminating the process.
fn interrupt_flag() -> Result<Arc<AtomicBool>> {
    let flag = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(signal_hook::consts::SIGINT, Arc::clone(&flag)).into_diagnostic()?;
    Ok(flag)
}

/// Wait for a background run, cancelling it on Ctrl-C.
fn wait_for(handle: MatchHandle) -> Result<MatchOutcome> {
    let interrupted = interrupt_flag()?;
    while !handle.is_finished() {
        if interrupted.swap(false, Ordering::SeqCst) {
            eprintln!("Interrupt received, cancelling...");
            handle.cancel();
        }
        std::thread::sleep(POLL_INTERVAL);
    }
    Ok(handle.join())
}
