//! Rich diagnostic error types for the ontomatch engine.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes, help text, and source chains so users know exactly what
//! went wrong and how to fix it.
//!
//! Not every failure is an error: a measure that cannot score a pair degrades to
//! "no score", and reference mappings naming unknown concepts are excluded from
//! evaluation with a warning. Only the conditions below abort an operation.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for the ontomatch engine.
///
/// Each variant wraps a subsystem-specific error, preserving the full diagnostic
/// chain (error codes, help text, source spans) through to the user.
#[derive(Debug, Error, Diagnostic)]
pub enum AlignError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Params(#[from] ParamError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Measure(#[from] MeasureError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Matrix(#[from] MatrixError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Task(#[from] TaskError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Load(#[from] LoadError),
}

// ---------------------------------------------------------------------------
// Parameter errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ParamError {
    #[error("threshold {value} is outside [0, 1]")]
    #[diagnostic(
        code(ontomatch::params::threshold),
        help("The similarity threshold must be a finite number between 0.0 and 1.0 inclusive.")
    )]
    ThresholdOutOfRange { value: f64 },

    #[error("invalid cardinality for {side}: {value}")]
    #[diagnostic(
        code(ontomatch::params::cardinality),
        help(
            "A per-node cap must be a non-negative integer, or \"any\" for unbounded \
             (ANY-to-ANY) matching."
        )
    )]
    InvalidCardinality { side: String, value: String },

    #[error("nothing to match: both classes and properties are skipped")]
    #[diagnostic(
        code(ontomatch::params::empty_scope),
        help("Enable at least one partition (drop --skip-classes or --skip-properties).")
    )]
    EmptyScope,
}

/// Convenience alias for parameter validation results.
pub type ParamResult<T> = std::result::Result<T, ParamError>;

// ---------------------------------------------------------------------------
// Measure errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum MeasureError {
    #[error("unknown similarity measure: \"{name}\"")]
    #[diagnostic(
        code(ontomatch::measure::unknown),
        help("List the available measures with `ontomatch measures`.")
    )]
    UnknownMeasure { name: String },

    #[error("invalid blend weights: {primary} + {secondary}")]
    #[diagnostic(
        code(ontomatch::measure::weights),
        help("Blend weights must be non-negative and sum to 1.0.")
    )]
    InvalidWeights { primary: f64, secondary: f64 },

    #[error("measure \"{name}\" requires {resource}")]
    #[diagnostic(
        code(ontomatch::measure::missing_resource),
        help(
            "This measure consults an auxiliary resource. Point the configuration \
             at the file with the corresponding option."
        )
    )]
    MissingResource { name: String, resource: String },

    #[error("invalid vector distance cutoff: {value}")]
    #[diagnostic(
        code(ontomatch::measure::cutoff),
        help("The Euclidean distance cutoff must be a finite, non-negative number.")
    )]
    InvalidCutoff { value: f64 },

    #[error("lexical index unavailable: {message}")]
    #[diagnostic(
        code(ontomatch::measure::index),
        help(
            "The synonym index failed to initialize. Matching continues without \
             synonym overrides; check the synonym file if this is unexpected."
        )
    )]
    IndexUnavailable { message: String },
}

/// Convenience alias for measure construction results.
pub type MeasureResult<T> = std::result::Result<T, MeasureError>;

// ---------------------------------------------------------------------------
// Matrix errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum MatrixError {
    #[error("cell ({row}, {col}) out of bounds for {rows}x{cols} matrix")]
    #[diagnostic(
        code(ontomatch::matrix::out_of_bounds),
        help("Row and column indices follow the source and target concept lists.")
    )]
    OutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error(
        "{kind} matrix is {rows}x{cols} but the concept lists have {sources} sources and {targets} targets"
    )]
    #[diagnostic(
        code(ontomatch::matrix::dimension_mismatch),
        help("Extract with the same concept lists the matrix was scored from.")
    )]
    DimensionMismatch {
        kind: String,
        rows: usize,
        cols: usize,
        sources: usize,
        targets: usize,
    },

    #[error("score {value} is outside [0, 1]")]
    #[diagnostic(
        code(ontomatch::matrix::score_range),
        help("Matrix cells hold similarity scores in [0, 1]; leave a cell unset instead.")
    )]
    ScoreOutOfRange { value: f64 },
}

// ---------------------------------------------------------------------------
// Task errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum TaskError {
    #[error("match run cancelled")]
    #[diagnostic(
        code(ontomatch::task::cancelled),
        help("The run was cancelled before completion; no alignment was produced.")
    )]
    Cancelled,

    #[error("match worker failed: {message}")]
    #[diagnostic(
        code(ontomatch::task::worker),
        help("The background matching thread terminated abnormally.")
    )]
    WorkerPanicked { message: String },
}

// ---------------------------------------------------------------------------
// Load errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum LoadError {
    #[error("failed to read {path}")]
    #[diagnostic(
        code(ontomatch::load::read),
        help("Check that the file exists and is readable.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}")]
    #[diagnostic(
        code(ontomatch::load::write),
        help("Check that the parent directory exists and is writable.")
    )]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {message}")]
    #[diagnostic(
        code(ontomatch::load::parse),
        help("The file does not match the expected JSON or TOML layout. {message}")
    )]
    Parse { path: String, message: String },
}

/// Convenience alias for functions returning ontomatch results.
pub type AlignResult<T> = std::result::Result<T, AlignError>;
