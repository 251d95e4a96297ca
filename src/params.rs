//! Match parameters and their boundary validation.

use serde::{Deserialize, Serialize};

use crate::error::{ParamError, ParamResult};

/// Per-node cap on the number of mappings a concept may take part in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cardinality {
    /// At most `n` mappings per concept.
    Bounded(usize),
    /// No cap (ANY-to-ANY).
    Any,
}

impl Cardinality {
    /// Whether a concept that already has `accepted` mappings may take one more.
    pub fn admits(self, accepted: usize) -> bool {
        match self {
            Cardinality::Bounded(cap) => accepted < cap,
            Cardinality::Any => true,
        }
    }

    pub fn is_any(self) -> bool {
        matches!(self, Cardinality::Any)
    }

    /// Parse the configuration spelling: a non-negative integer or `any`.
    pub fn parse_for(side: &str, raw: &str) -> ParamResult<Self> {
        let trimmed = raw.trim();
        if trimmed.eq_ignore_ascii_case("any") || trimmed == "*" {
            return Ok(Cardinality::Any);
        }
        let value: i64 = trimmed.parse().map_err(|_| ParamError::InvalidCardinality {
            side: side.to_string(),
            value: raw.to_string(),
        })?;
        Self::from_signed(side, value)
    }

    /// Convert a signed count, rejecting negatives.
    pub fn from_signed(side: &str, value: i64) -> ParamResult<Self> {
        usize::try_from(value)
            .map(Cardinality::Bounded)
            .map_err(|_| ParamError::InvalidCardinality {
                side: side.to_string(),
                value: value.to_string(),
            })
    }
}

impl Default for Cardinality {
    fn default() -> Self {
        Cardinality::Bounded(1)
    }
}

impl std::fmt::Display for Cardinality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Cardinality::Bounded(n) => write!(f, "{n}"),
            Cardinality::Any => write!(f, "any"),
        }
    }
}

/// Wire form of a cardinality: integer or the string `"any"`.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawCardinality {
    Count(i64),
    Keyword(String),
}

impl Serialize for Cardinality {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Cardinality::Bounded(n) => RawCardinality::Count(*n as i64),
            Cardinality::Any => RawCardinality::Keyword("any".into()),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Cardinality {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawCardinality::deserialize(deserializer)?;
        let parsed = match raw {
            RawCardinality::Count(n) => Cardinality::from_signed("cardinality", n),
            RawCardinality::Keyword(s) => Cardinality::parse_for("cardinality", &s),
        };
        parsed.map_err(serde::de::Error::custom)
    }
}

/// Configuration of one match run, constructed by the caller (CLI flags,
/// config file, or API request) and validated before any scoring begins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchParameters {
    /// Minimum accepted score (inclusive).
    pub threshold: f64,
    pub max_source_align: Cardinality,
    pub max_target_align: Cardinality,
    /// Only extract equivalence mappings.
    pub only_equivalence: bool,
    pub skip_classes: bool,
    pub skip_properties: bool,
    /// Lift the cardinality caps for subclass/superclass candidates.
    pub hierarchical_any: bool,
}

impl Default for MatchParameters {
    fn default() -> Self {
        Self {
            threshold: 0.6,
            max_source_align: Cardinality::Bounded(1),
            max_target_align: Cardinality::Bounded(1),
            only_equivalence: true,
            skip_classes: false,
            skip_properties: false,
            hierarchical_any: false,
        }
    }
}

impl MatchParameters {
    /// Parameters for one-to-one matching at the given threshold.
    pub fn one_to_one(threshold: f64) -> Self {
        Self {
            threshold,
            ..Default::default()
        }
    }

    /// Parameters for loading a reference alignment: every relation, every
    /// partition, ANY-to-ANY caps.
    pub fn reference() -> Self {
        Self {
            threshold: 0.0,
            max_source_align: Cardinality::Any,
            max_target_align: Cardinality::Any,
            only_equivalence: false,
            skip_classes: false,
            skip_properties: false,
            hierarchical_any: true,
        }
    }

    /// Reject out-of-range values. Called at the boundary, before scoring.
    pub fn validate(&self) -> ParamResult<()> {
        if !self.threshold.is_finite() || !(0.0..=1.0).contains(&self.threshold) {
            return Err(ParamError::ThresholdOutOfRange {
                value: self.threshold,
            });
        }
        if self.skip_classes && self.skip_properties {
            return Err(ParamError::EmptyScope);
        }
        Ok(())
    }

    /// Whether hierarchical candidates bypass the caps.
    pub fn hierarchical_unbounded(&self) -> bool {
        !self.only_equivalence && self.hierarchical_any
    }
}
