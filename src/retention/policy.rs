//! Weighted-factor retention policy: three metrics, each a base value and an
//! ordered list of half-open weight buckets.
//!
//! Buckets may overlap, leave gaps, or be empty (`low >= high`); an empty
//! bucket is accepted and simply never matches.
//!
//! ```yaml
//! update_time:
//!   base: 10
//!   factors:
//!     - weight: 1.0
//!       range: { low: 0, high: 30 }
//! pull_count:
//!   base: 5
//!   factors: []
//! tags_count:
//!   base: 2
//!   factors: []
//! ```

#![allow(missing_docs)]

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::errors::{Result, RrpError};

/// The full policy. Sections missing from the file score with base 0 and no buckets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    pub update_time: FactorSpec,
    pub pull_count: FactorSpec,
    pub tags_count: FactorSpec,
}

/// One metric's contribution: `base * weight(first matching bucket)`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FactorSpec {
    pub base: f64,
    /// Buckets in policy-author order; the first match wins.
    #[serde(rename = "factors")]
    pub buckets: Vec<FactorBucket>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FactorBucket {
    pub weight: f64,
    pub range: BucketRange,
}

/// Half-open integer interval `[low, high)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketRange {
    pub low: i64,
    pub high: i64,
}

impl BucketRange {
    #[must_use]
    pub const fn contains(&self, value: i64) -> bool {
        self.low <= value && value < self.high
    }
}

impl FactorSpec {
    /// Weight of the first bucket containing `value`, or `None` when nothing matches.
    #[must_use]
    pub fn match_weight(&self, value: i64) -> Option<f64> {
        self.buckets
            .iter()
            .find(|bucket| bucket.range.contains(value))
            .map(|bucket| bucket.weight)
    }

    fn validate(&self, section: &str) -> Result<()> {
        if !self.base.is_finite() {
            return Err(RrpError::InvalidPolicy {
                details: format!("{section}.base must be finite, got {}", self.base),
            });
        }
        for (idx, bucket) in self.buckets.iter().enumerate() {
            if !bucket.weight.is_finite() {
                return Err(RrpError::InvalidPolicy {
                    details: format!(
                        "{section}.factors[{idx}].weight must be finite, got {}",
                        bucket.weight
                    ),
                });
            }
        }
        Ok(())
    }
}

impl PolicyConfig {
    /// Load a policy file. `.json` files are parsed as JSON, anything else as YAML.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|source| RrpError::io(path, source))?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let policy = if is_json {
            Self::from_json_str(&raw)?
        } else {
            Self::from_yaml_str(&raw)?
        };
        Ok(policy)
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self> {
        let policy: Self = serde_yaml::from_str(raw)?;
        policy.validate()?;
        Ok(policy)
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        let policy: Self = serde_json::from_str(raw).map_err(|error| RrpError::ConfigParse {
            context: "json",
            details: error.to_string(),
        })?;
        policy.validate()?;
        Ok(policy)
    }

    pub fn validate(&self) -> Result<()> {
        self.update_time.validate("update_time")?;
        self.pull_count.validate("pull_count")?;
        self.tags_count.validate("tags_count")?;
        Ok(())
    }
}
