//! Repository "value" scoring: three policy-weighted metrics (update
//! recency, pull count, tag count) summed into one score. Low scores are
//! deletion candidates.

#![allow(missing_docs)]
#![allow(clippy::cast_possible_truncation)]

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::core::errors::Result;
use crate::registry::models::RepoTop;
use crate::retention::policy::{FactorSpec, PolicyConfig};
use crate::retention::{days_between, parse_timestamp};

/// Weight used when the repository age matches no `update_time` bucket.
///
/// Note the asymmetry with [`UNMATCHED_COUNT_WEIGHT`]: an out-of-range age
/// zeroes the recency term while out-of-range counts stay neutral. Existing
/// policies are tuned against this, so it is kept as-is even though it looks
/// like a latent defect in the scoring rules.
pub const UNMATCHED_UPDATE_WEIGHT: f64 = 0.0;

/// Weight used when pull count or tag count matches no bucket.
pub const UNMATCHED_COUNT_WEIGHT: f64 = 1.0;

/// Repository as read from the registry, with its update time parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoSnapshot {
    pub id: i64,
    pub name: String,
    pub project_id: i64,
    pub pull_count: i64,
    pub tags_count: i64,
    pub update_time: DateTime<Utc>,
}

impl RepoSnapshot {
    /// Fails with a timestamp error when `update_time` is not RFC 3339.
    pub fn from_wire(repo: &RepoTop) -> Result<Self> {
        let subject = format!("repository {} (id {}) update_time", repo.name, repo.id);
        Ok(Self {
            id: repo.id,
            name: repo.name.clone(),
            project_id: repo.project_id,
            pull_count: repo.pull_count,
            tags_count: repo.tags_count,
            update_time: parse_timestamp(&subject, &repo.update_time)?,
        })
    }
}

/// How one metric contributed to the score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FactorOutcome {
    pub base: f64,
    /// Integer value matched against the buckets.
    pub value: i64,
    pub weight: f64,
    /// True when no bucket matched and the default weight applied.
    pub defaulted: bool,
}

impl FactorOutcome {
    fn evaluate(spec: &FactorSpec, value: i64, unmatched_weight: f64) -> Self {
        let matched = spec.match_weight(value);
        Self {
            base: spec.base,
            value,
            weight: matched.unwrap_or(unmatched_weight),
            defaulted: matched.is_none(),
        }
    }

    #[must_use]
    pub fn contribution(&self) -> f64 {
        self.base * self.weight
    }
}

/// Audit record of one scoring decision. Observational only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub repo_id: i64,
    /// Fractional days since the last update.
    pub age_days: f64,
    pub update: FactorOutcome,
    pub pull: FactorOutcome,
    pub tags: FactorOutcome,
    pub score: f64,
}

impl fmt::Display for ScoreBreakdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "score = update {:.2} * {:.2} + pull {:.2} * {:.2} + tags {:.2} * {:.2} = {:.2}   repo_id: {} (age {:.2}d)",
            self.update.base,
            self.update.weight,
            self.pull.base,
            self.pull.weight,
            self.tags.base,
            self.tags.weight,
            self.score,
            self.repo_id,
            self.age_days,
        )?;
        for (label, outcome) in [
            ("update_time", &self.update),
            ("pull_count", &self.pull),
            ("tags_count", &self.tags),
        ] {
            if outcome.defaulted {
                write!(
                    f,
                    "\n  out of range: {label} = {}, weight defaults to {:.1}",
                    outcome.value, outcome.weight
                )?;
            }
        }
        Ok(())
    }
}

/// A scored repository. The score is computed once per run and never changes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RepoCandidate {
    pub id: i64,
    pub name: String,
    pub project_id: i64,
    pub pull_count: i64,
    pub tags_count: i64,
    pub update_time: DateTime<Utc>,
    pub score: f64,
    #[serde(skip)]
    pub breakdown: ScoreBreakdown,
}

/// Deterministic scoring against a fixed policy and a fixed run clock.
#[derive(Debug, Clone)]
pub struct ScoringEngine {
    policy: PolicyConfig,
    now: DateTime<Utc>,
}

impl ScoringEngine {
    #[must_use]
    pub fn new(policy: PolicyConfig, now: DateTime<Utc>) -> Self {
        Self { policy, now }
    }

    #[must_use]
    pub fn policy(&self) -> &PolicyConfig {
        &self.policy
    }

    /// Score one repository: `base_u*w_u + base_p*w_p + base_t*w_t`.
    #[must_use]
    pub fn score(&self, repo: &RepoSnapshot) -> ScoreBreakdown {
        let age_days = days_between(self.now, repo.update_time);
        // Buckets match on whole days, truncated toward zero.
        let update = FactorOutcome::evaluate(
            &self.policy.update_time,
            age_days.trunc() as i64,
            UNMATCHED_UPDATE_WEIGHT,
        );
        let pull = FactorOutcome::evaluate(
            &self.policy.pull_count,
            repo.pull_count,
            UNMATCHED_COUNT_WEIGHT,
        );
        let tags = FactorOutcome::evaluate(
            &self.policy.tags_count,
            repo.tags_count,
            UNMATCHED_COUNT_WEIGHT,
        );

        ScoreBreakdown {
            repo_id: repo.id,
            age_days,
            score: update.contribution() + pull.contribution() + tags.contribution(),
            update,
            pull,
            tags,
        }
    }

    #[must_use]
    pub fn score_candidate(&self, repo: RepoSnapshot) -> RepoCandidate {
        let breakdown = self.score(&repo);
        RepoCandidate {
            id: repo.id,
            name: repo.name,
            project_id: repo.project_id,
            pull_count: repo.pull_count,
            tags_count: repo.tags_count,
            update_time: repo.update_time,
            score: breakdown.score,
            breakdown,
        }
    }
}
