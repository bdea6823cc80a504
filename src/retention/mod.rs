//! Retention decision engine: policy scoring, ranking, bounded repository
//! eviction, and age/count tag eviction.

pub mod eviction;
pub mod policy;
pub mod ranking;
pub mod runner;
pub mod scoring;
pub mod tags;

use chrono::{DateTime, Utc};

use crate::core::errors::{Result, RrpError};
use crate::logger::jsonl::JsonlWriter;
use crate::registry::RegistryStore;

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Everything one analysis run needs, passed explicitly instead of held in globals.
///
/// `now` is captured once at run start so every score and tag age in the run
/// is measured against the same instant.
pub struct RunContext<'a> {
    /// Registry the run reads from and deletes in.
    pub store: &'a dyn RegistryStore,
    /// Reference instant for every age computed in the run.
    pub now: DateTime<Utc>,
    /// Activity log receiving scoring and deletion events.
    pub log: &'a mut JsonlWriter,
}

impl<'a> RunContext<'a> {
    /// Context against `store`, with the clock read now.
    pub fn new(store: &'a dyn RegistryStore, log: &'a mut JsonlWriter) -> Self {
        Self {
            store,
            now: Utc::now(),
            log,
        }
    }

    /// Pin the run clock, mainly for tests.
    #[must_use]
    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }
}

/// Parse an RFC 3339 timestamp from the registry.
///
/// `subject` names what the timestamp belongs to so the fatal error is actionable.
pub fn parse_timestamp(subject: &str, value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|error| RrpError::TimestampParse {
            subject: subject.to_string(),
            value: value.to_string(),
            details: error.to_string(),
        })
}

/// Fractional days from `then` to `now`; negative when `then` is in the future.
#[allow(clippy::cast_precision_loss)]
pub fn days_between(now: DateTime<Utc>, then: DateTime<Utc>) -> f64 {
    (now - then).num_milliseconds() as f64 / MILLIS_PER_DAY
}
