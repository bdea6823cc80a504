//! Tag retention: split a repository's tags by age, then evict the oldest
//! over-age tags until at most `max` of them remain.
//!
//! Tags younger than the threshold are never touched regardless of count.
//! Over-age tags are ordered by creation time (name breaks ties) so the
//! oldest go first.

#![allow(missing_docs)]

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::core::errors::{Result, RrpError};
use crate::logger::jsonl::{EventType, LogEntry, Severity};
use crate::registry::models::TagInfo;
use crate::retention::eviction::FailedDeletion;
use crate::retention::{RunContext, days_between, parse_timestamp};

/// One tag with its parsed creation time and age at run start.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TagCandidate {
    pub name: String,
    /// Creation time exactly as the registry reported it.
    pub created_raw: String,
    pub created_at: DateTime<Utc>,
    /// Fractional days since creation.
    pub age_days: f64,
}

impl TagCandidate {
    /// Parse a wire tag; a malformed `created` is fatal.
    pub fn from_wire(repository: &str, tag: &TagInfo, now: DateTime<Utc>) -> Result<Self> {
        let subject = format!("tag {repository}:{}", tag.name);
        let created_at = parse_timestamp(&subject, &tag.created)?;
        Ok(Self {
            name: tag.name.clone(),
            created_raw: tag.created.clone(),
            created_at,
            age_days: days_between(now, created_at),
        })
    }
}

fn compare_oldest_first(left: &TagCandidate, right: &TagCandidate) -> Ordering {
    left.created_at
        .cmp(&right.created_at)
        .then_with(|| left.name.cmp(&right.name))
}

#[derive(Debug, Clone)]
struct OldestFirst(TagCandidate);

impl PartialEq for OldestFirst {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OldestFirst {}

impl PartialOrd for OldestFirst {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OldestFirst {
    fn cmp(&self, other: &Self) -> Ordering {
        compare_oldest_first(&other.0, &self.0)
    }
}

/// Min-heap of over-age tags keyed by `(created_at, name)`.
#[derive(Debug, Clone, Default)]
pub struct TagEvictionHeap {
    heap: BinaryHeap<OldestFirst>,
}

impl TagEvictionHeap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, tag: TagCandidate) {
        self.heap.push(OldestFirst(tag));
    }

    /// Remove and return the oldest tag.
    pub fn pop(&mut self) -> Result<TagCandidate> {
        self.heap
            .pop()
            .map(|entry| entry.0)
            .ok_or(RrpError::EmptyHeap { heap: "tag" })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Remaining tags, oldest first.
    #[must_use]
    pub fn into_sorted(self) -> Vec<TagCandidate> {
        let mut tags: Vec<TagCandidate> = self.heap.into_iter().map(|entry| entry.0).collect();
        tags.sort_by(compare_oldest_first);
        tags
    }
}

/// Result of splitting one repository's tags by age.
#[derive(Debug, Clone, Default)]
pub struct TagPartition {
    pub retained: Vec<TagCandidate>,
    pub candidates: TagEvictionHeap,
}

/// Age threshold: tags at most `max_age_days` old are retained.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TagAgeFilter {
    pub max_age_days: f64,
}

impl TagAgeFilter {
    #[must_use]
    pub fn new(max_age_days: u32) -> Self {
        Self {
            max_age_days: f64::from(max_age_days),
        }
    }

    #[must_use]
    pub fn is_retained(&self, tag: &TagCandidate) -> bool {
        tag.age_days <= self.max_age_days
    }

    #[must_use]
    pub fn partition(&self, tags: Vec<TagCandidate>) -> TagPartition {
        let mut partition = TagPartition::default();
        for tag in tags {
            if self.is_retained(&tag) {
                partition.retained.push(tag);
            } else {
                partition.candidates.push(tag);
            }
        }
        partition
    }
}

/// Per-tag options for one tag retention run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagRetentionOptions {
    pub max_age_days: u32,
    pub max_keep: usize,
    /// Search query; empty selects every repository.
    pub repo_name: String,
    pub dry_run: bool,
}

/// Outcome of tag retention on one repository.
#[derive(Debug, Clone, Serialize)]
pub struct RepositoryTagReport {
    pub repository: String,
    /// Tag count advertised by the search endpoint.
    pub reported_tags: i64,
    pub max_age_days: u32,
    pub max_keep: usize,
    pub dry_run: bool,
    /// Every tag in registry order, for display.
    pub tags: Vec<TagCandidate>,
    pub retained: usize,
    /// Over-age tags before eviction (`K`).
    pub candidates: usize,
    /// Deleted tags, or would-delete tags on a dry run, oldest first.
    pub evicted: Vec<TagCandidate>,
    pub failed: Vec<FailedDeletion>,
    /// Over-age tags left untouched, oldest first.
    pub kept: Vec<TagCandidate>,
}

impl RepositoryTagReport {
    /// Whether any eviction was needed.
    #[must_use]
    pub fn over_cap(&self) -> bool {
        self.candidates > self.max_keep
    }

    #[must_use]
    pub fn is_marked(&self, tag: &TagCandidate) -> bool {
        tag.age_days > f64::from(self.max_age_days)
    }
}

/// Evict over-age tags of one repository beyond the cap.
///
/// Pops exactly `max(0, K - max_keep)` tags. On a dry run nothing is sent to
/// the registry and each pop is logged as a would-delete. A failed delete is
/// logged and recorded; the remaining pops still happen.
pub fn evict_tags(
    ctx: &mut RunContext<'_>,
    repository: &str,
    mut candidates: TagEvictionHeap,
    max_keep: usize,
    dry_run: bool,
) -> Result<(Vec<TagCandidate>, Vec<FailedDeletion>, TagEvictionHeap)> {
    let mut evicted = Vec::new();
    let mut failed = Vec::new();

    while candidates.len() > max_keep {
        let tag = candidates.pop()?;

        if dry_run {
            let mut entry = LogEntry::new(EventType::TagWouldDelete, Severity::Info)
                .repository(repository)
                .tag(tag.name.clone());
            entry.dry_run = Some(true);
            ctx.log.write_entry(&entry);
            evicted.push(tag);
            continue;
        }

        let outcome = ctx.store.delete_tag(repository, &tag.name);
        ctx.log.write_entry(
            &LogEntry::new(EventType::TagDelete, Severity::Info)
                .repository(repository)
                .tag(tag.name.clone())
                .outcome(outcome.as_ref().map(|_| ())),
        );
        match outcome {
            Ok(()) => evicted.push(tag),
            Err(error) => failed.push(FailedDeletion {
                name: tag.name,
                error_code: error.code().to_string(),
                error: error.to_string(),
            }),
        }
    }

    Ok((evicted, failed, candidates))
}

/// Full tag retention pass over one repository: list, parse, split, evict.
pub fn retain_repository_tags(
    ctx: &mut RunContext<'_>,
    repository: &str,
    reported_tags: i64,
    options: &TagRetentionOptions,
) -> Result<RepositoryTagReport> {
    let now = ctx.now;
    let tags = ctx
        .store
        .list_tags(repository)?
        .iter()
        .map(|tag| TagCandidate::from_wire(repository, tag, now))
        .collect::<Result<Vec<_>>>()?;

    let partition = TagAgeFilter::new(options.max_age_days).partition(tags.clone());
    let retained = partition.retained.len();
    let candidates = partition.candidates.len();

    let (evicted, failed, remaining) = evict_tags(
        ctx,
        repository,
        partition.candidates,
        options.max_keep,
        options.dry_run,
    )?;

    Ok(RepositoryTagReport {
        repository: repository.to_string(),
        reported_tags,
        max_age_days: options.max_age_days,
        max_keep: options.max_keep,
        dry_run: options.dry_run,
        tags,
        retained,
        candidates,
        evicted,
        failed,
        kept: remaining.into_sorted(),
    })
}
