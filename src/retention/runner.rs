//! Run orchestration: fetch from the registry, score or filter, and hand the
//! results to the caller for display and eviction.
//!
//! Every error escaping a per-repository step is tagged with the repository
//! name before it propagates, so a fail-fast abort says where it happened.

#![allow(missing_docs)]

use serde::Serialize;

use crate::core::errors::Result;
use crate::logger::jsonl::{EventType, LogEntry, ScoreFactorsRecord, Severity};
use crate::retention::RunContext;
use crate::retention::ranking::Ranking;
use crate::retention::scoring::{RepoSnapshot, ScoringEngine};
use crate::retention::tags::{RepositoryTagReport, TagRetentionOptions, retain_repository_tags};

/// Scored view of every public repository.
#[derive(Debug, Clone)]
pub struct RepoAnalysis {
    pub public_repo_count: u64,
    pub ranking: Ranking,
}

/// Fetch the public repositories, score each one and rank them.
pub fn analyse_repositories(
    ctx: &mut RunContext<'_>,
    engine: &ScoringEngine,
) -> Result<RepoAnalysis> {
    let stats = ctx.store.statistics()?;
    let top = ctx.store.top_repositories(stats.public_repo_count)?;

    let mut candidates = Vec::with_capacity(top.len());
    for wire in &top {
        let snapshot = RepoSnapshot::from_wire(wire).map_err(|e| e.in_repository(&wire.name))?;
        let candidate = engine.score_candidate(snapshot);

        let mut entry =
            LogEntry::new(EventType::RepoScored, Severity::Info).repository(candidate.name.clone());
        entry.score = Some(candidate.score);
        entry.factors = Some(ScoreFactorsRecord::from(&candidate.breakdown));
        ctx.log.write_entry(&entry);

        candidates.push(candidate);
    }

    Ok(RepoAnalysis {
        public_repo_count: stats.public_repo_count,
        ranking: Ranking::new(candidates),
    })
}

/// Totals across every repository visited by a tag retention run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TagRetentionSummary {
    pub repositories: usize,
    pub retained: usize,
    pub candidates: usize,
    pub evicted: usize,
    pub failed: usize,
    pub dry_run: bool,
}

impl TagRetentionSummary {
    fn absorb(&mut self, report: &RepositoryTagReport) {
        self.repositories += 1;
        self.retained += report.retained;
        self.candidates += report.candidates;
        self.evicted += report.evicted.len();
        self.failed += report.failed.len();
    }
}

/// Apply tag retention to every repository the search returns.
///
/// `on_report` sees each repository as soon as it is done, so output can
/// stream while later repositories are still being processed. Search
/// results are used as returned, without further name filtering.
pub fn run_tag_retention<F>(
    ctx: &mut RunContext<'_>,
    options: &TagRetentionOptions,
    mut on_report: F,
) -> Result<TagRetentionSummary>
where
    F: FnMut(&RepositoryTagReport),
{
    let search = ctx.store.search(&options.repo_name)?;
    let mut summary = TagRetentionSummary {
        dry_run: options.dry_run,
        ..TagRetentionSummary::default()
    };

    for repo in &search.repository {
        let report = retain_repository_tags(ctx, &repo.repository_name, repo.tags_count, options)
            .map_err(|e| e.in_repository(&repo.repository_name))?;
        summary.absorb(&report);
        on_report(&report);
    }

    Ok(summary)
}
