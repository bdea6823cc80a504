//! Ascending score ranking of repository candidates.
//!
//! A [`Ranking`] is the immutable sorted listing used for reporting. A
//! [`RankingHeap`] is an owned min-heap for destructive consumption. Both are
//! built from the same candidate snapshot and share no state, so draining
//! one never disturbs the other.

#![allow(missing_docs)]

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::core::errors::{Result, RrpError};
use crate::retention::scoring::RepoCandidate;

/// Total order used everywhere: score ascending, then id ascending.
#[must_use]
pub fn compare_candidates(left: &RepoCandidate, right: &RepoCandidate) -> Ordering {
    left.score
        .total_cmp(&right.score)
        .then_with(|| left.id.cmp(&right.id))
}

/// Heap entry with reversed ordering so `BinaryHeap` (a max-heap) pops the
/// lowest score first.
#[derive(Debug, Clone)]
struct LowestFirst(RepoCandidate);

impl PartialEq for LowestFirst {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for LowestFirst {}

impl PartialOrd for LowestFirst {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for LowestFirst {
    fn cmp(&self, other: &Self) -> Ordering {
        compare_candidates(&other.0, &self.0)
    }
}

/// Min-heap of candidates keyed by `(score, id)`.
#[derive(Debug, Clone, Default)]
pub struct RankingHeap {
    heap: BinaryHeap<LowestFirst>,
}

impl RankingHeap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, candidate: RepoCandidate) {
        self.heap.push(LowestFirst(candidate));
    }

    /// Remove and return the lowest-ranked candidate.
    pub fn pop(&mut self) -> Result<RepoCandidate> {
        self.heap
            .pop()
            .map(|entry| entry.0)
            .ok_or(RrpError::EmptyHeap { heap: "ranking" })
    }

    #[must_use]
    pub fn peek(&self) -> Option<&RepoCandidate> {
        self.heap.peek().map(|entry| &entry.0)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Pop everything in ascending order, consuming the heap.
    #[must_use]
    pub fn drain_ascending(mut self) -> Vec<RepoCandidate> {
        let mut out = Vec::with_capacity(self.heap.len());
        while let Some(entry) = self.heap.pop() {
            out.push(entry.0);
        }
        out
    }
}

impl FromIterator<RepoCandidate> for RankingHeap {
    fn from_iter<I: IntoIterator<Item = RepoCandidate>>(iter: I) -> Self {
        Self {
            heap: iter.into_iter().map(LowestFirst).collect(),
        }
    }
}

/// Immutable ascending listing of scored candidates.
#[derive(Debug, Clone, Default)]
pub struct Ranking {
    entries: Vec<RepoCandidate>,
}

impl Ranking {
    #[must_use]
    pub fn new(mut candidates: Vec<RepoCandidate>) -> Self {
        candidates.sort_by(compare_candidates);
        Self {
            entries: candidates,
        }
    }

    #[must_use]
    pub fn entries(&self) -> &[RepoCandidate] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// A fresh, independent heap over the same candidates.
    #[must_use]
    pub fn consumption_heap(&self) -> RankingHeap {
        self.entries.iter().cloned().collect()
    }
}
