//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use registry_retention::prelude::*;
//! ```

// Core
pub use crate::core::config::Config;
pub use crate::core::errors::{ErrorKind, Result, RrpError};

// Registry
pub use crate::registry::RegistryStore;
pub use crate::registry::client::HttpRegistry;
pub use crate::registry::session::SessionCookie;

// Retention
pub use crate::retention::RunContext;
pub use crate::retention::eviction::{
    EvictionReport, MAX_REPO_BATCH, RepoEvictor, SelectionState, prompt_batch_size,
    validate_batch_size,
};
pub use crate::retention::policy::{FactorSpec, PolicyConfig};
pub use crate::retention::ranking::{Ranking, RankingHeap};
pub use crate::retention::runner::{
    RepoAnalysis, TagRetentionSummary, analyse_repositories, run_tag_retention,
};
pub use crate::retention::scoring::{RepoCandidate, RepoSnapshot, ScoreBreakdown, ScoringEngine};
pub use crate::retention::tags::{
    RepositoryTagReport, TagAgeFilter, TagCandidate, TagEvictionHeap, TagRetentionOptions,
};

// Logger
pub use crate::logger::jsonl::{JsonlConfig, JsonlWriter};
