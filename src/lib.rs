#![forbid(unsafe_code)]

//! Registry retention policy engine.
//!
//! Two independent retention passes over a container registry:
//! 1. **Repository retention**: policy-weighted scoring, ascending ranking and
//!    an operator-confirmed, bounded batch of soft deletions
//! 2. **Tag retention**: per repository, tags past an age threshold are
//!    evicted oldest-first until at most a configured number remain
//!
//! # Library usage
//!
//! Use the [`prelude`] for convenient access to the most common types:
//!
//! ```rust,no_run
//! use registry_retention::prelude::*;
//! ```
//!
//! Individual modules can also be imported directly:
//!
//! ```rust,no_run
//! use registry_retention::core::config::Config;
//! use registry_retention::retention::scoring::{RepoSnapshot, ScoringEngine};
//! ```

pub mod prelude;

pub mod core;
pub mod logger;
pub mod registry;
pub mod retention;
