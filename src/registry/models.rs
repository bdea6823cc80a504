//! Wire types for the registry REST API responses.
//!
//! Only the fields the engine consumes are required; everything else is
//! tolerated when absent.

#![allow(missing_docs)]

use serde::{Deserialize, Serialize};

/// `GET /api/statistics`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Statistics {
    pub private_project_count: u64,
    pub private_repo_count: u64,
    pub public_project_count: u64,
    pub public_repo_count: u64,
    pub total_project_count: u64,
    pub total_repo_count: u64,
}

/// One element of `GET /api/repositories/top?count=N`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoTop {
    pub id: i64,
    pub name: String,
    pub project_id: i64,
    #[serde(default)]
    pub description: String,
    pub pull_count: i64,
    #[serde(default)]
    pub star_count: i64,
    pub tags_count: i64,
    #[serde(default)]
    pub creation_time: String,
    pub update_time: String,
}

/// `GET /api/search?q=...`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchResponse {
    pub repository: Vec<SearchRepository>,
    pub project: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchRepository {
    pub project_id: i64,
    pub project_name: String,
    pub project_public: bool,
    pub pull_count: i64,
    pub repository_name: String,
    pub tags_count: i64,
}

/// One element of `GET /api/repositories/{repo}/tags`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagInfo {
    pub name: String,
    /// RFC 3339 creation timestamp.
    pub created: String,
    #[serde(default)]
    pub digest: String,
    #[serde(default)]
    pub architecture: String,
    #[serde(default)]
    pub docker_version: String,
    #[serde(default)]
    pub author: String,
}
