//! Configuration system: TOML file + env var overrides + smart defaults.

#![allow(missing_docs)]

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::errors::{Result, RrpError};

/// Full configuration model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct Config {
    pub registry: RegistryConfig,
    pub policy: PolicyFileConfig,
    pub paths: PathsConfig,
}

/// Where the registry API lives and how long a single request may take.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RegistryConfig {
    /// Base URL, e.g. `https://harbor.example.com`.
    pub url: String,
    /// Global per-request timeout handed to the HTTP agent.
    pub timeout_secs: u64,
}

/// Location of the weighted retention policy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PolicyFileConfig {
    pub file: PathBuf,
}

/// Filesystem paths used by rrp.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PathsConfig {
    pub config_file: PathBuf,
    pub session_file: PathBuf,
    pub activity_log: PathBuf,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1".to_string(),
            timeout_secs: 30,
        }
    }
}

impl Default for PolicyFileConfig {
    fn default() -> Self {
        Self {
            file: PathBuf::from("./rp.yaml"),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        let home_dir = env::var_os("HOME").map_or_else(
            || {
                eprintln!(
                    "[RRP-CONFIG] WARNING: HOME not set, falling back to /tmp for data paths"
                );
                PathBuf::from("/tmp")
            },
            PathBuf::from,
        );
        let cfg = home_dir.join(".config").join("rrp");
        let data = home_dir.join(".local").join("share").join("rrp");
        Self {
            config_file: cfg.join("config.toml"),
            session_file: cfg.join("session.json"),
            activity_log: data.join("activity.jsonl"),
        }
    }
}

impl Config {
    /// Default configuration path.
    #[must_use]
    pub fn default_path() -> PathBuf {
        PathsConfig::default().config_file
    }

    /// Load config from default or explicit path, then apply env overrides.
    ///
    /// Missing config file is not an error when loading from default path; defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path_buf = path.map_or_else(Self::default_path, Path::to_path_buf);
        let is_explicit_path = path.is_some();

        let mut cfg = if path_buf.exists() {
            let raw = fs::read_to_string(&path_buf).map_err(|source| RrpError::Io {
                path: path_buf.clone(),
                source,
            })?;
            let parsed: Self = toml::from_str(&raw)?;
            parsed
        } else if is_explicit_path {
            return Err(RrpError::MissingConfig { path: path_buf });
        } else {
            Self::default()
        };

        cfg.paths.config_file = path_buf;
        cfg.apply_env_overrides_from(env_var)?;
        cfg.normalize();
        cfg.validate()?;
        Ok(cfg)
    }

    /// Session id supplied through the environment, bypassing the session file.
    #[must_use]
    pub fn session_id_override() -> Option<String> {
        env_var("RRP_SESSION_ID")
    }

    fn apply_env_overrides_from<F>(&mut self, mut lookup: F) -> Result<()>
    where
        F: FnMut(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("RRP_REGISTRY_URL") {
            self.registry.url = raw;
        }
        if let Some(raw) = lookup("RRP_REGISTRY_TIMEOUT_SECS") {
            self.registry.timeout_secs = parse_env_u64("RRP_REGISTRY_TIMEOUT_SECS", &raw)?;
        }
        if let Some(raw) = lookup("RRP_POLICY_FILE") {
            self.policy.file = PathBuf::from(raw);
        }
        if let Some(raw) = lookup("RRP_SESSION_FILE") {
            self.paths.session_file = PathBuf::from(raw);
        }
        if let Some(raw) = lookup("RRP_ACTIVITY_LOG") {
            self.paths.activity_log = PathBuf::from(raw);
        }
        Ok(())
    }

    fn normalize(&mut self) {
        let trimmed = self.registry.url.trim().trim_end_matches('/');
        self.registry.url = trimmed.to_string();
    }

    fn validate(&self) -> Result<()> {
        let url = &self.registry.url;
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(RrpError::InvalidConfig {
                details: format!("registry.url must start with http:// or https://, got {url:?}"),
            });
        }

        if self.registry.timeout_secs == 0 {
            return Err(RrpError::InvalidConfig {
                details: "registry.timeout_secs must be > 0".to_string(),
            });
        }

        if self.policy.file.as_os_str().is_empty() {
            return Err(RrpError::InvalidConfig {
                details: "policy.file must not be empty".to_string(),
            });
        }

        Ok(())
    }
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|raw| !raw.trim().is_empty())
}

fn parse_env_u64(name: &str, raw: &str) -> Result<u64> {
    raw.trim()
        .parse::<u64>()
        .map_err(|error| RrpError::ConfigParse {
            context: "env",
            details: format!("{name}={raw:?}: {error}"),
        })
}
