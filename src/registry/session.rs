//! Session cookie loaded from the local credential store.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::errors::{Result, RrpError};

/// Credential store contents: `{"beegosessionID": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCookie {
    /// Opaque session id issued by the registry at login.
    #[serde(rename = "beegosessionID")]
    pub session_id: String,
}

impl SessionCookie {
    /// Wrap an already known session id.
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
        }
    }

    /// Read the credential store written by the login step.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|error| RrpError::Session {
            details: format!("cannot read {}: {error}", path.display()),
        })?;
        let cookie: Self = serde_json::from_str(&raw).map_err(|error| RrpError::Session {
            details: format!("cannot parse {}: {error}", path.display()),
        })?;
        if cookie.session_id.trim().is_empty() {
            return Err(RrpError::Session {
                details: format!("{} holds an empty session id", path.display()),
            });
        }
        Ok(cookie)
    }

    /// Resolve from an explicit override, falling back to the credential store.
    pub fn resolve(override_id: Option<String>, path: &Path) -> Result<Self> {
        match override_id {
            Some(id) => Ok(Self::new(id)),
            None => Self::load(path),
        }
    }

    /// Value for the `Cookie` request header.
    #[must_use]
    pub fn header_value(&self) -> String {
        format!("beegosessionID={}", self.session_id)
    }
}
