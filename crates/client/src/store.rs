//! Persisted login session.
//!
//! The command-line front end keeps the session between runs as a JSON file
//! in the data directory, alongside the bearer token issued at login.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use protocol::Role;
use serde::{Deserialize, Serialize};

use crate::auth::UserSession;

/// On-disk session record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSession {
    pub email: String,
    pub role: Role,
    /// Bearer token for the file endpoints.
    pub token: String,
}

impl StoredSession {
    pub fn new(session: &UserSession, token: impl Into<String>) -> Self {
        Self {
            email: session.email.clone(),
            role: session.role,
            token: token.into(),
        }
    }

    /// The session without its credential.
    pub fn user(&self) -> UserSession {
        UserSession {
            email: self.email.clone(),
            role: self.role,
        }
    }
}

/// JSON file holding at most one [`StoredSession`].
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored session, or `None` if nobody is logged in.
    pub fn load(&self) -> Result<Option<StoredSession>> {
        if !self.path.exists() {
            tracing::debug!("No session file at {:?}", self.path);
            return Ok(None);
        }

        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read session file: {}", self.path.display()))?;
        let session = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse session file: {}", self.path.display()))?;
        Ok(Some(session))
    }

    /// Write the session atomically (temp file, then rename).
    pub fn save(&self, session: &StoredSession) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create data directory: {}", parent.display())
            })?;
        }

        let contents =
            serde_json::to_string_pretty(session).context("Failed to serialize session")?;

        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, &contents).with_context(|| {
            format!("Failed to write temp session file: {}", temp_path.display())
        })?;
        fs::rename(&temp_path, &self.path).with_context(|| {
            format!(
                "Failed to rename temp session file {} to {}",
                temp_path.display(),
                self.path.display()
            )
        })?;

        tracing::debug!(email = %session.email, "Saved session to {:?}", self.path);
        Ok(())
    }

    /// Delete the stored session. Returns whether one existed.
    pub fn clear(&self) -> Result<bool> {
        if !self.path.exists() {
            return Ok(false);
        }
        fs::remove_file(&self.path)
            .with_context(|| format!("Failed to remove session file: {}", self.path.display()))?;
        Ok(true)
    }
}
