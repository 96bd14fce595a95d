//! Per-user record of questions already handed out
//!
//! One JSON file per user under `<data_dir>/usage/`. A user's set is only
//! written by that user's exam builds, one at a time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{BankError, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UsedSet {
    #[serde(default)]
    pub ids: BTreeSet<String>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

pub struct UsageStore {
    dir: PathBuf,
}

impl UsageStore {
    pub fn new(data_dir: &Path) -> Self {
        Self { dir: data_dir.join("usage") }
    }

    fn path_for(&self, user: &str) -> PathBuf {
        self.dir.join(format!("{}.json", sanitize_user(user)))
    }

    /// A user with no file yet has an empty set
    pub fn load(&self, user: &str) -> Result<UsedSet> {
        let path = self.path_for(user);
        if !path.exists() {
            return Ok(UsedSet::default());
        }
        let content = fs::read_to_string(&path).map_err(|e| BankError::io(&path, e))?;
        serde_json::from_str(&content).map_err(|e| BankError::schema(&path, e))
    }

    pub fn save(&self, user: &str, ids: &BTreeSet<String>) -> Result<()> {
        let set = UsedSet { ids: ids.clone(), updated_at: Some(Utc::now()) };
        let content = serde_json::to_string_pretty(&set)
            .map_err(|e| BankError::Serialize { what: "used set", source: e })?;

        fs::create_dir_all(&self.dir).map_err(|e| BankError::io(&self.dir, e))?;
        let path = self.path_for(user);
        fs::write(&path, content).map_err(|e| BankError::io(&path, e))?;
        tracing::debug!(user, count = ids.len(), "saved used set");
        Ok(())
    }

    /// Forget everything handed out to `user`. Returns whether a file existed.
    pub fn reset(&self, user: &str) -> Result<bool> {
        let path = self.path_for(user);
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(&path).map_err(|e| BankError::io(&path, e))?;
        Ok(true)
    }
}

/// Lowercase and keep only `[a-z0-9_-]`, so a user name is always a safe file stem
pub fn sanitize_user(user: &str) -> String {
    let safe: String = user
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    if safe.is_empty() {
        "default".to_string()
    } else {
        safe
    }
}
