//! Learning-goal metadata
//!
//! Read-only view of a JSON file mapping topic -> `{ "title", "goals": { code: text } }`.
//! Used to label goal codes and to warn about codes no topic defines.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use crate::error::{BankError, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TopicGoals {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub goals: BTreeMap<String, String>,
}

/// One selectable goal, e.g. `T13 · LG 4: Balance chemical equations`
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct GoalLabel {
    pub topic: u32,
    pub code: String,
    pub text: String,
    pub label: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct GoalCatalog {
    topics: BTreeMap<u32, TopicGoals>,
}

impl GoalCatalog {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| BankError::io(path, e))?;
        serde_json::from_str(&content).map_err(|e| BankError::schema(path, e))
    }

    /// Like [`GoalCatalog::load`], but an absent file is an empty catalog
    pub fn load_if_present(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!(path = %path.display(), "no learning-goal file");
            Ok(Self::default())
        }
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }

    pub fn title(&self, topic: u32) -> Option<&str> {
        self.topics
            .get(&topic)
            .map(|t| t.title.as_str())
            .filter(|title| !title.is_empty())
    }

    /// Goals for the given topics (all topics when `None`), ordered by topic
    /// then code, with numeric codes compared as numbers
    pub fn labels(&self, topics: Option<&BTreeSet<u32>>) -> Vec<GoalLabel> {
        let mut labels = Vec::new();
        for (&topic, entry) in &self.topics {
            if topics.is_some_and(|wanted| !wanted.contains(&topic)) {
                continue;
            }
            let mut codes: Vec<(&String, &String)> = entry.goals.iter().collect();
            codes.sort_by(|a, b| compare_codes(a.0, b.0));
            for (code, text) in codes {
                labels.push(GoalLabel {
                    topic,
                    code: code.clone(),
                    text: text.clone(),
                    label: format!("T{} · LG {}: {}", topic, code, text),
                });
            }
        }
        labels
    }

    /// Codes from `codes` that none of `topics` (or no topic at all) define
    pub fn unknown_codes<'a, I>(&self, codes: I, topics: Option<&BTreeSet<u32>>) -> Vec<String>
    where
        I: IntoIterator<Item = &'a String>,
    {
        let known: BTreeSet<&str> = self
            .topics
            .iter()
            .filter(|(topic, _)| topics.map_or(true, |wanted| wanted.contains(*topic)))
            .flat_map(|(_, entry)| entry.goals.keys().map(String::as_str))
            .collect();
        codes
            .into_iter()
            .filter(|code| !known.contains(code.as_str()))
            .cloned()
            .collect()
    }
}

/// Numeric-aware ordering so "2" sorts before "10"
fn compare_codes(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}
