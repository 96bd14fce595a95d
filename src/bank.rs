//! Question bank: reconciliation of entries into records, and the JSON cache
//!
//! Question and solution halves arrive as separate entries and are folded into
//! one [`Question`] per (topic, question number). Challenge records always
//! use question number 0, so this is equivalent to keying on the full
//! [`QuestionKey`](crate::models::QuestionKey) triple.
//!
//! Every cache written here has a [`SourceStamp`] beside it, so a cache parsed
//! from one deck is never served for another.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::classifier::SlideClassifier;
use crate::error::{BankError, Result};
use crate::extractor;
use crate::models::{Entry, EntryKind, Question};

/// Records in first-seen order plus an index for reconciliation
#[derive(Debug, Default)]
pub struct BankBuilder {
    records: Vec<Question>,
    index: HashMap<(u32, u32), usize>,
}

impl BankBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one entry into the bank. Later entries overwrite earlier text/page
    /// fields; the challenge flag only ever goes from false to true.
    pub fn apply(&mut self, entry: &Entry) {
        let key = (entry.topic, entry.qnum);
        let slot = match self.index.get(&key) {
            Some(&slot) => slot,
            None => {
                self.records.push(Question::new(entry.topic, entry.qnum, entry.kind.is_challenge()));
                self.index.insert(key, self.records.len() - 1);
                self.records.len() - 1
            }
        };
        let record = &mut self.records[slot];

        if entry.kind.is_challenge() {
            record.is_challenge = true;
        }

        match entry.kind {
            EntryKind::Question => {
                record.question_text = Some(entry.text.clone());
                record.question_page = Some(entry.page);
                record.level = entry.level;
                record.learning_goals = entry.learning_goals.clone();
            }
            EntryKind::Solution | EntryKind::ChallengeSolution => {
                record.solution_text = Some(entry.text.clone());
                record.solution_page = Some(entry.page);
            }
            EntryKind::ChallengeQuestion => {
                record.question_text = Some(entry.text.clone());
                record.question_page = Some(entry.page);
            }
        }
    }

    pub fn finish(self) -> Vec<Question> {
        self.records
    }
}

/// Reconcile a stream of entries into unique question records
pub fn build_bank<'a, I>(entries: I) -> Vec<Question>
where
    I: IntoIterator<Item = &'a Entry>,
{
    let mut builder = BankBuilder::new();
    for entry in entries {
        builder.apply(entry);
    }
    builder.finish()
}

/// Write the bank as pretty-printed JSON, one object per record
pub fn save_bank(questions: &[Question], path: &Path) -> Result<()> {
    let content = serde_json::to_string_pretty(questions)
        .map_err(|e| BankError::Serialize { what: "question bank", source: e })?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| BankError::io(parent, e))?;
        }
    }

    fs::write(path, content).map_err(|e| BankError::io(path, e))?;
    tracing::info!(records = questions.len(), path = %path.display(), "saved question bank");
    Ok(())
}

pub fn load_bank(path: &Path) -> Result<Vec<Question>> {
    let content = fs::read_to_string(path).map_err(|e| BankError::io(path, e))?;
    let questions: Vec<Question> =
        serde_json::from_str(&content).map_err(|e| BankError::schema(path, e))?;
    tracing::info!(records = questions.len(), path = %path.display(), "loaded question bank");
    Ok(questions)
}

/// Where a bank returned by [`ensure_bank`] came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BankSource {
    Cache,
    Parsed { entries: usize },
}

/// Identity of the PDF a cache was parsed from, kept next to the cache as
/// `<cache stem>.source.json`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceStamp {
    pub path: PathBuf,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub modified: Option<DateTime<Utc>>,
}

impl SourceStamp {
    /// Stamp for `path` as it is on disk now; size and mtime are `None` when
    /// the file cannot be read
    pub fn of(path: &Path) -> Self {
        let meta = fs::metadata(path).ok();
        Self {
            path: fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf()),
            size: meta.as_ref().map(|m| m.len()),
            modified: meta.and_then(|m| m.modified().ok()).map(DateTime::<Utc>::from),
        }
    }

    /// Whether a cache stamped with `self` can stand in for `requested`.
    /// A missing source only has to match by path.
    pub fn covers(&self, requested: &SourceStamp) -> bool {
        if self.path != requested.path {
            return false;
        }
        requested.size.is_none() || (self.size == requested.size && self.modified == requested.modified)
    }
}

fn stamp_path(cache_path: &Path) -> PathBuf {
    cache_path.with_extension("source.json")
}

fn save_stamp(stamp: &SourceStamp, cache_path: &Path) -> Result<()> {
    let path = stamp_path(cache_path);
    let content = serde_json::to_string_pretty(stamp)
        .map_err(|e| BankError::Serialize { what: "bank source stamp", source: e })?;
    fs::write(&path, content).map_err(|e| BankError::io(&path, e))
}

/// `None` for caches written before stamps existed
fn load_stamp(cache_path: &Path) -> Result<Option<SourceStamp>> {
    let path = stamp_path(cache_path);
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&path).map_err(|e| BankError::io(&path, e))?;
    serde_json::from_str(&content).map(Some).map_err(|e| BankError::schema(&path, e))
}

/// Load the cached bank, parsing `source_pdf` when the cache is absent, was
/// built from a different (or since modified) PDF, or `force` is set
pub fn ensure_bank(
    classifier: &SlideClassifier,
    source_pdf: &Path,
    cache_path: &Path,
    force: bool,
) -> Result<(Vec<Question>, BankSource)> {
    let requested = SourceStamp::of(source_pdf);

    if !force && cache_path.exists() {
        match load_stamp(cache_path)? {
            Some(stamp) if stamp.covers(&requested) => {
                return Ok((load_bank(cache_path)?, BankSource::Cache));
            }
            Some(stamp) => {
                tracing::info!(
                    cached = %stamp.path.display(),
                    requested = %requested.path.display(),
                    "bank cache is for another source, re-parsing"
                );
            }
            None => {
                tracing::warn!(path = %cache_path.display(), "bank cache has no source stamp, using it as is");
                return Ok((load_bank(cache_path)?, BankSource::Cache));
            }
        }
    }

    let entries = extractor::extract_entries_from_pdf(classifier, source_pdf)?;
    let questions = build_bank(&entries);
    save_bank(&questions, cache_path)?;
    save_stamp(&requested, cache_path)?;
    Ok((questions, BankSource::Parsed { entries: entries.len() }))
}

/// Counts shown by `bank stats`
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct BankStats {
    pub total: usize,
    pub challenges: usize,
    pub by_topic: std::collections::BTreeMap<u32, usize>,
    pub by_level: std::collections::BTreeMap<u8, usize>,
    pub missing_question_page: usize,
    pub missing_solution_page: usize,
}

pub fn bank_stats(questions: &[Question]) -> BankStats {
    let mut stats = BankStats { total: questions.len(), ..BankStats::default() };
    for q in questions {
        *stats.by_topic.entry(q.topic).or_default() += 1;
        if let Some(level) = q.level {
            *stats.by_level.entry(level).or_default() += 1;
        }
        if q.is_challenge {
            stats.challenges += 1;
        }
        if q.question_page.is_none() {
            stats.missing_question_page += 1;
        }
        if q.solution_page.is_none() {
            stats.missing_solution_page += 1;
        }
    }
    stats
}
