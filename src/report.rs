//! Preprocessing summary and duplicate analysis
//!
//! The summary maps each kept page to the record halves claiming it
//! (`T5-Q3-C0:Q`, `T5-Q3-C0:S`). Two different records claiming the same
//! page as their question half almost always means a mislabelled slide, so
//! those pages are listed separately rather than resolved.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use crate::error::{BankError, Result};
use crate::models::Question;

pub const QUESTION_SUFFIX: &str = "Q";
pub const SOLUTION_SUFFIX: &str = "S";

/// A page claimed as a question half by more than one record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DuplicateClaim {
    pub page: u32,
    pub ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PreprocessSummary {
    pub input_pdf: String,
    pub output_pdf: String,
    pub total_pages: usize,
    pub num_kept_pages: usize,
    pub num_removed_pages: usize,
    pub kept_pages: Vec<u32>,
    pub removed_pages: Vec<u32>,
    /// page -> claiming halves
    pub page_usage: BTreeMap<u32, Vec<String>>,
    #[serde(default)]
    pub duplicates: Vec<DuplicateClaim>,
    #[serde(default)]
    pub generated_at: Option<DateTime<Utc>>,
}

/// page -> `<id>:Q` / `<id>:S` for every page some record points at
pub fn page_usage(questions: &[Question]) -> BTreeMap<u32, Vec<String>> {
    let mut usage: BTreeMap<u32, Vec<String>> = BTreeMap::new();
    for q in questions {
        let id = q.id();
        if let Some(page) = q.question_page {
            usage.entry(page).or_default().push(format!("{}:{}", id, QUESTION_SUFFIX));
        }
        if let Some(page) = q.solution_page {
            usage.entry(page).or_default().push(format!("{}:{}", id, SOLUTION_SUFFIX));
        }
    }
    usage
}

/// Split `T5-Q3-C0:Q` into (`T5-Q3-C0`, `Q`); entries without a suffix get `?`
fn split_claim(claim: &str) -> (&str, &str) {
    claim.split_once(':').unwrap_or((claim, "?"))
}

/// Pages whose question half is claimed by more than one distinct record
pub fn find_duplicate_pages(usage: &BTreeMap<u32, Vec<String>>) -> Vec<DuplicateClaim> {
    usage
        .iter()
        .filter_map(|(&page, claims)| {
            let ids: BTreeSet<&str> = claims
                .iter()
                .map(|c| split_claim(c))
                .filter(|(_, kind)| *kind == QUESTION_SUFFIX)
                .map(|(id, _)| id)
                .collect();
            (ids.len() > 1).then(|| DuplicateClaim {
                page,
                ids: ids.into_iter().map(str::to_string).collect(),
            })
        })
        .collect()
}

/// Build the summary for a preprocessing run over a `total_pages` document
pub fn summarize(
    input_pdf: &Path,
    output_pdf: &Path,
    questions: &[Question],
    total_pages: usize,
) -> PreprocessSummary {
    let usage = page_usage(questions);
    let kept_pages: Vec<u32> = usage.keys().copied().collect();
    let kept: BTreeSet<u32> = kept_pages.iter().copied().collect();
    let removed_pages: Vec<u32> = (1..=total_pages as u32).filter(|p| !kept.contains(p)).collect();

    let duplicates = find_duplicate_pages(&usage);
    for dup in &duplicates {
        tracing::warn!(page = dup.page, ids = ?dup.ids, "page claimed as question by several records");
    }

    PreprocessSummary {
        input_pdf: input_pdf.display().to_string(),
        output_pdf: output_pdf.display().to_string(),
        total_pages,
        num_kept_pages: kept_pages.len(),
        num_removed_pages: removed_pages.len(),
        kept_pages,
        removed_pages,
        page_usage: usage,
        duplicates,
        generated_at: Some(Utc::now()),
    }
}

pub fn save_summary(summary: &PreprocessSummary, path: &Path) -> Result<()> {
    let content = serde_json::to_string_pretty(summary)
        .map_err(|e| BankError::Serialize { what: "preprocess summary", source: e })?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| BankError::io(parent, e))?;
        }
    }
    fs::write(path, content).map_err(|e| BankError::io(path, e))
}

pub fn load_summary(path: &Path) -> Result<PreprocessSummary> {
    let content = fs::read_to_string(path).map_err(|e| BankError::io(path, e))?;
    serde_json::from_str(&content).map_err(|e| BankError::schema(path, e))
}

/// Per-record view of a summary's page usage
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct DuplicateAnalysis {
    pub all_ids: BTreeSet<String>,
    pub question_pages: BTreeMap<String, BTreeSet<u32>>,
    pub solution_pages: BTreeMap<String, BTreeSet<u32>>,
    /// Records whose question half appears on more than one page
    pub duplicates: BTreeSet<String>,
}

pub fn analyze_usage(usage: &BTreeMap<u32, Vec<String>>) -> DuplicateAnalysis {
    let mut analysis = DuplicateAnalysis::default();

    for (&page, claims) in usage {
        for claim in claims {
            let (id, kind) = split_claim(claim);
            match kind {
                QUESTION_SUFFIX => {
                    analysis.question_pages.entry(id.to_string()).or_default().insert(page);
                }
                SOLUTION_SUFFIX => {
                    analysis.solution_pages.entry(id.to_string()).or_default().insert(page);
                }
                _ => continue,
            }
            analysis.all_ids.insert(id.to_string());
        }
    }

    analysis.duplicates = analysis
        .question_pages
        .iter()
        .filter(|(_, pages)| pages.len() > 1)
        .map(|(id, _)| id.clone())
        .collect();
    analysis
}

pub fn analyze_summary(summary: &PreprocessSummary) -> DuplicateAnalysis {
    analyze_usage(&summary.page_usage)
}
