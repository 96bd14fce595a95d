//! Page-by-page entry extraction
//!
//! Walks pages in document order and turns every classifiable page into an
//! [`Entry`]. The only state carried between pages is the current topic, which
//! challenge slides inherit because their headers carry no topic of their own.

use std::path::Path;

use crate::classifier::{split_page, SlideClassifier, SlideHeader};
use crate::error::Result;
use crate::models::{Entry, EntryKind};
use crate::pdf;

/// State threaded from one page to the next
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractState {
    /// Topic of the most recent question or solution header
    pub current_topic: Option<u32>,
}

/// Classify one page. Returns the state for the next page and the entry, if any.
pub fn extract_page(
    classifier: &SlideClassifier,
    state: ExtractState,
    page: u32,
    text: &str,
) -> (ExtractState, Option<Entry>) {
    let Some((header, body)) = split_page(text) else {
        tracing::debug!(page, "skipping page with no text");
        return (state, None);
    };

    let Some(slide) = classifier.classify(header) else {
        tracing::debug!(page, header, "skipping unclassified page");
        return (state, None);
    };

    match slide {
        SlideHeader::Question { topic, qnum, level, learning_goals } => {
            let entry = Entry {
                kind: EntryKind::Question,
                topic,
                qnum,
                page,
                text: body,
                level: Some(level),
                learning_goals: Some(learning_goals),
            };
            (ExtractState { current_topic: Some(topic) }, Some(entry))
        }
        SlideHeader::Solution { topic, qnum } => {
            let entry = Entry {
                kind: EntryKind::Solution,
                topic,
                qnum,
                page,
                text: body,
                level: None,
                learning_goals: None,
            };
            (ExtractState { current_topic: Some(topic) }, Some(entry))
        }
        SlideHeader::ChallengeQuestion | SlideHeader::ChallengeSolution => {
            let Some(topic) = state.current_topic else {
                tracing::debug!(page, header, "challenge slide before any topic, skipping");
                return (state, None);
            };
            let entry = Entry {
                kind: slide.kind(),
                topic,
                qnum: 0,
                page,
                text: body,
                level: None,
                learning_goals: None,
            };
            (state, Some(entry))
        }
    }
}

/// Extract entries from page texts, where `pages[0]` is page 1
pub fn extract_entries<S: AsRef<str>>(classifier: &SlideClassifier, pages: &[S]) -> Vec<Entry> {
    let mut state = ExtractState::default();
    let mut entries = Vec::new();

    for (index, text) in pages.iter().enumerate() {
        let page = (index + 1) as u32;
        let (next, entry) = extract_page(classifier, state, page, text.as_ref());
        state = next;
        if let Some(entry) = entry {
            tracing::debug!(page, kind = entry.kind.as_str(), topic = entry.topic, qnum = entry.qnum, "entry");
            entries.push(entry);
        }
    }

    entries
}

/// Extract entries straight from a PDF on disk
pub fn extract_entries_from_pdf(classifier: &SlideClassifier, path: &Path) -> Result<Vec<Entry>> {
    let pages = pdf::extract_page_texts(path)?;
    let entries = extract_entries(classifier, &pages);
    tracing::info!(pages = pages.len(), entries = entries.len(), "extracted slide entries");
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::HeaderConfig;

    fn classifier() -> SlideClassifier {
        SlideClassifier::new(HeaderConfig::default()).unwrap()
    }

    #[test]
    fn test_question_and_solution_pages() {
        let pages = [
            "T13Q7: Level 3+ (L.G. 11)\nWhat is the pH?",
            "T13Q7: Solution\npH = 7",
        ];
        let entries = extract_entries(&classifier(), &pages);

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].kind, EntryKind::Question);
        assert_eq!(entries[0].page, 1);
        assert_eq!(entries[0].level, Some(3));
        assert_eq!(entries[0].learning_goals, Some(vec!["11".to_string()]));
        assert_eq!(entries[0].text, "What is the pH?");
        assert_eq!(entries[1].kind, EntryKind::Solution);
        assert_eq!(entries[1].page, 2);
        assert_eq!(entries[1].level, None);
    }

    #[test]
    fn test_challenge_inherits_current_topic() {
        let pages = [
            "T4Q2: Solution\n...",
            "Title slide",
            "8 pt challenge\nHard one",
            "Q0: Solution\nAnswer",
            "T5Q1: Level 1 (L.G. 2)\n...",
            "8 pt challenge\nAnother",
        ];
        let entries = extract_entries(&classifier(), &pages);
        let summary: Vec<_> = entries.iter().map(|e| (e.kind, e.topic, e.qnum, e.page)).collect();

        assert_eq!(
            summary,
            vec![
                (EntryKind::Solution, 4, 2, 1),
                (EntryKind::ChallengeQuestion, 4, 0, 3),
                (EntryKind::ChallengeSolution, 4, 0, 4),
                (EntryKind::Question, 5, 1, 5),
                (EntryKind::ChallengeQuestion, 5, 0, 6),
            ]
        );
    }

    #[test]
    fn test_challenge_before_any_topic_is_skipped() {
        let pages = ["8 pt challenge\nearly", "Q0: Solution\nearly", "T1Q1: Solution\n"];
        let entries = extract_entries(&classifier(), &pages);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].page, 3);
    }

    #[test]
    fn test_empty_pages_skipped_without_touching_state() {
        let c = classifier();
        let state = ExtractState { current_topic: Some(9) };
        let (next, entry) = extract_page(&c, state, 4, "");
        assert_eq!(next, state);
        assert!(entry.is_none());
    }

    #[test]
    fn test_challenge_does_not_change_topic() {
        let c = classifier();
        let state = ExtractState { current_topic: Some(3) };
        let (next, entry) = extract_page(&c, state, 10, "8 pt challenge");
        assert_eq!(next.current_topic, Some(3));
        assert_eq!(entry.map(|e| e.topic), Some(3));
    }
}
