//! Slide header classification
//!
//! Each page's first line is matched, in order, against four header forms:
//! - `T13Q7: Level 3+ (L.G. 11, 12)` question
//! - `T13Q7: Solution` solution
//! - any header containing the challenge marker (default "8 pt challenge")
//! - `Q0: Solution` / `Q0b: Solution` challenge solution
//!
//! First match wins. Topic and question bounds come from [`HeaderConfig`].

use regex::Regex;
use std::sync::LazyLock;

use crate::error::{BankError, Result};
use crate::models::EntryKind;
use crate::settings::HeaderConfig;

static QUESTION_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?ix)
        ^\s*
        T\s*(\d{1,4})\s*
        Q\s*(\d{1,4})
        \s*:\s*
        Level\s*([1-4])\s*\+?
        \s*\(\s*
        L\.?\s*G\.?\s*:?\s*
        ([^)]*?)
        \s*\)\s*$",
    )
    .unwrap()
});

static SOLUTION_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*T\s*(\d{1,4})\s*Q\s*(\d{1,4})\s*:\s*Solution\b").unwrap()
});

static CHALLENGE_SOLUTION_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*Q0[a-z]?\s*:\s*Solution\b").unwrap());

static GOAL_SEPARATOR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[,&/]").unwrap());

/// A repeated `L.G.` inside the list, as in `(L.G. 11, L.G. 12)`
static GOAL_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^L\.?\s*G\.?\s*:?\s*").unwrap());

/// What a header line says about its page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlideHeader {
    Question {
        topic: u32,
        qnum: u32,
        level: u8,
        learning_goals: Vec<String>,
    },
    Solution {
        topic: u32,
        qnum: u32,
    },
    /// Topic is inherited from the preceding numbered slides
    ChallengeQuestion,
    ChallengeSolution,
}

impl SlideHeader {
    pub fn kind(&self) -> EntryKind {
        match self {
            SlideHeader::Question { .. } => EntryKind::Question,
            SlideHeader::Solution { .. } => EntryKind::Solution,
            SlideHeader::ChallengeQuestion => EntryKind::ChallengeQuestion,
            SlideHeader::ChallengeSolution => EntryKind::ChallengeSolution,
        }
    }
}

pub struct SlideClassifier {
    config: HeaderConfig,
    challenge_header: Regex,
}

impl SlideClassifier {
    pub fn new(config: HeaderConfig) -> Result<Self> {
        config.validate()?;

        if config.question_max != config.solution_question_max {
            tracing::info!(
                question_max = config.question_max,
                solution_question_max = config.solution_question_max,
                "question and solution headers use different upper bounds"
            );
        }

        let challenge_header = challenge_regex(&config.challenge_marker)?;
        Ok(Self { config, challenge_header })
    }

    /// Classify one header line. `None` means the page is not a slide we track.
    pub fn classify(&self, header: &str) -> Option<SlideHeader> {
        if let Some(caps) = QUESTION_HEADER.captures(header) {
            let topic = caps[1].parse::<u32>().ok();
            let qnum = caps[2].parse::<u32>().ok();
            if let (Some(topic), Some(qnum)) = (topic, qnum) {
                if self.config.topic_in_range(topic) && self.config.question_in_range(qnum) {
                    // [1-4] in the pattern guarantees this parses
                    let level = caps[3].parse::<u8>().unwrap_or_default();
                    return Some(SlideHeader::Question {
                        topic,
                        qnum,
                        level,
                        learning_goals: split_learning_goals(&caps[4]),
                    });
                }
            }
        }

        if let Some(caps) = SOLUTION_HEADER.captures(header) {
            let topic = caps[1].parse::<u32>().ok();
            let qnum = caps[2].parse::<u32>().ok();
            if let (Some(topic), Some(qnum)) = (topic, qnum) {
                if self.config.topic_in_range(topic) && self.config.solution_in_range(qnum) {
                    return Some(SlideHeader::Solution { topic, qnum });
                }
            }
        }

        if self.challenge_header.is_match(header) {
            return Some(SlideHeader::ChallengeQuestion);
        }

        if CHALLENGE_SOLUTION_HEADER.is_match(header) {
            return Some(SlideHeader::ChallengeSolution);
        }

        None
    }
}

/// Build a case-insensitive matcher for the challenge marker, tolerant of
/// spacing between its words ("8pt challenge", "8 PT  Challenge")
fn challenge_regex(marker: &str) -> Result<Regex> {
    let words: Vec<String> = marker.split_whitespace().map(regex::escape).collect();
    let body = words.join(r"\s*");

    let starts_word = marker.trim_start().starts_with(|c: char| c.is_alphanumeric());
    let ends_word = marker.trim_end().ends_with(|c: char| c.is_alphanumeric());

    let pattern = format!(
        r"(?i){}{}{}",
        if starts_word { r"\b" } else { "" },
        body,
        if ends_word { r"\b" } else { "" },
    );
    Regex::new(&pattern)
        .map_err(|e| BankError::Settings(format!("invalid challenge marker {:?}: {}", marker, e)))
}

/// Split a raw learning-goal list on `,`, `&` or `/`, keeping order and duplicates
pub fn split_learning_goals(raw: &str) -> Vec<String> {
    GOAL_SEPARATOR
        .split(raw)
        .map(|piece| GOAL_PREFIX.replace(piece.trim(), "").trim().to_string())
        .filter(|piece| !piece.is_empty())
        .collect()
}

/// Split extracted page text into its header line and trimmed body.
///
/// Leading blank lines are skipped; text extraction often emits them before
/// the first real line. Returns `None` for pages with no text at all.
pub fn split_page(text: &str) -> Option<(&str, String)> {
    let mut lines = text.lines().skip_while(|line| line.trim().is_empty());
    let header = lines.next()?.trim();
    let body = lines.collect::<Vec<_>>().join("\n").trim().to_string();
    Some((header, body))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> SlideClassifier {
        SlideClassifier::new(HeaderConfig::default()).unwrap()
    }

    #[test]
    fn test_question_header_single_goal() {
        let header = classifier().classify("T13Q7: Level 3+ (L.G. 11)");
        assert_eq!(
            header,
            Some(SlideHeader::Question {
                topic: 13,
                qnum: 7,
                level: 3,
                learning_goals: vec!["11".to_string()],
            })
        );
    }

    #[test]
    fn test_question_header_multiple_goals_keep_order() {
        let header = classifier().classify("T2Q14 : level 1 (L.G. 4, 2 & 7/4)");
        let Some(SlideHeader::Question { topic, qnum, level, learning_goals }) = header else {
            panic!("expected question header, got {:?}", header);
        };
        assert_eq!((topic, qnum, level), (2, 14, 1));
        assert_eq!(learning_goals, vec!["4", "2", "7", "4"]);
    }

    #[test]
    fn test_question_header_whitespace_tolerance() {
        let header = classifier().classify("  t5q3:Level2+( L.G.  3a )  ");
        assert!(matches!(
            header,
            Some(SlideHeader::Question { topic: 5, qnum: 3, level: 2, .. })
        ));
    }

    #[test]
    fn test_question_out_of_range_topic_is_skipped() {
        assert_eq!(classifier().classify("T19Q1: Level 1 (L.G. 1)"), None);
        assert_eq!(classifier().classify("T0Q1: Level 1 (L.G. 1)"), None);
    }

    #[test]
    fn test_level_outside_one_to_four_is_not_a_question() {
        assert_eq!(classifier().classify("T3Q1: Level 5 (L.G. 1)"), None);
    }

    #[test]
    fn test_solution_header() {
        assert_eq!(
            classifier().classify("T13Q7: Solution"),
            Some(SlideHeader::Solution { topic: 13, qnum: 7 })
        );
        assert_eq!(
            classifier().classify("t4 q100 : SOLUTION continued"),
            Some(SlideHeader::Solution { topic: 4, qnum: 100 })
        );
    }

    #[test]
    fn test_solution_bound_is_separate_from_question_bound() {
        let config = HeaderConfig { question_max: 99, ..HeaderConfig::default() };
        let classifier = SlideClassifier::new(config).unwrap();

        assert_eq!(classifier.classify("T4Q100: Level 2 (L.G. 1)"), None);
        assert_eq!(
            classifier.classify("T4Q100: Solution"),
            Some(SlideHeader::Solution { topic: 4, qnum: 100 })
        );
    }

    #[test]
    fn test_challenge_headers() {
        let c = classifier();
        assert_eq!(c.classify("8 pt Challenge!"), Some(SlideHeader::ChallengeQuestion));
        assert_eq!(c.classify("Bonus: 8pt CHALLENGE again"), Some(SlideHeader::ChallengeQuestion));
        assert_eq!(c.classify("Q0: Solution"), Some(SlideHeader::ChallengeSolution));
        assert_eq!(c.classify("q0b : solution"), Some(SlideHeader::ChallengeSolution));
        assert_eq!(c.classify("18 pt challenge"), None);
    }

    #[test]
    fn test_custom_challenge_marker() {
        let config = HeaderConfig { challenge_marker: "bonus round".to_string(), ..HeaderConfig::default() };
        let c = SlideClassifier::new(config).unwrap();
        assert_eq!(c.classify("BONUS  round"), Some(SlideHeader::ChallengeQuestion));
        assert_eq!(c.classify("8 pt challenge"), None);
    }

    #[test]
    fn test_unrelated_headers() {
        let c = classifier();
        assert_eq!(c.classify("Announcements"), None);
        assert_eq!(c.classify("Q7: Solution"), None);
        assert_eq!(c.classify(""), None);
    }

    #[test]
    fn test_split_learning_goals_drops_empty_pieces() {
        assert_eq!(split_learning_goals(" 3 ,, & 5 / "), vec!["3", "5"]);
        assert!(split_learning_goals("").is_empty());
    }

    #[test]
    fn test_repeated_goal_prefix_is_stripped() {
        assert_eq!(split_learning_goals("11, L.G. 12 & LG 13"), vec!["11", "12", "13"]);

        let header = classifier().classify("T13Q7: Level 3+ (L.G. 11, L.G. 12)");
        let Some(SlideHeader::Question { learning_goals, .. }) = header else {
            panic!("expected question header, got {:?}", header);
        };
        assert_eq!(learning_goals, vec!["11", "12"]);
    }

    #[test]
    fn test_split_page() {
        let (header, body) = split_page("\n\n  T1Q1: Solution \n  body line\n\n").unwrap();
        assert_eq!(header, "T1Q1: Solution");
        assert_eq!(body, "body line");

        assert!(split_page("").is_none());
        assert!(split_page("   \n \n").is_none());
    }
}
