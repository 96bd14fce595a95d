//! Question bank extraction and practice-exam generation for tagged slide decks

pub mod bank;
pub mod classifier;
pub mod error;
pub mod exam;
pub mod extractor;
pub mod goals;
pub mod models;
pub mod pdf;
pub mod report;
pub mod sampler;
pub mod selector;
pub mod settings;
pub mod usage;

pub use error::{BankError, PdfError};
pub use models::{Entry, EntryKind, Question, QuestionKey};

#[cfg(test)]
mod tests {
    use crate::bank::build_bank;
    use crate::classifier::SlideClassifier;
    use crate::extractor::extract_entries;
    use crate::settings::HeaderConfig;

    #[test]
    fn test_two_page_deck_end_to_end() {
        let classifier = SlideClassifier::new(HeaderConfig::default()).unwrap();
        let pages = ["T13Q7: Level 3+ (L.G. 11)\nWhich acid is strongest?", "T13Q7: Solution\nHCl"];

        let bank = build_bank(&extract_entries(&classifier, &pages));

        assert_eq!(bank.len(), 1);
        let q = &bank[0];
        assert_eq!((q.topic, q.qnum, q.level), (13, 7, Some(3)));
        assert_eq!(q.learning_goals, Some(vec!["11".to_string()]));
        assert_eq!(q.question_page, Some(1));
        assert_eq!(q.solution_page, Some(2));
        assert!(!q.is_challenge);
        assert_eq!(q.solution_text.as_deref(), Some("HCl"));
    }
}
