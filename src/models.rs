use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of slide a page was classified as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    Question,
    Solution,
    ChallengeQuestion,
    ChallengeSolution,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::Question => "question",
            EntryKind::Solution => "solution",
            EntryKind::ChallengeQuestion => "challenge_question",
            EntryKind::ChallengeSolution => "challenge_solution",
        }
    }

    pub fn is_challenge(&self) -> bool {
        matches!(self, EntryKind::ChallengeQuestion | EntryKind::ChallengeSolution)
    }
}

/// One classified page, emitted by the extractor in page order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub kind: EntryKind,
    pub topic: u32,
    /// 0 for challenge kinds
    pub qnum: u32,
    /// 1-based page index in the source document
    pub page: u32,
    pub text: String,
    /// Question kind only
    pub level: Option<u8>,
    /// Question kind only
    pub learning_goals: Option<Vec<String>>,
}

/// Identity of a record in the bank
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QuestionKey {
    pub topic: u32,
    pub qnum: u32,
    pub is_challenge: bool,
}

impl fmt::Display for QuestionKey {
    /// `T<topic>-Q<qnum>-C<0|1>`, used for used-set tracking and reports
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}-Q{}-C{}", self.topic, self.qnum, u8::from(self.is_challenge))
    }
}

/// A reconciled question (or challenge) and its optional solution
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Question {
    pub topic: u32,
    pub qnum: u32,
    pub is_challenge: bool,
    #[serde(default)]
    pub question_text: Option<String>,
    #[serde(default)]
    pub solution_text: Option<String>,
    #[serde(default)]
    pub question_page: Option<u32>,
    #[serde(default)]
    pub solution_page: Option<u32>,
    /// 1-4, non-challenge questions only
    #[serde(default)]
    pub level: Option<u8>,
    #[serde(default)]
    pub learning_goals: Option<Vec<String>>,
}

impl Question {
    pub fn new(topic: u32, qnum: u32, is_challenge: bool) -> Self {
        Self {
            topic,
            qnum,
            is_challenge,
            question_text: None,
            solution_text: None,
            question_page: None,
            solution_page: None,
            level: None,
            learning_goals: None,
        }
    }

    pub fn key(&self) -> QuestionKey {
        QuestionKey {
            topic: self.topic,
            qnum: self.qnum,
            is_challenge: self.is_challenge,
        }
    }

    /// Stable external identifier, e.g. `T13-Q7-C0`
    pub fn id(&self) -> String {
        self.key().to_string()
    }

    /// Short human label: `T13Q7` or `T13 challenge`
    pub fn label(&self) -> String {
        if self.is_challenge {
            format!("T{} challenge", self.topic)
        } else {
            format!("T{}Q{}", self.topic, self.qnum)
        }
    }

    pub fn has_goal_in<'a, I>(&self, codes: I) -> bool
    where
        I: IntoIterator<Item = &'a String>,
    {
        let Some(goals) = self.learning_goals.as_ref() else {
            return false;
        };
        codes.into_iter().any(|code| goals.contains(code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_question_id_format() {
        let q = Question::new(13, 7, false);
        assert_eq!(q.id(), "T13-Q7-C0");

        let c = Question::new(5, 0, true);
        assert_eq!(c.id(), "T5-Q0-C1");
    }

    #[test]
    fn test_entry_kind_challenge_flag() {
        assert!(!EntryKind::Question.is_challenge());
        assert!(!EntryKind::Solution.is_challenge());
        assert!(EntryKind::ChallengeQuestion.is_challenge());
        assert!(EntryKind::ChallengeSolution.is_challenge());
    }

    #[test]
    fn test_has_goal_in() {
        let mut q = Question::new(1, 1, false);
        let wanted = vec!["3".to_string()];
        assert!(!q.has_goal_in(&wanted));

        q.learning_goals = Some(vec!["2".to_string(), "3".to_string()]);
        assert!(q.has_goal_in(&wanted));
        assert!(!q.has_goal_in(&vec!["9".to_string()]));
    }

    #[test]
    fn test_question_rejects_unknown_fields() {
        let json = r#"{"topic":1,"qnum":1,"is_challenge":false,"difficulty":3}"#;
        assert!(serde_json::from_str::<Question>(json).is_err());
    }

    #[test]
    fn test_question_accepts_absent_optionals() {
        let json = r#"{"topic":1,"qnum":2,"is_challenge":false}"#;
        let q: Question = serde_json::from_str(json).unwrap();
        assert_eq!(q, Question::new(1, 2, false));
    }
}
