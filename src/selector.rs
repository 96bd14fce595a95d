//! Declarative filtering of the question bank
//!
//! Rules, applied in order:
//! - challenge records are dropped unless `include_challenges`
//! - the topic filter applies to every record
//! - the level filter applies to non-challenge records only
//! - the learning-goal filter applies to every record (any overlap)
//! - page-presence requirements drop records missing that half
//!
//! Output is sorted by topic, then regular before challenge, then question number.

use std::collections::BTreeSet;

use crate::models::Question;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionFilter {
    /// `None` means no topic restriction
    pub topics: Option<BTreeSet<u32>>,
    pub levels: Option<BTreeSet<u8>>,
    pub learning_goals: Option<BTreeSet<String>>,
    pub include_challenges: bool,
    pub require_question_page: bool,
    pub require_solution_page: bool,
}

impl Default for SelectionFilter {
    fn default() -> Self {
        Self {
            topics: None,
            levels: None,
            learning_goals: None,
            include_challenges: true,
            require_question_page: true,
            require_solution_page: true,
        }
    }
}

impl SelectionFilter {
    pub fn matches(&self, q: &Question) -> bool {
        if q.is_challenge && !self.include_challenges {
            return false;
        }

        if let Some(topics) = &self.topics {
            if !topics.contains(&q.topic) {
                return false;
            }
        }

        if let Some(levels) = &self.levels {
            if !q.is_challenge && !q.level.is_some_and(|level| levels.contains(&level)) {
                return false;
            }
        }

        if let Some(goals) = &self.learning_goals {
            if !q.has_goal_in(goals) {
                return false;
            }
        }

        if self.require_question_page && q.question_page.is_none() {
            return false;
        }

        if self.require_solution_page && q.solution_page.is_none() {
            return false;
        }

        true
    }
}

/// Filter the bank and return matches in canonical order
pub fn select<'a>(questions: &'a [Question], filter: &SelectionFilter) -> Vec<&'a Question> {
    let mut selected: Vec<&Question> = questions.iter().filter(|q| filter.matches(q)).collect();
    selected.sort_by_key(|q| (q.topic, q.is_challenge, q.qnum));
    selected
}
