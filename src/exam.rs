//! Exam planning: presets, select-then-sample, output naming

use rand::Rng;
use std::collections::BTreeSet;

use crate::error::{BankError, Result};
use crate::models::Question;
use crate::sampler;
use crate::selector::{self, SelectionFilter};
use crate::settings::ExamPresetConfig;

/// How many questions an exam should have
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExamSize {
    Count(usize),
    /// Every matching question (every unused one when avoiding used questions)
    AllMatching,
}

#[derive(Debug, Clone)]
pub struct ExamRequest {
    pub filter: SelectionFilter,
    pub size: ExamSize,
    pub avoid_used: bool,
}

#[derive(Debug, Clone)]
pub struct ExamPlan<'a> {
    /// Questions passing the filter
    pub matched: usize,
    /// Of those, how many are not in the caller's used set
    pub unused_matched: usize,
    pub selected: Vec<&'a Question>,
    pub used: BTreeSet<String>,
    pub requested: usize,
    pub shortfall: usize,
}

/// Filter the bank, then sample evenly by topic
pub fn plan_exam<'a, R: Rng + ?Sized>(
    bank: &'a [Question],
    request: &ExamRequest,
    used: &BTreeSet<String>,
    rng: &mut R,
) -> ExamPlan<'a> {
    let pool = selector::select(bank, &request.filter);
    let unused_matched = pool.iter().filter(|q| !used.contains(&q.id())).count();

    let n = match request.size {
        ExamSize::Count(n) => n,
        ExamSize::AllMatching if request.avoid_used => unused_matched,
        ExamSize::AllMatching => pool.len(),
    };

    let outcome = sampler::sample_even_by_topic(&pool, n, used, request.avoid_used, rng);
    tracing::info!(
        matched = pool.len(),
        unused_matched,
        requested = n,
        selected = outcome.selected.len(),
        "planned exam"
    );

    ExamPlan {
        matched: pool.len(),
        unused_matched,
        selected: outcome.selected,
        used: outcome.used,
        requested: outcome.requested,
        shortfall: outcome.shortfall,
    }
}

/// Find a preset by name, ignoring case and spaces ("exam1" finds "Exam 1")
pub fn find_preset<'a>(presets: &'a [ExamPresetConfig], name: &str) -> Result<&'a ExamPresetConfig> {
    let wanted = compact(name);
    presets
        .iter()
        .find(|p| compact(&p.name) == wanted)
        .ok_or_else(|| BankError::UnknownPreset(name.to_string()))
}

/// Topics of the preset's range that actually occur in the bank
pub fn preset_topics(preset: &ExamPresetConfig, bank: &[Question]) -> BTreeSet<u32> {
    bank.iter()
        .map(|q| q.topic)
        .filter(|t| (preset.first_topic..=preset.last_topic).contains(t))
        .collect()
}

/// "Exam 1" -> "exam1"
pub fn preset_label(preset: &ExamPresetConfig) -> String {
    compact(&preset.name)
}

fn compact(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect::<String>().to_lowercase()
}

/// Parts of a suggested output name
#[derive(Debug, Clone, Default)]
pub struct NameParts<'a> {
    pub user: Option<&'a str>,
    pub preset_label: Option<&'a str>,
    pub topics: Option<&'a BTreeSet<u32>>,
    pub levels: Option<&'a BTreeSet<u8>>,
    pub learning_goals: Option<&'a BTreeSet<String>>,
}

/// Build a file stem summarizing the filters, e.g.
/// `practice_questions_alice_exam3_L1-2_12questions`
pub fn suggested_name(parts: &NameParts<'_>, size: ExamSize) -> String {
    let mut name = vec!["practice_questions".to_string()];

    if let Some(user) = parts.user {
        let safe: String = user
            .to_lowercase()
            .chars()
            .filter(|c| c.is_alphanumeric() || *c == '-' || *c == '_')
            .collect();
        if !safe.is_empty() {
            name.push(safe);
        }
    }

    match (parts.preset_label, parts.topics) {
        (Some(label), _) => name.push(label.to_string()),
        (None, Some(topics)) if !topics.is_empty() => name.push(format!("T{}", join(topics))),
        _ => {}
    }

    if let Some(levels) = parts.levels.filter(|l| !l.is_empty()) {
        name.push(format!("L{}", join(levels)));
    }

    if let Some(goals) = parts.learning_goals.filter(|g| !g.is_empty()) {
        name.push(format!("LG{}", join(goals)));
    }

    name.push(match size {
        ExamSize::Count(n) => format!("{}questions", n),
        ExamSize::AllMatching => "all_questions".to_string(),
    });

    name.join("_")
}

fn join<T: ToString>(items: impl IntoIterator<Item = T>) -> String {
    items.into_iter().map(|i| i.to_string()).collect::<Vec<_>>().join("-")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn bank() -> Vec<Question> {
        let mut bank = Vec::new();
        for topic in [1, 2, 7] {
            for qnum in 1..=3 {
                let mut q = Question::new(topic, qnum, false);
                q.level = Some(qnum as u8);
                q.question_page = Some(topic * 10 + qnum);
                q.solution_page = Some(topic * 10 + qnum + 5);
                bank.push(q);
            }
        }
        bank
    }

    fn presets() -> Vec<ExamPresetConfig> {
        vec![ExamPresetConfig { name: "Exam 1".to_string(), first_topic: 1, last_topic: 6 }]
    }

    #[test]
    fn test_plan_exam_count() {
        let bank = bank();
        let request = ExamRequest {
            filter: SelectionFilter::default(),
            size: ExamSize::Count(6),
            avoid_used: true,
        };
        let mut rng = StdRng::seed_from_u64(5);
        let plan = plan_exam(&bank, &request, &BTreeSet::new(), &mut rng);

        assert_eq!(plan.matched, 9);
        assert_eq!(plan.selected.len(), 6);
        assert_eq!(plan.shortfall, 0);
        for topic in [1, 2, 7] {
            assert_eq!(plan.selected.iter().filter(|q| q.topic == topic).count(), 2);
        }
    }

    #[test]
    fn test_all_matching_uses_unused_count() {
        let bank = bank();
        let used = BTreeSet::from(["T1-Q1-C0".to_string(), "T7-Q3-C0".to_string()]);
        let request = ExamRequest {
            filter: SelectionFilter::default(),
            size: ExamSize::AllMatching,
            avoid_used: true,
        };
        let mut rng = StdRng::seed_from_u64(5);
        let plan = plan_exam(&bank, &request, &used, &mut rng);

        assert_eq!(plan.unused_matched, 7);
        assert_eq!(plan.requested, 7);
        assert_eq!(plan.selected.len(), 7);
        assert_eq!(plan.used.len(), 9);
    }

    #[test]
    fn test_all_matching_without_avoid_takes_everything() {
        let bank = bank();
        let used = BTreeSet::from(["T1-Q1-C0".to_string()]);
        let request = ExamRequest {
            filter: SelectionFilter::default(),
            size: ExamSize::AllMatching,
            avoid_used: false,
        };
        let mut rng = StdRng::seed_from_u64(5);
        let plan = plan_exam(&bank, &request, &used, &mut rng);
        assert_eq!(plan.selected.len(), 9);
    }

    #[test]
    fn test_exhausted_pool_reports_shortfall() {
        let bank = bank();
        let used: BTreeSet<String> = bank.iter().map(|q| q.id()).collect();
        let request = ExamRequest {
            filter: SelectionFilter::default(),
            size: ExamSize::Count(4),
            avoid_used: true,
        };
        let mut rng = StdRng::seed_from_u64(5);
        let plan = plan_exam(&bank, &request, &used, &mut rng);
        assert!(plan.selected.is_empty());
        assert_eq!(plan.shortfall, 4);
    }

    #[test]
    fn test_find_preset() {
        let presets = presets();
        assert_eq!(find_preset(&presets, "exam1").unwrap().name, "Exam 1");
        assert_eq!(find_preset(&presets, "EXAM 1").unwrap().name, "Exam 1");
        assert!(matches!(find_preset(&presets, "Exam 9"), Err(BankError::UnknownPreset(_))));
    }

    #[test]
    fn test_preset_topics_present_in_bank() {
        let presets = presets();
        assert_eq!(preset_topics(&presets[0], &bank()), BTreeSet::from([1, 2]));
        assert_eq!(preset_label(&presets[0]), "exam1");
    }

    #[test]
    fn test_suggested_name() {
        let topics = BTreeSet::from([13, 14]);
        let levels = BTreeSet::from([1, 2]);
        let goals = BTreeSet::from(["4".to_string()]);

        let custom = NameParts {
            user: Some("Jane Doe"),
            topics: Some(&topics),
            levels: Some(&levels),
            learning_goals: Some(&goals),
            ..NameParts::default()
        };
        assert_eq!(
            suggested_name(&custom, ExamSize::Count(12)),
            "practice_questions_janedoe_T13-14_L1-2_LG4_12questions"
        );

        let preset = NameParts { preset_label: Some("exam3"), topics: Some(&topics), ..NameParts::default() };
        assert_eq!(suggested_name(&preset, ExamSize::AllMatching), "practice_questions_exam3_all_questions");
    }
}
