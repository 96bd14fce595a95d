//! Even-by-topic random sampling
//!
//! Slots are handed out round-robin over the sorted topic list, one per topic
//! per sweep, until `n` slots are allocated or every topic is exhausted. Each
//! topic then draws its share uniformly without replacement and the combined
//! draw is shuffled so the output is not grouped by topic.

use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::{BTreeMap, BTreeSet};

use crate::models::Question;

/// Result of one sampling call
#[derive(Debug, Clone)]
pub struct SampleOutcome<'a> {
    pub selected: Vec<&'a Question>,
    /// Caller's used-set plus everything in `selected`
    pub used: BTreeSet<String>,
    pub requested: usize,
    /// How many fewer than `requested` were available
    pub shortfall: usize,
}

impl SampleOutcome<'_> {
    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }
}

/// Candidates the sampler will consider: those with a question page and,
/// when `avoid_used` is set, not already in `used`
pub fn candidates<'a>(
    pool: &[&'a Question],
    used: &BTreeSet<String>,
    avoid_used: bool,
) -> Vec<&'a Question> {
    pool.iter()
        .copied()
        .filter(|q| q.question_page.is_some())
        .filter(|q| !avoid_used || !used.contains(&q.id()))
        .collect()
}

/// Round-robin slot allocation. `capacities` maps topic -> candidate count.
/// Never grants a topic more than its capacity.
pub fn allocate_by_topic(capacities: &BTreeMap<u32, usize>, n: usize) -> BTreeMap<u32, usize> {
    let mut allocation: BTreeMap<u32, usize> = capacities.keys().map(|&t| (t, 0)).collect();
    let mut remaining = n;

    while remaining > 0 {
        let mut progressed = false;
        for (topic, &capacity) in capacities {
            if remaining == 0 {
                break;
            }
            let granted = allocation.entry(*topic).or_default();
            if *granted < capacity {
                *granted += 1;
                remaining -= 1;
                progressed = true;
            }
        }
        if !progressed {
            break;
        }
    }

    allocation
}

/// Pick at most `n` questions spread evenly across topics, in random order
pub fn sample_even_by_topic<'a, R: Rng + ?Sized>(
    pool: &[&'a Question],
    n: usize,
    used: &BTreeSet<String>,
    avoid_used: bool,
    rng: &mut R,
) -> SampleOutcome<'a> {
    let candidates = candidates(pool, used, avoid_used);
    if candidates.is_empty() {
        return SampleOutcome {
            selected: Vec::new(),
            used: used.clone(),
            requested: n,
            shortfall: n,
        };
    }

    let target = n.min(candidates.len());

    let mut by_topic: BTreeMap<u32, Vec<&'a Question>> = BTreeMap::new();
    for q in candidates {
        by_topic.entry(q.topic).or_default().push(q);
    }

    let capacities: BTreeMap<u32, usize> = by_topic.iter().map(|(t, qs)| (*t, qs.len())).collect();
    let allocation = allocate_by_topic(&capacities, target);

    let mut selected: Vec<&'a Question> = Vec::with_capacity(target);
    for (topic, questions) in &by_topic {
        let take = allocation.get(topic).copied().unwrap_or(0);
        if take == 0 {
            continue;
        }
        selected.extend(questions.choose_multiple(rng, take).copied());
    }
    selected.shuffle(rng);

    let mut updated = used.clone();
    updated.extend(selected.iter().map(|q| q.id()));

    if selected.len() < n {
        tracing::warn!(requested = n, selected = selected.len(), "fewer questions available than requested");
    }

    SampleOutcome {
        shortfall: n - selected.len(),
        requested: n,
        selected,
        used: updated,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn pool_with_counts(counts: &[(u32, u32)]) -> Vec<Question> {
        let mut pool = Vec::new();
        for &(topic, count) in counts {
            for qnum in 1..=count {
                let mut q = Question::new(topic, qnum, false);
                q.question_page = Some(topic * 100 + qnum);
                pool.push(q);
            }
        }
        pool
    }

    fn per_topic(selected: &[&Question]) -> BTreeMap<u32, usize> {
        let mut counts = BTreeMap::new();
        for q in selected {
            *counts.entry(q.topic).or_default() += 1;
        }
        counts
    }

    #[test]
    fn test_allocation_even_split() {
        let caps = BTreeMap::from([(1, 5), (2, 5), (3, 5)]);
        assert_eq!(allocate_by_topic(&caps, 9), BTreeMap::from([(1, 3), (2, 3), (3, 3)]));
    }

    #[test]
    fn test_allocation_respects_small_topic() {
        let caps = BTreeMap::from([(1, 1), (2, 5), (3, 5)]);
        assert_eq!(allocate_by_topic(&caps, 9), BTreeMap::from([(1, 1), (2, 4), (3, 4)]));
    }

    #[test]
    fn test_allocation_remainder_spread_one_per_topic() {
        let caps = BTreeMap::from([(1, 10), (2, 10), (3, 10)]);
        assert_eq!(allocate_by_topic(&caps, 5), BTreeMap::from([(1, 2), (2, 2), (3, 1)]));
    }

    #[test]
    fn test_allocation_stops_when_exhausted() {
        let caps = BTreeMap::from([(1, 1), (2, 2)]);
        assert_eq!(allocate_by_topic(&caps, 10), BTreeMap::from([(1, 1), (2, 2)]));
    }

    #[test]
    fn test_sample_even_by_topic_counts() {
        let bank = pool_with_counts(&[(1, 1), (2, 5), (3, 5)]);
        let pool: Vec<&Question> = bank.iter().collect();
        let mut rng = StdRng::seed_from_u64(7);

        let outcome = sample_even_by_topic(&pool, 9, &BTreeSet::new(), true, &mut rng);
        assert_eq!(outcome.selected.len(), 9);
        assert_eq!(outcome.shortfall, 0);
        assert_eq!(per_topic(&outcome.selected), BTreeMap::from([(1, 1), (2, 4), (3, 4)]));

        let ids: BTreeSet<String> = outcome.selected.iter().map(|q| q.id()).collect();
        assert_eq!(ids.len(), 9, "no question drawn twice");
        assert_eq!(outcome.used, ids);
    }

    #[test]
    fn test_sample_never_exceeds_pool() {
        let bank = pool_with_counts(&[(1, 2), (2, 1)]);
        let pool: Vec<&Question> = bank.iter().collect();
        let mut rng = StdRng::seed_from_u64(1);

        let outcome = sample_even_by_topic(&pool, 50, &BTreeSet::new(), false, &mut rng);
        assert_eq!(outcome.selected.len(), 3);
        assert_eq!(outcome.requested, 50);
        assert_eq!(outcome.shortfall, 47);
    }

    #[test]
    fn test_avoid_used_excludes_and_extends_used_set() {
        let bank = pool_with_counts(&[(1, 3), (2, 3)]);
        let pool: Vec<&Question> = bank.iter().collect();
        let used = BTreeSet::from(["T1-Q1-C0".to_string(), "T2-Q2-C0".to_string()]);
        let mut rng = StdRng::seed_from_u64(42);

        let outcome = sample_even_by_topic(&pool, 10, &used, true, &mut rng);
        assert_eq!(outcome.selected.len(), 4);
        for q in &outcome.selected {
            assert!(!used.contains(&q.id()));
            assert!(outcome.used.contains(&q.id()));
        }
        assert!(outcome.used.is_superset(&used));
        assert_eq!(outcome.used.len(), 6);
    }

    #[test]
    fn test_used_ignored_when_not_avoiding() {
        let bank = pool_with_counts(&[(1, 2)]);
        let pool: Vec<&Question> = bank.iter().collect();
        let used: BTreeSet<String> = bank.iter().map(|q| q.id()).collect();
        let mut rng = StdRng::seed_from_u64(3);

        let outcome = sample_even_by_topic(&pool, 2, &used, false, &mut rng);
        assert_eq!(outcome.selected.len(), 2);
        assert_eq!(outcome.used, used);
    }

    #[test]
    fn test_questions_without_page_are_never_drawn() {
        let mut bank = pool_with_counts(&[(1, 2)]);
        bank[0].question_page = None;
        let pool: Vec<&Question> = bank.iter().collect();
        let mut rng = StdRng::seed_from_u64(9);

        let outcome = sample_even_by_topic(&pool, 2, &BTreeSet::new(), true, &mut rng);
        assert_eq!(outcome.selected.len(), 1);
        assert_eq!(outcome.selected[0].qnum, 2);
    }

    #[test]
    fn test_empty_pool_returns_input_used_set() {
        let used = BTreeSet::from(["T1-Q1-C0".to_string()]);
        let mut rng = StdRng::seed_from_u64(0);
        let outcome = sample_even_by_topic(&[], 5, &used, true, &mut rng);
        assert!(outcome.is_empty());
        assert_eq!(outcome.used, used);
        assert_eq!(outcome.shortfall, 5);
    }

    #[test]
    fn test_same_seed_same_draw() {
        let bank = pool_with_counts(&[(1, 6), (2, 6)]);
        let pool: Vec<&Question> = bank.iter().collect();

        let draw = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            sample_even_by_topic(&pool, 5, &BTreeSet::new(), true, &mut rng)
                .selected
                .iter()
                .map(|q| q.id())
                .collect::<Vec<_>>()
        };
        assert_eq!(draw(11), draw(11));
    }
}
