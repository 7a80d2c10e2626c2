use serde::Serialize;
use std::collections::BTreeMap;

use quiz_core::model::{Difficulty, QuizResult};
use quiz_core::scoring::{self, Tally};

/// Number of recent results included in [`ResultAggregates`].
pub const RECENT_RESULTS: usize = 5;

/// Summary over a set of results.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResultAggregates {
    pub count: usize,
    pub average_score: u8,
    pub best_score: u8,
    /// Newest first.
    pub recent: Vec<QuizResult>,
}

/// Answered/correct counts for one category or difficulty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct BucketStat {
    pub total: usize,
    pub correct: usize,
    pub percentage: u8,
}

impl From<Tally> for BucketStat {
    fn from(tally: Tally) -> Self {
        Self {
            total: tally.total,
            correct: tally.correct,
            percentage: tally.percentage(),
        }
    }
}

pub(crate) fn aggregates<'a>(
    results: impl IntoIterator<Item = &'a QuizResult>,
    recent: usize,
) -> ResultAggregates {
    let mut sorted: Vec<&QuizResult> = results.into_iter().collect();
    sorted.sort_by(|a, b| b.completed_at().cmp(&a.completed_at()));

    ResultAggregates {
        count: sorted.len(),
        average_score: scoring::average(sorted.iter().map(|r| r.score())),
        best_score: sorted.iter().map(|r| r.score()).max().unwrap_or(0),
        recent: sorted.into_iter().take(recent).cloned().collect(),
    }
}

/// Tallies every snapshot entry under `key`. Unanswered entries register the
/// bucket without counting towards its total.
fn breakdown<'a, K: Ord>(
    results: impl IntoIterator<Item = &'a QuizResult>,
    key: impl Fn(&quiz_core::model::Question) -> K,
) -> BTreeMap<K, BucketStat> {
    let mut tallies: BTreeMap<K, Tally> = BTreeMap::new();
    for entry in results.into_iter().flat_map(QuizResult::entries) {
        let tally = tallies.entry(key(entry.question())).or_default();
        if let Some(answer) = entry.answer() {
            tally.record(answer.is_correct());
        }
    }
    tallies.into_iter().map(|(k, t)| (k, t.into())).collect()
}

pub(crate) fn by_category<'a>(
    results: impl IntoIterator<Item = &'a QuizResult>,
) -> BTreeMap<String, BucketStat> {
    breakdown(results, |q| q.category().to_string())
}

pub(crate) fn by_difficulty<'a>(
    results: impl IntoIterator<Item = &'a QuizResult>,
) -> BTreeMap<Difficulty, BucketStat> {
    breakdown(results, quiz_core::model::Question::difficulty)
}
