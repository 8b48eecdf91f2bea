//! Read-only views handed to consumers. Owned copies: a renderer can
//! hold one as long as it likes without blocking ingestion or observing
//! a partial update.

use std::collections::HashMap;

use serde::Serialize;

use crate::poll::{Poll, Sample};

/// Immutable point-in-time copy of one poll's aggregate state. This is
/// the only surface a rendering/CLI/HTTP layer may consume.
#[derive(Debug, Clone, Serialize)]
pub struct PollView {
    pub index: usize,
    pub question: String,
    pub choices: Vec<String>,
    pub tally: HashMap<String, u64>,
    pub total_votes: u64,
    /// Display percentages, one decimal, 0.0 across the board until the
    /// first vote. Internal counters stay exact integers.
    pub percentages: HashMap<String, f64>,
    pub total_series: Vec<Sample>,
    pub per_choice_series: HashMap<String, Vec<Sample>>,
}

/// One line of a poll listing.
#[derive(Debug, Clone, Serialize)]
pub struct PollSummary {
    pub index: usize,
    pub question: String,
    pub total_votes: u64,
}

impl PollView {
    pub(crate) fn from_poll(index: usize, poll: &Poll) -> Self {
        let total = poll.total_votes();
        let percentages = poll
            .tally
            .iter()
            .map(|(choice, &count)| (choice.clone(), percentage(count, total)))
            .collect();

        Self {
            index,
            question: poll.question.clone(),
            choices: poll.choices.clone(),
            tally: poll.tally.clone(),
            total_votes: total,
            percentages,
            total_series: poll.total_series.clone(),
            per_choice_series: poll.per_choice_series.clone(),
        }
    }
}

/// Share of `count` in `total` as a percentage rounded to one decimal,
/// division-safe at zero.
fn percentage(count: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let raw = 100.0 * count as f64 / total as f64;
    (raw * 10.0).round() / 10.0
}
