//! A single poll's mutable aggregate state: tally plus the derived
//! cumulative time series used for step-function plotting.

use std::collections::HashMap;

use serde::Serialize;

use crate::event::QuestionAnnounced;

/// One point of a cumulative series: seconds since the poll's first
/// accepted vote, and the cumulative count at that instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Sample {
    pub elapsed_secs: f64,
    pub count: u64,
}

/// One question with its ordered choices and accumulated vote state.
///
/// Created only by a question announcement, never deleted, mutated only
/// by accepted votes. The choice list preserves duplicates as declared;
/// the tally and series maps collapse duplicate texts to a single
/// counter, matching the deployed dashboards.
#[derive(Debug, Clone)]
pub struct Poll {
    pub question: String,
    pub choices: Vec<String>,
    pub(crate) tally: HashMap<String, u64>,
    pub(crate) first_vote_ts: Option<f64>,
    pub(crate) total_series: Vec<Sample>,
    pub(crate) per_choice_series: HashMap<String, Vec<Sample>>,
}

impl Poll {
    pub(crate) fn new(announced: QuestionAnnounced) -> Self {
        let tally = announced.choices.iter().map(|c| (c.clone(), 0)).collect();
        let per_choice_series = announced
            .choices
            .iter()
            .map(|c| (c.clone(), Vec::new()))
            .collect();
        Self {
            question: announced.question,
            choices: announced.choices,
            tally,
            first_vote_ts: None,
            total_series: Vec::new(),
            per_choice_series,
        }
    }

    pub fn has_choice(&self, choice: &str) -> bool {
        self.tally.contains_key(choice)
    }

    pub fn total_votes(&self) -> u64 {
        self.tally.values().sum()
    }

    /// Counts one vote for `choice` and appends the derived samples.
    /// The caller has already validated choice membership, so tally and
    /// series mutate together or not at all.
    pub(crate) fn apply_vote(&mut self, choice: &str, timestamp: f64) {
        if let Some(count) = self.tally.get_mut(choice) {
            *count += 1;
        } else {
            // Membership is checked before any mutation; reaching this
            // arm would mean the registry skipped validation.
            log::error!(
                "vote for undeclared choice {:?} reached poll {:?}",
                choice,
                self.question
            );
            return;
        }
        self.record(timestamp);
    }

    /// Appends one sample per series for the vote just counted.
    ///
    /// Elapsed time is anchored to the first accepted vote, floored at
    /// zero, and clamped to the previous sample so the series stays
    /// non-decreasing even when voter clocks run backwards. Equal
    /// elapsed values are preserved in arrival order.
    fn record(&mut self, timestamp: f64) {
        let first = *self.first_vote_ts.get_or_insert(timestamp);
        let mut elapsed = (timestamp - first).max(0.0);
        if let Some(last) = self.total_series.last() {
            if elapsed < last.elapsed_secs {
                elapsed = last.elapsed_secs;
            }
        }

        self.total_series.push(Sample {
            elapsed_secs: elapsed,
            count: self.total_votes(),
        });

        // Every declared choice gets a sample, not just the voted one,
        // so a renderer can step-plot with last observation held.
        for (choice, series) in self.per_choice_series.iter_mut() {
            series.push(Sample {
                elapsed_secs: elapsed,
                count: self.tally[choice],
            });
        }
    }
}
