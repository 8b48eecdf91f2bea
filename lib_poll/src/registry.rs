//! The source of truth: an ordered collection of polls behind a single
//! lock, with all mutation and reads running under exclusive critical
//! sections so a concurrent reader can never tear a tally apart from
//! its series samples.

use std::sync::{Arc, Mutex};

use crate::error::{RegistryError, VoteError};
use crate::event::{QuestionAnnounced, VoteCast};
use crate::poll::Poll;
use crate::snapshot::{PollSummary, PollView};

/// Stable zero-based identity of a poll, assigned at first announcement.
pub type PollIndex = usize;

/// Cheaply cloneable handle to the shared poll state. One clone lives in
/// the ingestion task, others in whatever consumers pull snapshots.
///
/// A `std::sync::Mutex` is enough here: nothing awaits or does I/O under
/// the lock, and every operation is O(polls) or O(choices).
#[derive(Clone, Default)]
pub struct PollRegistry {
    polls: Arc<Mutex<Vec<Poll>>>,
}

impl PollRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a question, idempotently.
    ///
    /// The deployed publishers rebroadcast identical question payloads,
    /// so an exact question-text match returns the existing index and
    /// leaves its tally and series untouched. Only a new text appends a
    /// poll.
    pub fn announce(&self, announced: QuestionAnnounced) -> PollIndex {
        let mut polls = self.polls.lock().expect("poll registry lock poisoned");

        if let Some(idx) = polls.iter().position(|p| p.question == announced.question) {
            log::debug!(
                "re-announcement of poll {} ({:?}), keeping existing state",
                idx,
                announced.question
            );
            return idx;
        }

        let idx = polls.len();
        log::info!(
            "new poll {} ({:?}) with {} choices",
            idx,
            announced.question,
            announced.choices.len()
        );
        polls.push(Poll::new(announced));
        idx
    }

    /// Counts one vote, resolving the target poll by exact question
    /// text. Validation happens before any mutation; a rejected vote
    /// leaves every poll untouched. Tally increment and series append
    /// happen under the same lock acquisition.
    pub fn apply_vote(&self, vote: &VoteCast) -> Result<PollIndex, VoteError> {
        let mut polls = self.polls.lock().expect("poll registry lock poisoned");

        let idx = polls
            .iter()
            .position(|p| p.question == vote.question)
            .ok_or_else(|| VoteError::UnknownPoll(vote.question.clone()))?;

        if !polls[idx].has_choice(&vote.choice) {
            return Err(VoteError::UnknownChoice {
                question: vote.question.clone(),
                choice: vote.choice.clone(),
            });
        }

        polls[idx].apply_vote(&vote.choice, vote.timestamp);
        Ok(idx)
    }

    pub fn count(&self) -> usize {
        self.polls.lock().expect("poll registry lock poisoned").len()
    }

    /// Owned copy of one poll's record. Prefer [`PollRegistry::snapshot`]
    /// for rendering; this is for callers that only need the identity
    /// fields.
    pub fn get(&self, idx: PollIndex) -> Result<Poll, RegistryError> {
        let polls = self.polls.lock().expect("poll registry lock poisoned");
        polls.get(idx).cloned().ok_or(RegistryError::NotFound(idx))
    }

    /// Returns an immutable point-in-time copy of one poll's aggregate
    /// state. Taken under the registry lock, so it reflects a state
    /// that existed at a single instant.
    pub fn snapshot(&self, idx: PollIndex) -> Result<PollView, RegistryError> {
        let polls = self.polls.lock().expect("poll registry lock poisoned");
        polls
            .get(idx)
            .map(|p| PollView::from_poll(idx, p))
            .ok_or(RegistryError::NotFound(idx))
    }

    /// One-line summaries of every poll, for listings.
    pub fn summaries(&self) -> Vec<PollSummary> {
        let polls = self.polls.lock().expect("poll registry lock poisoned");
        polls
            .iter()
            .enumerate()
            .map(|(idx, p)| PollSummary {
                index: idx,
                question: p.question.clone(),
                total_votes: p.total_votes(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn announce(registry: &PollRegistry, question: &str, choices: &[&str]) -> PollIndex {
        registry.announce(QuestionAnnounced {
            question: question.to_string(),
            choices: choices.iter().map(|c| c.to_string()).collect(),
        })
    }

    fn vote(question: &str, choice: &str, timestamp: f64) -> VoteCast {
        VoteCast {
            question: question.to_string(),
            choice: choice.to_string(),
            voter_id: None,
            timestamp,
        }
    }

    #[test]
    fn two_vote_scenario_matches_expected_series() {
        let registry = PollRegistry::new();
        let idx = announce(&registry, "Color?", &["Red", "Blue"]);
        assert_eq!(idx, 0);

        let view = registry.snapshot(0).unwrap();
        assert_eq!(view.tally["Red"], 0);
        assert_eq!(view.tally["Blue"], 0);

        registry.apply_vote(&vote("Color?", "Red", 100.0)).unwrap();
        let view = registry.snapshot(0).unwrap();
        assert_eq!(view.tally["Red"], 1);
        assert_eq!(view.tally["Blue"], 0);
        assert_eq!(view.total_series.len(), 1);
        assert_eq!(view.total_series[0].elapsed_secs, 0.0);
        assert_eq!(view.total_series[0].count, 1);
        assert_eq!(view.per_choice_series["Red"][0].count, 1);
        assert_eq!(view.per_choice_series["Blue"][0].count, 0);

        registry.apply_vote(&vote("Color?", "Blue", 105.0)).unwrap();
        let view = registry.snapshot(0).unwrap();
        assert_eq!(view.tally["Red"], 1);
        assert_eq!(view.tally["Blue"], 1);
        let series: Vec<(f64, u64)> = view
            .total_series
            .iter()
            .map(|s| (s.elapsed_secs, s.count))
            .collect();
        assert_eq!(series, vec![(0.0, 1), (5.0, 2)]);
    }

    #[test]
    fn n_applied_votes_sum_to_n() {
        let registry = PollRegistry::new();
        announce(&registry, "Color?", &["Red", "Blue", "Green"]);
        for i in 0..50u64 {
            let choice = ["Red", "Blue", "Green"][(i % 3) as usize];
            registry
                .apply_vote(&vote("Color?", choice, 100.0 + i as f64))
                .unwrap();
        }
        let view = registry.snapshot(0).unwrap();
        assert_eq!(view.total_votes, 50);
        assert_eq!(view.tally.values().sum::<u64>(), 50);
        assert_eq!(view.total_series.last().unwrap().count, 50);
    }

    #[test]
    fn reannouncement_keeps_existing_tally() {
        let registry = PollRegistry::new();
        announce(&registry, "Color?", &["Red", "Blue"]);
        registry.apply_vote(&vote("Color?", "Red", 100.0)).unwrap();
        registry.apply_vote(&vote("Color?", "Blue", 105.0)).unwrap();

        let idx = announce(&registry, "Color?", &["Red", "Blue"]);
        assert_eq!(idx, 0);
        assert_eq!(registry.count(), 1);

        let view = registry.snapshot(0).unwrap();
        assert_eq!(view.tally["Red"], 1);
        assert_eq!(view.tally["Blue"], 1);
        assert_eq!(view.total_series.len(), 2);
    }

    #[test]
    fn distinct_questions_get_isolated_state() {
        let registry = PollRegistry::new();
        announce(&registry, "Color?", &["Red", "Blue"]);
        announce(&registry, "Animal?", &["Cat", "Dog"]);
        assert_eq!(registry.count(), 2);

        registry.apply_vote(&vote("Animal?", "Cat", 100.0)).unwrap();

        let colors = registry.snapshot(0).unwrap();
        let animals = registry.snapshot(1).unwrap();
        assert_eq!(colors.total_votes, 0);
        assert!(colors.total_series.is_empty());
        assert_eq!(animals.total_votes, 1);
    }

    #[test]
    fn unknown_poll_vote_changes_nothing() {
        let registry = PollRegistry::new();
        announce(&registry, "Color?", &["Red", "Blue"]);

        let err = registry
            .apply_vote(&vote("Unknown?", "Red", 100.0))
            .unwrap_err();
        assert_eq!(err, VoteError::UnknownPoll("Unknown?".to_string()));

        assert_eq!(registry.count(), 1);
        let view = registry.snapshot(0).unwrap();
        assert_eq!(view.total_votes, 0);
        assert!(view.total_series.is_empty());
    }

    #[test]
    fn unknown_choice_vote_changes_nothing() {
        let registry = PollRegistry::new();
        announce(&registry, "Color?", &["Red", "Blue"]);
        registry.apply_vote(&vote("Color?", "Red", 100.0)).unwrap();

        let err = registry
            .apply_vote(&vote("Color?", "Purple", 105.0))
            .unwrap_err();
        assert!(matches!(err, VoteError::UnknownChoice { .. }));

        let view = registry.snapshot(0).unwrap();
        assert_eq!(view.total_votes, 1);
        assert_eq!(view.total_series.len(), 1);
        assert!(view.per_choice_series.values().all(|s| s.len() == 1));
    }

    #[test]
    fn series_heads_always_match_tally() {
        let registry = PollRegistry::new();
        announce(&registry, "Color?", &["Red", "Blue"]);
        for (choice, ts) in [("Red", 100.0), ("Red", 103.0), ("Blue", 101.0)] {
            registry.apply_vote(&vote("Color?", choice, ts)).unwrap();
            let view = registry.snapshot(0).unwrap();
            assert_eq!(view.total_series.last().unwrap().count, view.total_votes);
            for (c, series) in &view.per_choice_series {
                assert_eq!(series.last().unwrap().count, view.tally[c]);
            }
            let mut prev = 0.0f64;
            for s in &view.total_series {
                assert!(s.elapsed_secs >= prev);
                prev = s.elapsed_secs;
            }
        }
    }

    #[test]
    fn snapshot_out_of_range_is_not_found() {
        let registry = PollRegistry::new();
        assert_eq!(registry.snapshot(0).unwrap_err(), RegistryError::NotFound(0));
        assert_eq!(registry.get(3).unwrap_err(), RegistryError::NotFound(3));
    }

    #[test]
    fn get_returns_the_declared_shape() {
        let registry = PollRegistry::new();
        announce(&registry, "Color?", &["Red", "Blue"]);
        let poll = registry.get(0).unwrap();
        assert_eq!(poll.question, "Color?");
        assert_eq!(poll.choices, vec!["Red", "Blue"]);
        assert_eq!(poll.total_votes(), 0);
    }

    #[test]
    fn concurrent_votes_and_snapshots_stay_consistent() {
        let registry = PollRegistry::new();
        announce(&registry, "Color?", &["Red", "Blue"]);

        let writer = {
            let registry = registry.clone();
            std::thread::spawn(move || {
                for i in 0..200u64 {
                    let choice = if i % 2 == 0 { "Red" } else { "Blue" };
                    registry
                        .apply_vote(&vote("Color?", choice, 100.0 + i as f64))
                        .unwrap();
                }
            })
        };

        // Readers must never observe a tally without its series sample.
        for _ in 0..200 {
            let view = registry.snapshot(0).unwrap();
            if let Some(last) = view.total_series.last() {
                assert_eq!(last.count, view.total_votes);
            } else {
                assert_eq!(view.total_votes, 0);
            }
        }

        writer.join().unwrap();
        assert_eq!(registry.snapshot(0).unwrap().total_votes, 200);
    }
}
