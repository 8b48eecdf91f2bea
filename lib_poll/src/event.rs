//! Event decoding for the two wire channels.
//!
//! The transport delivers untyped byte payloads tagged with a topic
//! name. [`decode`] validates them into typed events and normalizes the
//! field-name variance the deployed publishers exhibit (`choix` vs
//! `choices`). Decoding never panics and has no side effects; callers
//! branch on the result and drop bad messages.

use serde::Deserialize;

use crate::error::DecodeError;

/// Fewest declared choices a question may carry.
pub const MIN_CHOICES: usize = 2;
/// Most declared choices a question may carry.
pub const MAX_CHOICES: usize = 30;

/// Topic names for the two logical channels. Deployment configuration,
/// injected by whoever owns the transport.
#[derive(Debug, Clone)]
pub struct Topics {
    pub question: String,
    pub vote: String,
}

impl Topics {
    pub fn new(question: impl Into<String>, vote: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            vote: vote.into(),
        }
    }
}

/// A validated question announcement. Choices are normalized: empty
/// strings removed, order and duplicates preserved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionAnnounced {
    pub question: String,
    pub choices: Vec<String>,
}

/// A validated vote. `voter_id` is opaque and carried for logging only;
/// the engine does not deduplicate by it. `timestamp` is epoch seconds
/// from the voter's clock, best effort only.
#[derive(Debug, Clone, PartialEq)]
pub struct VoteCast {
    pub question: String,
    pub choice: String,
    pub voter_id: Option<String>,
    pub timestamp: f64,
}

/// One decoded inbound event.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Question(QuestionAnnounced),
    Vote(VoteCast),
}

// Raw wire shapes. Kept private: callers only see the validated types.

#[derive(Deserialize)]
struct QuestionWire {
    question: String,
    // Older publishers send "choix"; both never appear together.
    #[serde(alias = "choix")]
    choices: Vec<String>,
}

#[derive(Deserialize)]
struct VoteWire {
    #[serde(default)]
    pseudo: Option<String>,
    question: String,
    reponse: String,
    #[serde(default)]
    timestamp: Option<f64>,
}

/// Parses a raw transport message into a typed [`Event`].
///
/// `topic` is the discriminator supplied by the transport and must match
/// one of the two configured channels.
pub fn decode(topic: &str, payload: &[u8], topics: &Topics) -> Result<Event, DecodeError> {
    if topic == topics.question {
        decode_question(payload).map(Event::Question)
    } else if topic == topics.vote {
        decode_vote(payload).map(Event::Vote)
    } else {
        Err(DecodeError::UnknownTopic(topic.to_string()))
    }
}

fn decode_question(payload: &[u8]) -> Result<QuestionAnnounced, DecodeError> {
    let wire: QuestionWire =
        serde_json::from_slice(payload).map_err(|e| DecodeError::Malformed(e.to_string()))?;

    if wire.question.trim().is_empty() {
        return Err(DecodeError::Malformed("question text is empty".to_string()));
    }

    let choices: Vec<String> = wire
        .choices
        .into_iter()
        .filter(|c| !c.trim().is_empty())
        .collect();

    if choices.len() < MIN_CHOICES || choices.len() > MAX_CHOICES {
        return Err(DecodeError::Malformed(format!(
            "expected {}..={} non-empty choices, got {}",
            MIN_CHOICES,
            MAX_CHOICES,
            choices.len()
        )));
    }

    Ok(QuestionAnnounced {
        question: wire.question,
        choices,
    })
}

fn decode_vote(payload: &[u8]) -> Result<VoteCast, DecodeError> {
    let wire: VoteWire =
        serde_json::from_slice(payload).map_err(|e| DecodeError::Malformed(e.to_string()))?;

    if wire.question.is_empty() {
        return Err(DecodeError::Malformed("vote has no question text".to_string()));
    }
    if wire.reponse.is_empty() {
        return Err(DecodeError::Malformed("vote has no choice text".to_string()));
    }

    // The deployed dashboards substitute the wall clock when a voter
    // client omits the timestamp.
    let timestamp = wire
        .timestamp
        .unwrap_or_else(|| chrono::Utc::now().timestamp_millis() as f64 / 1000.0);

    Ok(VoteCast {
        question: wire.question,
        choice: wire.reponse,
        voter_id: wire.pseudo,
        timestamp,
    })
}
