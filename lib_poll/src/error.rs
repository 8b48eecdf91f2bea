use thiserror::Error;

/// Failures while turning a raw transport message into a typed event.
///
/// Always recoverable: the caller logs and drops the message, state is
/// never touched.
#[derive(Error, Debug)]
pub enum DecodeError {
    /// The payload is not valid JSON or violates the wire contract
    /// (empty question, fewer than 2 or more than 30 non-empty choices,
    /// missing required fields).
    #[error("malformed payload: {0}")]
    Malformed(String),

    /// The topic the transport handed us matches neither the question
    /// nor the vote channel.
    #[error("unknown topic: {0}")]
    UnknownTopic(String),
}

/// Failures while applying a decoded vote. Recoverable: the vote is
/// dropped whole, no partial mutation occurs.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum VoteError {
    /// No poll with this exact question text exists (yet). Expected
    /// under at-least-once, unordered delivery when a vote outruns its
    /// question announcement.
    #[error("no poll matches question {0:?}")]
    UnknownPoll(String),

    /// The choice is not one of the target poll's declared choices.
    #[error("choice {choice:?} is not declared on poll {question:?}")]
    UnknownChoice { question: String, choice: String },
}

/// Caller-side usage errors on the query surface.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum RegistryError {
    /// The poll index is out of range.
    #[error("no poll at index {0}")]
    NotFound(usize),
}
