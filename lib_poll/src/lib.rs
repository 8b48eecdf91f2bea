// Declare the modules to re-export
pub mod error;
pub mod event;
pub mod ingest;
pub mod poll;
pub mod registry;
pub mod snapshot;

// Re-export the types callers actually touch
pub use error::{DecodeError, RegistryError, VoteError};
pub use event::{decode, Event, QuestionAnnounced, Topics, VoteCast};
pub use ingest::{run_ingest, InboundMessage};
pub use poll::{Poll, Sample};
pub use registry::{PollIndex, PollRegistry};
pub use snapshot::{PollSummary, PollView};
