//! # `poll-vote`: Cast a Live-Poll Vote
//!
//! Publishes a single vote on the vote channel: the target question
//! text, the chosen choice text, an optional display name, and the
//! current epoch timestamp. The aggregation server drops the vote
//! silently if the question or choice is unknown to it.
//!
//! ## Usage
//!
//! ```bash
//! poll-vote --question "Best color?" --choice Red --pseudo ana
//! ```

#![forbid(unsafe_code)]

use anyhow::{Context, Result, bail};
use clap::Parser;
use redis::AsyncCommands;

/// # Command Line Arguments
#[derive(Parser, Debug)]
#[command(
    name = "poll-vote",
    about = "Publishes one vote to the live-poll vote channel",
    version
)]
struct Args {
    /// Question text of the target poll (must match exactly).
    #[arg(short, long)]
    question: String,

    /// The chosen choice text (must match one of the poll's choices).
    #[arg(short, long)]
    choice: String,

    /// Display name to attach to the vote.
    #[arg(short, long)]
    pseudo: Option<String>,

    /// Redis connection URL for the pub/sub transport.
    #[arg(long, env = "POLL_REDIS_URL", default_value = "redis://127.0.0.1:6379")]
    redis_url: String,

    /// Channel to publish the vote on.
    #[arg(long, env = "POLL_VOTE_TOPIC", default_value = "votinglivepoll/vote")]
    topic: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.question.trim().is_empty() || args.choice.trim().is_empty() {
        bail!("both --question and --choice must be non-empty");
    }

    let timestamp = chrono::Utc::now().timestamp_millis() as f64 / 1000.0;
    let mut payload = serde_json::json!({
        "question": args.question,
        "reponse": args.choice,
        "timestamp": timestamp,
    });
    if let Some(pseudo) = &args.pseudo {
        payload["pseudo"] = serde_json::json!(pseudo);
    }

    let client = redis::Client::open(args.redis_url.as_str()).context("invalid Redis URL")?;
    let mut conn = client
        .get_multiplexed_async_connection()
        .await
        .context("connecting to Redis")?;

    let receivers: i64 = conn
        .publish(&args.topic, payload.to_string())
        .await
        .context("publishing vote")?;

    println!(
        "Vote for {:?} published to {} ({} subscriber(s)).",
        args.choice, args.topic, receivers
    );
    Ok(())
}
