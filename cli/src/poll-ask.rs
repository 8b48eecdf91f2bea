//! # `poll-ask`: Publish a Live-Poll Question
//!
//! Announces a question with its candidate choices on the question
//! channel. Every subscribed voter client receives it and can start
//! casting votes; the aggregation server registers the poll on first
//! sight and treats any rebroadcast of the same text as a no-op.
//!
//! ## Usage
//!
//! ```bash
//! poll-ask --question "Best color?" -c Red -c Blue -c Green
//! ```

#![forbid(unsafe_code)]

use anyhow::{Context, Result, bail};
use clap::Parser;
use redis::AsyncCommands;

/// # Command Line Arguments
#[derive(Parser, Debug)]
#[command(
    name = "poll-ask",
    about = "Publishes a question with candidate choices to the live-poll question channel",
    version
)]
struct Args {
    /// The question text.
    #[arg(short, long)]
    question: String,

    /// A candidate choice. Repeat the flag for each one (2 to 30).
    #[arg(short = 'c', long = "choice")]
    choices: Vec<String>,

    /// Redis connection URL for the pub/sub transport.
    #[arg(long, env = "POLL_REDIS_URL", default_value = "redis://127.0.0.1:6379")]
    redis_url: String,

    /// Channel to publish the question on.
    #[arg(long, env = "POLL_QUESTION_TOPIC", default_value = "votinglivepoll/question")]
    topic: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.question.trim().is_empty() {
        bail!("the question text must not be empty");
    }
    let choices: Vec<&str> = args
        .choices
        .iter()
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
        .collect();
    if choices.len() < 2 || choices.len() > 30 {
        bail!("expected 2 to 30 non-empty choices, got {}", choices.len());
    }

    let payload = serde_json::json!({
        "question": args.question,
        "choices": choices,
    })
    .to_string();

    let client = redis::Client::open(args.redis_url.as_str()).context("invalid Redis URL")?;
    let mut conn = client
        .get_multiplexed_async_connection()
        .await
        .context("connecting to Redis")?;

    let receivers: i64 = conn
        .publish(&args.topic, &payload)
        .await
        .context("publishing question")?;

    println!(
        "Question published to {} ({} subscriber(s)).",
        args.topic, receivers
    );
    Ok(())
}
