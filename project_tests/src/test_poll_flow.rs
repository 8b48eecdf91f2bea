//! # Poll Flow End-to-End Test
//!
//! Replays a scripted, deliberately messy message sequence (duplicated
//! announcements, out-of-order votes, garbage payloads) through the real
//! ingestion loop over in-memory channels, then verifies the resulting
//! snapshots.

use anyhow::{Result, ensure};
use tokio::sync::{broadcast, mpsc};

use lib_poll::{InboundMessage, PollRegistry, Topics, run_ingest};

const QUESTION_TOPIC: &str = "votinglivepoll/question";
const VOTE_TOPIC: &str = "votinglivepoll/vote";

fn msg(topic: &str, payload: &str) -> InboundMessage {
    InboundMessage {
        topic: topic.to_string(),
        payload: payload.as_bytes().to_vec(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let registry = PollRegistry::new();
    let topics = Topics::new(QUESTION_TOPIC, VOTE_TOPIC);
    let (tx, rx) = mpsc::unbounded_channel();
    let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);

    println!("[*] Replaying scripted message stream...");

    // A vote that outruns its question announcement: dropped.
    tx.send(msg(
        VOTE_TOPIC,
        r#"{"question":"Color?","reponse":"Red","timestamp":99}"#,
    ))?;
    // The announcement itself.
    tx.send(msg(
        QUESTION_TOPIC,
        r#"{"question":"Color?","choices":["Red","Blue"]}"#,
    ))?;
    // Two valid votes, five seconds apart.
    tx.send(msg(
        VOTE_TOPIC,
        r#"{"pseudo":"ana","question":"Color?","reponse":"Red","timestamp":100}"#,
    ))?;
    tx.send(msg(
        VOTE_TOPIC,
        r#"{"question":"Color?","reponse":"Blue","timestamp":105}"#,
    ))?;
    // At-least-once delivery: the broker rebroadcasts the question.
    tx.send(msg(
        QUESTION_TOPIC,
        r#"{"question":"Color?","choices":["Red","Blue"]}"#,
    ))?;
    // A second poll, using the legacy field name.
    tx.send(msg(
        QUESTION_TOPIC,
        r#"{"question":"Animal?","choix":["Cat","Dog"]}"#,
    ))?;
    // Garbage and stale references: all dropped without fallout.
    tx.send(msg(QUESTION_TOPIC, "not json at all"))?;
    tx.send(msg(
        VOTE_TOPIC,
        r#"{"question":"Unknown?","reponse":"Red","timestamp":1}"#,
    ))?;
    tx.send(msg(
        VOTE_TOPIC,
        r#"{"question":"Color?","reponse":"Purple","timestamp":110}"#,
    ))?;
    drop(tx);

    run_ingest(registry.clone(), topics, rx, shutdown_rx).await;

    println!("[*] Stream drained, checking snapshots...");

    ensure!(
        registry.count() == 2,
        "expected 2 polls, found {}",
        registry.count()
    );

    let colors = registry.snapshot(0)?;
    ensure!(colors.question == "Color?", "poll 0 has wrong question");
    ensure!(colors.tally["Red"] == 1, "Red should have exactly 1 vote");
    ensure!(colors.tally["Blue"] == 1, "Blue should have exactly 1 vote");
    ensure!(colors.total_votes == 2, "re-announcement must not reset the tally");

    let series: Vec<(f64, u64)> = colors
        .total_series
        .iter()
        .map(|s| (s.elapsed_secs, s.count))
        .collect();
    ensure!(
        series == vec![(0.0, 1), (5.0, 2)],
        "unexpected total series: {:?}",
        series
    );
    ensure!(
        colors.per_choice_series["Blue"].len() == 2,
        "every choice gets one sample per accepted vote"
    );
    ensure!(
        (colors.percentages["Red"] - 50.0).abs() < f64::EPSILON,
        "Red should sit at 50.0%"
    );

    let animals = registry.snapshot(1)?;
    ensure!(animals.question == "Animal?", "poll 1 has wrong question");
    ensure!(
        animals.total_votes == 0 && animals.total_series.is_empty(),
        "poll 1 never received a valid vote"
    );

    println!("\n[SUCCESS] Final snapshots:");
    println!("-----------------------------------------------");
    println!("{}", serde_json::to_string_pretty(&colors)?);
    println!("{}", serde_json::to_string_pretty(&animals)?);
    println!("-----------------------------------------------");

    Ok(())
}
