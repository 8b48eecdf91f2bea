//! The boundary adapter between a transport and the registry.
//!
//! Whoever owns the transport (a pub/sub subscriber task, a test
//! harness) pushes raw messages into an unbounded channel; this loop
//! decodes and applies them one at a time. Bad messages are logged and
//! dropped, never surfaced: under at-least-once, unordered delivery a
//! vote can legitimately outrun its question announcement.

use tokio::sync::{broadcast, mpsc};

use crate::event::{decode, Event, Topics};
use crate::registry::PollRegistry;

/// One raw message as delivered by the transport: the topic it arrived
/// on plus the untyped payload bytes.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

/// Consumes transport messages until shutdown is signalled or the
/// transport sender is dropped. Each message is processed to completion;
/// already-applied state survives shutdown.
pub async fn run_ingest(
    registry: PollRegistry,
    topics: Topics,
    mut inbound: mpsc::UnboundedReceiver<InboundMessage>,
    mut shutdown: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                log::info!("Ingest loop shutting down.");
                break;
            }
            msg = inbound.recv() => {
                match msg {
                    Some(msg) => handle_message(&registry, &topics, msg),
                    None => {
                        log::warn!("Transport channel closed, stopping ingest loop.");
                        break;
                    }
                }
            }
        }
    }
}

fn handle_message(registry: &PollRegistry, topics: &Topics, msg: InboundMessage) {
    match decode(&msg.topic, &msg.payload, topics) {
        Ok(Event::Question(question)) => {
            let idx = registry.announce(question);
            log::debug!("question event applied to poll {}", idx);
        }
        Ok(Event::Vote(vote)) => match registry.apply_vote(&vote) {
            Ok(idx) => log::debug!(
                "vote for {:?} counted on poll {} (voter: {})",
                vote.choice,
                idx,
                vote.voter_id.as_deref().unwrap_or("anonymous")
            ),
            // Expected churn under unordered delivery, not a fault.
            Err(e) => log::debug!("dropping vote: {}", e),
        },
        Err(e) => log::warn!("dropping message on topic {:?}: {}", msg.topic, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn topics() -> Topics {
        Topics::new("livepoll/question", "livepoll/vote")
    }

    fn msg(topic: &str, payload: &str) -> InboundMessage {
        InboundMessage {
            topic: topic.to_string(),
            payload: payload.as_bytes().to_vec(),
        }
    }

    #[tokio::test]
    async fn scripted_stream_produces_expected_snapshot() {
        let registry = PollRegistry::new();
        let (tx, rx) = mpsc::unbounded_channel();
        let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);

        tx.send(msg(
            "livepoll/question",
            r#"{"question":"Color?","choices":["Red","Blue"]}"#,
        ))
        .unwrap();
        tx.send(msg(
            "livepoll/vote",
            r#"{"pseudo":"ana","question":"Color?","reponse":"Red","timestamp":100}"#,
        ))
        .unwrap();
        tx.send(msg(
            "livepoll/vote",
            r#"{"question":"Color?","reponse":"Blue","timestamp":105}"#,
        ))
        .unwrap();
        drop(tx);

        run_ingest(registry.clone(), topics(), rx, shutdown_rx).await;

        let view = registry.snapshot(0).unwrap();
        assert_eq!(view.tally["Red"], 1);
        assert_eq!(view.tally["Blue"], 1);
        assert_eq!(view.total_series.last().unwrap().elapsed_secs, 5.0);
    }

    #[tokio::test]
    async fn bad_messages_do_not_stop_the_loop() {
        let registry = PollRegistry::new();
        let (tx, rx) = mpsc::unbounded_channel();
        let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);

        // Garbage payload, unknown topic, vote for a poll that does not
        // exist yet: all dropped, none fatal.
        tx.send(msg("livepoll/question", "not json")).unwrap();
        tx.send(msg("livepoll/elsewhere", "{}")).unwrap();
        tx.send(msg(
            "livepoll/vote",
            r#"{"question":"Unknown?","reponse":"Red","timestamp":100}"#,
        ))
        .unwrap();
        tx.send(msg(
            "livepoll/question",
            r#"{"question":"Color?","choices":["Red","Blue"]}"#,
        ))
        .unwrap();
        tx.send(msg(
            "livepoll/vote",
            r#"{"question":"Color?","reponse":"Purple","timestamp":100}"#,
        ))
        .unwrap();
        drop(tx);

        run_ingest(registry.clone(), topics(), rx, shutdown_rx).await;

        assert_eq!(registry.count(), 1);
        let view = registry.snapshot(0).unwrap();
        assert_eq!(view.total_votes, 0);
    }

    #[tokio::test]
    async fn shutdown_keeps_already_applied_state() {
        let registry = PollRegistry::new();
        let (tx, rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        tx.send(msg(
            "livepoll/question",
            r#"{"question":"Color?","choices":["Red","Blue"]}"#,
        ))
        .unwrap();
        tx.send(msg(
            "livepoll/vote",
            r#"{"question":"Color?","reponse":"Red","timestamp":100}"#,
        ))
        .unwrap();

        let handle = tokio::spawn(run_ingest(registry.clone(), topics(), rx, shutdown_rx));

        // Give the loop a chance to drain before signalling shutdown.
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        shutdown_tx.send(()).unwrap();
        handle.await.unwrap();

        assert_eq!(registry.snapshot(0).unwrap().total_votes, 1);
    }
}
