//! Pub/sub transport subscriber.
//!
//! Owns the broker connection for the whole process: subscribes to the
//! question and vote channels and forwards every raw message into the
//! ingest channel. Reconnects with bounded exponential backoff; the
//! engine simply resumes counting once delivery resumes.

use anyhow::{Context, Result};
use futures_util::StreamExt;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::time::sleep;

use lib_poll::InboundMessage;

use crate::poll_logic::config::Settings;

enum SessionEnd {
    Shutdown,
    Dropped,
}

pub async fn run(
    settings: Settings,
    inbound: mpsc::UnboundedSender<InboundMessage>,
    mut shutdown: broadcast::Receiver<()>,
) {
    let base_delay = Duration::from_millis(settings.reconnect_base_delay_ms);
    let max_delay = Duration::from_millis(settings.reconnect_max_delay_ms);
    let mut delay = base_delay;

    loop {
        if shutdown.try_recv().is_ok() {
            break;
        }

        log::info!("Connecting to transport: {}", settings.redis_url);

        match subscribe_session(&settings, &inbound, &mut shutdown).await {
            Ok(SessionEnd::Shutdown) => {
                log::info!("Upstream shutting down.");
                return;
            }
            Ok(SessionEnd::Dropped) => {
                // We had a working subscription, so start backoff over.
                delay = base_delay;
                log::warn!("Subscription ended. Reconnecting in {:?}...", delay);
            }
            Err(e) => {
                log::error!("Transport error: {:#}. Retrying in {:?}...", e, delay);
            }
        }

        tokio::select! {
            _ = shutdown.recv() => {
                log::info!("Upstream shutting down.");
                return;
            }
            _ = sleep(delay) => {}
        }
        delay = (delay * 2).min(max_delay);
    }
}

/// One connect-subscribe-drain cycle. Returns how the session ended so
/// the outer loop can decide whether to back off.
async fn subscribe_session(
    settings: &Settings,
    inbound: &mpsc::UnboundedSender<InboundMessage>,
    shutdown: &mut broadcast::Receiver<()>,
) -> Result<SessionEnd> {
    let client =
        redis::Client::open(settings.redis_url.as_str()).context("invalid transport URL")?;
    let mut pubsub = client
        .get_async_pubsub()
        .await
        .context("connecting to transport")?;

    pubsub
        .subscribe(&settings.question_topic)
        .await
        .with_context(|| format!("subscribing to {}", settings.question_topic))?;
    pubsub
        .subscribe(&settings.vote_topic)
        .await
        .with_context(|| format!("subscribing to {}", settings.vote_topic))?;

    log::info!(
        "Subscribed to {} and {}",
        settings.question_topic,
        settings.vote_topic
    );

    let mut messages = pubsub.on_message();

    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                return Ok(SessionEnd::Shutdown);
            }
            msg = messages.next() => {
                match msg {
                    Some(msg) => {
                        let topic = msg.get_channel_name().to_string();
                        let payload = msg.get_payload_bytes().to_vec();
                        log::trace!("Received {} bytes on {}", payload.len(), topic);
                        if inbound.send(InboundMessage { topic, payload }).is_err() {
                            // Ingest loop is gone; nothing left to feed.
                            return Ok(SessionEnd::Shutdown);
                        }
                    }
                    None => return Ok(SessionEnd::Dropped),
                }
            }
        }
    }
}
