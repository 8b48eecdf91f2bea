use anyhow::Result;
use tokio::signal;

mod poll_logic;
use poll_logic::{config, downstream, logger, upstream};

use lib_poll::{run_ingest, PollRegistry, Topics};

#[tokio::main]
async fn main() -> Result<()> {
    let settings = config::load_config();
    logger::setup_logging(&settings.log_dir, &settings.log_level)?;

    let (shutdown_tx, _) = tokio::sync::broadcast::channel(1);
    let registry = PollRegistry::new();
    let topics = Topics::new(
        settings.question_topic.clone(),
        settings.vote_topic.clone(),
    );

    // Transport handoff: the upstream subscriber pushes raw messages in,
    // the ingest loop drains them into the registry.
    let (inbound_tx, inbound_rx) = tokio::sync::mpsc::unbounded_channel();

    let upstream_handle = tokio::spawn(upstream::run(
        settings.clone(),
        inbound_tx,
        shutdown_tx.subscribe(),
    ));

    let ingest_handle = tokio::spawn(run_ingest(
        registry.clone(),
        topics,
        inbound_rx,
        shutdown_tx.subscribe(),
    ));

    let downstream_handle = tokio::spawn(downstream::run(
        settings.clone(),
        registry.clone(),
        shutdown_tx.subscribe(),
    ));

    // Wait for shutdown signal
    tokio::select! {
        _ = signal::ctrl_c() => {
            log::info!("Ctrl-C received, initiating shutdown.");
        }
        _ = async {
            #[cfg(unix)]
            {
                let mut term_signal = signal::unix::signal(signal::unix::SignalKind::terminate()).unwrap();
                term_signal.recv().await;
                log::info!("SIGTERM received, initiating shutdown.");
            }
            #[cfg(not(unix))]
            {
                // On non-unix platforms, just wait forever.
                std::future::pending::<()>().await;
            }
        } => {}
    }

    // Send shutdown signal to all components
    let _ = shutdown_tx.send(());

    // Wait for components to shut down
    let _ = tokio::try_join!(upstream_handle, ingest_handle, downstream_handle);

    log::info!("Shutdown complete.");
    Ok(())
}
