use hoststat::shutdown::{ShutdownSender, request_shutdown, wait_for_shutdown};
use tracing::{info, warn};

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Requests shutdown on Ctrl+C or SIGTERM. Exits quietly once shutdown was
/// requested elsewhere.
pub fn setup_signal_shutdown_handler(shutdown_tx: &ShutdownSender) -> tokio::task::JoinHandle<()> {
    let shutdown_tx = shutdown_tx.clone();
    tokio::spawn(async move {
        let mut shutdown_rx = shutdown_tx.subscribe();

        #[cfg(unix)]
        let mut term_signal = signal(SignalKind::terminate())
            .inspect_err(|err| warn!("Failed to register SIGTERM handler: {}", err))
            .ok();

        #[cfg(unix)]
        {
            tokio::select! {
                () = wait_for_shutdown(&mut shutdown_rx) => {}
                result = tokio::signal::ctrl_c() => {
                    if let Err(err) = result {
                        warn!("Failed to listen for Ctrl+C: {}", err);
                        return;
                    }
                    info!("Received Ctrl+C, stopping");
                    request_shutdown(&shutdown_tx);
                }
                () = async {
                    if let Some(signal) = term_signal.as_mut() {
                        signal.recv().await;
                    } else {
                        std::future::pending::<()>().await;
                    }
                } => {
                    info!("Received SIGTERM, stopping");
                    request_shutdown(&shutdown_tx);
                }
            }
        }

        #[cfg(not(unix))]
        {
            tokio::select! {
                () = wait_for_shutdown(&mut shutdown_rx) => {}
                result = tokio::signal::ctrl_c() => {
                    if let Err(err) = result {
                        warn!("Failed to listen for Ctrl+C: {}", err);
                        return;
                    }
                    info!("Received Ctrl+C, stopping");
                    request_shutdown(&shutdown_tx);
                }
            }
        }
    })
}
