use tokio::sync::watch;

/// Shared cancellation signal: `true` once a stop has been requested.
pub type ShutdownSender = watch::Sender<bool>;
pub type ShutdownReceiver = watch::Receiver<bool>;

#[must_use]
pub fn shutdown_channel() -> (ShutdownSender, ShutdownReceiver) {
    watch::channel(false)
}

/// Resolves once the signal is set. Never resolves if every sender is gone
/// without having signalled.
pub async fn wait_for_shutdown(shutdown_rx: &mut ShutdownReceiver) {
    if shutdown_rx.wait_for(|stopped| *stopped).await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// Sets the signal. Returns `false` if it was already set.
pub fn request_shutdown(shutdown_tx: &ShutdownSender) -> bool {
    !shutdown_tx.send_replace(true)
}
