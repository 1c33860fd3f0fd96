use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::warn;

/// Resolves once shutdown was requested or the requesting handle is gone.
pub(crate) async fn wait_for_shutdown(signal: &mut watch::Receiver<bool>) {
    loop {
        if *signal.borrow_and_update() {
            return;
        }
        if signal.changed().await.is_err() {
            return;
        }
    }
}

/// Signal the owning task and wait for it to exit.
pub(crate) async fn stop(signal: &watch::Sender<bool>, task: Option<JoinHandle<()>>, name: &str) {
    let _ = signal.send(true);
    if let Some(task) = task {
        if let Err(e) = task.await {
            if !e.is_cancelled() {
                warn!("{} task ended abnormally: {}", name, e);
            }
        }
    }
}
