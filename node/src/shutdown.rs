//! Graceful shutdown controller for the node.
//!
//! Listens for SIGINT/SIGTERM and broadcasts a shutdown signal to all
//! subsystems via a `tokio::sync::broadcast` channel. The fork controller
//! reaches it through [`ShutdownHook`] when the configuration is invalid or
//! activation fails fatally.

use std::sync::{Mutex, PoisonError};

use splitchain_fork::ShutdownHook;
use tokio::signal;
use tokio::sync::broadcast;

/// Coordinates graceful shutdown across the node.
///
/// Subsystems call [`subscribe`](Self::subscribe) to get a receiver, then
/// `select!` on it alongside their main loop. When shutdown is triggered
/// (by OS signal or a [`ShutdownHook`] request), every receiver is notified.
pub struct ShutdownController {
    tx: broadcast::Sender<()>,
    reason: Mutex<Option<String>>,
}

impl ShutdownController {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self {
            tx,
            reason: Mutex::new(None),
        }
    }

    /// Get a receiver that will be notified on shutdown.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Trigger shutdown programmatically.
    pub fn shutdown(&self) {
        let _ = self.tx.send(());
    }

    /// Reason given by the first request, if any.
    pub fn reason(&self) -> Option<String> {
        self.reason
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_requested(&self) -> bool {
        self.reason().is_some()
    }

    /// Wait for SIGTERM or SIGINT, then trigger shutdown.
    pub async fn wait_for_signal(&self) {
        let ctrl_c = signal::ctrl_c();

        #[cfg(unix)]
        let terminate = async {
            match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(mut stream) => {
                    stream.recv().await;
                }
                Err(err) => {
                    tracing::warn!(%err, "failed to install SIGTERM handler");
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => { self.request_shutdown("received SIGINT"); }
            _ = terminate => { self.request_shutdown("received SIGTERM"); }
        }
    }
}

impl ShutdownHook for ShutdownController {
    fn request_shutdown(&self, reason: &str) {
        tracing::info!(reason, "shutdown requested");
        self.reason
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get_or_insert_with(|| reason.to_string());
        self.shutdown();
    }
}

impl Default for ShutdownController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn programmatic_shutdown_notifies_subscribers() {
        let controller = ShutdownController::new();
        let mut rx = controller.subscribe();
        controller.shutdown();
        assert!(rx.recv().await.is_ok());
    }

    #[tokio::test]
    async fn hook_request_notifies_and_keeps_first_reason() {
        let controller = ShutdownController::new();
        let mut rx1 = controller.subscribe();
        let mut rx2 = controller.subscribe();
        controller.request_shutdown("bad fork id");
        controller.request_shutdown("second");
        assert!(rx1.recv().await.is_ok());
        assert!(rx2.recv().await.is_ok());
        assert!(controller.is_requested());
        assert_eq!(controller.reason().as_deref(), Some("bad fork id"));
    }
}
