use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

/// Pipeline-level graceful shutdown deadline (spec §5).
pub const GRACEFUL_SHUTDOWN_DEADLINE: Duration = Duration::from_secs(30);

/// Per-processor drain deadline (spec §5).
pub const PROCESSOR_DRAIN_DEADLINE: Duration = Duration::from_secs(1);

pub struct ShutdownHandler {
    shutdown_requested: Arc<AtomicBool>,
    shutdown_notify: Arc<Notify>,
}

impl Default for ShutdownHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownHandler {
    pub fn new() -> Self {
        Self {
            shutdown_requested: Arc::new(AtomicBool::new(false)),
            shutdown_notify: Arc::new(Notify::new()),
        }
    }

    /// Install SIGINT/SIGTERM handlers and return a cloneable guard that
    /// session loops can poll or await.
    pub fn install(self) -> ShutdownGuard {
        let requested = Arc::clone(&self.shutdown_requested);
        let notify = Arc::clone(&self.shutdown_notify);

        tokio::spawn(async move {
            let ctrl_c = async {
                tokio::signal::ctrl_c()
                    .await
                    .expect("failed to install SIGINT handler");
            };

            #[cfg(unix)]
            let terminate = async {
                tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                    .expect("failed to install SIGTERM handler")
                    .recv()
                    .await;
            };
            #[cfg(not(unix))]
            let terminate = std::future::pending::<()>();

            tokio::select! {
                _ = ctrl_c => tracing::info!("shutdown requested via SIGINT"),
                _ = terminate => tracing::info!("shutdown requested via SIGTERM"),
            }

            requested.store(true, Ordering::SeqCst);
            notify.notify_waiters();
        });

        ShutdownGuard {
            shutdown_requested: self.shutdown_requested,
            shutdown_notify: self.shutdown_notify,
        }
    }
}

#[derive(Clone)]
pub struct ShutdownGuard {
    shutdown_requested: Arc<AtomicBool>,
    shutdown_notify: Arc<Notify>,
}

impl ShutdownGuard {
    pub fn is_shutdown_requested(&self) -> bool {
        self.shutdown_requested.load(Ordering::SeqCst)
    }

    pub async fn wait(&self) {
        if self.is_shutdown_requested() {
            return;
        }
        self.shutdown_notify.notified().await;
    }

    pub fn request_shutdown(&self) {
        self.shutdown_requested.store(true, Ordering::SeqCst);
        self.shutdown_notify.notify_waiters();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn manual_request_wakes_waiter() {
        let guard = ShutdownHandler::new().install();
        let waiter = guard.clone();
        let handle = tokio::spawn(async move {
            waiter.wait().await;
        });
        guard.request_shutdown();
        handle.await.unwrap();
        assert!(guard.is_shutdown_requested());
    }
}
