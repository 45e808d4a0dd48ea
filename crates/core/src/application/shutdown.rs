// Shutdown signal for background loops (maintenance sweep, stats reporter)

use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;

/// Receiving half, cloned into every loop
#[derive(Clone)]
pub struct ShutdownToken {
    rx: watch::Receiver<bool>,
}

impl ShutdownToken {
    pub fn is_shutdown(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once shutdown is requested (immediately if it already was)
    pub async fn wait(&mut self) {
        // Err means the sender is gone, which is also a stop signal
        let _ = self.rx.wait_for(|stop| *stop).await;
    }

    /// Sleep for `period`, returning `false` if shutdown interrupted the sleep
    pub async fn sleep(&mut self, period: Duration) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(period) => true,
            _ = self.wait() => false,
        }
    }

    /// Drive `fut` unless shutdown comes first
    pub async fn run_until<F: Future>(&mut self, fut: F) -> Option<F::Output> {
        tokio::select! {
            out = fut => Some(out),
            _ = self.wait() => None,
        }
    }
}

/// Sending half, owned by the composition root
pub struct ShutdownSender {
    tx: watch::Sender<bool>,
}

impl ShutdownSender {
    pub fn shutdown(&self) {
        let _ = self.tx.send(true);
    }
}

pub fn shutdown_channel() -> (ShutdownSender, ShutdownToken) {
    let (tx, rx) = watch::channel(false);
    (ShutdownSender { tx }, ShutdownToken { rx })
}
