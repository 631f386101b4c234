//! Graceful shutdown handling
//!
//! One [`ShutdownSignal`] is shared by the HTTP server and the session
//! sweeper; triggering it stops both. The flag lives in a `watch` channel,
//! so a waiter that subscribes after the trigger still sees it.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{error, info};

/// Cloneable, one-shot stop flag
#[derive(Clone)]
pub struct ShutdownSignal {
    tx: Arc<watch::Sender<bool>>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }

    /// Idempotent; only the first call is logged.
    pub fn trigger(&self) {
        let first = self.tx.send_if_modified(|stopped| !std::mem::replace(stopped, true));
        if first {
            info!("Shutdown signal triggered");
        }
    }

    pub async fn wait(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives as long as `self`, so this only returns on trigger.
        let _ = rx.wait_for(|stopped| *stopped).await;
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve on the first SIGTERM or SIGINT (Ctrl+C elsewhere).
async fn os_stop_request() -> std::io::Result<&'static str> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut term = signal(SignalKind::terminate())?;
        let mut int = signal(SignalKind::interrupt())?;
        let name = tokio::select! {
            _ = term.recv() => "SIGTERM",
            _ = int.recv() => "SIGINT",
        };
        Ok(name)
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        Ok("Ctrl+C")
    }
}

/// Trigger `shutdown` once the process is asked to stop.
pub async fn listen_for_shutdown_signals(shutdown: ShutdownSignal) {
    match os_stop_request().await {
        Ok(name) => {
            info!("Received {}, shutting down", name);
            shutdown.trigger();
        }
        Err(e) => error!("Failed to install signal handlers: {}", e),
    }
}

/// Owns the process-wide signal plus the grace period for in-flight work
pub struct ShutdownCoordinator {
    signal: ShutdownSignal,
    timeout_secs: u64,
}

impl ShutdownCoordinator {
    pub fn new(timeout_secs: u64) -> Self {
        Self {
            signal: ShutdownSignal::new(),
            timeout_secs,
        }
    }

    pub fn signal(&self) -> ShutdownSignal {
        self.signal.clone()
    }

    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs
    }

    pub fn start_signal_listener(&self) {
        tokio::spawn(listen_for_shutdown_signals(self.signal.clone()));
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new(30)
    }
}
