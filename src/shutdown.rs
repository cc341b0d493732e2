// src/shutdown.rs
// Termination signal handling for the standalone binary

use futures_util::StreamExt;
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook_tokio::{Handle, Signals};
use std::io;
use std::time::Duration;

use crate::logger::Logger;

/// How long a graceful close may take before the process exits anyway.
pub const FORCE_EXIT_AFTER: Duration = Duration::from_secs(5);

/// Waits for SIGINT or SIGTERM.
///
/// After the first signal a watchdog is armed: a second signal, or
/// [`FORCE_EXIT_AFTER`] elapsing, exits the process immediately.
pub struct ShutdownSignals {
    signals: Signals,
    handle: Handle,
    logger: Logger,
}

impl ShutdownSignals {
    pub fn new(logger: Logger) -> io::Result<Self> {
        let signals = Signals::new([SIGINT, SIGTERM])?;
        let handle = signals.handle();
        Ok(Self {
            signals,
            handle,
            logger,
        })
    }

    /// Resolves on the first termination signal and returns its number.
    pub async fn recv(mut self) -> Option<i32> {
        let signal = self.signals.next().await?;
        self.logger.shutdown_message();

        let logger = self.logger.clone();
        let mut signals = self.signals;
        tokio::spawn(async move {
            let _ = tokio::time::timeout(FORCE_EXIT_AFTER, signals.next()).await;
            logger.force_shutdown_message();
            std::process::exit(0);
        });

        Some(signal)
    }

    /// Stops listening; a pending `recv` resolves with `None`.
    pub fn handle(&self) -> Handle {
        self.handle.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_closed_handle_ends_recv() {
        let signals = ShutdownSignals::new(Logger::new()).unwrap();
        let handle = signals.handle();
        handle.close();

        let received = timeout(Duration::from_secs(1), signals.recv()).await.unwrap();
        assert_eq!(received, None);
    }

    #[tokio::test]
    async fn test_recv_returns_delivered_signal() {
        let signals = ShutdownSignals::new(Logger::new()).unwrap();
        signal_hook::low_level::raise(SIGTERM).unwrap();

        let received = timeout(Duration::from_secs(5), signals.recv()).await.unwrap();
        assert_eq!(received, Some(SIGTERM));
    }
}
