//! Cooperative shutdown.
//!
//! Termination signals trip a shared flag instead of killing the process;
//! the dequeue loop finishes its current iteration (claim transaction and
//! job run included) before exiting. Interrupting a claim mid-transition
//! would leave a queued job with no runner, permanently blocking its
//! project.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::signal::unix::{SignalKind, signal};
use tracing::info;

/// Shared alive flag checked by the dequeue loop.
#[derive(Debug, Clone, Default)]
pub struct ShutdownFlag(Arc<AtomicBool>);

impl ShutdownFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_shutdown(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn is_alive(&self) -> bool {
        !self.is_shutdown()
    }
}

/// Trip the flag on the first SIGINT or SIGTERM. No other signals are
/// handled.
pub async fn listen_for_signals(flag: ShutdownFlag) -> std::io::Result<()> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    tokio::select! {
        _ = sigint.recv() => info!("Received SIGINT, finishing current iteration"),
        _ = sigterm.recv() => info!("Received SIGTERM, finishing current iteration"),
    }

    flag.trigger();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_starts_alive_and_trips_once() {
        let flag = ShutdownFlag::new();
        assert!(flag.is_alive());

        flag.trigger();
        assert!(flag.is_shutdown());
        assert!(!flag.is_alive());
    }

    #[test]
    fn test_clones_share_the_flag() {
        let flag = ShutdownFlag::new();
        let seen_by_loop = flag.clone();

        flag.trigger();
        assert!(seen_by_loop.is_shutdown());
    }
}
