//! Periodic sweep scheduler
//!
//! Runs a best-effort reclamation pass on a fixed interval until told to
//! stop. Block-decision correctness never depends on the sweep; it exists
//! to bound the memory held by entries nobody queries again.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// A store that can reclaim its expired entries
pub trait Sweep: Send + Sync {
    /// Remove expired entries, returning how many were reclaimed.
    fn sweep(&self) -> anyhow::Result<usize>;
}

/// Handle to a running sweeper task
pub struct SweeperHandle {
    shutdown_tx: mpsc::Sender<()>,
    handle: JoinHandle<()>,
}

impl SweeperHandle {
    /// Signal the sweeper to stop and wait for it to exit
    ///
    /// The loop breaks at the next scheduling point; no final sweep runs.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        let _ = self.handle.await;
    }
}

/// Spawn the background sweep loop
///
/// The first sweep runs immediately, then one per `interval`. A failed
/// cycle is logged and isolated; the next cycle still runs on schedule.
pub fn spawn_sweeper(target: Arc<dyn Sweep>, interval: Duration) -> SweeperHandle {
    let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

    let handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        info!("sweeper started (interval: {:?})", interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match target.sweep() {
                        Ok(0) => debug!("sweep cycle: nothing to reclaim"),
                        Ok(removed) => info!("sweep cycle: reclaimed {} expired entries", removed),
                        Err(e) => warn!("sweep cycle failed: {:#}", e),
                    }
                }
                _ = shutdown_rx.recv() => break,
            }
        }

        info!("sweeper stopped");
    });

    SweeperHandle {
        shutdown_tx,
        handle,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingSweep {
        calls: AtomicUsize,
    }

    impl CountingSweep {
        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Sweep for CountingSweep {
        fn sweep(&self) -> anyhow::Result<usize> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(0)
        }
    }

    #[derive(Default)]
    struct FailingSweep {
        calls: AtomicUsize,
    }

    impl Sweep for FailingSweep {
        fn sweep(&self) -> anyhow::Result<usize> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            anyhow::bail!("store unavailable")
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_sweep_runs_immediately() {
        let sweep = Arc::new(CountingSweep::default());
        let handle = spawn_sweeper(sweep.clone(), Duration::from_secs(300));

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(sweep.calls(), 1);

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeps_on_every_interval() {
        let sweep = Arc::new(CountingSweep::default());
        let handle = spawn_sweeper(sweep.clone(), Duration::from_secs(60));

        tokio::time::sleep(Duration::from_secs(185)).await;
        // immediate tick plus three interval ticks
        assert_eq!(sweep.calls(), 4);

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_cycle_does_not_stop_the_loop() {
        let sweep = Arc::new(FailingSweep::default());
        let handle = spawn_sweeper(sweep.clone(), Duration::from_secs(60));

        tokio::time::sleep(Duration::from_secs(125)).await;
        assert!(sweep.calls.load(Ordering::SeqCst) >= 3);

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_without_final_sweep() {
        let sweep = Arc::new(CountingSweep::default());
        let handle = spawn_sweeper(sweep.clone(), Duration::from_secs(60));

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(sweep.calls(), 1);

        handle.shutdown().await;
        assert_eq!(sweep.calls(), 1);
    }
}
