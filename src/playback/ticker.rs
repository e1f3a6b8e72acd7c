//! Cancellable position-polling task.
//!
//! A [`PositionTicker`] sends a [`PlaybackTick`] every interval until it is
//! cancelled or dropped.  Each ticker carries an epoch; ticks from an older
//! epoch that were already queued when the ticker was cancelled are ignored
//! by the controller.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// One position-poll wake-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackTick {
    pub epoch: u64,
}

/// Handle to a running polling task.  Dropping it aborts the task.
#[derive(Debug)]
pub struct PositionTicker {
    epoch: u64,
    handle: JoinHandle<()>,
}

impl PositionTicker {
    /// Spawn onto the current tokio runtime.  The first tick fires one full
    /// `interval` after spawning.
    pub fn spawn(interval: Duration, epoch: u64, tx: mpsc::UnboundedSender<PlaybackTick>) -> Self {
        let handle = tokio::spawn(async move {
            let start = tokio::time::Instant::now() + interval;
            let mut ticks = tokio::time::interval_at(start, interval);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticks.tick().await;
                if tx.send(PlaybackTick { epoch }).is_err() {
                    break;
                }
            }
        });
        Self { epoch, handle }
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }
}

impl Drop for PositionTicker {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ticks_until_dropped() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let ticker = PositionTicker::spawn(Duration::from_millis(10), 4, tx);

        let tick = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("tick in time")
            .expect("channel open");
        assert_eq!(tick, PlaybackTick { epoch: 4 });

        drop(ticker);
        // The aborted task drops its sender, closing the channel once
        // buffered ticks are drained.
        let drained = tokio::time::timeout(Duration::from_secs(2), async {
            while rx.recv().await.is_some() {}
        })
        .await;
        assert!(drained.is_ok(), "ticker kept running after drop");
    }
}
