use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::runtime::AppEvent;

/// Generation counter for a session. Bumped on every reset so that ticks
/// scheduled for an older session can be recognised and dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Epoch(pub u64);

impl Epoch {
    pub fn next(self) -> Self {
        Epoch(self.0.wrapping_add(1))
    }
}

/// Handle to a running periodic refresh. Dropping it cancels the refresh.
#[derive(Debug)]
pub struct RefreshGuard {
    epoch: Epoch,
    cancelled: Arc<AtomicBool>,
}

impl RefreshGuard {
    pub fn new(epoch: Epoch) -> Self {
        Self {
            epoch,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Shared flag observed by whoever produces the ticks
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }
}

impl Drop for RefreshGuard {
    fn drop(&mut self) {
        self.cancelled.store(true, Ordering::SeqCst);
        tracing::trace!(epoch = self.epoch.0, "refresh released");
    }
}

/// Starts periodic refresh ticks for a session epoch
pub trait RefreshScheduler: Send {
    fn schedule(&self, epoch: Epoch, interval: Duration) -> RefreshGuard;
}

/// Scheduler that never ticks; statistics then only move on input
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopScheduler;

impl RefreshScheduler for NoopScheduler {
    fn schedule(&self, epoch: Epoch, _interval: Duration) -> RefreshGuard {
        RefreshGuard::new(epoch)
    }
}

/// Posts `AppEvent::Refresh(epoch)` into the event loop from a timer thread
#[derive(Clone, Debug)]
pub struct ThreadScheduler {
    tx: Sender<AppEvent>,
}

impl ThreadScheduler {
    pub fn new(tx: Sender<AppEvent>) -> Self {
        Self { tx }
    }
}

impl RefreshScheduler for ThreadScheduler {
    fn schedule(&self, epoch: Epoch, interval: Duration) -> RefreshGuard {
        let guard = RefreshGuard::new(epoch);
        let cancelled = guard.cancel_flag();
        let tx = self.tx.clone();

        thread::spawn(move || loop {
            thread::sleep(interval);
            if cancelled.load(Ordering::SeqCst) {
                tracing::trace!(epoch = epoch.0, "refresh timer stopped");
                break;
            }
            if tx.send(AppEvent::Refresh(epoch)).is_err() {
                break;
            }
        });

        guard
    }
}

/// Records every schedule request so tests can inspect and cancel-check them
#[derive(Clone, Debug, Default)]
pub struct ManualScheduler {
    scheduled: Arc<Mutex<Vec<(Epoch, Arc<AtomicBool>)>>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Epochs that have been scheduled so far, oldest first
    pub fn scheduled_epochs(&self) -> Vec<Epoch> {
        self.lock().iter().map(|(epoch, _)| *epoch).collect()
    }

    /// Epochs whose refresh is still live (not cancelled)
    pub fn active_epochs(&self) -> Vec<Epoch> {
        self.lock()
            .iter()
            .filter(|(_, cancelled)| !cancelled.load(Ordering::SeqCst))
            .map(|(epoch, _)| *epoch)
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(Epoch, Arc<AtomicBool>)>> {
        self.scheduled.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl RefreshScheduler for ManualScheduler {
    fn schedule(&self, epoch: Epoch, _interval: Duration) -> RefreshGuard {
        let guard = RefreshGuard::new(epoch);
        self.lock().push((epoch, guard.cancel_flag()));
        guard
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn dropping_guard_cancels() {
        let guard = RefreshGuard::new(Epoch(3));
        let flag = guard.cancel_flag();
        assert!(!flag.load(Ordering::SeqCst));
        drop(guard);
        assert!(flag.load(Ordering::SeqCst));
    }

    #[test]
    fn manual_scheduler_tracks_live_refreshes() {
        let scheduler = ManualScheduler::new();
        let first = scheduler.schedule(Epoch(1), Duration::from_secs(1));
        let _second = scheduler.schedule(Epoch(2), Duration::from_secs(1));

        assert_eq!(scheduler.scheduled_epochs(), vec![Epoch(1), Epoch(2)]);
        drop(first);
        assert_eq!(scheduler.active_epochs(), vec![Epoch(2)]);
    }

    #[test]
    fn thread_scheduler_posts_epoch_until_dropped() {
        let (tx, rx) = mpsc::channel();
        let scheduler = ThreadScheduler::new(tx);
        let guard = scheduler.schedule(Epoch(7), Duration::from_millis(5));

        match rx.recv_timeout(Duration::from_secs(1)) {
            Ok(AppEvent::Refresh(epoch)) => assert_eq!(epoch, Epoch(7)),
            other => panic!("expected refresh tick, got {other:?}"),
        }

        drop(guard);
        // Drain whatever was in flight, then the channel must go quiet
        thread::sleep(Duration::from_millis(30));
        while rx.try_recv().is_ok() {}
        thread::sleep(Duration::from_millis(30));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn epoch_next_increments() {
        assert_eq!(Epoch(0).next(), Epoch(1));
        assert_eq!(Epoch(u64::MAX).next(), Epoch(0));
    }
}
