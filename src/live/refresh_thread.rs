//! Background polling for a live collection.
//!
//! `RefreshThread` refetches a [`LiveCollection`] on a fixed interval until
//! stopped. Fetch failures are counted and retried on the next tick; an
//! authorization failure ends the thread, since every later poll would
//! fail the same way.

use std::sync::mpsc::{channel, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, error};

use super::LiveCollection;
use crate::error::SyncError;
use crate::record::Record;

/// Poll interval used when none is configured.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Statistics from the refresh thread.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RefreshStats {
    /// Snapshots fetched and merged.
    pub refreshes: usize,
    /// Fetches that failed and will be retried.
    pub failures: usize,
    /// Snapshots discarded because a newer refresh superseded them.
    pub discarded: usize,
    /// The thread exited because the session is no longer authorized.
    pub stopped_on_auth: bool,
}

/// A background thread that refreshes one collection every interval.
///
/// ```ignore
/// let poller = RefreshThread::spawn(reservations.clone(), Duration::from_secs(30));
/// // ...
/// let stats = poller.stop();
/// ```
pub struct RefreshThread {
    stop_tx: Sender<()>,
    handle: Option<JoinHandle<RefreshStats>>,
}

impl RefreshThread {
    pub fn spawn<R, L>(collection: LiveCollection<R, L>, interval: Duration) -> Self
    where
        R: Record,
        L: Default + Clone + Send + 'static,
    {
        let (stop_tx, stop_rx) = channel();

        let handle = thread::spawn(move || {
            let mut stats = RefreshStats::default();

            loop {
                match stop_rx.recv_timeout(interval) {
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    Err(RecvTimeoutError::Timeout) => {}
                }
                if !collection.is_alive() {
                    break;
                }

                match collection.refresh() {
                    Ok(Some(summary)) => {
                        stats.refreshes += 1;
                        debug!(collection = R::COLLECTION, ?summary, "poll merged");
                    }
                    Ok(None) => stats.discarded += 1,
                    Err(SyncError::Auth(message)) => {
                        error!(collection = R::COLLECTION, %message, "polling stopped");
                        stats.stopped_on_auth = true;
                        break;
                    }
                    Err(_) => stats.failures += 1,
                }
            }

            stats
        });

        Self {
            stop_tx,
            handle: Some(handle),
        }
    }

    /// Signal the thread to stop and wait for it to finish.
    pub fn stop(mut self) -> RefreshStats {
        let _ = self.stop_tx.send(());
        match self.handle.take() {
            Some(handle) => handle.join().unwrap_or_default(),
            None => RefreshStats::default(),
        }
    }

    /// Whether the thread has exited on its own (e.g. after an auth failure).
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, JoinHandle::is_finished)
    }
}

impl Drop for RefreshThread {
    fn drop(&mut self) {
        let _ = self.stop_tx.send(());
    }
}
