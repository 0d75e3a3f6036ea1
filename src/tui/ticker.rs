use std::collections::HashSet;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::models::Todo;

/// A periodic callback on its own thread.
///
/// The callback runs every `interval` until it returns `false` or the ticker
/// is cancelled. Cancelling (or dropping) wakes the thread immediately and
/// waits for it to finish, so no callback runs afterwards.
pub struct Ticker {
    cancel_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Ticker {
    pub fn spawn<F>(interval: Duration, mut on_tick: F) -> Self
    where
        F: FnMut() -> bool + Send + 'static,
    {
        let (cancel_tx, cancel_rx) = mpsc::channel::<()>();
        let handle = thread::spawn(move || {
            loop {
                match cancel_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        if !on_tick() {
                            break;
                        }
                    }
                    // Explicit cancel, or the sender went away with the ticker
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }
        });

        Self {
            cancel_tx: Some(cancel_tx),
            handle: Some(handle),
        }
    }

    pub fn cancel(&mut self) {
        if let Some(tx) = self.cancel_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::warn!("countdown ticker thread panicked");
            }
        }
    }

    pub fn is_active(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Live countdowns for every todo that shows one: not completed and with a
/// due date. A single shared ticker sends each tracked id on the events
/// channel once per interval. It runs only while something is tracked.
pub struct Countdowns {
    interval: Duration,
    events: Sender<String>,
    tracked: Arc<Mutex<HashSet<String>>>,
    ticker: Option<Ticker>,
}

impl Countdowns {
    pub fn new(interval: Duration, events: Sender<String>) -> Self {
        Self {
            interval,
            events,
            tracked: Arc::new(Mutex::new(HashSet::new())),
            ticker: None,
        }
    }

    fn tracked(&self) -> MutexGuard<'_, HashSet<String>> {
        // The tick callback cannot panic while holding the lock
        self.tracked.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Track todos that gained a countdown and stop ticking for the ones
    /// whose todo was completed, deleted or lost its due date
    pub fn sync(&mut self, todos: &[Todo]) {
        let wanted: HashSet<String> = todos
            .iter()
            .filter(|t| !t.completed && t.due_date.is_some())
            .map(|t| t.id.clone())
            .collect();
        let empty = wanted.is_empty();
        *self.tracked() = wanted;

        if empty {
            self.ticker = None;
        } else if !self.ticker.as_ref().is_some_and(Ticker::is_active) {
            let events = self.events.clone();
            let tracked = Arc::clone(&self.tracked);
            self.ticker = Some(Ticker::spawn(self.interval, move || {
                let ids: Vec<String> = tracked
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .iter()
                    .cloned()
                    .collect();
                // Stop once the receiving view is gone
                ids.into_iter().all(|id| events.send(id).is_ok())
            }));
        }
    }

    pub fn is_tracking(&self, id: &str) -> bool {
        self.tracked().contains(id)
    }

    pub fn len(&self) -> usize {
        self.tracked().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracked().is_empty()
    }

    /// Whether the shared ticker thread is running
    pub fn is_ticking(&self) -> bool {
        self.ticker.as_ref().is_some_and(Ticker::is_active)
    }

    /// Stop ticking and forget every todo, e.g. when the view is torn down
    pub fn clear(&mut self) {
        self.ticker = None;
        self.tracked().clear();
    }
}
