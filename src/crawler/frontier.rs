//! Link frontier: the shared queue of pages waiting to be fetched
//!
//! This module handles:
//! - FIFO (breadth-first) or LIFO (depth-first) ordering of entries
//! - Tracking entries that workers are still processing
//! - Quiescence: `pop` ends once the queue is empty and nothing is in flight
//! - The stop signal used for cancellation

use crate::config::Traversal;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::ops::Deref;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;

/// A URL waiting to be fetched, with its distance from the seed
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrontierEntry {
    /// Normalized absolute URL
    pub url: String,

    /// Link hops from the seed (seed = 0)
    pub depth: u32,
}

impl FrontierEntry {
    pub fn new(url: impl Into<String>, depth: u32) -> Self {
        Self {
            url: url.into(),
            depth,
        }
    }
}

/// Concurrency-safe work queue with in-flight tracking
///
/// Workers take entries with [`Frontier::pop`], which hands out a [`Lease`].
/// While any lease is alive the frontier is not considered drained, because
/// the page behind it may still yield new entries.
pub struct Frontier {
    state: Mutex<FrontierState>,
    changed: Notify,
    traversal: Traversal,
}

#[derive(Default)]
struct FrontierState {
    queue: VecDeque<FrontierEntry>,
    in_flight: usize,
    stopped: bool,
}

impl Frontier {
    /// Creates an empty frontier
    pub fn new(traversal: Traversal) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(FrontierState::default()),
            changed: Notify::new(),
            traversal,
        })
    }

    fn lock(&self) -> MutexGuard<'_, FrontierState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds an entry
    ///
    /// Entries pushed after a stop are kept so they can be checkpointed.
    pub fn push(&self, entry: FrontierEntry) {
        self.lock().queue.push_back(entry);
        self.changed.notify_waiters();
    }

    /// Takes the next entry, waiting while other workers may still add work
    ///
    /// Returns `None` once the frontier is quiescent (empty with no lease
    /// outstanding) or has been stopped.
    pub async fn pop(self: &Arc<Self>) -> Option<Lease> {
        loop {
            // Registered before the state check so a push or release that
            // lands in between still wakes this waiter.
            let notified = self.changed.notified();
            {
                let mut state = self.lock();
                if state.stopped {
                    return None;
                }

                let next = match self.traversal {
                    Traversal::BreadthFirst => state.queue.pop_front(),
                    Traversal::DepthFirst => state.queue.pop_back(),
                };

                if let Some(entry) = next {
                    state.in_flight += 1;
                    return Some(Lease {
                        entry,
                        frontier: Arc::clone(self),
                    });
                }

                if state.in_flight == 0 {
                    drop(state);
                    self.changed.notify_waiters();
                    return None;
                }
            }

            notified.await;
        }
    }

    fn release(&self) {
        let idle = {
            let mut state = self.lock();
            state.in_flight = state.in_flight.saturating_sub(1);
            state.in_flight == 0 && state.queue.is_empty()
        };
        if idle {
            self.changed.notify_waiters();
        }
    }

    /// Raises the stop signal; waiting and future `pop` calls return `None`
    pub fn stop(&self) {
        self.lock().stopped = true;
        self.changed.notify_waiters();
    }

    pub fn is_stopped(&self) -> bool {
        self.lock().stopped
    }

    /// Removes and returns every queued entry, in queue order
    pub fn drain_pending(&self) -> Vec<FrontierEntry> {
        self.lock().queue.drain(..).collect()
    }

    /// Number of queued entries
    pub fn len(&self) -> usize {
        self.lock().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().queue.is_empty()
    }

    /// Number of leases currently held by workers
    pub fn in_flight(&self) -> usize {
        self.lock().in_flight
    }
}

/// An entry taken from the frontier; counted as in flight until dropped
pub struct Lease {
    entry: FrontierEntry,
    frontier: Arc<Frontier>,
}

impl Deref for Lease {
    type Target = FrontierEntry;

    fn deref(&self) -> &FrontierEntry {
        &self.entry
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        self.frontier.release();
    }
}
