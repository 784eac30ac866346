//! Per-category dispatch worker.
//!
//! Decouples the OS callback thread (which must return quickly) from
//! arbitrarily slow observer logic: the callback pushes a payload onto the
//! category's queue, and a dedicated worker drains the queue and invokes
//! every registered observer for each payload, in arrival order.

use std::sync::{Arc, Mutex};
use std::thread;

use crossbeam_channel::{bounded, Sender};
use tracing::{debug, warn};

use crate::hooks::HookError;

// Bounded queue so a stalled observer cannot grow memory without limit; the
// OS callback side uses try_send and drops on overflow instead of blocking.
const EVENT_QUEUE_CAPACITY: usize = 10_000;

/// Queue plus observer list for one observer category.
///
/// The worker parks in `recv()` while the queue is empty and wakes when a
/// payload arrives. While draining, the queue lock is never held across an
/// observer call (channel semantics), but the observer list is locked for the
/// whole iteration so concurrent register/unregister cannot corrupt it.
pub(crate) struct DispatchLane<E, O>
where
    E: Send + 'static,
    O: ?Sized + Send + Sync + 'static,
{
    tx: Sender<E>,
    observers: Arc<Mutex<Vec<Arc<O>>>>,
}

impl<E, O> DispatchLane<E, O>
where
    E: Send + 'static,
    O: ?Sized + Send + Sync + 'static,
{
    /// Start the category's worker thread.
    ///
    /// The worker lives until the queue disconnects, which only happens when
    /// the owning registry is dropped at process teardown.
    pub(crate) fn spawn(name: &str, deliver: fn(&O, &E)) -> Result<Self, HookError> {
        let (tx, rx) = bounded::<E>(EVENT_QUEUE_CAPACITY);
        let observers: Arc<Mutex<Vec<Arc<O>>>> = Arc::new(Mutex::new(Vec::new()));
        let list = observers.clone();

        thread::Builder::new()
            .name(format!("dispatch-{name}"))
            .spawn(move || {
                while let Ok(event) = rx.recv() {
                    let observers = list.lock().unwrap();
                    for observer in observers.iter() {
                        deliver(observer, &event);
                    }
                }
                debug!("dispatch worker exiting (queue disconnected)");
            })
            .map_err(|e| HookError::WorkerSpawn(e.to_string()))?;

        Ok(Self { tx, observers })
    }

    /// Queue handle for the OS callback side.
    pub(crate) fn sender(&self) -> Sender<E> {
        self.tx.clone()
    }

    /// Add an observer. An observer appears at most once in the list.
    pub(crate) fn add(&self, observer: Arc<O>) {
        let mut observers = self.observers.lock().unwrap();
        if observers.iter().any(|o| Arc::ptr_eq(o, &observer)) {
            debug!("observer already registered for this category");
            return;
        }
        observers.push(observer);
    }

    /// Remove an observer by identity.
    pub(crate) fn remove(&self, observer: &Arc<O>) {
        let mut observers = self.observers.lock().unwrap();
        let before = observers.len();
        observers.retain(|o| !Arc::ptr_eq(o, observer));
        if observers.len() == before {
            warn!("tried to unregister an observer that was not registered");
        }
    }
}
