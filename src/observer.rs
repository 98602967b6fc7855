// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! Typed observer channels.
//!
//! Each channel is a [`Registry`] of [`Observer`] handles for one event type. The
//! firing side only knows the event type, never a method name on the observer.

use std::{
    any::Any,
    fmt,
    panic::{self, AssertUnwindSafe},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use parking_lot::RwLock;
use tracing::{debug, error};

/// Source of observer identities. Identities are never reused within a process.
static NEXT_OBSERVER_ID: AtomicU64 = AtomicU64::new(1);

/// A handle to a callback interested in events of type `E`.
///
/// Clones share the same identity, so a clone can be used to remove the original.
pub struct Observer<E> {
    id: u64,
    name: String,
    callback: Arc<dyn Fn(&E) + Send + Sync>,
}

impl<E> Observer<E> {
    /// Creates a new observer with a fresh identity.
    pub fn new<F>(name: &str, callback: F) -> Observer<E>
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        Observer {
            id: NEXT_OBSERVER_ID.fetch_add(1, Ordering::Relaxed),
            name: name.to_string(),
            callback: Arc::new(callback),
        }
    }

    /// The identity of this observer.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The name used when logging about this observer.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<E> Clone for Observer<E> {
    fn clone(&self) -> Self {
        Observer {
            id: self.id,
            name: self.name.clone(),
            callback: self.callback.clone(),
        }
    }
}

impl<E> PartialEq for Observer<E> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<E> Eq for Observer<E> {}

impl<E> fmt::Debug for Observer<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observer")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish()
    }
}

/// An ordered set of observers for a single channel.
pub struct Registry<E> {
    /// The channel name, used for logging.
    channel: &'static str,
    /// Observers in registration order. No identity appears twice.
    observers: RwLock<Vec<Observer<E>>>,
}

impl<E> Registry<E> {
    /// Creates an empty registry for the named channel.
    pub fn new(channel: &'static str) -> Registry<E> {
        Registry {
            channel,
            observers: RwLock::new(Vec::new()),
        }
    }

    /// Appends the observer. Returns false if it was already registered.
    pub fn add(&self, observer: &Observer<E>) -> bool {
        let mut observers = self.observers.write();
        if observers.contains(observer) {
            debug!(
                channel = self.channel,
                observer = observer.name(),
                "Observer already registered."
            );
            return false;
        }
        observers.push(observer.clone());
        true
    }

    /// Removes the observer. Returns false if it was not registered.
    pub fn remove(&self, observer: &Observer<E>) -> bool {
        let mut observers = self.observers.write();
        match observers.iter().position(|o| o == observer) {
            Some(index) => {
                observers.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.observers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.read().is_empty()
    }

    /// Calls every observer with the event, in registration order, on the calling thread.
    ///
    /// The list is snapshotted first, so observers may register, remove, or fire other
    /// channels from inside their callback. A panicking observer is logged and skipped.
    pub fn notify_all(&self, event: &E) {
        let snapshot: Vec<Observer<E>> = self.observers.read().clone();
        for observer in snapshot.iter() {
            let result = panic::catch_unwind(AssertUnwindSafe(|| (observer.callback)(event)));
            if let Err(payload) = result {
                error!(
                    channel = self.channel,
                    observer = observer.name(),
                    err = panic_message(payload.as_ref()),
                    "Observer failed during notification."
                );
            }
        }
    }
}

impl<E> fmt::Debug for Registry<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("channel", &self.channel)
            .field("observers", &self.len())
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic"
    }
}
