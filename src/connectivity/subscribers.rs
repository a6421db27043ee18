// Copyright 2026 Daniel Pelikan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Ordered observer registry.

use parking_lot::Mutex;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::error;

/// Callback invoked with every committed snapshot.
pub type Subscriber<S> = Arc<dyn Fn(&S) + Send + Sync>;

struct Entry<S> {
    id: u64,
    callback: Subscriber<S>,
}

type Entries<S> = Mutex<Vec<Entry<S>>>;

/// Observers notified in subscription order.
///
/// The same `Arc` callback is registered at most once.
pub struct SubscriberRegistry<S> {
    entries: Arc<Entries<S>>,
    next_id: AtomicU64,
}

impl<S: 'static> SubscriberRegistry<S> {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(Vec::new())),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a callback. Subscribing an already registered callback
    /// returns a handle to the existing registration.
    pub fn subscribe(&self, callback: Subscriber<S>) -> Subscription {
        let mut entries = self.entries.lock();
        let id = match entries.iter().find(|e| Arc::ptr_eq(&e.callback, &callback)) {
            Some(existing) => existing.id,
            None => {
                let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                entries.push(Entry { id, callback });
                id
            }
        };

        let weak: Weak<Entries<S>> = Arc::downgrade(&self.entries);
        Subscription {
            remove: Box::new(move || {
                if let Some(entries) = weak.upgrade() {
                    entries.lock().retain(|e| e.id != id);
                }
            }),
            active: Mutex::new(true),
        }
    }

    /// Invoke every callback with `snapshot`.
    ///
    /// Callbacks run outside the registry lock so they may subscribe or
    /// unsubscribe. A panicking callback is logged and skipped.
    pub fn notify(&self, snapshot: &S) {
        let callbacks: Vec<Subscriber<S>> = self
            .entries
            .lock()
            .iter()
            .map(|e| e.callback.clone())
            .collect();

        for callback in callbacks {
            if catch_unwind(AssertUnwindSafe(|| callback(snapshot))).is_err() {
                error!("Subscriber callback panicked");
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

impl<S: 'static> Default for SubscriberRegistry<S> {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle returned by `subscribe`.
///
/// Dropping the handle keeps the subscription alive; call
/// [`Subscription::unsubscribe`] to remove it.
pub struct Subscription {
    remove: Box<dyn Fn() + Send + Sync>,
    active: Mutex<bool>,
}

impl Subscription {
    /// Remove the callback. Calling this more than once is a no-op.
    pub fn unsubscribe(&self) {
        let mut active = self.active.lock();
        if *active {
            *active = false;
            (self.remove)();
        }
    }

    pub fn is_active(&self) -> bool {
        *self.active.lock()
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}
