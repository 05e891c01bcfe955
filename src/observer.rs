//! Typed observer registry with scoped subscriptions
//!
//! Listener lists in the registries all go through [`Listeners`]: subscribing
//! returns a [`Subscription`] handle whose drop removes the listener, so
//! unsubscribe cannot be forgotten. A panicking listener is caught and logged
//! and never breaks delivery to the listeners after it.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, Weak};

type Callback<E> = Arc<dyn Fn(&E) + Send + Sync>;

struct Table<E> {
    next_id: u64,
    entries: Vec<(u64, Callback<E>)>,
}

/// A set of listeners for one event type
pub struct Listeners<E> {
    inner: Arc<Mutex<Table<E>>>,
}

impl<E> Listeners<E> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Table {
                next_id: 0,
                entries: Vec::new(),
            })),
        }
    }

    /// Register a listener. Dropping the returned handle removes it.
    pub fn subscribe(&self, listener: impl Fn(&E) + Send + Sync + 'static) -> Subscription
    where
        E: 'static,
    {
        let id = {
            let mut table = self.inner.lock().expect("listener table poisoned");
            let id = table.next_id;
            table.next_id += 1;
            table.entries.push((id, Arc::new(listener)));
            id
        };

        let weak: Weak<Mutex<Table<E>>> = Arc::downgrade(&self.inner);
        Subscription {
            cancel: Some(Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    if let Ok(mut table) = inner.lock() {
                        table.entries.retain(|(entry_id, _)| *entry_id != id);
                    }
                }
            })),
        }
    }

    /// Deliver an event to every registered listener.
    ///
    /// Listeners run outside the table lock, so a listener may subscribe or
    /// drop subscriptions reentrantly. A panicking listener is logged and
    /// skipped; the remaining listeners still run.
    pub fn emit(&self, event: &E) {
        let callbacks: Vec<Callback<E>> = {
            let table = self.inner.lock().expect("listener table poisoned");
            table.entries.iter().map(|(_, cb)| Arc::clone(cb)).collect()
        };

        for callback in callbacks {
            if catch_unwind(AssertUnwindSafe(|| callback(event))).is_err() {
                tracing::error!("listener panicked; continuing with remaining listeners");
            }
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("listener table poisoned").entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<E> Default for Listeners<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> std::fmt::Debug for Listeners<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listeners").field("len", &self.len()).finish()
    }
}

/// RAII handle for one registered listener
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Keep the listener registered for the life of the process.
    pub fn forget(mut self) {
        self.cancel = None;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}
