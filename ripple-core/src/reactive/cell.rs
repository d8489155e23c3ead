//! Observable Cell
//!
//! A cell owns a value and an ordered list of subscriptions. It knows how
//! to read, write, and broadcast; it knows nothing about tracking. Signals
//! wrap a cell and add dependency registration on read.
//!
//! # Notification
//!
//! `notify` takes a snapshot of the subscription list before invoking
//! anything, so no lock is held while user code runs. Subscriptions added
//! during a pass are first invoked on the next write. Each subscriber is
//! handed the cell's value as it is at the moment that subscriber runs, so a
//! subscriber that writes back to the same cell is visible to the ones after
//! it. Whether a snapshotted entry still wants to run is up to its callback;
//! effects check that they still track the cell.

use std::fmt::{self, Debug};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use smallvec::SmallVec;

use super::runtime::{FailurePolicy, Runtime};
use super::subscriber::{CellId, SubscriberId};
use crate::error::{ReactiveError, Result, SubscriberFailure};

type Notify<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// The type-erased face of a cell, used by effects to manage their edges.
pub trait Source: Send + Sync {
    fn id(&self) -> CellId;

    /// Remove every subscription owned by `subscriber`, returning how many
    /// were removed.
    fn unsubscribe(&self, subscriber: SubscriberId) -> usize;

    fn subscriber_count(&self) -> usize;
}

struct Subscription<T> {
    subscriber: SubscriberId,
    notify: Notify<T>,
}

/// A value plus the callbacks interested in it.
pub struct ObservableCell<T>
where
    T: Clone + Send + Sync + 'static,
{
    id: CellId,
    value: RwLock<T>,
    subscribers: Mutex<Vec<Subscription<T>>>,
    failure_policy: FailurePolicy,
}

impl<T> ObservableCell<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a cell using this thread's configured failure policy.
    pub fn new(value: T) -> Self {
        Self::with_policy(value, Runtime::config().failure_policy)
    }

    pub fn with_policy(value: T, failure_policy: FailurePolicy) -> Self {
        Self {
            id: CellId::new(),
            value: RwLock::new(value),
            subscribers: Mutex::new(Vec::new()),
            failure_policy,
        }
    }

    pub fn id(&self) -> CellId {
        self.id
    }

    pub fn failure_policy(&self) -> FailurePolicy {
        self.failure_policy
    }

    /// Read the stored value. No tracking happens here.
    pub fn get(&self) -> T {
        self.value.read().clone()
    }

    /// Replace the stored value, then notify every subscriber.
    pub fn set(&self, value: T) -> Result<()> {
        *self.value.write() = value;
        self.notify()
    }

    /// Append a subscription. The same subscriber may be added any number of
    /// times and is then invoked once per subscription.
    pub fn subscribe<F>(&self, subscriber: SubscriberId, notify: F)
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let mut subscribers = self.subscribers.lock();
        subscribers.push(Subscription {
            subscriber,
            notify: Arc::new(notify),
        });
        tracing::trace!(
            cell = %self.id,
            %subscriber,
            count = subscribers.len(),
            "subscribed"
        );
    }

    /// Invoke every subscriber, in the order they were added.
    ///
    /// With [`FailurePolicy::Abort`] a panicking subscriber unwinds out of
    /// this call and later subscribers are skipped. With
    /// [`FailurePolicy::Isolate`] every subscriber runs and the panics are
    /// returned as [`ReactiveError::Notify`].
    pub fn notify(&self) -> Result<()> {
        let snapshot: SmallVec<[(SubscriberId, Notify<T>); 4]> = self
            .subscribers
            .lock()
            .iter()
            .map(|subscription| (subscription.subscriber, Arc::clone(&subscription.notify)))
            .collect();
        let total = snapshot.len();

        let mut failures = Vec::new();
        for (subscriber, notify) in snapshot {
            let value = self.get();
            match self.failure_policy {
                FailurePolicy::Abort => notify(&value),
                FailurePolicy::Isolate => {
                    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| notify(&value))) {
                        let failure = SubscriberFailure::from_panic(subscriber, payload.as_ref());
                        tracing::warn!(
                            cell = %self.id,
                            %subscriber,
                            message = %failure.message,
                            "subscriber panicked during notify"
                        );
                        failures.push(failure);
                    }
                }
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(ReactiveError::Notify {
                cell: self.id,
                failed: failures.len(),
                total,
                failures,
            })
        }
    }

    /// Remove every subscription owned by `subscriber`.
    pub fn unsubscribe(&self, subscriber: SubscriberId) -> usize {
        let mut subscribers = self.subscribers.lock();
        let before = subscribers.len();
        subscribers.retain(|subscription| subscription.subscriber != subscriber);
        let removed = before - subscribers.len();
        if removed > 0 {
            tracing::trace!(cell = %self.id, %subscriber, removed, "unsubscribed");
        }
        removed
    }

    /// Number of subscriptions, duplicates included.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}

impl<T> Source for ObservableCell<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn id(&self) -> CellId {
        self.id
    }

    fn unsubscribe(&self, subscriber: SubscriberId) -> usize {
        ObservableCell::unsubscribe(self, subscriber)
    }

    fn subscriber_count(&self) -> usize {
        ObservableCell::subscriber_count(self)
    }
}

impl<T> Debug for ObservableCell<T>
where
    T: Clone + Send + Sync + Debug + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservableCell")
            .field("id", &self.id)
            .field("value", &*self.value.read())
            .field("subscriber_count", &self.subscriber_count())
            .field("failure_policy", &self.failure_policy)
            .finish()
    }
}
