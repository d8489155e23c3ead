//! Signal Implementation
//!
//! A signal is an observable cell exposed as two capabilities: a
//! [`ReadSignal`] and a [`WriteSignal`]. They are the only handles to the
//! cell; cloning either one shares the same cell.
//!
//! # How Signals Work
//!
//! 1. When a signal is read while an effect is running, the read subscribes
//!    that effect to the cell. Nothing else is needed to declare a
//!    dependency.
//!
//! 2. When a signal is written, the cell stores the value and synchronously
//!    invokes every subscriber before `set` returns.
//!
//! Reads outside any effect never subscribe anything.

use std::fmt::{self, Debug};
use std::sync::Arc;

use super::cell::{ObservableCell, Source};
use super::context::ReactiveContext;
use super::subscriber::CellId;
use crate::error::Result;

/// Create a signal holding `initial`, returning its read and write halves.
///
/// # Example
///
/// ```rust
/// use ripple_core::reactive::{create_effect, create_signal};
///
/// let (count, set_count) = create_signal(1);
/// let log = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
///
/// let log_clone = log.clone();
/// create_effect(move || log_clone.lock().unwrap().push(count.get()));
/// set_count.set(2);
///
/// assert_eq!(*log.lock().unwrap(), vec![1, 2]);
/// ```
pub fn create_signal<T>(initial: T) -> (ReadSignal<T>, WriteSignal<T>)
where
    T: Clone + Send + Sync + 'static,
{
    let cell = Arc::new(ObservableCell::new(initial));
    (
        ReadSignal {
            cell: Arc::clone(&cell),
        },
        WriteSignal { cell },
    )
}

/// The read half of a signal.
pub struct ReadSignal<T>
where
    T: Clone + Send + Sync + 'static,
{
    cell: Arc<ObservableCell<T>>,
}

impl<T> ReadSignal<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Get the current value.
    ///
    /// If called while an effect is running, this also subscribes that
    /// effect to the signal.
    pub fn get(&self) -> T {
        if let Some(observer) = ReactiveContext::current_observer() {
            let source: Arc<dyn Source> = self.cell.clone();
            if observer.track(&source) {
                let rerun = observer.notifier(self.cell.id());
                self.cell.subscribe(observer.subscriber_id(), move |_| rerun());
            }
        }

        self.cell.get()
    }

    /// Get the current value without subscribing anything.
    pub fn get_untracked(&self) -> T {
        self.cell.get()
    }

    pub fn id(&self) -> CellId {
        self.cell.id()
    }

    /// Number of subscriptions on the underlying cell, duplicates included.
    pub fn subscriber_count(&self) -> usize {
        self.cell.subscriber_count()
    }
}

impl<T> Clone for ReadSignal<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            cell: Arc::clone(&self.cell),
        }
    }
}

impl<T> Debug for ReadSignal<T>
where
    T: Clone + Send + Sync + Debug + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadSignal")
            .field("id", &self.cell.id())
            .field("value", &self.get_untracked())
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

/// The write half of a signal.
pub struct WriteSignal<T>
where
    T: Clone + Send + Sync + 'static,
{
    cell: Arc<ObservableCell<T>>,
}

impl<T> WriteSignal<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Set a new value and notify subscribers.
    ///
    /// # Panics
    ///
    /// Panics if a subscriber panicked. Under the `Isolate` failure policy
    /// this happens after every subscriber has run; under `Abort` the
    /// subscriber's own panic unwinds through here immediately.
    pub fn set(&self, value: T) {
        if let Err(err) = self.try_set(value) {
            panic!("{err}");
        }
    }

    /// Set a new value and notify subscribers, reporting isolated subscriber
    /// failures instead of panicking.
    pub fn try_set(&self, value: T) -> Result<()> {
        self.cell.set(value)
    }

    /// Update the value using a function of the current one.
    ///
    /// # Panics
    ///
    /// Same as [`WriteSignal::set`].
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&T) -> T,
    {
        let next = f(&self.cell.get());
        self.set(next);
    }

    pub fn id(&self) -> CellId {
        self.cell.id()
    }
}

impl<T> Clone for WriteSignal<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            cell: Arc::clone(&self.cell),
        }
    }
}

impl<T> Debug for WriteSignal<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriteSignal").field("id", &self.cell.id()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::error::ReactiveError;
    use crate::reactive::{FailurePolicy, Runtime, RuntimeConfig};

    #[test]
    fn read_returns_last_write() {
        let (value, set_value) = create_signal(0);
        for next in 1..=5 {
            set_value.set(next);
        }
        assert_eq!(value.get(), 5);
    }

    #[test]
    fn signal_update() {
        let (value, set_value) = create_signal(10);
        set_value.update(|v| v + 5);
        assert_eq!(value.get(), 15);
    }

    #[test]
    fn halves_share_one_cell() {
        let (read, write) = create_signal(String::from("a"));
        let (read2, write2) = (read.clone(), write.clone());

        assert_eq!(read.id(), write.id());
        assert_eq!(read2.id(), write2.id());

        write2.set("b".into());
        assert_eq!(read.get(), "b");
    }

    #[test]
    fn reads_outside_effects_do_not_subscribe() {
        let (value, _set_value) = create_signal(1);
        let _ = value.get();
        let _ = value.get_untracked();
        assert_eq!(value.subscriber_count(), 0);
    }

    #[test]
    fn signal_ids_are_unique() {
        let (a, _) = create_signal(0);
        let (b, _) = create_signal(0);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn try_set_reports_isolated_failures() {
        let (value, set_value) = create_signal(0);
        value.cell.subscribe(crate::reactive::SubscriberId::new(), |v: &i32| {
            if *v > 0 {
                panic!("positive value rejected");
            }
        });

        let err = set_value.try_set(1).unwrap_err();
        assert!(matches!(err, ReactiveError::Notify { failed: 1, total: 1, .. }));
        assert_eq!(value.get(), 1);
    }

    #[test]
    #[should_panic(expected = "panicked during notify")]
    fn set_panics_after_isolated_failures() {
        let (value, set_value) = create_signal(0);
        value.cell.subscribe(crate::reactive::SubscriberId::new(), |_| panic!("boom"));
        set_value.set(1);
    }

    #[test]
    #[should_panic(expected = "boom")]
    fn set_propagates_subscriber_panic_under_abort() {
        let config = RuntimeConfig::new().with_failure_policy(FailurePolicy::Abort);
        let (value, set_value) = Runtime::with_config(config, || create_signal(0));
        value.cell.subscribe(crate::reactive::SubscriberId::new(), |_| panic!("boom"));
        set_value.set(1);
    }

    #[test]
    fn debug_output_names_the_half() {
        let (read, write) = create_signal(3);
        assert!(format!("{read:?}").starts_with("ReadSignal"));
        assert!(format!("{read:?}").contains("value: 3"));
        assert!(format!("{write:?}").starts_with("WriteSignal"));
    }
}
