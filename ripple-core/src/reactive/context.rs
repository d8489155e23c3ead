//! Reactive Context
//!
//! The reactive context tracks which effect is currently running.
//! This enables automatic dependency tracking: when a signal is read,
//! the running effect is subscribed to it without naming the signal.
//!
//! # Implementation
//!
//! We use a thread-local stack of observers. Entering a context pushes an
//! observer and returns a guard; dropping the guard pops it again, which
//! restores whichever effect was running before. Because the pop happens in
//! `Drop`, a panicking effect still leaves the stack balanced.
//!
//! Only the top of the stack is ever consulted, so an effect created inside
//! another effect's run tracks its own reads, and the outer effect picks up
//! tracking again once the inner one returns.

use std::cell::RefCell;
use std::sync::Arc;

use super::cell::Source;
use super::subscriber::{Callback, CellId, SubscriberId};

/// Something that can be attributed signal reads while it runs.
pub trait Observer: Send + Sync {
    /// The identity used for this observer's subscriptions.
    fn subscriber_id(&self) -> SubscriberId;

    /// Record that `source` was read during the current run.
    ///
    /// Returns `true` when the caller should add a new subscription to the
    /// source, `false` when an existing one already covers it.
    fn track(&self, source: &Arc<dyn Source>) -> bool;

    /// The callback `source` invokes to re-run this observer.
    fn notifier(&self, source: CellId) -> Callback;
}

thread_local! {
    static CONTEXT_STACK: RefCell<Vec<Arc<dyn Observer>>> = const { RefCell::new(Vec::new()) };
}

/// Guard that pops the context when dropped.
pub struct ReactiveContext {
    subscriber_id: SubscriberId,
}

impl ReactiveContext {
    /// Enter a new reactive context for the given observer.
    ///
    /// While this context is active, any signals that are read will
    /// subscribe the observer. The context is exited when the returned
    /// guard is dropped.
    #[must_use = "the context is exited as soon as the guard is dropped"]
    pub fn enter(observer: Arc<dyn Observer>) -> Self {
        let subscriber_id = observer.subscriber_id();
        CONTEXT_STACK.with(|stack| stack.borrow_mut().push(observer));
        Self { subscriber_id }
    }

    /// Check if there is an active reactive context.
    pub fn is_active() -> bool {
        CONTEXT_STACK.with(|stack| !stack.borrow().is_empty())
    }

    #[cfg(test)]
    pub(crate) fn depth() -> usize {
        CONTEXT_STACK.with(|stack| stack.borrow().len())
    }

    /// Get the current subscriber ID, if any.
    pub fn current_subscriber() -> Option<SubscriberId> {
        CONTEXT_STACK.with(|stack| stack.borrow().last().map(|observer| observer.subscriber_id()))
    }

    /// Get the observer reads are currently attributed to, if any.
    ///
    /// The observer is cloned out so no borrow of the stack is held while
    /// the caller subscribes it.
    pub fn current_observer() -> Option<Arc<dyn Observer>> {
        CONTEXT_STACK.with(|stack| stack.borrow().last().cloned())
    }
}

impl Drop for ReactiveContext {
    fn drop(&mut self) {
        CONTEXT_STACK.with(|stack| {
            let popped = stack.borrow_mut().pop();

            if let Some(observer) = popped {
                debug_assert_eq!(
                    observer.subscriber_id(),
                    self.subscriber_id,
                    "ReactiveContext mismatch: expected {:?}, got {:?}",
                    self.subscriber_id,
                    observer.subscriber_id()
                );
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    struct Recorder {
        id: SubscriberId,
        seen: Mutex<Vec<CellId>>,
    }

    impl Recorder {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                id: SubscriberId::new(),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    impl Observer for Recorder {
        fn subscriber_id(&self) -> SubscriberId {
            self.id
        }

        fn track(&self, source: &Arc<dyn Source>) -> bool {
            self.seen.lock().push(source.id());
            true
        }

        fn notifier(&self, _source: CellId) -> Callback {
            Arc::new(|| {})
        }
    }

    #[test]
    fn context_tracks_subscriber() {
        let observer = Recorder::new();
        let id = observer.id;

        assert!(!ReactiveContext::is_active());
        assert!(ReactiveContext::current_subscriber().is_none());

        {
            let _ctx = ReactiveContext::enter(observer);

            assert!(ReactiveContext::is_active());
            assert_eq!(ReactiveContext::current_subscriber(), Some(id));
        }

        assert!(!ReactiveContext::is_active());
        assert!(ReactiveContext::current_subscriber().is_none());
    }

    #[test]
    fn nested_contexts_restore_the_outer_observer() {
        let outer = Recorder::new();
        let inner = Recorder::new();
        let (outer_id, inner_id) = (outer.id, inner.id);

        {
            let _outer = ReactiveContext::enter(outer);
            assert_eq!(ReactiveContext::current_subscriber(), Some(outer_id));

            {
                let _inner = ReactiveContext::enter(inner);
                assert_eq!(ReactiveContext::current_subscriber(), Some(inner_id));
                assert_eq!(ReactiveContext::depth(), 2);
            }

            assert_eq!(ReactiveContext::current_subscriber(), Some(outer_id));
        }

        assert!(ReactiveContext::current_subscriber().is_none());
    }

    #[test]
    fn context_is_popped_when_the_body_panics() {
        let observer = Recorder::new();

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _ctx = ReactiveContext::enter(observer);
            panic!("effect body failed");
        }));

        assert!(result.is_err());
        assert!(!ReactiveContext::is_active());
    }

    #[test]
    fn current_observer_receives_reads() {
        let observer = Recorder::new();
        let cell: Arc<dyn Source> = Arc::new(crate::reactive::ObservableCell::new(1));
        let cell_id = cell.id();

        {
            let _ctx = ReactiveContext::enter(observer.clone());
            let current = ReactiveContext::current_observer().unwrap();
            assert!(current.track(&cell));
        }

        assert_eq!(*observer.seen.lock(), vec![cell_id]);
    }
}
