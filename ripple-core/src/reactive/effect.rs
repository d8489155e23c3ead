//! Effect Implementation
//!
//! An Effect is a side-effecting computation that runs whenever a signal it
//! read changes.
//!
//! # How Effects Work
//!
//! 1. When created, the effect runs its function immediately, with itself
//!    entered as the reactive context. Every signal read during that run
//!    subscribes the effect.
//!
//! 2. When a subscribed signal is written, the signal invokes the effect,
//!    which runs the whole protocol again: enter the context, run, leave.
//!
//! 3. What a re-run does with its dependencies depends on [`Tracking`]:
//!    `Rebuild` refreshes the edges it reads and prunes the rest afterwards,
//!    `Accumulate` appends a subscription for every tracked read.
//!
//! # Lifetime
//!
//! Subscriptions hold the effect strongly, so an effect keeps running after
//! its [`Effect`] handle is dropped. An effect whose closure captures a
//! signal it is subscribed to forms a cycle with that signal; call
//! [`Effect::dispose`] to detach it from every cell and break the cycle.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use super::cell::Source;
use super::context::{Observer, ReactiveContext};
use super::runtime::{Runtime, Tracking};
use super::subscriber::{Callback, CellId, SubscriberId};
use crate::graph::EdgeSet;

/// Create an effect that runs `run` now and again whenever a signal it reads
/// changes.
///
/// The returned handle may be dropped; the effect stays subscribed.
pub fn create_effect<F>(run: F) -> Effect
where
    F: Fn() + Send + Sync + 'static,
{
    Effect::new(run)
}

struct EffectInner {
    id: SubscriberId,
    run: Callback,
    tracking: Tracking,
    this: Weak<EffectInner>,
    edges: Mutex<EdgeSet>,
    /// Number of runs started; the current run's edges carry this value.
    generation: AtomicU64,
    /// Runs of this effect currently on the stack.
    depth: AtomicUsize,
    disposed: AtomicBool,
    /// Number of runs that returned normally.
    run_count: AtomicUsize,
}

/// Counts a run as active until dropped, also when the run panics.
struct RunDepth<'a>(&'a AtomicUsize);

impl<'a> RunDepth<'a> {
    /// Returns the guard and whether this is the outermost run.
    fn enter(depth: &'a AtomicUsize) -> (Self, bool) {
        let outermost = depth.fetch_add(1, Ordering::SeqCst) == 0;
        (Self(depth), outermost)
    }
}

impl Drop for RunDepth<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl EffectInner {
    fn execute(self: &Arc<Self>) {
        if self.disposed.load(Ordering::SeqCst) {
            tracing::trace!(effect = %self.id, "skipping disposed effect");
            return;
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let (_depth, outermost) = RunDepth::enter(&self.depth);
        tracing::debug!(effect = %self.id, generation, outermost, "running effect");

        {
            let observer: Arc<dyn Observer> = self.clone();
            let _ctx = ReactiveContext::enter(observer);
            (self.run)();
        }

        self.run_count.fetch_add(1, Ordering::SeqCst);

        // A re-entrant run (the effect wrote a cell it reads) stamps edges
        // with a later generation, so everything read since the outermost
        // run began survives; only that run prunes.
        let rebuild = self.tracking == Tracking::Rebuild;
        if outermost && rebuild && !self.disposed.load(Ordering::SeqCst) {
            self.prune(generation);
        }
    }

    fn prune(&self, generation: u64) {
        let stale = self.edges.lock().prune(generation);
        for source in stale {
            let removed = source.unsubscribe(self.id);
            tracing::trace!(effect = %self.id, cell = %source.id(), removed, "pruned stale edge");
        }
    }
}

impl Observer for EffectInner {
    fn subscriber_id(&self) -> SubscriberId {
        self.id
    }

    fn track(&self, source: &Arc<dyn Source>) -> bool {
        if self.disposed.load(Ordering::SeqCst) {
            return false;
        }

        let generation = self.generation.load(Ordering::SeqCst);
        let inserted = self.edges.lock().record(source, generation);
        match self.tracking {
            Tracking::Accumulate => true,
            Tracking::Rebuild => inserted,
        }
    }

    fn notifier(&self, source: CellId) -> Callback {
        match self.this.upgrade() {
            Some(effect) => Arc::new(move || {
                // A notify pass may still hold this subscription in its
                // snapshot after a run pruned the edge.
                let subscribed = effect.edges.lock().contains(source);
                if subscribed {
                    effect.execute();
                }
            }),
            None => Arc::new(|| {}),
        }
    }
}

/// A side-effecting computation that runs when dependencies change.
///
/// # Example
///
/// ```rust
/// use ripple_core::reactive::{create_signal, Effect};
///
/// let (count, set_count) = create_signal(0);
///
/// let effect = Effect::new(move || {
///     println!("Count is: {}", count.get());
/// });
///
/// set_count.set(5);  // Prints: "Count is: 5"
/// assert_eq!(effect.run_count(), 2);
/// ```
#[derive(Clone)]
pub struct Effect {
    inner: Arc<EffectInner>,
}

impl Effect {
    /// Create an effect using this thread's configured tracking mode.
    ///
    /// The function runs immediately to establish initial dependencies.
    pub fn new<F>(run: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self::with_tracking(run, Runtime::config().tracking)
    }

    /// Create an effect with an explicit tracking mode.
    pub fn with_tracking<F>(run: F, tracking: Tracking) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        let inner = Arc::new_cyclic(|this| EffectInner {
            id: SubscriberId::new(),
            run: Arc::new(run),
            tracking,
            this: this.clone(),
            edges: Mutex::new(EdgeSet::new()),
            generation: AtomicU64::new(0),
            depth: AtomicUsize::new(0),
            disposed: AtomicBool::new(false),
            run_count: AtomicUsize::new(0),
        });

        inner.execute();

        Self { inner }
    }

    /// Get the effect's unique ID, which is also its subscriber ID.
    pub fn id(&self) -> SubscriberId {
        self.inner.id
    }

    pub fn tracking(&self) -> Tracking {
        self.inner.tracking
    }

    /// Run the effect again now, exactly as a dependency change would.
    pub fn run(&self) {
        self.inner.execute();
    }

    /// Detach the effect from every cell it is subscribed to.
    ///
    /// After disposal, the effect will not run again.
    pub fn dispose(&self) {
        if self.inner.disposed.swap(true, Ordering::SeqCst) {
            return;
        }

        let sources = self.inner.edges.lock().drain();
        let removed: usize = sources
            .iter()
            .map(|source| source.unsubscribe(self.inner.id))
            .sum();
        tracing::debug!(effect = %self.inner.id, cells = sources.len(), removed, "effect disposed");
    }

    /// Check if the effect has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }

    /// Get the number of times the effect has run to completion.
    pub fn run_count(&self) -> usize {
        self.inner.run_count.load(Ordering::SeqCst)
    }

    /// Get the number of distinct cells the effect depends on.
    pub fn dependency_count(&self) -> usize {
        self.inner.edges.lock().len()
    }
}

impl std::fmt::Debug for Effect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Effect")
            .field("id", &self.inner.id)
            .field("tracking", &self.inner.tracking)
            .field("run_count", &self.run_count())
            .field("dependencies", &self.inner.edges.lock().cells().collect::<Vec<_>>())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
