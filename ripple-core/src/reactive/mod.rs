//! Reactive Primitives
//!
//! This module implements the core reactive system: signals and effects.
//!
//! # Concepts
//!
//! ## Signals
//!
//! A signal is a value cell exposed as a read half and a write half. When
//! the read half is called while an effect is running, the signal
//! automatically registers that effect as a subscriber. When the write half
//! is called, every subscriber runs before the write returns.
//!
//! ## Effects
//!
//! An effect is a side-effecting computation that runs once when created
//! and again whenever a signal it read changes. Effects are how reactive
//! state reaches the outside world: logging, rendering, I/O.
//!
//! # Implementation Notes
//!
//! The reactive system uses a thread-local tracking context to detect
//! dependencies. When a signal is read, we check if there is an active
//! context and, if so, subscribe the running effect.
//!
//! Everything is synchronous. A write propagates through every subscriber,
//! including writes those subscribers make in turn, within a single call
//! stack. There is no batching and no deduplication across paths.

mod cell;
mod context;
mod effect;
mod runtime;
mod signal;
mod subscriber;

pub use cell::{ObservableCell, Source};
pub use context::{Observer, ReactiveContext};
pub use effect::{create_effect, Effect};
pub use runtime::{FailurePolicy, Runtime, RuntimeConfig, Tracking};
pub use signal::{create_signal, ReadSignal, WriteSignal};
pub use subscriber::{Callback, CellId, SubscriberId};
