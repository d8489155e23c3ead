//! Ripple Core
//!
//! This crate provides a small reactive value propagation engine:
//!
//! - Signals: observable values exposed as a read/write accessor pair
//! - Effects: procedures that re-run whenever a signal they read changes
//! - Implicit dependency tracking through a per-thread reactive context
//!
//! # Architecture
//!
//! The crate is organized into a few modules:
//!
//! - `reactive`: Signals, effects, the tracking context and the runtime
//!   configuration
//! - `graph`: Per-effect dependency edges used to rebuild and dispose
//! - `error`: The error type shared by the above
//!
//! # Example
//!
//! ```rust
//! use std::sync::{Arc, Mutex};
//! use ripple_core::reactive::{create_effect, create_signal};
//!
//! let (name, set_name) = create_signal(String::from("John"));
//! let (age, _set_age) = create_signal(24);
//! let log = Arc::new(Mutex::new(Vec::new()));
//!
//! let sink = log.clone();
//! create_effect(move || {
//!     sink.lock().unwrap().push(format!("Name: {}, Age: {}", name.get(), age.get()));
//! });
//!
//! set_name.set("John Doe".into());
//!
//! assert_eq!(
//!     *log.lock().unwrap(),
//!     ["Name: John, Age: 24", "Name: John Doe, Age: 24"]
//! );
//! ```

pub mod error;
pub mod graph;
pub mod reactive;

pub use error::{ReactiveError, Result, SubscriberFailure};
pub use reactive::{create_effect, create_signal, Effect, ReadSignal, WriteSignal};
