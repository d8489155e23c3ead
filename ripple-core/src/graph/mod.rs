//! Dependency Graph
//!
//! The graph is stored per effect rather than centrally: each effect owns an
//! [`EdgeSet`] naming the cells it depends on, and each cell owns the list of
//! subscriptions pointing back at effects.
//!
//! - Cell → effect edges are the subscriptions that drive notification.
//! - Effect → cell edges are what let an effect rebuild its dependencies
//!   between runs and detach itself entirely on disposal.
//!
//! Edges carry a generation so that a re-run can refresh the ones it reads
//! and prune the rest once it finishes, without first tearing everything
//! down.

mod edges;

pub use edges::{Edge, EdgeSet};
