//! Error types for the reactive core.

use std::any::Any;

use thiserror::Error;

use crate::reactive::{CellId, SubscriberId};

/// A subscriber that panicked while a cell was broadcasting a write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriberFailure {
    /// The subscriber whose callback panicked.
    pub subscriber: SubscriberId,
    /// The panic message, when the payload was a string.
    pub message: String,
}

impl SubscriberFailure {
    pub(crate) fn from_panic(subscriber: SubscriberId, payload: &(dyn Any + Send)) -> Self {
        Self {
            subscriber,
            message: panic_message(payload),
        }
    }
}

/// Errors produced by the reactive core.
#[derive(Debug, Error)]
pub enum ReactiveError {
    /// One or more subscribers panicked during an isolated notify pass.
    /// The remaining subscribers of that pass still ran.
    #[error(
        "{} of {} subscribers of {} panicked during notify: {}",
        .failed, .total, .cell, summarize(.failures)
    )]
    Notify {
        cell: CellId,
        failed: usize,
        total: usize,
        failures: Vec<SubscriberFailure>,
    },

    #[error("unknown tracking mode `{0}` (expected `accumulate` or `rebuild`)")]
    UnknownTracking(String),

    #[error("unknown failure policy `{0}` (expected `abort` or `isolate`)")]
    UnknownFailurePolicy(String),
}

/// Convenience result alias.
pub type Result<T, E = ReactiveError> = std::result::Result<T, E>;

fn summarize(failures: &[SubscriberFailure]) -> String {
    failures
        .iter()
        .map(|failure| format!("{}: {}", failure.subscriber, failure.message))
        .collect::<Vec<_>>()
        .join("; ")
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panic_messages_are_extracted() {
        let id = SubscriberId::new();

        let literal: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(SubscriberFailure::from_panic(id, literal.as_ref()).message, "boom");

        let owned: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(SubscriberFailure::from_panic(id, owned.as_ref()).message, "bang");

        let other: Box<dyn Any + Send> = Box::new(7_u32);
        assert_eq!(
            SubscriberFailure::from_panic(id, other.as_ref()).message,
            "non-string panic payload"
        );
    }

    #[test]
    fn notify_error_lists_failures() {
        let cell = CellId::new();
        let first = SubscriberId::new();
        let second = SubscriberId::new();
        let err = ReactiveError::Notify {
            cell,
            failed: 2,
            total: 3,
            failures: vec![
                SubscriberFailure { subscriber: first, message: "a".into() },
                SubscriberFailure { subscriber: second, message: "b".into() },
            ],
        };

        let rendered = err.to_string();
        assert!(rendered.starts_with(&format!("2 of 3 subscribers of {cell} panicked")));
        assert!(rendered.contains(&format!("{first}: a; {second}: b")));
    }
}
