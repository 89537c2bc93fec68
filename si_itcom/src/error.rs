//! Errors raised by the shared-state primitives (spec §4.3, §4.4).

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum ItcomError {
    #[error("queue is empty")]
    Empty,

    #[error("queue is full")]
    Full,

    #[error("index {0} out of bounds")]
    IndexOutOfBounds(usize),

    #[error("element exceeds fixed capacity")]
    Oversized,

    #[error("no entry matched the given criterion")]
    NotFound,
}
