//! Errors raised by the Fault Manager's persistence and log-sink I/O.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FmError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("persistence record truncated: got {got} bytes, need at least {need}")]
    Truncated { got: usize, need: usize },
}
