//! Errors raised by the connection abstraction and ICM workers.

use si_common::error::FrameError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IcmError {
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    #[error("connection closed by peer")]
    PeerClosed,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
