//! Error types shared by the wire codec and the static dictionary.

use thiserror::Error;

/// Errors raised while decoding or validating a raw TLV frame.
///
/// These are distinct from the fault *events* raised into the `EventQueue`
/// (`si_common::events::EventId`): a `FrameError` is the low-level reason a
/// frame was rejected before dispatch; the receive path turns repeated
/// occurrences into a fault event per its own threshold policy (crc/rc error
/// counters), it does not propagate this error type itself.
#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum FrameError {
    /// Buffer handed to `RawFrame::decode` was shorter than the fixed frame size.
    #[error("truncated frame: got {got} bytes, need {need}")]
    Truncated { got: usize, need: usize },

    /// `length` field did not match the dictionary-declared length for `type`.
    #[error("length mismatch: frame declares {declared}, dictionary expects {expected}")]
    LengthMismatch { declared: u16, expected: u16 },

    /// Recomputed CRC over `seq ‖ id ‖ value` did not match the frame's `crc` field.
    #[error("crc mismatch: frame has {frame_crc:#06x}, computed {computed:#06x}")]
    CrcMismatch { frame_crc: u16, computed: u16 },
}

/// Errors raised by dictionary lookups.
#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum DictionaryError {
    /// No dictionary entry for the given `(type, id)` pair on this connection role.
    #[error("unrecognized message: type={wire_type:#06x} id={id:#06x}")]
    UnknownMessage { wire_type: u16, id: u16 },
}
