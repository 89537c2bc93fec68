//! The transport boundary between ICM and an already-established byte
//! stream (spec §1, §4.1.1). Socket setup, accept/connect, and
//! connection-lifecycle details are out of scope; this crate only depends
//! on the small `FrameConnection` trait below, mirroring the way this
//! codebase isolates transport specifics behind a typed attach/read/commit
//! wrapper rather than coupling the protocol engine to a concrete transport.

use std::collections::VecDeque;
use std::io::{Read, Write};
use std::net::TcpStream;

use si_common::frame::{RawFrame, FRAME_LEN};

use crate::error::IcmError;

/// Minimal non-blocking byte-stream contract the ICM needs (spec §4.1.1).
pub trait FrameConnection {
    /// Read one frame without blocking. `Ok(None)` means the read would
    /// block (no full frame available yet); `Err(IcmError::PeerClosed)`
    /// means the peer closed the stream.
    fn try_read_frame(&mut self) -> Result<Option<RawFrame>, IcmError>;

    /// Send one frame, blocking at most as long as the underlying transport does.
    fn send_frame(&mut self, frame: &RawFrame) -> Result<(), IcmError>;

    /// Close the connection; idempotent.
    fn close(&mut self);
}

/// `FrameConnection` over a non-blocking `TcpStream`, accumulating partial
/// reads across polls until a full frame is available.
pub struct TcpFrameConnection {
    stream: TcpStream,
    read_buf: Vec<u8>,
    closed: bool,
}

impl TcpFrameConnection {
    /// Wrap an already-connected stream; sets it non-blocking.
    pub fn new(stream: TcpStream) -> std::io::Result<Self> {
        stream.set_nonblocking(true)?;
        Ok(Self {
            stream,
            read_buf: Vec::with_capacity(FRAME_LEN),
            closed: false,
        })
    }
}

impl FrameConnection for TcpFrameConnection {
    fn try_read_frame(&mut self) -> Result<Option<RawFrame>, IcmError> {
        if self.closed {
            return Err(IcmError::PeerClosed);
        }
        let mut chunk = [0u8; FRAME_LEN];
        loop {
            if self.read_buf.len() >= FRAME_LEN {
                let frame = RawFrame::decode(&self.read_buf[..FRAME_LEN])?;
                self.read_buf.drain(..FRAME_LEN);
                return Ok(Some(frame));
            }
            match self.stream.read(&mut chunk) {
                Ok(0) => {
                    self.closed = true;
                    return Err(IcmError::PeerClosed);
                }
                Ok(n) => self.read_buf.extend_from_slice(&chunk[..n]),
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => return Ok(None),
                Err(e) => return Err(IcmError::Io(e)),
            }
        }
    }

    fn send_frame(&mut self, frame: &RawFrame) -> Result<(), IcmError> {
        self.stream.write_all(&frame.encode()).map_err(IcmError::Io)
    }

    fn close(&mut self) {
        self.closed = true;
        let _ = self.stream.shutdown(std::net::Shutdown::Both);
    }
}

/// In-memory `FrameConnection` test double, backed by queues of already-decoded frames.
#[derive(Debug, Default)]
pub struct ChannelFrameConnection {
    pub inbound: VecDeque<RawFrame>,
    pub sent: Vec<RawFrame>,
    pub closed: bool,
    pub peer_closed: bool,
}

impl ChannelFrameConnection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_inbound(&mut self, frame: RawFrame) {
        self.inbound.push_back(frame);
    }
}

impl FrameConnection for ChannelFrameConnection {
    fn try_read_frame(&mut self) -> Result<Option<RawFrame>, IcmError> {
        if self.closed {
            return Err(IcmError::PeerClosed);
        }
        if self.peer_closed && self.inbound.is_empty() {
            return Err(IcmError::PeerClosed);
        }
        Ok(self.inbound.pop_front())
    }

    fn send_frame(&mut self, frame: &RawFrame) -> Result<(), IcmError> {
        if self.closed {
            return Err(IcmError::PeerClosed);
        }
        self.sent.push(*frame);
        Ok(())
    }

    fn close(&mut self) {
        self.closed = true;
    }
}
