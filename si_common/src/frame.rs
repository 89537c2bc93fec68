//! The 26-byte TLV wire frame and its CRC.
//!
//! Field layout is a fixed external contract (§6), so it is packed and
//! unpacked explicitly rather than derived, and its size is pinned at
//! compile time.

use static_assertions::const_assert_eq;

use crate::error::FrameError;

/// Fixed payload width of a TLV frame, per spec §6.
pub const VALUE_LEN: usize = 8;

/// Fixed wire size of a TLV frame in bytes, per spec §6.
pub const FRAME_LEN: usize = 26;

const_assert_eq!(
    2 + 2 + 2 + 2 + 4 + 2 + 2 + VALUE_LEN,
    FRAME_LEN
);

/// A decoded TLV frame (spec §3, §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawFrame {
    pub wire_type: u16,
    pub length: u16,
    pub crc: u16,
    pub rolling_counter: u16,
    pub timestamp: u32,
    pub sequence_number: u16,
    pub id: u16,
    pub value: [u8; VALUE_LEN],
}

impl RawFrame {
    /// Encode into the fixed 26-byte little-endian wire layout.
    pub fn encode(&self) -> [u8; FRAME_LEN] {
        let mut buf = [0u8; FRAME_LEN];
        buf[0..2].copy_from_slice(&self.wire_type.to_le_bytes());
        buf[2..4].copy_from_slice(&self.length.to_le_bytes());
        buf[4..6].copy_from_slice(&self.crc.to_le_bytes());
        buf[6..8].copy_from_slice(&self.rolling_counter.to_le_bytes());
        buf[8..12].copy_from_slice(&self.timestamp.to_le_bytes());
        buf[12..14].copy_from_slice(&self.sequence_number.to_le_bytes());
        buf[14..16].copy_from_slice(&self.id.to_le_bytes());
        buf[16..24].copy_from_slice(&self.value);
        buf
    }

    /// Decode from a byte slice. Only checks length; CRC/dictionary-length
    /// validation is the receive path's job (spec §4.1 step 4).
    pub fn decode(bytes: &[u8]) -> Result<Self, FrameError> {
        if bytes.len() < FRAME_LEN {
            return Err(FrameError::Truncated {
                got: bytes.len(),
                need: FRAME_LEN,
            });
        }
        let mut value = [0u8; VALUE_LEN];
        value.copy_from_slice(&bytes[16..24]);
        Ok(Self {
            wire_type: u16::from_le_bytes([bytes[0], bytes[1]]),
            length: u16::from_le_bytes([bytes[2], bytes[3]]),
            crc: u16::from_le_bytes([bytes[4], bytes[5]]),
            rolling_counter: u16::from_le_bytes([bytes[6], bytes[7]]),
            timestamp: u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]),
            sequence_number: u16::from_le_bytes([bytes[12], bytes[13]]),
            id: u16::from_le_bytes([bytes[14], bytes[15]]),
            value,
        })
    }

    /// Recompute the CRC this frame *should* carry, over `seq ‖ id ‖ value`.
    pub fn expected_crc(&self) -> u16 {
        crc_over_seq_id_value(self.sequence_number, self.id, &self.value)
    }

    /// Whether the frame's declared `crc` matches its recomputed CRC.
    pub fn crc_ok(&self) -> bool {
        self.crc == self.expected_crc()
    }
}

/// CRC-16/CCITT (false) over `sequence_number ‖ id ‖ value`, per spec §6.
///
/// CRC-16 internals are an external collaborator per spec §1; this wraps a
/// published CRC-16 implementation rather than hand-rolling the polynomial
/// table.
pub fn crc_over_seq_id_value(sequence_number: u16, id: u16, value: &[u8; VALUE_LEN]) -> u16 {
    let mut bytes = [0u8; 2 + 2 + VALUE_LEN];
    bytes[0..2].copy_from_slice(&sequence_number.to_le_bytes());
    bytes[2..4].copy_from_slice(&id.to_le_bytes());
    bytes[4..].copy_from_slice(value);
    crc16::State::<crc16::CCITT_FALSE>::calculate(&bytes)
}
