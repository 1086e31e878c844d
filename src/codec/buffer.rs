//! Bounds-checked reads over a connection's receive buffer.
//!
//! Every accessor answers `None` when the buffer does not hold enough bytes yet, which a decoder
//! turns into "wait for more input". Nothing here indexes past the end of the buffer.

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use bytes::BytesMut;

pub trait FrameBuf {
    /// Offset of the first `delimiter` at or after `from`.
    fn peek_delimiter(&self, delimiter: u8, from: usize) -> Option<usize>;

    fn peek_u8(&self, at: usize) -> Option<u8>;

    fn peek_u16_be(&self, at: usize) -> Option<u16>;

    fn peek_u16_le(&self, at: usize) -> Option<u16>;

    fn peek_u32_le(&self, at: usize) -> Option<u32>;

    /// Removes and returns exactly `n` bytes from the front, or leaves the buffer untouched when
    /// fewer are buffered.
    fn take_exact(&mut self, n: usize) -> Option<BytesMut>;
}

impl FrameBuf for BytesMut {
    fn peek_delimiter(&self, delimiter: u8, from: usize) -> Option<usize> {
        self.get(from..)?
            .iter()
            .position(|byte| *byte == delimiter)
            .map(|offset| from + offset)
    }

    fn peek_u8(&self, at: usize) -> Option<u8> {
        self.get(at).copied()
    }

    fn peek_u16_be(&self, at: usize) -> Option<u16> {
        self.get(at..at + 2).map(BigEndian::read_u16)
    }

    fn peek_u16_le(&self, at: usize) -> Option<u16> {
        self.get(at..at + 2).map(LittleEndian::read_u16)
    }

    fn peek_u32_le(&self, at: usize) -> Option<u32> {
        self.get(at..at + 4).map(LittleEndian::read_u32)
    }

    fn take_exact(&mut self, n: usize) -> Option<BytesMut> {
        if self.len() < n {
            return None;
        }
        Some(self.split_to(n))
    }
}
