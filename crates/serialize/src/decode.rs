//! The byte-level input half of the wire format.

use std::io;

/// The most a length prefix read off the wire may reserve before any of its
/// bytes have arrived. Longer runs grow the buffer as they are read.
pub(crate) const MAX_UPFRONT_RESERVATION: usize = 64 * 1024;

/// A source of the primitive values the wire format is built from.
///
/// Every method fails with [`io::ErrorKind::UnexpectedEof`] when the input
/// ends early, and with [`io::ErrorKind::InvalidData`] when a varint does not
/// fit its target width.
pub trait Decoder {
    /// Reads a single byte.
    fn read_u8(&mut self) -> io::Result<u8>;

    /// Reads a variable-length unsigned 32-bit integer.
    fn read_u32(&mut self) -> io::Result<u32>;

    /// Reads a variable-length unsigned 64-bit integer.
    fn read_u64(&mut self) -> io::Result<u64>;

    /// Appends exactly `len` bytes to `buffer`.
    ///
    /// On failure `buffer` may hold a partial read; callers treat the whole
    /// buffer as garbage in that case.
    fn read_into(&mut self, buffer: &mut Vec<u8>, len: usize)
    -> io::Result<()>;

    /// Discards exactly `len` bytes.
    fn skip(&mut self, len: usize) -> io::Result<()>;

    /// Reads exactly `len` bytes into a fresh vector.
    fn read_raw_bytes(&mut self, len: usize) -> io::Result<Vec<u8>> {
        let mut buffer = Vec::with_capacity(len.min(MAX_UPFRONT_RESERVATION));
        self.read_into(&mut buffer, len)?;
        Ok(buffer)
    }

    /// Reads a byte run preceded by its varint length.
    fn read_bytes(&mut self) -> io::Result<Vec<u8>> {
        let len = self.read_u32()? as usize;
        self.read_raw_bytes(len)
    }
}
