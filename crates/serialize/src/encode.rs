//! The byte-level output half of the wire format.
//!
//! [`Encoder`] is intentionally small: the field framing in
//! [`Writer`](crate::Writer) only ever needs single bytes, unsigned varints
//! and raw byte runs. The trait is object safe so a writer can target any
//! sink through `&mut dyn Encoder`.

use std::io;

/// A sink for the primitive values the wire format is built from.
///
/// ```ignore
/// use quill_serialize::{Encoder, PostcardEncoder};
///
/// let mut encoder = PostcardEncoder::new(Vec::new());
/// encoder.emit_u32(300)?;
/// encoder.emit_bytes(b"abc")?;
/// assert_eq!(encoder.into_inner(), [0xAC, 0x02, 3, b'a', b'b', b'c']);
/// ```
pub trait Encoder {
    /// Emits a single byte.
    fn emit_u8(&mut self, v: u8) -> io::Result<()>;

    /// Emits an unsigned 32-bit integer as a variable-length integer.
    fn emit_u32(&mut self, v: u32) -> io::Result<()>;

    /// Emits an unsigned 64-bit integer as a variable-length integer.
    fn emit_u64(&mut self, v: u64) -> io::Result<()>;

    /// Emits bytes as-is, without a length prefix.
    fn emit_raw_bytes(&mut self, s: &[u8]) -> io::Result<()>;

    /// Emits a byte slice preceded by its length.
    ///
    /// # Errors
    ///
    /// Fails with [`io::ErrorKind::InvalidInput`] when the slice is longer
    /// than `u32::MAX` bytes, or when the sink fails.
    fn emit_bytes(&mut self, v: &[u8]) -> io::Result<()> {
        let len = u32::try_from(v.len()).map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                "byte slice too long for a u32 length prefix",
            )
        })?;

        self.emit_u32(len)?;
        self.emit_raw_bytes(v)
    }
}
