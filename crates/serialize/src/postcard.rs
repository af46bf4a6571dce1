//! Postcard-style implementations of [`Encoder`] and [`Decoder`].
//!
//! Unsigned integers use LEB128: seven data bits per byte, least significant
//! group first, with the high bit set on every byte except the last. Values
//! below 128 therefore take a single byte, which keeps field lengths and
//! reference ids compact.

use std::io::{self, Read, Write};

use crate::{Decoder, Encoder, decode::MAX_UPFRONT_RESERVATION};

const MAX_VARINT_U32_BYTES: usize = 5;
const MAX_VARINT_U64_BYTES: usize = 10;

macro_rules! encode_varint {
    ($name:ident, $ty:ty, $max:expr) => {
        /// Writes `value` as LEB128 into `buf`, returning the byte count.
        #[inline]
        #[allow(clippy::cast_possible_truncation)]
        const fn $name(mut value: $ty, buf: &mut [u8; $max]) -> usize {
            let mut i = 0;
            while value >= 0x80 {
                buf[i] = (value as u8) | 0x80;
                value >>= 7;
                i += 1;
            }
            buf[i] = value as u8;
            i + 1
        }
    };
}

encode_varint!(encode_varint_u32, u32, MAX_VARINT_U32_BYTES);
encode_varint!(encode_varint_u64, u64, MAX_VARINT_U64_BYTES);

/// An [`Encoder`] writing the postcard varint format to any [`Write`].
///
/// ```ignore
/// let mut encoder = PostcardEncoder::new(Vec::new());
/// encoder.emit_u32(42)?;
/// assert_eq!(encoder.into_inner(), [42]);
/// ```
#[derive(Debug)]
pub struct PostcardEncoder<W> {
    writer: W,
}

impl<W> PostcardEncoder<W> {
    /// Creates a new encoder wrapping the given writer.
    #[must_use]
    pub const fn new(writer: W) -> Self { Self { writer } }

    /// Returns a reference to the underlying writer.
    #[must_use]
    pub const fn get_ref(&self) -> &W { &self.writer }

    /// Consumes the encoder and returns the underlying writer.
    #[must_use]
    pub fn into_inner(self) -> W { self.writer }
}

impl<W: Write> Encoder for PostcardEncoder<W> {
    fn emit_u8(&mut self, v: u8) -> io::Result<()> {
        self.writer.write_all(&[v])
    }

    fn emit_u32(&mut self, v: u32) -> io::Result<()> {
        let mut buf = [0u8; MAX_VARINT_U32_BYTES];
        let len = encode_varint_u32(v, &mut buf);
        self.writer.write_all(&buf[..len])
    }

    fn emit_u64(&mut self, v: u64) -> io::Result<()> {
        let mut buf = [0u8; MAX_VARINT_U64_BYTES];
        let len = encode_varint_u64(v, &mut buf);
        self.writer.write_all(&buf[..len])
    }

    fn emit_raw_bytes(&mut self, s: &[u8]) -> io::Result<()> {
        self.writer.write_all(s)
    }
}

/// A [`Decoder`] reading the postcard varint format from any [`Read`].
#[derive(Debug)]
pub struct PostcardDecoder<R> {
    reader: R,
}

impl<R> PostcardDecoder<R> {
    /// Creates a new decoder wrapping the given reader.
    #[must_use]
    pub const fn new(reader: R) -> Self { Self { reader } }

    /// Returns a reference to the underlying reader.
    #[must_use]
    pub const fn get_ref(&self) -> &R { &self.reader }

    /// Consumes the decoder and returns the underlying reader.
    #[must_use]
    pub fn into_inner(self) -> R { self.reader }
}

macro_rules! read_varint {
    ($name:ident, $ty:ty, $bits:expr) => {
        fn $name(&mut self) -> io::Result<$ty> {
            let mut result: $ty = 0;
            let mut shift = 0;

            loop {
                let byte = self.read_byte()?;

                if shift >= $bits {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        concat!("varint too long for ", stringify!($ty)),
                    ));
                }

                let group = <$ty>::from(byte & 0x7F);
                if shift > 0 && group >> ($bits - shift) != 0 {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        concat!("varint overflows ", stringify!($ty)),
                    ));
                }
                result |= group << shift;

                if byte & 0x80 == 0 {
                    return Ok(result);
                }

                shift += 7;
            }
        }
    };
}

impl<R: Read> PostcardDecoder<R> {
    fn read_byte(&mut self) -> io::Result<u8> {
        let mut buf = [0u8; 1];
        self.reader.read_exact(&mut buf)?;
        Ok(buf[0])
    }

    read_varint!(read_varint_u32, u32, 32);
    read_varint!(read_varint_u64, u64, 64);

    fn take_exact(
        &mut self,
        len: usize,
        sink: &mut impl Write,
    ) -> io::Result<()> {
        let copied = io::copy(&mut self.reader.by_ref().take(len as u64), sink)?;

        if copied == len as u64 {
            Ok(())
        } else {
            Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "input ended inside a length-prefixed run",
            ))
        }
    }
}

impl<R: Read> Decoder for PostcardDecoder<R> {
    fn read_u8(&mut self) -> io::Result<u8> { self.read_byte() }

    fn read_u32(&mut self) -> io::Result<u32> { self.read_varint_u32() }

    fn read_u64(&mut self) -> io::Result<u64> { self.read_varint_u64() }

    fn read_into(
        &mut self,
        buffer: &mut Vec<u8>,
        len: usize,
    ) -> io::Result<()> {
        buffer.reserve(len.min(MAX_UPFRONT_RESERVATION));
        self.take_exact(len, buffer)
    }

    fn skip(&mut self, len: usize) -> io::Result<()> {
        self.take_exact(len, &mut io::sink())
    }
}
