//! The input side of a serialization session.

use crate::{
    Decoder, Error, Object, Result, Session, reference, type_codec,
    wire::{DecodedTag, FIELD_ID_EXTENDED, Field, SchemaType, WireType, decode_tag},
};

/// How deeply unknown tag-delimited fields may nest before skipping gives up.
const MAX_SKIP_DEPTH: usize = 64;

/// Reads fields from a [`Decoder`] on behalf of one [`Session`].
pub struct Reader<'a> {
    decoder: &'a mut dyn Decoder,
    session: &'a mut Session,
}

impl<'a> Reader<'a> {
    /// Creates a reader consuming `decoder`.
    pub fn new(decoder: &'a mut dyn Decoder, session: &'a mut Session) -> Self {
        Self { decoder, session }
    }

    /// The session this reader belongs to.
    #[must_use]
    pub fn session(&self) -> &Session { self.session }

    /// The session this reader belongs to, mutably.
    pub fn session_mut(&mut self) -> &mut Session { self.session }

    /// Reads the next field header, including an encoded field type.
    ///
    /// # Errors
    ///
    /// Fails on an invalid tag, an unknown or disallowed field type, or when
    /// the input ends.
    pub fn read_field_header(&mut self) -> Result<Field> {
        let tag = self.decoder.read_u8()?;

        let (wire_type, schema, inline_delta) = match decode_tag(tag)? {
            DecodedTag::Extended(extended) => return Ok(Field::end(extended)),
            DecodedTag::Field { wire_type, schema, inline_delta } => {
                (wire_type, schema, inline_delta)
            }
        };

        let field_id_delta = if inline_delta == FIELD_ID_EXTENDED {
            self.decoder.read_u32()?
        } else {
            u32::from(inline_delta)
        };

        let field_type = match schema {
            SchemaType::Expected => None,
            SchemaType::Encoded => Some(type_codec::read_length_prefixed(self)?),
        };

        Ok(Field::new(field_id_delta, wire_type, field_type))
    }

    /// Reads a variable-length unsigned integer.
    ///
    /// # Errors
    ///
    /// Fails when the input ends or the varint overflows.
    pub fn read_var_u32(&mut self) -> Result<u32> { Ok(self.decoder.read_u32()?) }

    /// Reads a variable-length unsigned integer.
    ///
    /// # Errors
    ///
    /// Fails when the input ends or the varint overflows.
    pub fn read_var_u64(&mut self) -> Result<u64> { Ok(self.decoder.read_u64()?) }

    /// Appends exactly `len` bytes to `buffer`.
    ///
    /// # Errors
    ///
    /// Fails when fewer than `len` bytes remain.
    pub fn read_bytes_into(
        &mut self,
        buffer: &mut Vec<u8>,
        len: usize,
    ) -> Result<()> {
        Ok(self.decoder.read_into(buffer, len)?)
    }

    /// Reads exactly `len` bytes.
    ///
    /// # Errors
    ///
    /// Fails when fewer than `len` bytes remain.
    pub fn read_raw_bytes(&mut self, len: usize) -> Result<Vec<u8>> {
        Ok(self.decoder.read_raw_bytes(len)?)
    }

    /// Skips the body of a field this reader has no use for.
    ///
    /// # Errors
    ///
    /// Fails when the body is malformed or nests too deeply.
    pub fn consume_unknown_field(&mut self, field: &Field) -> Result<()> {
        self.consume_field(field, 0)
    }

    fn consume_field(&mut self, field: &Field, depth: usize) -> Result<()> {
        match field.wire_type() {
            WireType::VarInt => {
                self.decoder.read_u64()?;
            }
            WireType::Fixed32 => self.decoder.skip(4)?,
            WireType::Fixed64 => self.decoder.skip(8)?,
            WireType::LengthPrefixed => {
                let len = self.decoder.read_u32()?;
                self.decoder.skip(len as usize)?;
            }
            WireType::Reference => {
                self.decoder.read_u32()?;
            }
            WireType::TagDelimited => self.consume_tag_delimited(depth + 1)?,
            WireType::Extended => {}
        }

        Ok(())
    }

    fn consume_tag_delimited(&mut self, depth: usize) -> Result<()> {
        if depth > MAX_SKIP_DEPTH {
            return Err(Error::Malformed("fields nested too deeply"));
        }

        loop {
            let header = self.read_field_header()?;

            if header.is_end_object() {
                return Ok(());
            }
            if header.is_end_base_or_end_object() {
                continue;
            }

            self.consume_field(&header, depth)?;
        }
    }

    /// Reads the value introduced by `field`, dispatching on the field's
    /// type.
    ///
    /// A back-reference without a type is resolved directly against the
    /// session's reference table.
    ///
    /// # Errors
    ///
    /// Fails when no type is known for the field, when no codec supports it,
    /// or when the selected codec fails.
    pub fn read_object_field(&mut self, field: &Field) -> Result<Object> {
        let Some(field_type) = field.field_type().cloned() else {
            if field.is_reference() {
                return reference::read_reference(self, field);
            }
            return Err(Error::MissingFieldType);
        };

        let provider = self.session.provider().clone();
        provider.codec_for(&field_type)?.read_value(self, field)
    }
}

impl std::fmt::Debug for Reader<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reader")
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}
