//! The output side of a serialization session.

use crate::{
    Encoder, Object, Result, Session, TypeInfo,
    type_codec,
    wire::{self, END_BASE_TAG, END_OBJECT_TAG, FIELD_ID_EXTENDED, SchemaType, WireType},
};

/// Writes fields into an [`Encoder`] on behalf of one [`Session`].
///
/// Codecs receive a `Writer` in [`FieldCodec::write_field`]; it exposes the
/// framing primitives (field headers, varints, raw bytes, end markers) and
/// the session's reference table.
///
/// [`FieldCodec::write_field`]: crate::FieldCodec::write_field
pub struct Writer<'a> {
    encoder: &'a mut dyn Encoder,
    session: &'a mut Session,
}

impl<'a> Writer<'a> {
    /// Creates a writer emitting into `encoder`.
    pub fn new(encoder: &'a mut dyn Encoder, session: &'a mut Session) -> Self {
        Self { encoder, session }
    }

    /// The session this writer belongs to.
    #[must_use]
    pub fn session(&self) -> &Session { self.session }

    /// The session this writer belongs to, mutably.
    pub fn session_mut(&mut self) -> &mut Session { self.session }

    /// Writes a field header for a value of type `actual`.
    ///
    /// When `actual` is the `expected` type the header relies on the reader
    /// knowing it; otherwise the type identifier is encoded after the tag.
    ///
    /// # Errors
    ///
    /// Fails when the encoder fails.
    pub fn write_field_header(
        &mut self,
        field_id_delta: u32,
        expected: Option<&TypeInfo>,
        actual: &TypeInfo,
        wire_type: WireType,
    ) -> Result<()> {
        if expected.is_some_and(|expected| expected.type_id() == actual.type_id()) {
            return self.write_field_header_expected(field_id_delta, wire_type);
        }

        self.write_tag(wire_type, SchemaType::Encoded, field_id_delta)?;
        type_codec::write_length_prefixed(self, actual)
    }

    /// Writes a field header whose type the reader knows from context.
    ///
    /// # Errors
    ///
    /// Fails when the encoder fails.
    pub fn write_field_header_expected(
        &mut self,
        field_id_delta: u32,
        wire_type: WireType,
    ) -> Result<()> {
        self.write_tag(wire_type, SchemaType::Expected, field_id_delta)
    }

    fn write_tag(
        &mut self,
        wire_type: WireType,
        schema: SchemaType,
        field_id_delta: u32,
    ) -> Result<()> {
        match u8::try_from(field_id_delta) {
            Ok(delta) if delta < FIELD_ID_EXTENDED => {
                self.encoder.emit_u8(wire::tag(wire_type, schema, delta))?;
            }
            _ => {
                self.encoder.emit_u8(wire::tag(
                    wire_type,
                    schema,
                    FIELD_ID_EXTENDED,
                ))?;
                self.encoder.emit_u32(field_id_delta)?;
            }
        }

        Ok(())
    }

    /// Writes a variable-length unsigned integer.
    ///
    /// # Errors
    ///
    /// Fails when the encoder fails.
    pub fn write_var_u32(&mut self, value: u32) -> Result<()> {
        Ok(self.encoder.emit_u32(value)?)
    }

    /// Writes a variable-length unsigned integer.
    ///
    /// # Errors
    ///
    /// Fails when the encoder fails.
    pub fn write_var_u64(&mut self, value: u64) -> Result<()> {
        Ok(self.encoder.emit_u64(value)?)
    }

    /// Writes bytes without a length prefix.
    ///
    /// # Errors
    ///
    /// Fails when the encoder fails.
    pub fn write_raw_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        Ok(self.encoder.emit_raw_bytes(bytes)?)
    }

    /// Closes the current tag-delimited field.
    ///
    /// # Errors
    ///
    /// Fails when the encoder fails.
    pub fn write_end_object(&mut self) -> Result<()> {
        Ok(self.encoder.emit_u8(END_OBJECT_TAG)?)
    }

    /// Closes the base-type fields of the current tag-delimited field.
    ///
    /// # Errors
    ///
    /// Fails when the encoder fails.
    pub fn write_end_base(&mut self) -> Result<()> {
        Ok(self.encoder.emit_u8(END_BASE_TAG)?)
    }

    /// Writes `value` with whichever codec the provider selects for its
    /// runtime type.
    ///
    /// # Errors
    ///
    /// Fails when the type is unregistered, when no codec supports it, or
    /// when the selected codec fails.
    pub fn write_object_field(
        &mut self,
        field_id_delta: u32,
        expected: Option<&TypeInfo>,
        value: &Object,
    ) -> Result<()> {
        let provider = self.session.provider().clone();
        let runtime_type = provider.registry().type_of(value)?;

        provider.codec_for(&runtime_type)?.write_field(
            self,
            field_id_delta,
            expected,
            value,
        )
    }
}

impl std::fmt::Debug for Writer<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Writer")
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}
