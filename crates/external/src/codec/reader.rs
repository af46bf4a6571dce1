use std::sync::Arc;

use quill_serialize::{
    Error, Field, Object, PooledBuffer, Reader, Result, TypeInfo, WireType,
    reference, type_codec,
};

use super::ExternalCodec;
use crate::ExternalSerializer;

impl<S: ExternalSerializer> ExternalCodec<S> {
    /// Reads one frame whose header is `field`.
    ///
    /// A placeholder is reserved before the sub-fields are read and filled
    /// with the decoded value afterwards. Sub-fields other than the type and
    /// the payload are skipped; a repeated type sub-field replaces the
    /// earlier one.
    ///
    /// A failed read leaves the placeholder unresolved, so the session must
    /// not be used for further reads.
    #[tracing::instrument(level = "trace", skip_all)]
    pub(super) fn read_frame(
        &self,
        reader: &mut Reader<'_>,
        field: &Field,
    ) -> Result<Object> {
        if field.is_reference() {
            return reference::read_reference(reader, field);
        }

        field.ensure_wire_type_tag_delimited()?;

        let placeholder =
            reader.session_mut().references_mut().create_placeholder();

        let mut field_id = 0u32;
        let mut runtime_type: Option<Arc<TypeInfo>> = None;
        let mut result: Option<Object> = None;

        loop {
            let header = reader.read_field_header()?;
            if header.is_end_base_or_end_object() {
                break;
            }

            field_id = field_id.saturating_add(header.field_id_delta());

            match field_id {
                0 => {
                    header.ensure_wire_type(WireType::LengthPrefixed)?;
                    reader.session_mut().references_mut().mark_value_field();

                    runtime_type = Some(type_codec::read_length_prefixed(reader)?);
                }
                1 => {
                    let ty = runtime_type.clone().ok_or(Error::MissingTypeField)?;

                    header.ensure_wire_type(WireType::LengthPrefixed)?;
                    reader.session_mut().references_mut().mark_value_field();

                    let len = reader.read_var_u32()? as usize;
                    let mut payload = PooledBuffer::rent();
                    reader.read_bytes_into(&mut payload, len)?;

                    let options = self.serializer_options(reader.session().plugin());
                    let value = self
                        .serializer
                        .deserialize(&ty, &payload, options)
                        .map_err(Error::external)?;

                    tracing::trace!(ty = ty.name(), len, "read external frame");

                    result = Some(value);
                }
                _ => reader.consume_unknown_field(&header)?,
            }
        }

        let result = result.ok_or(Error::MissingPayloadField)?;
        reader
            .session_mut()
            .references_mut()
            .record_object(result.clone(), placeholder)?;

        Ok(result)
    }
}
