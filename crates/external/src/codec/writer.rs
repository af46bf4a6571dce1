use quill_serialize::{
    Error, Field, FieldCodec, GeneralizedCodec, Object, PooledBuffer, Reader,
    Result, TypeInfo, WireType, Writer, reference, type_codec,
};

use super::ExternalCodec;
use crate::{ExternalSerializer, Purpose};

impl<S: ExternalSerializer> FieldCodec for ExternalCodec<S> {
    #[tracing::instrument(level = "trace", skip_all, fields(delta = field_id_delta))]
    fn write_field(
        &self,
        writer: &mut Writer<'_>,
        field_id_delta: u32,
        expected: Option<&TypeInfo>,
        value: &Object,
    ) -> Result<()> {
        if reference::try_write_reference_field(writer, field_id_delta, value)? {
            tracing::trace!("wrote back-reference");
            return Ok(());
        }

        let runtime_type = writer.session().registry().type_of(value)?;

        writer.write_field_header(
            field_id_delta,
            expected,
            &self.identity,
            WireType::TagDelimited,
        )?;

        writer.session_mut().references_mut().mark_value_field();
        writer.write_field_header_expected(0, WireType::LengthPrefixed)?;
        type_codec::write_length_prefixed(writer, &runtime_type)?;

        let mut payload = PooledBuffer::rent();
        {
            let options = self.serializer_options(writer.session().plugin());
            self.serializer
                .serialize(&runtime_type, &**value, options, &mut payload)
                .map_err(Error::external)?;
        }

        let len = u32::try_from(payload.len())
            .map_err(|_| Error::Malformed("external payload exceeds 4 GiB"))?;

        writer.session_mut().references_mut().mark_value_field();
        writer.write_field_header_expected(1, WireType::LengthPrefixed)?;
        writer.write_var_u32(len)?;
        writer.write_raw_bytes(&payload)?;
        writer.write_end_object()?;

        tracing::trace!(ty = runtime_type.name(), len, "wrote external frame");

        Ok(())
    }

    fn read_value(&self, reader: &mut Reader<'_>, field: &Field) -> Result<Object> {
        self.read_frame(reader, field)
    }
}

impl<S: ExternalSerializer> GeneralizedCodec for ExternalCodec<S> {
    fn is_supported_type(&self, ty: &TypeInfo) -> bool {
        self.is_eligible(ty, Purpose::Encode)
    }
}
