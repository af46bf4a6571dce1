use quill_serialize::{
    CopyContext, DeepCopier, Error, GeneralizedCopier, Object, PooledBuffer,
    Result, TypeInfo,
};

use super::ExternalCodec;
use crate::{ExternalSerializer, Purpose};

impl<S: ExternalSerializer> DeepCopier for ExternalCodec<S> {
    /// Copies `input` by serializing it and deserializing the bytes.
    #[tracing::instrument(level = "trace", skip_all)]
    fn deep_copy(&self, input: &Object, context: &mut CopyContext) -> Result<Object> {
        if let Some(copy) = context.try_get_copy(input) {
            return Ok(copy);
        }

        let ty = context.registry().type_of(input)?;

        let copy = {
            let options = self.serializer_options(context.plugin());
            let mut buffer = PooledBuffer::rent();

            self.serializer
                .serialize(&ty, &**input, options, &mut buffer)
                .map_err(Error::external)?;
            self.serializer
                .deserialize(&ty, &buffer, options)
                .map_err(Error::external)?
        };

        context.record_copy(input, &copy);
        tracing::trace!(ty = ty.name(), "copied through external serializer");

        Ok(copy)
    }
}

impl<S: ExternalSerializer> GeneralizedCopier for ExternalCodec<S> {
    fn is_supported_type(&self, ty: &TypeInfo) -> bool {
        self.is_eligible(ty, Purpose::Clone)
    }
}
