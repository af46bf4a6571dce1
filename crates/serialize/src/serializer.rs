//! The entry point: whole-value serialization, deserialization and deep
//! copying.

use std::{any::Any, sync::Arc};

use crate::{
    CodecProvider, CopyContext, Decoder, Encoder, Error, Object, Plugin,
    PostcardDecoder, PostcardEncoder, Reader, Result, Session, Writer,
};

/// Serializes values with the codecs of a [`CodecProvider`].
///
/// A serializer is cheap to clone and safe to share between threads; every
/// call runs in a fresh [`Session`].
#[derive(Debug, Clone)]
pub struct Serializer {
    provider: Arc<CodecProvider>,
    plugin: Arc<Plugin>,
}

impl Serializer {
    /// Creates a serializer with an empty [`Plugin`].
    #[must_use]
    pub fn new(provider: Arc<CodecProvider>) -> Self {
        Self { provider, plugin: Arc::new(Plugin::new()) }
    }

    /// Replaces the per-call context handed to codecs.
    #[must_use]
    pub fn with_plugin(mut self, plugin: Plugin) -> Self {
        self.plugin = Arc::new(plugin);
        self
    }

    /// The codec provider.
    #[must_use]
    pub const fn provider(&self) -> &Arc<CodecProvider> { &self.provider }

    fn session(&self) -> Session {
        Session::new(self.provider.clone(), self.plugin.clone())
    }

    /// Serializes `value` into a new byte vector.
    ///
    /// # Errors
    ///
    /// Fails when the value's type is unregistered or unsupported, or when a
    /// codec fails.
    pub fn serialize(&self, value: &Object) -> Result<Vec<u8>> {
        let mut encoder = PostcardEncoder::new(Vec::new());
        self.serialize_into(value, &mut encoder)?;

        Ok(encoder.into_inner())
    }

    /// Serializes `value` as the root field of `encoder`.
    ///
    /// # Errors
    ///
    /// See [`Self::serialize`].
    pub fn serialize_into(
        &self,
        value: &Object,
        encoder: &mut dyn Encoder,
    ) -> Result<()> {
        let mut session = self.session();
        let mut writer = Writer::new(encoder, &mut session);

        writer.write_object_field(0, None, value)
    }

    /// Deserializes the value at the start of `bytes`.
    ///
    /// # Errors
    ///
    /// Fails when the input is malformed, names an unknown or disallowed
    /// type, or when a codec fails.
    pub fn deserialize(&self, bytes: &[u8]) -> Result<Object> {
        let mut decoder = PostcardDecoder::new(bytes);
        self.deserialize_from(&mut decoder)
    }

    /// Deserializes the root field of `decoder`.
    ///
    /// # Errors
    ///
    /// See [`Self::deserialize`].
    pub fn deserialize_from(&self, decoder: &mut dyn Decoder) -> Result<Object> {
        let mut session = self.session();
        let mut reader = Reader::new(decoder, &mut session);

        let field = reader.read_field_header()?;
        reader.read_object_field(&field)
    }

    /// Deserializes a value and downcasts it to `T`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Malformed`] when the value is not a `T`, and
    /// otherwise see [`Self::deserialize`].
    pub fn deserialize_as<T: Any + Send + Sync>(&self, bytes: &[u8]) -> Result<Arc<T>> {
        self.deserialize(bytes)?
            .downcast::<T>()
            .map_err(|_| Error::Malformed("value has an unexpected type"))
    }

    /// Produces an independent copy of `value`.
    ///
    /// # Errors
    ///
    /// Fails when the value's type is unregistered or has no copier, or when
    /// a copier fails.
    pub fn deep_copy(&self, value: &Object) -> Result<Object> {
        let mut context = CopyContext::new(self.provider.clone(), self.plugin.clone());
        context.deep_copy(value)
    }
}

#[cfg(test)]
mod test;
