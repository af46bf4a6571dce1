//! The capability an external serializer provides to [`ExternalCodec`].
//!
//! [`ExternalCodec`]: crate::ExternalCodec

use std::{any::Any, fmt::Debug};

use quill_serialize::{Object, TypeInfo};

/// An independently versioned binary serializer.
///
/// Both directions are driven by the runtime type of the value, so the
/// serializer never has to guess a concrete type from a declared one.
pub trait ExternalSerializer: Send + Sync + 'static {
    /// Serializer-specific settings, forwarded on every call.
    ///
    /// A value of this type stored in the operation's
    /// [`Plugin`](quill_serialize::Plugin) takes precedence over the one the
    /// codec was configured with.
    type Options: Any + Send + Sync + Default + Debug;

    /// The error reported by the serializer; it reaches the caller unchanged
    /// as the source of [`Error::External`](quill_serialize::Error::External).
    type Error: std::error::Error + Send + Sync + 'static;

    /// Returns `true` if `ty` carries the serializer's compatibility marker.
    ///
    /// Must be a pure function of the type: the answer is cached for the
    /// lifetime of the process.
    fn is_contract(ty: &TypeInfo) -> bool;

    /// Appends the encoding of `value`, whose runtime type is `ty`, to
    /// `output`.
    ///
    /// # Errors
    ///
    /// Implementations fail when the value cannot be encoded.
    fn serialize(
        &self,
        ty: &TypeInfo,
        value: &dyn Any,
        options: &Self::Options,
        output: &mut Vec<u8>,
    ) -> Result<(), Self::Error>;

    /// Decodes a value of type `ty` from exactly `input`.
    ///
    /// # Errors
    ///
    /// Implementations fail when the input does not decode.
    fn deserialize(
        &self,
        ty: &TypeInfo,
        input: &[u8],
        options: &Self::Options,
    ) -> Result<Object, Self::Error>;
}
