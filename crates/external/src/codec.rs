//! The bridging codec.

use std::{fmt, sync::Arc};

use quill_serialize::{
    CodecProviderBuilder, Identifiable, Plugin, Result, StableTypeID, TypeFilter,
    TypeInfo, TypeKind,
};

use crate::{ExternalCodecOptions, ExternalSerializer, Purpose, eligibility};

mod copier;
mod reader;
mod writer;

/// The alias the identity type's stable identifier is derived from.
///
/// Fixed so that frames stay readable across builds and crate renames.
pub const WELL_KNOWN_ALIAS: &str = "quill.external";

/// The identity type of [`ExternalCodec`] frames.
///
/// Frame headers name this type, which routes them back to the codec on
/// read. It never holds data.
#[derive(Debug, Clone, Copy)]
pub struct ExternalField;

impl Identifiable for ExternalField {
    const STABLE_TYPE_ID: StableTypeID =
        StableTypeID::from_unique_type_name(WELL_KNOWN_ALIAS);
}

/// Delegates values of eligible types to an [`ExternalSerializer`].
///
/// Installed as a generalized codec, a generalized copier and a type filter
/// by [`ExternalCodec::install`].
pub struct ExternalCodec<S: ExternalSerializer> {
    serializer: S,
    options: ExternalCodecOptions<S::Options>,
    identity: Arc<TypeInfo>,
}

impl<S: ExternalSerializer> ExternalCodec<S> {
    /// Registers the identity type and adds a new codec to `builder`.
    ///
    /// Only the types already in the builder's registry can be written or
    /// read; register them before building the provider.
    ///
    /// # Errors
    ///
    /// Fails when the identity type's stable identifier collides with
    /// another registered type.
    pub fn install(
        builder: &mut CodecProviderBuilder,
        serializer: S,
        options: ExternalCodecOptions<S::Options>,
    ) -> Result<Arc<Self>> {
        let identity = builder
            .registry_mut()
            .register_with_kind::<ExternalField>(TypeKind::Framework)?;

        let codec = Arc::new(Self { serializer, options, identity });
        builder
            .add_generalized_codec(codec.clone())
            .add_generalized_copier(codec.clone())
            .add_type_filter(codec.clone());

        tracing::debug!(
            serializer = std::any::type_name::<S>(),
            "installed external codec"
        );

        Ok(codec)
    }

    /// The identity type named in frame headers.
    #[must_use]
    pub const fn identity(&self) -> &Arc<TypeInfo> { &self.identity }

    /// The configured options.
    #[must_use]
    pub const fn options(&self) -> &ExternalCodecOptions<S::Options> {
        &self.options
    }

    /// Decides whether values of `ty` are handled for `purpose`.
    ///
    /// A negative answer is not an error; the provider moves on to other
    /// codecs.
    ///
    /// The identity type is eligible for [`Purpose::Clone`] as well as
    /// [`Purpose::Encode`], so copy dispatch also routes it to this codec.
    #[must_use]
    pub fn is_eligible(&self, ty: &TypeInfo, purpose: Purpose) -> bool {
        if ty.type_id() == self.identity.type_id() {
            return true;
        }

        if !ty.kind().holds_data() {
            return false;
        }

        self.options
            .override_for(ty, purpose)
            .decision()
            .unwrap_or_else(|| eligibility::is_contract::<S>(ty))
    }

    /// The serializer options for one operation: those in `plugin` if
    /// present, otherwise the configured ones.
    fn serializer_options<'a>(&'a self, plugin: &'a Plugin) -> &'a S::Options {
        plugin
            .get::<S::Options>()
            .unwrap_or(&self.options.serializer_options)
    }
}

impl<S: ExternalSerializer> TypeFilter for ExternalCodec<S> {
    fn is_type_allowed(&self, ty: &TypeInfo) -> Option<bool> {
        (self.is_eligible(ty, Purpose::Clone)
            || self.is_eligible(ty, Purpose::Encode))
        .then_some(true)
    }
}

impl<S: ExternalSerializer + fmt::Debug> fmt::Debug for ExternalCodec<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExternalCodec")
            .field("serializer", &self.serializer)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod test;
