//! Codec contracts and the provider that selects a codec for each type.
//!
//! Selection follows a fixed order. A codec registered for a specific type
//! always wins; otherwise the generalized codecs are asked, in registration
//! order, whether they support the type. Deep copiers are selected the same
//! way.
//!
//! Type filters decide which types may be named in incoming data. The first
//! filter with an opinion decides; when none has one, the type is allowed
//! only if [`SerializerOptions::allow_unknown_types`] is set. Types with a
//! specific codec are always allowed.

use std::{
    any::{Any, TypeId},
    fmt,
    sync::Arc,
};

use fxhash::FxHashMap;
use quill_stable_type_id::Identifiable;

use crate::{
    CopyContext, Error, Object, Reader, Result, TypeInfo, TypeKind, TypeRegistry,
    Writer, wire::Field,
};

/// Writes and reads values of some type as one field.
pub trait FieldCodec: Send + Sync {
    /// Writes `value` as a field with the given id delta.
    ///
    /// `expected` is the type the reader will know from context, if any.
    ///
    /// # Errors
    ///
    /// Implementations fail when the value cannot be written.
    fn write_field(
        &self,
        writer: &mut Writer<'_>,
        field_id_delta: u32,
        expected: Option<&TypeInfo>,
        value: &Object,
    ) -> Result<()>;

    /// Reads the value introduced by `field`, whose header has already been
    /// consumed.
    ///
    /// # Errors
    ///
    /// Implementations fail when the input is malformed.
    fn read_value(&self, reader: &mut Reader<'_>, field: &Field) -> Result<Object>;
}

/// A [`FieldCodec`] that decides at runtime which types it handles.
pub trait GeneralizedCodec: FieldCodec {
    /// Returns `true` if this codec can handle values of `ty`.
    fn is_supported_type(&self, ty: &TypeInfo) -> bool;
}

/// Produces an independent copy of a value.
pub trait DeepCopier: Send + Sync {
    /// Copies `input`, recording the copy in `context` so shared and cyclic
    /// structure is preserved.
    ///
    /// # Errors
    ///
    /// Implementations fail when the value cannot be copied.
    fn deep_copy(&self, input: &Object, context: &mut CopyContext) -> Result<Object>;
}

/// A [`DeepCopier`] that decides at runtime which types it handles.
pub trait GeneralizedCopier: DeepCopier {
    /// Returns `true` if this copier can handle values of `ty`.
    fn is_supported_type(&self, ty: &TypeInfo) -> bool;
}

/// Votes on whether a type may appear in incoming data.
pub trait TypeFilter: Send + Sync {
    /// `Some(true)` allows the type, `Some(false)` rejects it, `None`
    /// abstains.
    fn is_type_allowed(&self, ty: &TypeInfo) -> Option<bool>;
}

/// Options of a [`CodecProvider`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SerializerOptions {
    /// Allow types no filter has an opinion on. Defaults to `false`.
    pub allow_unknown_types: bool,
}

impl SerializerOptions {
    /// Sets [`Self::allow_unknown_types`].
    #[must_use]
    pub const fn with_allow_unknown_types(mut self, allow: bool) -> Self {
        self.allow_unknown_types = allow;
        self
    }
}

/// The immutable set of codecs, copiers and type filters of a serializer.
pub struct CodecProvider {
    registry: TypeRegistry,
    codecs: FxHashMap<TypeId, Arc<dyn FieldCodec>>,
    generalized_codecs: Vec<Arc<dyn GeneralizedCodec>>,
    copiers: FxHashMap<TypeId, Arc<dyn DeepCopier>>,
    generalized_copiers: Vec<Arc<dyn GeneralizedCopier>>,
    type_filters: Vec<Arc<dyn TypeFilter>>,
    options: SerializerOptions,
}

impl CodecProvider {
    /// Starts building a provider.
    #[must_use]
    pub fn builder() -> CodecProviderBuilder { CodecProviderBuilder::default() }

    /// The registered types.
    #[must_use]
    pub const fn registry(&self) -> &TypeRegistry { &self.registry }

    /// The options the provider was built with.
    #[must_use]
    pub const fn options(&self) -> &SerializerOptions { &self.options }

    /// Selects the codec for values of `ty`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedType`] when no codec handles `ty`.
    pub fn codec_for(&self, ty: &TypeInfo) -> Result<&dyn FieldCodec> {
        if let Some(codec) = self.codecs.get(&ty.type_id()) {
            return Ok(codec.as_ref());
        }

        self.generalized_codecs
            .iter()
            .find(|codec| codec.is_supported_type(ty))
            .map(|codec| codec.as_ref() as &dyn FieldCodec)
            .ok_or(Error::UnsupportedType(ty.name()))
    }

    /// Selects the deep copier for values of `ty`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedType`] when no copier handles `ty`.
    pub fn copier_for(&self, ty: &TypeInfo) -> Result<&dyn DeepCopier> {
        if let Some(copier) = self.copiers.get(&ty.type_id()) {
            return Ok(copier.as_ref());
        }

        self.generalized_copiers
            .iter()
            .find(|copier| copier.is_supported_type(ty))
            .map(|copier| copier.as_ref() as &dyn DeepCopier)
            .ok_or(Error::UnsupportedType(ty.name()))
    }

    /// Returns `true` if `ty` may be named in incoming data.
    #[must_use]
    pub fn is_type_allowed(&self, ty: &TypeInfo) -> bool {
        if self.codecs.contains_key(&ty.type_id()) {
            return true;
        }

        self.type_filters
            .iter()
            .find_map(|filter| filter.is_type_allowed(ty))
            .unwrap_or(self.options.allow_unknown_types)
    }
}

impl fmt::Debug for CodecProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodecProvider")
            .field("types", &self.registry.len())
            .field("codecs", &self.codecs.len())
            .field("generalized_codecs", &self.generalized_codecs.len())
            .field("copiers", &self.copiers.len())
            .field("generalized_copiers", &self.generalized_copiers.len())
            .field("type_filters", &self.type_filters.len())
            .field("options", &self.options)
            .finish()
    }
}

/// Assembles a [`CodecProvider`].
#[derive(Default)]
pub struct CodecProviderBuilder {
    registry: TypeRegistry,
    codecs: FxHashMap<TypeId, Arc<dyn FieldCodec>>,
    generalized_codecs: Vec<Arc<dyn GeneralizedCodec>>,
    copiers: FxHashMap<TypeId, Arc<dyn DeepCopier>>,
    generalized_copiers: Vec<Arc<dyn GeneralizedCopier>>,
    type_filters: Vec<Arc<dyn TypeFilter>>,
    options: SerializerOptions,
}

impl CodecProviderBuilder {
    /// The registry being assembled.
    pub const fn registry_mut(&mut self) -> &mut TypeRegistry { &mut self.registry }

    /// Registers `T` as a concrete type.
    ///
    /// # Errors
    ///
    /// See [`TypeRegistry::register_with_kind`].
    pub fn register<T: ?Sized + Any + Identifiable>(
        &mut self,
    ) -> Result<Arc<TypeInfo>> {
        self.registry.register_with_kind::<T>(TypeKind::Concrete)
    }

    /// Adds a codec dedicated to `T`, replacing any earlier one.
    pub fn add_codec<T: ?Sized + Any>(
        &mut self,
        codec: Arc<dyn FieldCodec>,
    ) -> &mut Self {
        self.codecs.insert(TypeId::of::<T>(), codec);
        self
    }

    /// Appends a generalized codec.
    pub fn add_generalized_codec(
        &mut self,
        codec: Arc<dyn GeneralizedCodec>,
    ) -> &mut Self {
        self.generalized_codecs.push(codec);
        self
    }

    /// Adds a copier dedicated to `T`, replacing any earlier one.
    pub fn add_copier<T: ?Sized + Any>(
        &mut self,
        copier: Arc<dyn DeepCopier>,
    ) -> &mut Self {
        self.copiers.insert(TypeId::of::<T>(), copier);
        self
    }

    /// Appends a generalized copier.
    pub fn add_generalized_copier(
        &mut self,
        copier: Arc<dyn GeneralizedCopier>,
    ) -> &mut Self {
        self.generalized_copiers.push(copier);
        self
    }

    /// Appends a type filter.
    pub fn add_type_filter(&mut self, filter: Arc<dyn TypeFilter>) -> &mut Self {
        self.type_filters.push(filter);
        self
    }

    /// Sets the provider options.
    pub fn options(&mut self, options: SerializerOptions) -> &mut Self {
        self.options = options;
        self
    }

    /// Finishes the provider.
    #[must_use]
    pub fn build(self) -> Arc<CodecProvider> {
        tracing::debug!(
            types = self.registry.len(),
            codecs = self.codecs.len(),
            generalized_codecs = self.generalized_codecs.len(),
            "built codec provider"
        );

        Arc::new(CodecProvider {
            registry: self.registry,
            codecs: self.codecs,
            generalized_codecs: self.generalized_codecs,
            copiers: self.copiers,
            generalized_copiers: self.generalized_copiers,
            type_filters: self.type_filters,
            options: self.options,
        })
    }
}

impl fmt::Debug for CodecProviderBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodecProviderBuilder")
            .field("types", &self.registry.len())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
