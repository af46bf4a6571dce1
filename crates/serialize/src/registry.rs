//! Runtime type information and the registry that maps between in-process
//! [`TypeId`]s and on-the-wire [`StableTypeID`]s.

use std::{
    any::{Any, TypeId},
    fmt,
    sync::Arc,
};

use fxhash::FxHashMap;
use quill_stable_type_id::{Identifiable, StableTypeID};

use crate::{Error, Result};

/// A value handled by the serialization framework.
///
/// Identity is the address of the shared allocation: two `Object`s are the
/// same object exactly when [`Arc::ptr_eq`] holds.
pub type Object = Arc<dyn Any + Send + Sync>;

/// Returns the identity key of an [`Object`].
#[must_use]
pub fn identity(object: &Object) -> usize {
    Arc::as_ptr(object).cast::<()>() as usize
}

/// What kind of type a [`TypeInfo`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    /// An ordinary type whose values carry data.
    Concrete,

    /// A trait object or other type that only appears as a declared type.
    Abstract,

    /// A type owned by the framework itself, such as a codec's identity.
    Framework,
}

impl TypeKind {
    /// Returns `true` if values of this kind carry data of their own.
    #[must_use]
    pub const fn holds_data(self) -> bool { matches!(self, Self::Concrete) }
}

/// Everything the framework knows about one registered type.
#[derive(Clone, PartialEq, Eq)]
pub struct TypeInfo {
    type_id: TypeId,
    stable_id: StableTypeID,
    name: &'static str,
    kind: TypeKind,
}

impl TypeInfo {
    /// Describes `T`.
    #[must_use]
    pub fn of<T: ?Sized + Any + Identifiable>(kind: TypeKind) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            stable_id: T::STABLE_TYPE_ID,
            name: std::any::type_name::<T>(),
            kind,
        }
    }

    /// The in-process type identifier.
    #[must_use]
    pub const fn type_id(&self) -> TypeId { self.type_id }

    /// The identifier written on the wire.
    #[must_use]
    pub const fn stable_id(&self) -> StableTypeID { self.stable_id }

    /// The Rust type name, for diagnostics.
    #[must_use]
    pub const fn name(&self) -> &'static str { self.name }

    /// The kind of type.
    #[must_use]
    pub const fn kind(&self) -> TypeKind { self.kind }

    /// Returns `true` if `T` is the described type.
    #[must_use]
    pub fn is<T: ?Sized + Any>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }
}

impl fmt::Debug for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeInfo")
            .field("name", &self.name)
            .field("stable_id", &format_args!("{}", self.stable_id))
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// The set of types a [`CodecProvider`](crate::CodecProvider) can name on
/// the wire.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    by_type_id: FxHashMap<TypeId, Arc<TypeInfo>>,
    by_stable_id: FxHashMap<StableTypeID, Arc<TypeInfo>>,
}

impl TypeRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Registers `T` as a [`TypeKind::Concrete`] type.
    ///
    /// # Errors
    ///
    /// See [`Self::register_with_kind`].
    pub fn register<T: ?Sized + Any + Identifiable>(
        &mut self,
    ) -> Result<Arc<TypeInfo>> {
        self.register_with_kind::<T>(TypeKind::Concrete)
    }

    /// Registers `T` with an explicit kind.
    ///
    /// Registering the same type again returns the existing entry unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateTypeId`] when a different type already owns
    /// `T`'s stable identifier.
    pub fn register_with_kind<T: ?Sized + Any + Identifiable>(
        &mut self,
        kind: TypeKind,
    ) -> Result<Arc<TypeInfo>> {
        if let Some(existing) = self.by_type_id.get(&TypeId::of::<T>()) {
            return Ok(existing.clone());
        }

        let info = Arc::new(TypeInfo::of::<T>(kind));

        if let Some(existing) = self.by_stable_id.get(&info.stable_id) {
            return Err(Error::DuplicateTypeId {
                id: info.stable_id,
                name: info.name,
                existing: existing.name,
            });
        }

        self.by_type_id.insert(info.type_id, info.clone());
        self.by_stable_id.insert(info.stable_id, info.clone());

        Ok(info)
    }

    /// Looks a type up by its in-process identifier.
    #[must_use]
    pub fn get(&self, type_id: TypeId) -> Option<&Arc<TypeInfo>> {
        self.by_type_id.get(&type_id)
    }

    /// Looks a type up by its wire identifier.
    #[must_use]
    pub fn by_stable_id(&self, id: StableTypeID) -> Option<&Arc<TypeInfo>> {
        self.by_stable_id.get(&id)
    }

    /// Resolves the runtime type of `value`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnregisteredType`] when the type was never registered.
    pub fn type_of(&self, value: &Object) -> Result<Arc<TypeInfo>> {
        let type_id = Any::type_id(&**value);

        self.get(type_id).cloned().ok_or(Error::UnregisteredType(type_id))
    }

    /// Returns the number of registered types.
    #[must_use]
    pub fn len(&self) -> usize { self.by_type_id.len() }

    /// Returns `true` if no type is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.by_type_id.is_empty() }
}
