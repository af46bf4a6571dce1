//! The compatibility marker: a static table of contract types.
//!
//! Types become contracts where they are declared, with
//! [`external_contract!`](crate::external_contract), rather than in one
//! central list. The entries are collected into the [`CONTRACTS`]
//! distributed slice at link time and indexed by [`TypeId`] on first use.

use std::{
    any::{Any, TypeId},
    fmt,
    sync::{Arc, LazyLock},
};

use fxhash::FxHashMap;
use linkme::distributed_slice;
use quill_serialize::{Identifiable, Object, TypeInfo, TypeRegistry};
use serde::{Serialize, de::DeserializeOwned};

use crate::{BincodeOptions, ExternalError, serde_bincode};

/// Marks a type whose shape the external serializer understands.
///
/// Implemented by [`external_contract!`](crate::external_contract), which
/// also records the type in [`CONTRACTS`]. Implementing the trait by hand
/// does not make a type eligible.
pub trait ExternalContract:
    Serialize + DeserializeOwned + Identifiable + Any + Send + Sync
{
}

/// Every contract type linked into the program.
#[distributed_slice]
pub static CONTRACTS: [Contract];

static INDEX: LazyLock<FxHashMap<TypeId, &'static Contract>> =
    LazyLock::new(|| {
        let index: FxHashMap<_, _> =
            CONTRACTS.iter().map(|contract| (contract.type_id(), contract)).collect();

        tracing::debug!(contracts = index.len(), "indexed external contracts");

        index
    });

type EncodeFn =
    fn(&dyn Any, &BincodeOptions, &mut Vec<u8>) -> Result<(), ExternalError>;
type DecodeFn = fn(&[u8], &BincodeOptions) -> Result<Object, ExternalError>;
type RegisterFn =
    fn(&mut TypeRegistry) -> quill_serialize::Result<Arc<TypeInfo>>;

/// A type-erased contract entry.
#[derive(Clone, Copy)]
pub struct Contract {
    type_id_fn: fn() -> TypeId,
    type_name_fn: fn() -> &'static str,
    register_fn: RegisterFn,
    encode_fn: EncodeFn,
    decode_fn: DecodeFn,
}

impl Contract {
    /// The entry for `T`.
    #[must_use]
    pub const fn of<T: ExternalContract>() -> Self {
        Self {
            type_id_fn: TypeId::of::<T>,
            type_name_fn: std::any::type_name::<T>,
            register_fn: TypeRegistry::register::<T>,
            encode_fn: serde_bincode::encode_as::<T>,
            decode_fn: serde_bincode::decode_as::<T>,
        }
    }

    /// Looks up the entry of a type.
    #[must_use]
    pub fn find(type_id: TypeId) -> Option<&'static Self> {
        INDEX.get(&type_id).copied()
    }

    /// The contract type's identifier.
    #[must_use]
    pub fn type_id(&self) -> TypeId { (self.type_id_fn)() }

    /// The contract type's name.
    #[must_use]
    pub fn type_name(&self) -> &'static str { (self.type_name_fn)() }

    /// Registers the contract type as a concrete type.
    ///
    /// # Errors
    ///
    /// See [`TypeRegistry::register_with_kind`].
    pub fn register(
        &self,
        registry: &mut TypeRegistry,
    ) -> quill_serialize::Result<Arc<TypeInfo>> {
        (self.register_fn)(registry)
    }

    pub(crate) fn encode(
        &self,
        value: &dyn Any,
        options: &BincodeOptions,
        output: &mut Vec<u8>,
    ) -> Result<(), ExternalError> {
        (self.encode_fn)(value, options, output)
    }

    pub(crate) fn decode(
        &self,
        input: &[u8],
        options: &BincodeOptions,
    ) -> Result<Object, ExternalError> {
        (self.decode_fn)(input, options)
    }
}

impl fmt::Debug for Contract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Contract").field(&self.type_name()).finish()
    }
}

/// Registers every contract type in `registry`.
///
/// # Errors
///
/// Fails when a contract type's stable identifier collides with another
/// registered type.
pub fn register_all(registry: &mut TypeRegistry) -> quill_serialize::Result<()> {
    for contract in CONTRACTS {
        contract.register(registry)?;
    }

    Ok(())
}
