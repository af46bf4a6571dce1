//! Error type shared by the wire layer, the codecs and the copier.

use std::{any::TypeId, io};

use quill_stable_type_id::StableTypeID;

use crate::wire::WireType;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong while writing, reading or copying a value.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The underlying sink or source failed.
    #[error("io: {0}")]
    Io(#[from] io::Error),

    /// A payload sub-field appeared before the type sub-field describing it.
    #[error("serialized value is missing its type field")]
    MissingTypeField,

    /// A frame ended without the payload sub-field.
    #[error("serialized value is missing its payload field")]
    MissingPayloadField,

    /// A field carried a wire type other than the one its codec requires.
    #[error("expected wire type {expected:?}, found {actual:?}")]
    UnexpectedWireType {
        /// The wire type the codec requires.
        expected: WireType,
        /// The wire type found in the field header.
        actual: WireType,
    },

    /// A tag byte that does not decode to a known header.
    #[error("invalid field tag {0:#04x}")]
    InvalidTag(u8),

    /// Input that violates the frame grammar in some other way.
    #[error("malformed input: {0}")]
    Malformed(&'static str),

    /// A field header resolved to no type, and the caller supplied none.
    #[error("field does not name its type")]
    MissingFieldType,

    /// A type identifier on the wire that the registry does not know.
    #[error("unknown type identifier {0}")]
    UnknownType(StableTypeID),

    /// A runtime value whose type was never registered.
    #[error("type {0:?} is not registered")]
    UnregisteredType(TypeId),

    /// Two different types registered under the same stable identifier.
    #[error("`{name}` reuses the stable identifier {id} of `{existing}`")]
    DuplicateTypeId {
        /// The identifier both types hash to.
        id: StableTypeID,
        /// The type being registered.
        name: &'static str,
        /// The type already holding the identifier.
        existing: &'static str,
    },

    /// The type filters rejected a type read from the wire.
    #[error("type `{0}` is not allowed to be deserialized")]
    TypeNotAllowed(&'static str),

    /// No codec or copier accepted the type.
    #[error("no codec supports `{0}`")]
    UnsupportedType(&'static str),

    /// A back-reference to an id that was never recorded.
    #[error("reference {0} does not exist")]
    UnknownReference(u32),

    /// A back-reference to an object whose decoding has not finished.
    #[error("reference {0} points at an object that is still being decoded")]
    UnresolvedReference(u32),

    /// A reference id was recorded twice.
    #[error("reference {0} was already recorded")]
    DuplicateReference(u32),

    /// The external serializer failed. The original error is the source.
    #[error("external serializer: {0}")]
    External(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
    /// Wraps an error coming from an external serializer.
    pub fn external(
        error: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::External(Box::new(error))
    }

    /// Returns `true` for errors caused by input that does not follow the
    /// frame grammar.
    ///
    /// These are never worth retrying with the same bytes.
    #[must_use]
    pub const fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::MissingTypeField
                | Self::MissingPayloadField
                | Self::UnexpectedWireType { .. }
                | Self::InvalidTag(_)
                | Self::Malformed(_)
                | Self::MissingFieldType
        )
    }
}
