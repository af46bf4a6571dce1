//! Writes and reads type identifiers.
//!
//! A type is named on the wire by its [`StableTypeID`], framed as a varint
//! length followed by the identifier bytes. The length is always
//! [`STABLE_TYPE_ID_LEN`]; anything else is rejected as malformed.

use std::sync::Arc;

use quill_stable_type_id::{STABLE_TYPE_ID_LEN, StableTypeID};

use crate::{Error, Reader, Result, TypeInfo, Writer};

/// Writes `ty` as a length-prefixed type identifier.
///
/// # Errors
///
/// Fails when the encoder fails.
#[allow(clippy::cast_possible_truncation)]
pub fn write_length_prefixed(writer: &mut Writer<'_>, ty: &TypeInfo) -> Result<()> {
    writer.write_var_u32(STABLE_TYPE_ID_LEN as u32)?;
    writer.write_raw_bytes(&ty.stable_id().to_bytes())
}

/// Reads a length-prefixed type identifier and resolves it.
///
/// The resolved type must pass the provider's type filters.
///
/// # Errors
///
/// - [`Error::Malformed`] when the length is not [`STABLE_TYPE_ID_LEN`].
/// - [`Error::UnknownType`] when no registered type has the identifier.
/// - [`Error::TypeNotAllowed`] when the type filters reject the type.
pub fn read_length_prefixed(reader: &mut Reader<'_>) -> Result<Arc<TypeInfo>> {
    let len = reader.read_var_u32()?;
    if len as usize != STABLE_TYPE_ID_LEN {
        return Err(Error::Malformed("type identifier has the wrong length"));
    }

    let mut bytes = [0u8; STABLE_TYPE_ID_LEN];
    bytes.copy_from_slice(&reader.read_raw_bytes(STABLE_TYPE_ID_LEN)?);
    let id = StableTypeID::from_bytes(bytes);

    let session = reader.session();
    let ty = session
        .registry()
        .by_stable_id(id)
        .cloned()
        .ok_or(Error::UnknownType(id))?;

    if !session.provider().is_type_allowed(&ty) {
        tracing::debug!(ty = ty.name(), "rejected by type filters");
        return Err(Error::TypeNotAllowed(ty.name()));
    }

    Ok(ty)
}
