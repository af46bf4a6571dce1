//! Serde + bincode external serializer.

use std::{any::Any, sync::Arc};

use quill_serialize::{CodecProviderBuilder, Object, TypeInfo};

use crate::{
    Contract, ExternalCodec, ExternalCodecOptions, ExternalContract,
    ExternalSerializer, contract,
};

/// Byte order of fixed-width integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Endian {
    /// Little endian.
    #[default]
    Little,

    /// Big endian.
    Big,
}

/// How integers are laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IntEncoding {
    /// Variable length, zig-zag for signed integers.
    #[default]
    Variable,

    /// Always the full width of the type.
    Fixed,
}

/// Settings forwarded to bincode on every call.
///
/// The defaults match `bincode::config::standard()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BincodeOptions {
    /// Byte order of fixed-width integers.
    pub endian: Endian,

    /// Integer layout.
    pub int_encoding: IntEncoding,

    /// The largest payload accepted when decoding, in bytes.
    pub limit: Option<usize>,
}

impl BincodeOptions {
    /// Uses big-endian byte order.
    #[must_use]
    pub const fn with_big_endian(mut self) -> Self {
        self.endian = Endian::Big;
        self
    }

    /// Uses fixed-width integers.
    #[must_use]
    pub const fn with_fixed_int_encoding(mut self) -> Self {
        self.int_encoding = IntEncoding::Fixed;
        self
    }

    /// Rejects payloads longer than `limit` bytes when decoding.
    #[must_use]
    pub const fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Errors reported by the [`Bincode`] serializer.
#[derive(Debug, thiserror::Error)]
pub enum ExternalError {
    /// bincode failed to encode.
    #[error("encode error: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    /// bincode failed to decode.
    #[error("decode error: {0}")]
    Decode(#[from] bincode::error::DecodeError),

    /// The type was not declared with `external_contract!`.
    #[error("`{0}` is not an external contract")]
    NotAContract(&'static str),

    /// The value handed over is not of the announced type.
    #[error("value is not a `{0}`")]
    TypeMismatch(&'static str),

    /// The payload exceeds [`BincodeOptions::limit`].
    #[error("payload of {len} bytes exceeds the limit of {limit} bytes")]
    PayloadTooLarge {
        /// The payload length.
        len: usize,
        /// The configured limit.
        limit: usize,
    },

    /// Decoding finished before the end of the payload.
    #[error("{trailing} bytes left over after decoding")]
    TrailingBytes {
        /// The number of unread bytes.
        trailing: usize,
    },
}

/// Runs `$body` with the bincode configuration `$options` describes bound to
/// `$config`.
macro_rules! with_config {
    ($options:expr, |$config:ident| $body:expr) => {{
        let standard = bincode::config::standard();
        match ($options.endian, $options.int_encoding) {
            (Endian::Little, IntEncoding::Variable) => {
                let $config = standard;
                $body
            }
            (Endian::Little, IntEncoding::Fixed) => {
                let $config = standard.with_fixed_int_encoding();
                $body
            }
            (Endian::Big, IntEncoding::Variable) => {
                let $config = standard.with_big_endian();
                $body
            }
            (Endian::Big, IntEncoding::Fixed) => {
                let $config =
                    standard.with_big_endian().with_fixed_int_encoding();
                $body
            }
        }
    }};
}

pub(crate) fn encode_as<T: ExternalContract>(
    value: &dyn Any,
    options: &BincodeOptions,
    output: &mut Vec<u8>,
) -> Result<(), ExternalError> {
    let value = value
        .downcast_ref::<T>()
        .ok_or(ExternalError::TypeMismatch(std::any::type_name::<T>()))?;

    with_config!(options, |config| {
        bincode::serde::encode_into_std_write(value, output, config)
    })?;

    Ok(())
}

pub(crate) fn decode_as<T: ExternalContract>(
    input: &[u8],
    options: &BincodeOptions,
) -> Result<Object, ExternalError> {
    if let Some(limit) = options.limit.filter(|limit| input.len() > *limit) {
        return Err(ExternalError::PayloadTooLarge { len: input.len(), limit });
    }

    let (value, read) = with_config!(options, |config| {
        bincode::serde::decode_from_slice::<T, _>(input, config)
    })?;

    if read != input.len() {
        return Err(ExternalError::TrailingBytes { trailing: input.len() - read });
    }

    Ok(Arc::new(value))
}

/// The bundled external serializer: serde data model, bincode encoding.
///
/// A type is a contract when it was declared with
/// [`external_contract!`](crate::external_contract).
#[derive(Debug, Clone, Copy, Default)]
pub struct Bincode;

impl Bincode {
    /// Registers every contract type and installs an [`ExternalCodec`]
    /// backed by bincode.
    ///
    /// # Errors
    ///
    /// Fails when a contract type's stable identifier collides with another
    /// registered type.
    pub fn install(
        builder: &mut CodecProviderBuilder,
        options: ExternalCodecOptions<BincodeOptions>,
    ) -> quill_serialize::Result<Arc<ExternalCodec<Self>>> {
        contract::register_all(builder.registry_mut())?;

        ExternalCodec::install(builder, Self, options)
    }

    fn contract(ty: &TypeInfo) -> Result<&'static Contract, ExternalError> {
        Contract::find(ty.type_id()).ok_or(ExternalError::NotAContract(ty.name()))
    }
}

impl ExternalSerializer for Bincode {
    type Options = BincodeOptions;
    type Error = ExternalError;

    fn is_contract(ty: &TypeInfo) -> bool {
        Contract::find(ty.type_id()).is_some()
    }

    fn serialize(
        &self,
        ty: &TypeInfo,
        value: &dyn Any,
        options: &BincodeOptions,
        output: &mut Vec<u8>,
    ) -> Result<(), ExternalError> {
        Self::contract(ty)?.encode(value, options, output)
    }

    fn deserialize(
        &self,
        ty: &TypeInfo,
        input: &[u8],
        options: &BincodeOptions,
    ) -> Result<Object, ExternalError> {
        Self::contract(ty)?.decode(input, options)
    }
}
