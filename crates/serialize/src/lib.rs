//! Quill serialization framework.
//!
//! This crate provides a self-describing, version-tolerant binary wire
//! format together with the machinery codecs plug into.
//!
//! # Overview
//!
//! - [`Encoder`] and [`Decoder`] emit and read primitives; the
//!   [`PostcardEncoder`] and [`PostcardDecoder`] implementations use varints
//!   for integers.
//! - Every value is written as a *field*: a tag byte carrying the
//!   [`WireType`], whether the field's type is encoded, and the field-id
//!   delta. See [`wire`] for the bit layout.
//! - A [`CodecProvider`] selects a [`FieldCodec`] for each type and a
//!   [`DeepCopier`] for deep copies. [`TypeFilter`]s decide which types may
//!   be named in incoming data.
//! - [`Writer`] and [`Reader`] carry a [`Session`], whose [`ReferenceTable`]
//!   preserves object identity and cycles.
//! - [`Serializer`] ties it together.
//!
//! Types are named on the wire by their [`StableTypeID`], so only types
//! implementing [`Identifiable`] can be registered.
//!
//! # Example
//!
//! ```ignore
//! let mut builder = CodecProvider::builder();
//! builder.register::<Point>()?;
//! builder.add_codec::<Point>(Arc::new(PointCodec));
//!
//! let serializer = Serializer::new(builder.build());
//! let bytes = serializer.serialize(&(Arc::new(Point { x: 3, y: 4 }) as Object))?;
//! let point = serializer.deserialize_as::<Point>(&bytes)?;
//! ```

pub mod buffer;
pub mod codec;
pub mod copy;
pub mod decode;
pub mod encode;
pub mod error;
pub mod plugin;
pub mod postcard;
pub mod reader;
pub mod reference;
pub mod registry;
pub mod serializer;
pub mod session;
pub mod type_codec;
pub mod wire;
pub mod writer;

pub use buffer::{BufferPool, PooledBuffer};
pub use codec::{
    CodecProvider, CodecProviderBuilder, DeepCopier, FieldCodec,
    GeneralizedCodec, GeneralizedCopier, SerializerOptions, TypeFilter,
};
pub use copy::CopyContext;
pub use decode::Decoder;
pub use encode::Encoder;
pub use error::{Error, Result};
pub use plugin::Plugin;
pub use postcard::{PostcardDecoder, PostcardEncoder};
pub use quill_stable_type_id::{self as stable_type_id, Identifiable, StableTypeID};
pub use reader::Reader;
pub use reference::ReferenceTable;
pub use registry::{Object, TypeInfo, TypeKind, TypeRegistry};
pub use serializer::Serializer;
pub use session::Session;
pub use wire::{ExtendedWireType, Field, SchemaType, WireType};
pub use writer::Writer;
