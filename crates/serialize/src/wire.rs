//! Field headers: the self-describing framing every value is wrapped in.
//!
//! # Tag layout
//!
//! Each field starts with a tag byte:
//!
//! ```text
//!  7   6   5   4   3   2   1   0
//! +-----------+-------+-----------+
//! | wire type | schema| id delta  |
//! +-----------+-------+-----------+
//! ```
//!
//! - A field-id delta of 0 to 6 is stored inline; 7 means the delta follows as
//!   a varint.
//! - Schema [`SchemaType::Encoded`] means the field's type follows the tag
//!   (and the delta, if any), written by the type identifier codec.
//! - Wire type [`WireType::Extended`] reuses the schema bits to carry an
//!   [`ExtendedWireType`]; these are the end markers of tag-delimited fields.

use std::sync::Arc;

use crate::{Error, Result, TypeInfo};

const WIRE_TYPE_SHIFT: u8 = 5;
const SCHEMA_TYPE_SHIFT: u8 = 3;
const SCHEMA_TYPE_MASK: u8 = 0b0001_1000;
const FIELD_ID_MASK: u8 = 0b0000_0111;

/// The inline delta value meaning "the delta follows as a varint".
pub(crate) const FIELD_ID_EXTENDED: u8 = FIELD_ID_MASK;

/// How the bytes of a field are laid out, and so how to skip them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WireType {
    /// A single varint.
    VarInt = 0,
    /// Nested fields terminated by an end-object marker.
    TagDelimited = 1,
    /// A varint length followed by that many bytes.
    LengthPrefixed = 2,
    /// Four bytes.
    Fixed32 = 3,
    /// Eight bytes.
    Fixed64 = 4,
    /// A varint back-reference id.
    Reference = 6,
    /// An end marker; see [`ExtendedWireType`].
    Extended = 7,
}

impl WireType {
    const fn from_bits(bits: u8) -> Option<Self> {
        Some(match bits {
            0 => Self::VarInt,
            1 => Self::TagDelimited,
            2 => Self::LengthPrefixed,
            3 => Self::Fixed32,
            4 => Self::Fixed64,
            6 => Self::Reference,
            7 => Self::Extended,
            _ => return None,
        })
    }
}

/// How the type of a field is conveyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaType {
    /// The reader already knows the type from context.
    Expected = 0,
    /// The type identifier follows the tag.
    Encoded = 2,
}

/// End markers, carried in the schema bits of an extended tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtendedWireType {
    /// Closes a tag-delimited field.
    EndTagDelimited = 0,
    /// Separates base-type fields from derived-type fields.
    EndBaseFields = 1,
}

/// Builds a tag byte. `delta` must already be clamped to
/// [`FIELD_ID_EXTENDED`].
pub(crate) const fn tag(wire_type: WireType, schema: SchemaType, delta: u8) -> u8 {
    ((wire_type as u8) << WIRE_TYPE_SHIFT)
        | ((schema as u8) << SCHEMA_TYPE_SHIFT)
        | (delta & FIELD_ID_MASK)
}

/// Builds the tag byte of an end marker.
pub(crate) const fn extended_tag(extended: ExtendedWireType) -> u8 {
    ((WireType::Extended as u8) << WIRE_TYPE_SHIFT)
        | ((extended as u8) << SCHEMA_TYPE_SHIFT)
}

/// The tag byte closing a tag-delimited field.
pub const END_OBJECT_TAG: u8 = extended_tag(ExtendedWireType::EndTagDelimited);

/// The tag byte closing the base-type fields of a tag-delimited field.
pub const END_BASE_TAG: u8 = extended_tag(ExtendedWireType::EndBaseFields);

/// The parts of a tag byte before any trailing delta or type is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DecodedTag {
    Field { wire_type: WireType, schema: SchemaType, inline_delta: u8 },
    Extended(ExtendedWireType),
}

pub(crate) fn decode_tag(tag: u8) -> Result<DecodedTag> {
    let wire_type =
        WireType::from_bits(tag >> WIRE_TYPE_SHIFT).ok_or(Error::InvalidTag(tag))?;
    let schema_bits = (tag & SCHEMA_TYPE_MASK) >> SCHEMA_TYPE_SHIFT;

    if wire_type == WireType::Extended {
        return match (schema_bits, tag & FIELD_ID_MASK) {
            (0, 0) => Ok(DecodedTag::Extended(ExtendedWireType::EndTagDelimited)),
            (1, 0) => Ok(DecodedTag::Extended(ExtendedWireType::EndBaseFields)),
            _ => Err(Error::InvalidTag(tag)),
        };
    }

    let schema = match schema_bits {
        0 => SchemaType::Expected,
        2 => SchemaType::Encoded,
        _ => return Err(Error::InvalidTag(tag)),
    };

    Ok(DecodedTag::Field { wire_type, schema, inline_delta: tag & FIELD_ID_MASK })
}

/// A decoded field header.
#[derive(Debug, Clone)]
pub struct Field {
    field_id_delta: u32,
    wire_type: WireType,
    extended: Option<ExtendedWireType>,
    field_type: Option<Arc<TypeInfo>>,
}

impl Field {
    pub(crate) const fn new(
        field_id_delta: u32,
        wire_type: WireType,
        field_type: Option<Arc<TypeInfo>>,
    ) -> Self {
        Self { field_id_delta, wire_type, extended: None, field_type }
    }

    pub(crate) const fn end(extended: ExtendedWireType) -> Self {
        Self {
            field_id_delta: 0,
            wire_type: WireType::Extended,
            extended: Some(extended),
            field_type: None,
        }
    }

    /// The difference between this field's id and the previous one.
    #[must_use]
    pub const fn field_id_delta(&self) -> u32 { self.field_id_delta }

    /// The wire type of the field.
    #[must_use]
    pub const fn wire_type(&self) -> WireType { self.wire_type }

    /// The end marker this header represents, if it is one.
    #[must_use]
    pub const fn extended_wire_type(&self) -> Option<ExtendedWireType> {
        self.extended
    }

    /// The type named by the header, if it carried one.
    #[must_use]
    pub const fn field_type(&self) -> Option<&Arc<TypeInfo>> {
        self.field_type.as_ref()
    }

    /// Fills in the type from context when the header did not carry one.
    #[must_use]
    pub fn with_expected_type(mut self, expected: Option<&Arc<TypeInfo>>) -> Self {
        if self.field_type.is_none() {
            self.field_type = expected.cloned();
        }
        self
    }

    /// Returns `true` if the field is a back-reference.
    #[must_use]
    pub fn is_reference(&self) -> bool { self.wire_type == WireType::Reference }

    /// Returns `true` if the field is an end-object or end-base marker.
    #[must_use]
    pub const fn is_end_base_or_end_object(&self) -> bool {
        self.extended.is_some()
    }

    /// Returns `true` if the field is an end-object marker.
    #[must_use]
    pub fn is_end_object(&self) -> bool {
        self.extended == Some(ExtendedWireType::EndTagDelimited)
    }

    /// Fails unless the field is tag-delimited.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnexpectedWireType`] for any other wire type.
    pub fn ensure_wire_type_tag_delimited(&self) -> Result<()> {
        self.ensure_wire_type(WireType::TagDelimited)
    }

    /// Fails unless the field has the given wire type.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnexpectedWireType`] for any other wire type.
    pub fn ensure_wire_type(&self, expected: WireType) -> Result<()> {
        if self.wire_type == expected {
            Ok(())
        } else {
            Err(Error::UnexpectedWireType { expected, actual: self.wire_type })
        }
    }
}
