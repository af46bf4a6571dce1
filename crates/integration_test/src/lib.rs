//! Common types and provider setup for quill integration tests.
//!
//! Contract types travel through the bincode-backed external codec, while
//! [`Node`] has a hand-written codec that can form cycles and share
//! children, so a single object graph mixes both kinds of frames.

#![allow(missing_docs)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_const_for_fn)]

use std::sync::{Arc, Mutex, PoisonError};

use quill_external::{
    Bincode, BincodeOptions, ExternalCodec, ExternalCodecOptions,
    external_contract,
};
use quill_serialize::{
    CodecProvider, Error, Field, FieldCodec, Object, Reader, Result,
    Serializer, TypeInfo, WireType, Writer, reference,
};
use quill_stable_type_id::Identifiable;
use serde::{Deserialize, Serialize};

// ============================================================================
// Contract Types
// ============================================================================

#[derive(
    Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Identifiable,
)]
pub struct Order {
    pub id: u64,
    pub items: Vec<String>,
}

impl Order {
    pub fn new(id: u64, items: &[&str]) -> Self {
        Self { id, items: items.iter().map(|item| (*item).to_owned()).collect() }
    }
}

#[derive(
    Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Identifiable,
)]
pub struct Customer {
    pub name: String,
    pub vip: bool,
}

external_contract!(Order, Customer);

/// Registered, but neither a contract nor backed by a codec.
#[derive(Debug, Identifiable)]
pub struct Sealed;

// ============================================================================
// Native Graph Type
// ============================================================================

/// A labelled graph node whose children can be any registered value,
/// including the node itself.
#[derive(Debug, Identifiable)]
pub struct Node {
    label: String,
    children: Mutex<Vec<Object>>,
}

impl Node {
    pub fn new(label: &str) -> Arc<Self> {
        Arc::new(Self { label: label.to_owned(), children: Mutex::new(Vec::new()) })
    }

    pub fn label(&self) -> &str { &self.label }

    pub fn push(&self, child: Object) {
        self.children.lock().unwrap_or_else(PoisonError::into_inner).push(child);
    }

    pub fn children(&self) -> Vec<Object> {
        self.children.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

/// Writes a [`Node`] as its label (field 0) followed by one field per child.
pub struct NodeCodec;

impl NodeCodec {
    /// Builds the node and fills its placeholder so that children can refer
    /// back to it.
    fn publish(
        reader: &mut Reader<'_>,
        label: Option<String>,
        placeholder: u32,
    ) -> Result<Arc<Node>> {
        let label = label.ok_or(Error::Malformed("node without label"))?;
        let node = Node::new(&label);

        reader
            .session_mut()
            .references_mut()
            .record_object(node.clone(), placeholder)?;

        Ok(node)
    }
}

impl FieldCodec for NodeCodec {
    fn write_field(
        &self,
        writer: &mut Writer<'_>,
        field_id_delta: u32,
        expected: Option<&TypeInfo>,
        value: &Object,
    ) -> Result<()> {
        if reference::try_write_reference_field(writer, field_id_delta, value)? {
            return Ok(());
        }

        let node =
            value.downcast_ref::<Node>().ok_or(Error::Malformed("not a node"))?;
        let ty = writer.session().registry().type_of(value)?;

        writer.write_field_header(
            field_id_delta,
            expected,
            &ty,
            WireType::TagDelimited,
        )?;

        let label = node.label.as_bytes();
        let len = u32::try_from(label.len())
            .map_err(|_| Error::Malformed("label exceeds 4 GiB"))?;

        writer.session_mut().references_mut().mark_value_field();
        writer.write_field_header_expected(0, WireType::LengthPrefixed)?;
        writer.write_var_u32(len)?;
        writer.write_raw_bytes(label)?;

        for child in node.children() {
            writer.write_object_field(1, None, &child)?;
        }

        writer.write_end_object()
    }

    fn read_value(&self, reader: &mut Reader<'_>, field: &Field) -> Result<Object> {
        if field.is_reference() {
            return reference::read_reference(reader, field);
        }

        field.ensure_wire_type_tag_delimited()?;

        let placeholder =
            reader.session_mut().references_mut().create_placeholder();

        let mut field_id = 0u32;
        let mut label = None;
        let mut node: Option<Arc<Node>> = None;

        loop {
            let header = reader.read_field_header()?;
            if header.is_end_object() {
                break;
            }

            field_id = field_id.saturating_add(header.field_id_delta());

            if field_id == 0 {
                header.ensure_wire_type(WireType::LengthPrefixed)?;
                reader.session_mut().references_mut().mark_value_field();

                let len = reader.read_var_u32()? as usize;
                let bytes = reader.read_raw_bytes(len)?;
                label = Some(
                    String::from_utf8(bytes)
                        .map_err(|_| Error::Malformed("label is not UTF-8"))?,
                );
                continue;
            }

            let parent = match &node {
                Some(node) => node.clone(),
                None => {
                    let published =
                        Self::publish(reader, label.take(), placeholder)?;
                    node = Some(published.clone());
                    published
                }
            };

            let child = reader.read_object_field(&header)?;
            parent.push(child);
        }

        let node = match node {
            Some(node) => node,
            None => Self::publish(reader, label, placeholder)?,
        };

        Ok(node)
    }
}

// ============================================================================
// Setup
// ============================================================================

/// Builds a provider with the node codec and a bincode external codec.
///
/// # Errors
///
/// Fails when two registered types share a stable identifier.
pub fn build_provider(
    options: ExternalCodecOptions<BincodeOptions>,
) -> Result<(Arc<CodecProvider>, Arc<ExternalCodec<Bincode>>)> {
    let mut builder = CodecProvider::builder();
    builder.register::<Node>()?;
    builder.register::<Sealed>()?;
    builder.add_codec::<Node>(Arc::new(NodeCodec));

    let codec = Bincode::install(&mut builder, options)?;

    Ok((builder.build(), codec))
}

/// A serializer over [`build_provider`] with default options.
///
/// # Errors
///
/// See [`build_provider`].
pub fn create_serializer() -> Result<Serializer> {
    let (provider, _) = build_provider(ExternalCodecOptions::default())?;

    Ok(Serializer::new(provider))
}

/// Wraps a value as an [`Object`].
pub fn object<T: std::any::Any + Send + Sync>(value: T) -> Object { Arc::new(value) }
