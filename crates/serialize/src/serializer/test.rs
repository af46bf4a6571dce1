use std::sync::Arc;

use quill_stable_type_id::Identifiable;
use tracing_test::traced_test;

use super::*;
use crate::{
    DeepCopier, FieldCodec, SerializerOptions, TypeFilter, TypeInfo, WireType,
    reference, wire::Field,
};

#[derive(Debug, PartialEq, Eq, Identifiable)]
struct Counter(u64);

#[derive(Debug, Identifiable)]
struct Pair {
    left: Object,
    right: Object,
}

#[derive(Debug, Identifiable)]
struct Opaque;

struct CounterCodec;

impl FieldCodec for CounterCodec {
    fn write_field(
        &self,
        writer: &mut Writer<'_>,
        field_id_delta: u32,
        expected: Option<&TypeInfo>,
        value: &Object,
    ) -> Result<()> {
        let counter = value
            .downcast_ref::<Counter>()
            .ok_or(Error::Malformed("not a counter"))?;
        let ty = writer.session().registry().type_of(value)?;

        writer.write_field_header(field_id_delta, expected, &ty, WireType::VarInt)?;
        writer.write_var_u64(counter.0)
    }

    fn read_value(&self, reader: &mut Reader<'_>, field: &Field) -> Result<Object> {
        field.ensure_wire_type(WireType::VarInt)?;

        Ok(Arc::new(Counter(reader.read_var_u64()?)))
    }
}

impl DeepCopier for CounterCodec {
    fn deep_copy(&self, input: &Object, _: &mut CopyContext) -> Result<Object> {
        let counter = input
            .downcast_ref::<Counter>()
            .ok_or(Error::Malformed("not a counter"))?;

        Ok(Arc::new(Counter(counter.0)))
    }
}

struct PairCodec;

impl FieldCodec for PairCodec {
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

        let pair =
            value.downcast_ref::<Pair>().ok_or(Error::Malformed("not a pair"))?;
        let ty = writer.session().registry().type_of(value)?;

        writer.write_field_header(
            field_id_delta,
            expected,
            &ty,
            WireType::TagDelimited,
        )?;
        writer.write_object_field(0, None, &pair.left)?;
        writer.write_object_field(1, None, &pair.right)?;
        writer.write_end_object()
    }

    fn read_value(&self, reader: &mut Reader<'_>, field: &Field) -> Result<Object> {
        field.ensure_wire_type_tag_delimited()?;

        let placeholder = reader.session_mut().references_mut().create_placeholder();
        let mut left = None;
        let mut right = None;
        let mut id = 0u32;

        loop {
            let header = reader.read_field_header()?;
            if header.is_end_object() {
                break;
            }

            id += header.field_id_delta();
            match id {
                0 => left = Some(reader.read_object_field(&header)?),
                1 => right = Some(reader.read_object_field(&header)?),
                _ => reader.consume_unknown_field(&header)?,
            }
        }

        let pair: Object = Arc::new(Pair {
            left: left.ok_or(Error::Malformed("pair without left"))?,
            right: right.ok_or(Error::Malformed("pair without right"))?,
        });
        reader
            .session_mut()
            .references_mut()
            .record_object(pair.clone(), placeholder)?;

        Ok(pair)
    }
}

struct AllowAll;

impl TypeFilter for AllowAll {
    fn is_type_allowed(&self, _: &TypeInfo) -> Option<bool> { Some(true) }
}

fn provider() -> Arc<CodecProvider> {
    let mut builder = CodecProvider::builder();
    builder.register::<Counter>().unwrap();
    builder.register::<Pair>().unwrap();
    builder.register::<Opaque>().unwrap();

    let counter = Arc::new(CounterCodec);
    builder
        .add_codec::<Counter>(counter.clone())
        .add_copier::<Counter>(counter)
        .add_codec::<Pair>(Arc::new(PairCodec));

    builder.build()
}

#[test]
fn value_round_trip() {
    let serializer = Serializer::new(provider());

    let bytes = serializer.serialize(&(Arc::new(Counter(300)) as Object)).unwrap();
    let counter = serializer.deserialize_as::<Counter>(&bytes).unwrap();

    assert_eq!(*counter, Counter(300));
}

#[test]
fn shared_objects_stay_shared() {
    let serializer = Serializer::new(provider());

    let inner: Object = Arc::new(Pair {
        left: Arc::new(Counter(1)),
        right: Arc::new(Counter(2)),
    });
    let outer: Object = Arc::new(Pair { left: inner.clone(), right: inner });

    let bytes = serializer.serialize(&outer).unwrap();
    let outer = serializer.deserialize_as::<Pair>(&bytes).unwrap();

    assert!(Arc::ptr_eq(&outer.left, &outer.right));

    let inner = outer.left.clone().downcast::<Pair>().unwrap();
    assert_eq!(inner.left.downcast_ref::<Counter>(), Some(&Counter(1)));
    assert_eq!(inner.right.downcast_ref::<Counter>(), Some(&Counter(2)));
}

#[test]
fn deserialize_as_wrong_type_fails() {
    let serializer = Serializer::new(provider());

    let bytes = serializer.serialize(&(Arc::new(Counter(1)) as Object)).unwrap();

    assert!(matches!(
        serializer.deserialize_as::<Pair>(&bytes),
        Err(Error::Malformed(_))
    ));
}

#[test]
fn unsupported_and_unregistered_types() {
    let serializer = Serializer::new(provider());

    assert!(matches!(
        serializer.serialize(&(Arc::new(Opaque) as Object)),
        Err(Error::UnsupportedType(_))
    ));
    assert!(matches!(
        serializer.serialize(&(Arc::new(0u8) as Object)),
        Err(Error::UnregisteredType(_))
    ));
}

#[test]
#[traced_test]
fn incoming_types_are_filtered() {
    let serializer = Serializer::new(provider());
    let opaque = serializer
        .provider()
        .registry()
        .get(std::any::TypeId::of::<Opaque>())
        .cloned()
        .unwrap();

    assert!(!serializer.provider().is_type_allowed(&opaque));

    // an encoded header naming `Opaque`
    let mut bytes = vec![0b000_10_000, 16];
    bytes.extend_from_slice(&Opaque::STABLE_TYPE_ID.to_bytes());

    assert!(matches!(
        serializer.deserialize(&bytes),
        Err(Error::TypeNotAllowed(_))
    ));
    assert!(logs_contain("rejected by type filters"));

    let mut builder = CodecProvider::builder();
    builder.register::<Opaque>().unwrap();
    builder.add_type_filter(Arc::new(AllowAll));
    let permissive = Serializer::new(builder.build());

    assert!(matches!(
        permissive.deserialize(&bytes),
        Err(Error::UnsupportedType(_))
    ));
}

#[test]
fn unknown_types_can_be_allowed_by_default() {
    let mut builder = CodecProvider::builder();
    let opaque = builder.register::<Opaque>().unwrap();
    builder.options(SerializerOptions::default().with_allow_unknown_types(true));

    assert!(builder.build().is_type_allowed(&opaque));
}

#[test]
fn deep_copy_uses_the_copier() {
    let serializer = Serializer::new(provider());
    let original: Object = Arc::new(Counter(5));

    let copy = serializer.deep_copy(&original).unwrap();

    assert!(!Arc::ptr_eq(&original, &copy));
    assert_eq!(copy.downcast_ref::<Counter>(), Some(&Counter(5)));

    let pair: Object = Arc::new(Pair { left: original.clone(), right: original });
    assert!(matches!(
        serializer.deep_copy(&pair),
        Err(Error::UnsupportedType(_))
    ));
}
