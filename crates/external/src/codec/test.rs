use std::{
    any::{Any, TypeId},
    sync::Arc,
};

use quill_serialize::{
    BufferPool, CodecProvider, CopyContext, Error, Object, Plugin,
    PostcardDecoder, PostcardEncoder, Reader, Serializer, Session, TypeFilter,
    TypeInfo, TypeKind, WireType, Writer, type_codec,
};
use quill_stable_type_id::{Identifiable, StableTypeID};
use serde::{Deserialize, Serialize};
use tracing_test::traced_test;

use crate::{
    Bincode, BincodeOptions, Eligibility, ExternalCodec, ExternalCodecOptions,
    ExternalError, ExternalField, ExternalSerializer, Purpose,
    cached_contract_decision, external_contract,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Identifiable)]
struct Point {
    x: i32,
    y: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Identifiable)]
struct Label(String);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Identifiable)]
struct Fresh(u8);

#[derive(Debug, Identifiable)]
struct Plain;

#[derive(Debug, Identifiable)]
struct Untouched;

trait Shape {}

impl Identifiable for dyn Shape {
    const STABLE_TYPE_ID: StableTypeID =
        StableTypeID::from_unique_type_name("quill_external::codec::test::Shape");
}

external_contract!(Point, Label, Fresh);

fn setup(
    options: ExternalCodecOptions<BincodeOptions>,
) -> (Arc<CodecProvider>, Arc<ExternalCodec<Bincode>>) {
    let mut builder = CodecProvider::builder();
    builder.register::<Plain>().unwrap();
    builder
        .registry_mut()
        .register_with_kind::<dyn Shape>(TypeKind::Abstract)
        .unwrap();

    let codec = Bincode::install(&mut builder, options).unwrap();

    (builder.build(), codec)
}

fn info<T: ?Sized + Any>(provider: &CodecProvider) -> Arc<TypeInfo> {
    provider.registry().get(TypeId::of::<T>()).cloned().unwrap()
}

fn object<T: Any + Send + Sync>(value: T) -> Object { Arc::new(value) }

fn bincode_bytes<T: Serialize>(value: &T) -> Vec<u8> {
    bincode::serde::encode_to_vec(value, bincode::config::standard()).unwrap()
}

fn new_session(provider: &Arc<CodecProvider>) -> Session {
    Session::new(provider.clone(), Arc::new(Plugin::new()))
}

/// Writes a frame header naming the codec, `body`, and the end marker.
fn frame(
    provider: &Arc<CodecProvider>,
    body: impl FnOnce(&mut Writer<'_>) -> quill_serialize::Result<()>,
) -> Vec<u8> {
    let identity = info::<ExternalField>(provider);
    let mut session = new_session(provider);
    let mut encoder = PostcardEncoder::new(Vec::new());

    let mut writer = Writer::new(&mut encoder, &mut session);
    writer
        .write_field_header(0, None, &identity, WireType::TagDelimited)
        .unwrap();
    body(&mut writer).unwrap();
    writer.write_end_object().unwrap();

    encoder.into_inner()
}

fn type_field(
    writer: &mut Writer<'_>,
    field_id_delta: u32,
    ty: &TypeInfo,
) -> quill_serialize::Result<()> {
    writer.write_field_header_expected(field_id_delta, WireType::LengthPrefixed)?;
    type_codec::write_length_prefixed(writer, ty)
}

#[allow(clippy::cast_possible_truncation)]
fn payload_field(
    writer: &mut Writer<'_>,
    field_id_delta: u32,
    payload: &[u8],
) -> quill_serialize::Result<()> {
    writer.write_field_header_expected(field_id_delta, WireType::LengthPrefixed)?;
    writer.write_var_u32(payload.len() as u32)?;
    writer.write_raw_bytes(payload)
}

#[test]
#[allow(clippy::cast_possible_truncation)]
fn frame_names_the_runtime_type() {
    let (provider, _) = setup(ExternalCodecOptions::default());
    let shape = info::<dyn Shape>(&provider);
    let point = info::<Point>(&provider);
    let identity = info::<ExternalField>(&provider);

    let value = object(Point { x: 3, y: 4 });
    let mut session = new_session(&provider);
    let mut encoder = PostcardEncoder::new(Vec::new());
    Writer::new(&mut encoder, &mut session)
        .write_object_field(0, Some(shape.as_ref()), &value)
        .unwrap();
    let bytes = encoder.into_inner();

    let payload = bincode_bytes(&Point { x: 3, y: 4 });
    let mut expected = vec![0b001_10_000, 16];
    expected.extend_from_slice(&identity.stable_id().to_bytes());
    expected.extend_from_slice(&[0b010_00_000, 16]);
    expected.extend_from_slice(&point.stable_id().to_bytes());
    expected.extend_from_slice(&[0b010_00_001, payload.len() as u8]);
    expected.extend_from_slice(&payload);
    expected.push(0xE0);

    assert_eq!(bytes, expected);
    assert!(!bytes.windows(16).any(|w| w == shape.stable_id().to_bytes()));

    let serializer = Serializer::new(provider);
    let decoded = serializer.deserialize_as::<Point>(&bytes).unwrap();
    assert_eq!(*decoded, Point { x: 3, y: 4 });
}

#[test]
#[traced_test]
fn values_round_trip() {
    let (provider, _) = setup(ExternalCodecOptions::default());
    let serializer = Serializer::new(provider);

    let bytes = serializer
        .serialize(&object(Label("external".to_owned())))
        .unwrap();
    let label = serializer.deserialize_as::<Label>(&bytes).unwrap();

    assert_eq!(*label, Label("external".to_owned()));
    assert!(logs_contain("wrote external frame"));
    assert!(logs_contain("read external frame"));
}

#[test]
fn repeated_type_field_uses_the_last() {
    let (provider, _) = setup(ExternalCodecOptions::default());
    let label = info::<Label>(&provider);
    let point = info::<Point>(&provider);

    let bytes = frame(&provider, |w| {
        type_field(w, 0, &label)?;
        type_field(w, 0, &point)?;
        payload_field(w, 1, &bincode_bytes(&Point { x: -1, y: 1 }))
    });

    let serializer = Serializer::new(provider);
    let decoded = serializer.deserialize_as::<Point>(&bytes).unwrap();

    assert_eq!(*decoded, Point { x: -1, y: 1 });
}

#[test]
fn payload_without_type_is_structural_error() {
    let (provider, _) = setup(ExternalCodecOptions::default());

    let bytes = frame(&provider, |w| {
        payload_field(w, 1, &bincode_bytes(&Point { x: 3, y: 4 }))
    });

    let error = Serializer::new(provider).deserialize(&bytes).unwrap_err();

    assert!(matches!(error, Error::MissingTypeField));
    assert!(error.is_structural());
}

#[test]
fn type_without_payload_is_structural_error() {
    let (provider, _) = setup(ExternalCodecOptions::default());
    let point = info::<Point>(&provider);

    let bytes = frame(&provider, |w| type_field(w, 0, &point));

    let error = Serializer::new(provider).deserialize(&bytes).unwrap_err();

    assert!(matches!(error, Error::MissingPayloadField));
    assert!(error.is_structural());
}

#[test]
fn oversized_payload_length_fails_without_allocating_it() {
    let (provider, _) = setup(ExternalCodecOptions::default());
    let point = info::<Point>(&provider);

    let bytes = frame(&provider, |w| {
        type_field(w, 0, &point)?;
        w.write_field_header_expected(1, WireType::LengthPrefixed)?;
        w.write_var_u32(u32::MAX)
    });

    let error = Serializer::new(provider).deserialize(&bytes).unwrap_err();

    let Error::Io(io_error) = error else {
        panic!("expected an I/O error");
    };
    assert_eq!(io_error.kind(), std::io::ErrorKind::UnexpectedEof);
}

#[test]
fn failed_read_leaves_placeholder_unresolved() {
    let (provider, _) = setup(ExternalCodecOptions::default());
    let point = info::<Point>(&provider);

    let bytes = frame(&provider, |w| type_field(w, 0, &point));

    let mut session = new_session(&provider);
    let mut decoder = PostcardDecoder::new(&bytes[..]);
    {
        let mut reader = Reader::new(&mut decoder, &mut session);
        let field = reader.read_field_header().unwrap();
        assert!(reader.read_object_field(&field).is_err());
    }

    assert!(matches!(
        session.references().lookup(1),
        Err(Error::UnresolvedReference(1))
    ));
}

#[test]
fn unknown_sub_fields_are_skipped() {
    let (provider, _) = setup(ExternalCodecOptions::default());
    let point = info::<Point>(&provider);

    let bytes = frame(&provider, |w| {
        type_field(w, 0, &point)?;
        payload_field(w, 1, &bincode_bytes(&Point { x: 5, y: 6 }))?;
        w.write_field_header_expected(1, WireType::VarInt)?;
        w.write_var_u64(77)?;
        w.write_field_header_expected(5, WireType::LengthPrefixed)?;
        w.write_var_u32(2)?;
        w.write_raw_bytes(&[0xFF, 0xFF])
    });

    let decoded =
        Serializer::new(provider).deserialize_as::<Point>(&bytes).unwrap();

    assert_eq!(*decoded, Point { x: 5, y: 6 });
}

#[test]
fn frame_must_be_tag_delimited() {
    let (provider, _) = setup(ExternalCodecOptions::default());
    let identity = info::<ExternalField>(&provider);

    let mut bytes = vec![0b010_10_000, 16];
    bytes.extend_from_slice(&identity.stable_id().to_bytes());

    let result = Serializer::new(provider).deserialize(&bytes);

    assert!(matches!(
        result,
        Err(Error::UnexpectedWireType {
            expected: WireType::TagDelimited,
            actual: WireType::LengthPrefixed,
        })
    ));
}

#[test]
fn repeated_values_become_back_references() {
    let (provider, _) = setup(ExternalCodecOptions::default());
    let value = object(Point { x: 1, y: 2 });

    let mut session = new_session(&provider);
    let mut encoder = PostcardEncoder::new(Vec::new());
    {
        let mut writer = Writer::new(&mut encoder, &mut session);
        writer.write_object_field(0, None, &value).unwrap();
        writer.write_object_field(1, None, &value).unwrap();
    }
    let bytes = encoder.into_inner();

    // the second field is a reference header plus id 1
    assert_eq!(bytes[bytes.len() - 2..], [0b110_00_001, 1]);

    let mut session = new_session(&provider);
    let mut decoder = PostcardDecoder::new(&bytes[..]);
    let mut reader = Reader::new(&mut decoder, &mut session);

    let header = reader.read_field_header().unwrap();
    let first = reader.read_object_field(&header).unwrap();
    let header = reader.read_field_header().unwrap();
    let second = reader.read_object_field(&header).unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.downcast_ref::<Point>(), Some(&Point { x: 1, y: 2 }));
}

#[derive(Debug, thiserror::Error)]
#[error("refused")]
struct Refused;

#[derive(Debug)]
struct Refusing;

impl ExternalSerializer for Refusing {
    type Options = ();
    type Error = Refused;

    fn is_contract(ty: &TypeInfo) -> bool { ty.is::<Point>() }

    fn serialize(
        &self,
        _: &TypeInfo,
        _: &dyn Any,
        _: &(),
        output: &mut Vec<u8>,
    ) -> Result<(), Refused> {
        output.extend_from_slice(b"partial");
        Err(Refused)
    }

    fn deserialize(
        &self,
        _: &TypeInfo,
        _: &[u8],
        _: &(),
    ) -> Result<Object, Refused> {
        Err(Refused)
    }
}

#[test]
fn serializer_failures_propagate_and_release_buffers() {
    let mut builder = CodecProvider::builder();
    builder.register::<Point>().unwrap();
    ExternalCodec::install(&mut builder, Refusing, ExternalCodecOptions::default())
        .unwrap();
    let refusing = Serializer::new(builder.build());

    let before = BufferPool::shared().idle_count();

    let error = refusing.serialize(&object(Point { x: 0, y: 0 })).unwrap_err();
    let Error::External(source) = error else {
        panic!("expected an external error");
    };
    assert!(source.downcast_ref::<Refused>().is_some());
    assert_eq!(BufferPool::shared().idle_count(), before.max(1));

    let (provider, _) = setup(ExternalCodecOptions::default());
    let bytes = Serializer::new(provider)
        .serialize(&object(Point { x: 0, y: 0 }))
        .unwrap();

    let before = BufferPool::shared().idle_count();
    let error = refusing.deserialize(&bytes).unwrap_err();
    assert!(matches!(error, Error::External(_)));
    assert_eq!(BufferPool::shared().idle_count(), before.max(1));
}

#[test]
fn deep_copies_are_independent_and_memoized() {
    let (provider, _) = setup(ExternalCodecOptions::default());
    let original = object(Label("copy me".to_owned()));

    let mut context = CopyContext::new(provider.clone(), Arc::new(Plugin::new()));
    let first = context.deep_copy(&original).unwrap();
    let second = context.deep_copy(&original).unwrap();

    assert!(!Arc::ptr_eq(&original, &first));
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.downcast_ref::<Label>(), Some(&Label("copy me".to_owned())));

    let serializer = Serializer::new(provider);
    assert!(matches!(
        serializer.deep_copy(&object(Plain)),
        Err(Error::UnsupportedType(_))
    ));
}

#[test]
fn eligibility_resolution_order() {
    let options = ExternalCodecOptions::default()
        .with_serializable_override(|ty| {
            if ty.is::<Label>() {
                Eligibility::Deny
            } else if ty.is::<Plain>() || ty.is::<dyn Shape>() {
                Eligibility::Allow
            } else {
                Eligibility::Unspecified
            }
        })
        .with_copyable_override(|ty| {
            if ty.is::<ExternalField>() {
                Eligibility::Deny
            } else {
                Eligibility::Unspecified
            }
        });
    let (provider, codec) = setup(options);

    let identity = info::<ExternalField>(&provider);
    assert!(codec.is_eligible(&identity, Purpose::Encode));
    // the identity guard covers copying too
    assert!(codec.is_eligible(&identity, Purpose::Clone));

    let shape = info::<dyn Shape>(&provider);
    assert!(!codec.is_eligible(&shape, Purpose::Encode));
    assert!(!codec.is_eligible(&shape, Purpose::Clone));

    // the two overrides disagree on both of these
    let label = info::<Label>(&provider);
    assert!(!codec.is_eligible(&label, Purpose::Encode));
    assert!(codec.is_eligible(&label, Purpose::Clone));

    let plain = info::<Plain>(&provider);
    assert!(codec.is_eligible(&plain, Purpose::Encode));
    assert!(!codec.is_eligible(&plain, Purpose::Clone));

    let point = info::<Point>(&provider);
    assert!(codec.is_eligible(&point, Purpose::Encode));
    assert!(codec.is_eligible(&point, Purpose::Clone));
}

#[test]
fn eligibility_is_cached_and_stable() {
    let (provider, codec) = setup(ExternalCodecOptions::default());
    let plain = info::<Plain>(&provider);
    let point = info::<Point>(&provider);

    for _ in 0..3 {
        assert!(!codec.is_eligible(&plain, Purpose::Encode));
        assert!(codec.is_eligible(&point, Purpose::Clone));
    }

    assert_eq!(cached_contract_decision::<Bincode>(&plain), Some(false));
    assert_eq!(cached_contract_decision::<Bincode>(&point), Some(true));
    assert_eq!(cached_contract_decision::<Refusing>(&plain), None);
}

#[test]
fn concurrent_first_checks_agree() {
    let (provider, codec) = setup(ExternalCodecOptions::default());
    let fresh = info::<Fresh>(&provider);
    let untouched = TypeInfo::of::<Untouched>(TypeKind::Concrete);

    let results: Vec<(bool, bool)> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..16)
            .map(|_| {
                scope.spawn(|| {
                    (
                        codec.is_eligible(&fresh, Purpose::Encode),
                        codec.is_eligible(&untouched, Purpose::Clone),
                    )
                })
            })
            .collect();

        handles.into_iter().map(|handle| handle.join().unwrap()).collect()
    });

    assert!(results.iter().all(|&result| result == (true, false)));
    assert_eq!(cached_contract_decision::<Bincode>(&fresh), Some(true));
    assert_eq!(cached_contract_decision::<Bincode>(&untouched), Some(false));
}

#[test]
fn filter_allows_eligible_types_only() {
    let (provider, codec) = setup(ExternalCodecOptions::default());

    assert_eq!(codec.is_type_allowed(&info::<Point>(&provider)), Some(true));
    assert_eq!(
        codec.is_type_allowed(&info::<ExternalField>(&provider)),
        Some(true)
    );
    assert_eq!(codec.is_type_allowed(&info::<Plain>(&provider)), None);
    assert_eq!(codec.is_type_allowed(&info::<dyn Shape>(&provider)), None);
}

#[test]
fn plugin_options_take_precedence() {
    let (provider, _) = setup(ExternalCodecOptions::default());
    let value = object(Point { x: 3, y: 4 });

    let mut plugin = Plugin::new();
    plugin.insert(BincodeOptions::default().with_fixed_int_encoding());
    let fixed = Serializer::new(provider.clone()).with_plugin(plugin);
    let standard = Serializer::new(provider);

    let fixed_bytes = fixed.serialize(&value).unwrap();
    let standard_bytes = standard.serialize(&value).unwrap();
    assert_eq!(fixed_bytes.len(), standard_bytes.len() + 6);

    let decoded = fixed.deserialize_as::<Point>(&fixed_bytes).unwrap();
    assert_eq!(*decoded, Point { x: 3, y: 4 });

    let Err(Error::External(source)) = standard.deserialize(&fixed_bytes) else {
        panic!("fixed-width payload decoded with variable-width options");
    };
    assert!(matches!(
        source.downcast_ref::<ExternalError>(),
        Some(ExternalError::TrailingBytes { trailing: 6 })
    ));
}
