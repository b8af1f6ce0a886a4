use std::mem::size_of;

use bytemuck::{Pod, Zeroable};

use archetype_store::{
    cached_deserializers, cached_serializers, ByteReader, ByteWriter, StoreError,
};

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
struct Particle {
    x: f32,
    y: f32,
    lifetime: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
struct Tag {
    value: u64,
}

#[test]
fn plain_roundtrip_is_byte_exact() {
    let serializers = cached_serializers::<Particle>();
    let deserializers = cached_deserializers::<Particle>();

    let original = Particle { x: 1.25, y: -2.5, lifetime: 300 };

    let mut writer = ByteWriter::new();
    (serializers.plain)(&original, &mut writer);
    assert_eq!(writer.len(), size_of::<Particle>());

    let bytes = writer.into_vec();
    let mut reader = ByteReader::new(&bytes);
    let restored = (deserializers.plain)(&mut reader).unwrap();
    assert_eq!(restored, original);
    assert_eq!(reader.remaining(), 0);
}

#[test]
fn size_prefixed_stream_reads_back_in_order() {
    let serializers = cached_serializers::<Particle>();
    let deserializers = cached_deserializers::<Particle>();

    let first = Particle { x: 1.0, y: 2.0, lifetime: 3 };
    let second = Particle { x: -4.0, y: 5.5, lifetime: 6 };

    // Two distinct records back-to-back in one self-describing stream.
    let mut writer = ByteWriter::new();
    (serializers.size_prefixed)(&first, &mut writer);
    (serializers.size_prefixed)(&second, &mut writer);
    assert_eq!(writer.len(), 2 * (size_of::<i32>() + size_of::<Particle>()));

    let bytes = writer.into_vec();
    let mut reader = ByteReader::new(&bytes);
    assert_eq!((deserializers.size_prefixed)(&mut reader).unwrap(), first);
    assert_eq!((deserializers.size_prefixed)(&mut reader).unwrap(), second);
    assert_eq!(reader.remaining(), 0);
}

#[test]
fn mixed_type_stream_roundtrips() {
    let particle_ser = cached_serializers::<Particle>();
    let tag_ser = cached_serializers::<Tag>();
    let particle_de = cached_deserializers::<Particle>();
    let tag_de = cached_deserializers::<Tag>();

    let particle = Particle { x: 9.0, y: 8.0, lifetime: 7 };
    let tag = Tag { value: 0xDEAD_BEEF };

    let mut writer = ByteWriter::new();
    (particle_ser.plain)(&particle, &mut writer);
    (tag_ser.plain)(&tag, &mut writer);

    let bytes = writer.into_vec();
    let mut reader = ByteReader::new(&bytes);
    assert_eq!((particle_de.plain)(&mut reader).unwrap(), particle);
    assert_eq!((tag_de.plain)(&mut reader).unwrap(), tag);
}

#[test]
fn plain_deserializer_fails_on_short_source() {
    let deserializers = cached_deserializers::<Particle>();

    let bytes = vec![0u8; size_of::<Particle>() - 1];
    let mut reader = ByteReader::new(&bytes);

    assert_eq!(
        (deserializers.plain)(&mut reader),
        Err(StoreError::CorruptData {
            reason: "source ended early",
            expected: size_of::<Particle>(),
            found: size_of::<Particle>() - 1,
        })
    );
}

#[test]
fn size_prefix_mismatch_is_corrupt_data() {
    let deserializers = cached_deserializers::<Particle>();

    // Declared size disagrees with the component's byte size.
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&(size_of::<Particle>() as i32 - 4).to_ne_bytes());
    bytes.extend_from_slice(&vec![0u8; size_of::<Particle>()]);

    let mut reader = ByteReader::new(&bytes);
    assert!(matches!(
        (deserializers.size_prefixed)(&mut reader),
        Err(StoreError::CorruptData { reason: "size prefix mismatch", .. })
    ));

    // A negative declared size is rejected the same way.
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&(-1i32).to_ne_bytes());
    let mut reader = ByteReader::new(&bytes);
    assert!(matches!(
        (deserializers.size_prefixed)(&mut reader),
        Err(StoreError::CorruptData { .. })
    ));
}

#[test]
fn validated_serializer_honors_writer_limit() {
    let serializers = cached_serializers::<Particle>();
    let value = Particle { x: 0.0, y: 0.0, lifetime: 0 };

    let mut writer = ByteWriter::with_limit(size_of::<Particle>());
    (serializers.validated)(&value, &mut writer).unwrap();

    // A second record would exceed the limit.
    assert!(matches!(
        (serializers.validated)(&value, &mut writer),
        Err(StoreError::InvalidHandle(_))
    ));
    assert_eq!(writer.len(), size_of::<Particle>());
}

#[test]
fn validated_deserializer_rejects_exhausted_reader() {
    let deserializers = cached_deserializers::<Particle>();

    let mut reader = ByteReader::new(&[]);
    assert!(matches!(
        (deserializers.validated)(&mut reader),
        Err(StoreError::InvalidHandle(_))
    ));
}
