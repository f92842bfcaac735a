//! Benchmarks for frame and callback encoding

use bytes::Bytes;
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

use fedpro_core::{
    AttributeHandle, AttributeHandleValueMap, FederateHandle, ObjectInstanceHandle, OrderType,
    TransportationTypeHandle,
};
use fedpro_runtime::{Callback, MessageInfo};
use fedpro_time::{Float64Time, TimeFactory};
use fedpro_wire::{Envelope, Frame, Message, OperationTag};

fn call_request(size: usize) -> Message {
    Message::CallRequest(Envelope::new(
        OperationTag::UpdateAttributeValues.to_u16(),
        vec![0x5au8; size],
    ))
}

fn bench_frame_encode(c: &mut Criterion) {
    let sizes = [64, 256, 1024, 4096];
    let mut group = c.benchmark_group("frame_encode");

    for size in sizes {
        let message = call_request(size);
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_function(format!("{}_bytes", size), |b| {
            b.iter(|| Frame::encode(black_box(&message), 42, 0x5e55, 41))
        });
    }

    group.finish();
}

fn bench_frame_decode(c: &mut Criterion) {
    let packet = Frame::encode(&call_request(256), 42, 0x5e55, 41);

    let mut group = c.benchmark_group("frame_decode");
    group.throughput(Throughput::Bytes(packet.len() as u64));
    group.bench_function("256_bytes", |b| {
        b.iter(|| Frame::decode(black_box(&packet)).unwrap())
    });
    group.finish();
}

fn reflection(attributes: u32) -> Callback {
    let mut values = AttributeHandleValueMap::new();
    for n in 0..attributes {
        values.insert(AttributeHandle::from_u32(n), Bytes::from(vec![n as u8; 16]));
    }
    Callback::ReflectAttributeValues {
        object: ObjectInstanceHandle::from_u32(77),
        values,
        tag: Bytes::from_static(b"bench"),
        info: MessageInfo {
            order: OrderType::Timestamp,
            transportation: TransportationTypeHandle::HLA_RELIABLE,
            producer: FederateHandle::from_u32(3),
            time: Some(Float64Time::new(12.5).into()),
        },
    }
}

fn bench_callback_roundtrip(c: &mut Criterion) {
    let callback = reflection(32);
    let envelope = callback.encode();

    c.bench_function("callback_encode_reflect_32", |b| {
        b.iter(|| black_box(&callback).encode())
    });

    c.bench_function("callback_decode_reflect_32", |b| {
        b.iter(|| Callback::decode(black_box(&envelope), Some(TimeFactory::Float64)).unwrap())
    });
}

criterion_group!(
    benches,
    bench_frame_encode,
    bench_frame_decode,
    bench_callback_roundtrip,
);

criterion_main!(benches);
