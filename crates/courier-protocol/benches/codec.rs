//! Codec benchmarks for courier-protocol.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use courier_protocol::{codec, Message, MessageId, ServerEvent, UserId};

fn sample_event(content_len: usize) -> ServerEvent {
    ServerEvent::MessageNew(Message::new(
        MessageId::new("6f1c2b9e-5a0d-4c3e-9d7a-1b2c3d4e5f60"),
        UserId::parse("65a1f0c2e4b0a1b2c3d4e5f6").unwrap(),
        UserId::parse("65a1f0c2e4b0a1b2c3d4e5f7").unwrap(),
        "x".repeat(content_len),
        1_700_000_000_000,
    ))
}

fn bench_encode(c: &mut Criterion) {
    let event = sample_event(64);

    let mut group = c.benchmark_group("encode");
    group.throughput(Throughput::Bytes(64));
    group.bench_function("json_64B", |b| b.iter(|| codec::encode_json(black_box(&event))));
    group.bench_function("msgpack_64B", |b| {
        b.iter(|| codec::encode_binary(black_box(&event)))
    });
    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let event = sample_event(64);
    let text = codec::encode_json(&event).unwrap();
    let binary = codec::encode_binary(&event).unwrap();

    let mut group = c.benchmark_group("decode");
    group.bench_function("json_64B", |b| {
        b.iter(|| codec::decode_json::<ServerEvent>(black_box(&text)))
    });
    group.bench_function("msgpack_64B", |b| {
        b.iter(|| codec::decode_binary::<ServerEvent>(black_box(&binary)))
    });
    group.finish();
}

fn bench_roundtrip(c: &mut Criterion) {
    let event = sample_event(1024);

    c.bench_function("msgpack_roundtrip_1KB", |b| {
        b.iter(|| {
            let encoded = codec::encode_binary(black_box(&event)).unwrap();
            codec::decode_binary::<ServerEvent>(black_box(&encoded)).unwrap()
        })
    });
}

criterion_group!(benches, bench_encode, bench_decode, bench_roundtrip);
criterion_main!(benches);
