//! Criterion benchmarks for the control-protocol codec.
//!
//! The hot input path never touches the codec, but the administrative side
//! re-encodes full rule snapshots on every get/set, so keep an eye on the
//! per-rule cost here.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use hidgate_core::packet::{predicate, KeyboardPacket};
use hidgate_core::protocol::codec::{
    decode_filter_request, decode_packets, encode_filter_request, encode_packets,
};
use hidgate_core::rules::{FilterConfig, FilterRule};

fn filter_request_round_trip(c: &mut Criterion) {
    let rules: Vec<FilterRule> = (0..64)
        .map(|i| FilterRule {
            flag_predicates: predicate::KEY_DOWN,
            scan_code: i,
        })
        .collect();
    let config = FilterConfig::Rules(rules);
    let encoded = encode_filter_request(&config);

    c.bench_function("encode_filter_request_64_rules", |b| {
        b.iter(|| encode_filter_request(black_box(&config)))
    });
    c.bench_function("decode_filter_request_64_rules", |b| {
        b.iter(|| decode_filter_request(black_box(&encoded)).unwrap())
    });
}

fn packet_batch_round_trip(c: &mut Criterion) {
    let batch: Vec<KeyboardPacket> = (0..32)
        .map(|i| KeyboardPacket::key_down(0, i))
        .collect();
    let encoded = encode_packets(&batch);

    c.bench_function("encode_packets_32", |b| {
        b.iter(|| encode_packets(black_box(&batch)))
    });
    c.bench_function("decode_packets_32", |b| {
        b.iter(|| decode_packets::<KeyboardPacket>(black_box(&encoded)).unwrap())
    });
}

criterion_group!(benches, filter_request_round_trip, packet_batch_round_trip);
criterion_main!(benches);
