//! Performance benchmarks for the reader wire protocol.
//!
//! The session loop polls up to eight readers every cycle, so command
//! assembly and response parsing sit on the hot path. These benchmarks
//! track the cost of building poll frames and decoding what comes back.
//!
//! Run benchmarks with:
//! ```sh
//! cargo bench --bench frame_bench
//! ```

use bytes::Bytes;
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;
use tagcue_core::constants::{ACK_FRAME, DIRECTION_READER_TO_HOST};
use tagcue_protocol::{
    Command, build_command_frame, build_frame, is_ack, parse_frame, parse_passive_target,
    parse_response,
};

/// Response frame reporting a four-byte UID, as a classic tag produces.
fn short_uid_response() -> Bytes {
    build_frame(&[
        DIRECTION_READER_TO_HOST,
        0x4B,
        0x01,
        0x01,
        0x00,
        0x04,
        0x08,
        0x04,
        0x33,
        0xC2,
        0x9C,
        0x92,
    ])
}

/// Response frame reporting a seven-byte UID, as an NTAG produces.
fn long_uid_response() -> Bytes {
    build_frame(&[
        DIRECTION_READER_TO_HOST,
        0x4B,
        0x01,
        0x01,
        0x00,
        0x44,
        0x00,
        0x07,
        0x04,
        0xA2,
        0x24,
        0xB2,
        0xC3,
        0x5E,
        0x80,
    ])
}

/// Benchmark building the poll command frame.
fn bench_build_poll(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_poll");
    group.throughput(Throughput::Elements(1));

    group.bench_function("build_poll_frame", |b| {
        b.iter(|| {
            let frame = build_command_frame(
                black_box(Command::InListPassiveTarget),
                Command::InListPassiveTarget.default_params(),
            );
            black_box(frame);
        });
    });

    group.finish();
}

/// Benchmark frame assembly for each command in the set.
fn bench_build_commands(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_commands");
    group.throughput(Throughput::Elements(1));

    for command in [
        Command::GetFirmwareVersion,
        Command::SamConfiguration,
        Command::InListPassiveTarget,
    ] {
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{command:?}")),
            &command,
            |b, &cmd| {
                b.iter(|| {
                    let frame = build_command_frame(black_box(cmd), cmd.default_params());
                    black_box(frame);
                });
            },
        );
    }

    group.finish();
}

/// Benchmark parsing a target listing frame for both UID lengths.
fn bench_parse_target_frame(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_target_frame");
    group.throughput(Throughput::Elements(1));

    for (label, frame) in [("uid_4", short_uid_response()), ("uid_7", long_uid_response())] {
        group.bench_with_input(BenchmarkId::from_parameter(label), &frame, |b, frame| {
            b.iter(|| {
                let body = parse_frame(black_box(frame)).unwrap();
                black_box(body);
            });
        });
    }

    group.finish();
}

/// Benchmark the full decode path a successful poll takes: response
/// validation followed by target extraction.
fn bench_poll_decode_path(c: &mut Criterion) {
    let mut group = c.benchmark_group("poll_decode_path");
    group.throughput(Throughput::Elements(1));

    let frame = long_uid_response();

    group.bench_function("parse_response_and_target", |b| {
        b.iter(|| {
            let payload =
                parse_response(black_box(&frame), Command::InListPassiveTarget).unwrap();
            let target = parse_passive_target(&payload).unwrap();
            black_box(target);
        });
    });

    group.finish();
}

/// Benchmark the ACK check that runs after every command write.
fn bench_ack_check(c: &mut Criterion) {
    let mut group = c.benchmark_group("ack_check");
    group.throughput(Throughput::Elements(1));

    group.bench_function("is_ack", |b| {
        b.iter(|| black_box(is_ack(black_box(&ACK_FRAME))));
    });

    group.finish();
}

/// Benchmark parsing with the zero padding fixed-length bus reads carry
/// in front of the start code.
fn bench_parse_with_padding(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_with_padding");
    group.throughput(Throughput::Elements(1));

    let frame = short_uid_response();

    for pad in [0usize, 8, 24] {
        let mut padded = vec![0x00; pad];
        padded.extend_from_slice(&frame);

        group.bench_with_input(
            BenchmarkId::from_parameter(format!("pad_{pad}")),
            &padded,
            |b, raw| {
                b.iter(|| {
                    let body = parse_frame(black_box(raw)).unwrap();
                    black_box(body);
                });
            },
        );
    }

    group.finish();
}

/// Benchmark decoding a full mux sweep: one response per channel.
fn bench_sweep_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("sweep_decode");
    group.throughput(Throughput::Elements(8));

    let frames: Vec<Bytes> = (0..8)
        .map(|i| {
            if i % 2 == 0 {
                short_uid_response()
            } else {
                long_uid_response()
            }
        })
        .collect();

    group.bench_function("decode_8_responses", |b| {
        b.iter(|| {
            for frame in &frames {
                let payload =
                    parse_response(black_box(frame), Command::InListPassiveTarget).unwrap();
                let target = parse_passive_target(&payload).unwrap();
                black_box(target);
            }
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_build_poll,
    bench_build_commands,
    bench_parse_target_frame,
    bench_poll_decode_path,
    bench_ack_check,
    bench_parse_with_padding,
    bench_sweep_decode,
);

criterion_main!(benches);
