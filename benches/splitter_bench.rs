// SPDX-License-Identifier: Apache-2.0

use criterion::Criterion;
use criterion::Throughput;
use criterion::{black_box, criterion_group, criterion_main};
use logtrail::tail::RecordSplitter;

fn log_body(records: usize, record_len: usize) -> Vec<u8> {
    let mut body = Vec::with_capacity(records * (record_len + 2));
    for i in 0..records {
        let line = format!("{:08} {}", i, "x".repeat(record_len.saturating_sub(9)));
        body.extend_from_slice(line.as_bytes());
        body.extend_from_slice(b"\r\n");
    }
    body
}

fn splitter_throughput(c: &mut Criterion) {
    let input = [
        ("short", log_body(10_000, 40)),
        ("long", log_body(1_000, 2_000)),
    ];
    let mut group = c.benchmark_group("splitter_throughput");
    for (name, body) in input.iter() {
        group.throughput(Throughput::Bytes(body.len() as u64));
        for chunk_size in [64, 4096] {
            group.bench_with_input(
                format!("drain {} chunk={}", name, chunk_size),
                body,
                |b, body| {
                    b.iter(|| {
                        let mut splitter = RecordSplitter::with_chunk_size(chunk_size);
                        let mut source = &body[..];
                        let count = splitter
                            .drain(&mut source)
                            .filter_map(Result::ok)
                            .count();
                        black_box(count)
                    })
                },
            );
        }
    }
    group.finish();
}

fn splitter_push(c: &mut Criterion) {
    let body = log_body(10_000, 120);
    let mut group = c.benchmark_group("splitter_push");
    group.throughput(Throughput::Bytes(body.len() as u64));
    group.bench_function("push 1 KiB chunks", |b| {
        b.iter(|| {
            let mut splitter = RecordSplitter::new();
            let mut count = 0;
            for chunk in body.chunks(1024) {
                count += splitter.push(black_box(chunk)).count();
            }
            black_box(count)
        })
    });
    group.finish();
}

criterion_group!(benches, splitter_throughput, splitter_push);
criterion_main!(benches);
