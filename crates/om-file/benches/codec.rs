//! Chunk codec throughput on weather-shaped data.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use om_file::codec::{decode_chunk, encode_chunk};
use std::path::PathBuf;

fn smooth_chunk(n_loc: usize, n_time: usize) -> Vec<f32> {
    let mut values = Vec::with_capacity(n_loc * n_time);
    for loc in 0..n_loc {
        for step in 0..n_time {
            let diurnal = (step as f32 * std::f32::consts::TAU / 24.0).sin() * 6.0;
            values.push(12.0 + loc as f32 * 0.1 + diurnal);
        }
    }
    values
}

fn bench_codec(c: &mut Criterion) {
    let n_loc = 6;
    let n_time = 183;
    let values = smooth_chunk(n_loc, n_time);
    let encoded = encode_chunk(&values, n_loc, n_time, 20.0);
    let path = PathBuf::from("bench.om");

    c.bench_function("encode_chunk_6x183", |b| {
        b.iter(|| encode_chunk(black_box(&values), n_loc, n_time, 20.0))
    });

    c.bench_function("decode_chunk_6x183", |b| {
        b.iter(|| decode_chunk(&path, black_box(&encoded), n_loc, n_time, 20.0).unwrap())
    });
}

criterion_group!(benches, bench_codec);
criterion_main!(benches);
