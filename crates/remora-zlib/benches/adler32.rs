use std::io::Write;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use remora_pool::BufferPool;
use remora_zlib::{adler32, compress, decompress, ZlibConfig, ZlibEncoder};

fn sample(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 31 % 253) as u8).collect()
}

fn checksum(c: &mut Criterion) {
    let mut group = c.benchmark_group("adler32");
    for len in [64 * 1024, 1024 * 1024] {
        let data = sample(len);
        group.throughput(Throughput::Bytes(len as u64));
        group.bench_with_input(BenchmarkId::from_parameter(len), &data, |b, data| {
            b.iter(|| adler32(black_box(data)))
        });
    }
    group.finish();
}

fn framing(c: &mut Criterion) {
    let data = sample(64 * 1024);
    let config = ZlibConfig::default();
    let framed = compress(&data, &config).unwrap();

    let mut group = c.benchmark_group("zlib");
    group.throughput(Throughput::Bytes(data.len() as u64));
    group.bench_function("compress_64k", |b| {
        b.iter(|| compress(black_box(&data), &config).unwrap())
    });
    group.bench_function("decompress_64k", |b| {
        b.iter(|| decompress(black_box(&framed), &config).unwrap())
    });

    let pool = BufferPool::default();
    group.bench_function("compress_64k_pooled_scratch", |b| {
        b.iter(|| {
            let mut out = Vec::with_capacity(data.len());
            let mut encoder =
                ZlibEncoder::with_buffer_pool(&mut out, config.clone(), &pool).unwrap();
            encoder.write_all(black_box(&data)).unwrap();
            encoder.close().unwrap();
            drop(encoder);
            out
        })
    });
    group.finish();
}

criterion_group!(benches, checksum, framing);
criterion_main!(benches);
