use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use geoarena_buffer::GrowthPolicy;
use geoarena_codec::{Codec, ZlibCodec, ZstdCodec, decode_buffer, encode_buffer};
use geoarena_tests::node_buffer;

fn bench_build_nodes(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_nodes");
    for growth in [GrowthPolicy::AutoGrow, GrowthPolicy::Spill] {
        group.bench_function(format!("{growth:?}"), |b| {
            b.iter(|| node_buffer(1000, 4096, growth));
        });
    }
    group.finish();
}

fn bench_iterate(c: &mut Criterion) {
    let buffer = node_buffer(1000, 256 * 1024, GrowthPolicy::Fixed);
    c.bench_function("iterate_entities", |b| {
        b.iter(|| {
            buffer
                .entities()
                .filter_map(Result::ok)
                .filter_map(|e| e.as_object().map(|o| o.tags().len()))
                .sum::<usize>()
        });
    });
}

fn bench_purge(c: &mut Criterion) {
    let template = node_buffer(1000, 256 * 1024, GrowthPolicy::Fixed);
    let offsets: Vec<usize> = template.records().map(|r| r.offset()).collect();
    c.bench_function("purge_every_other", |b| {
        b.iter_batched(
            || {
                let mut buffer = node_buffer(1000, 256 * 1024, GrowthPolicy::Fixed);
                for offset in offsets.iter().step_by(2) {
                    buffer.set_removed(*offset, true).unwrap();
                }
                buffer
            },
            |mut buffer| buffer.purge_removed().unwrap(),
            criterion::BatchSize::SmallInput,
        );
    });
}

fn bench_transport(c: &mut Criterion) {
    let buffer = node_buffer(2000, 512 * 1024, GrowthPolicy::Fixed);
    let mut group = c.benchmark_group("transport");
    #[allow(clippy::cast_possible_truncation)]
    group.throughput(Throughput::Bytes(buffer.committed() as u64));

    let codecs: [(&str, &dyn Codec); 2] = [
        ("zstd", &ZstdCodec::default()),
        ("zlib", &ZlibCodec::default()),
    ];
    for (name, codec) in codecs {
        let frame = encode_buffer(&buffer, codec).unwrap();
        group.bench_with_input(BenchmarkId::new("encode", name), &buffer, |b, buffer| {
            b.iter(|| encode_buffer(buffer, codec).unwrap());
        });
        group.bench_with_input(BenchmarkId::new("decode", name), &frame, |b, frame| {
            b.iter(|| decode_buffer(frame, GrowthPolicy::Fixed).unwrap());
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_build_nodes,
    bench_iterate,
    bench_purge,
    bench_transport
);
criterion_main!(benches);
