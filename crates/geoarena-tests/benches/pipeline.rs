use std::io::Cursor;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use geoarena_buffer::GrowthPolicy;
use geoarena_codec::ZstdCodec;
use geoarena_pipeline::{FileFormat, FrameWriter, PipelineConfig, Segregation};
use geoarena_tests::{drain, node_buffer, scripted, small_extract};

fn bench_scripted_extract(c: &mut Criterion) {
    let mut group = c.benchmark_group("scripted_extract");
    for segregation in [Segregation::None, Segregation::ByType] {
        let config = PipelineConfig::default()
            .with_segregation(segregation)
            .with_buffer_capacity(64 * 1024)
            .with_flush_threshold(8 * 1024);
        group.bench_with_input(
            BenchmarkId::new("nodes_2000", format!("{segregation:?}")),
            &config,
            |b, config| {
                b.iter(|| drain(scripted(small_extract(2000), config.clone())));
            },
        );
    }
    group.finish();
}

fn bench_arena_stream(c: &mut Criterion) {
    let mut writer = FrameWriter::new(Vec::new(), Box::new(ZstdCodec::default())).unwrap();
    for _ in 0..32 {
        writer
            .write_buffer(&node_buffer(500, 64 * 1024, GrowthPolicy::AutoGrow))
            .unwrap();
    }
    let bytes = writer.finish().unwrap();

    let mut group = c.benchmark_group("arena_stream");
    for threads in [1, 4] {
        let config = PipelineConfig::default().with_pool_threads(threads);
        group.bench_with_input(BenchmarkId::new("threads", threads), &config, |b, config| {
            b.iter(|| {
                let reader = geoarena_pipeline::Reader::open_format(
                    FileFormat::Arena,
                    Box::new(Cursor::new(bytes.clone())),
                    config.clone(),
                )
                .unwrap();
                drain(reader)
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_scripted_extract, bench_arena_stream);
criterion_main!(benches);
