use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use atomweave::hash::{hash_composition, hash_constant};
use atomweave::hilbert::{self, HilbertConfig};
use atomweave::projector::project;
use atomweave::{Seed, Substrate};

fn bench_projection(c: &mut Criterion) {
    let mut group = c.benchmark_group("projection");

    group.bench_function("unicode", |bencher| {
        bencher.iter(|| project(black_box(&Seed::from_char('q'))))
    });

    group.bench_function("integer", |bencher| {
        bencher.iter(|| project(black_box(&Seed::Integer(-123_456_789))))
    });

    group.bench_function("float", |bencher| {
        bencher.iter(|| project(black_box(&Seed::from_f64(3.141592653589793))))
    });

    group.finish();
}

fn bench_hilbert(c: &mut Criterion) {
    let mut group = c.benchmark_group("hilbert");
    let cfg = HilbertConfig::default();
    let point = project(&Seed::from_char('q')).unwrap();
    let index = hilbert::to_index(&point, &cfg).unwrap();

    group.bench_function("to_index", |bencher| {
        bencher.iter(|| hilbert::to_index(black_box(&point), black_box(&cfg)))
    });

    group.bench_function("from_index", |bencher| {
        bencher.iter(|| hilbert::from_index(black_box(index), black_box(&cfg)))
    });

    group.finish();
}

fn bench_hashing(c: &mut Criterion) {
    let mut group = c.benchmark_group("hashing");

    group.bench_function("constant", |bencher| {
        bencher.iter(|| hash_constant(black_box(&Seed::from_char('q'))))
    });

    let children: Vec<_> = "abcdefgh"
        .chars()
        .map(|c| (hash_constant(&Seed::from_char(c)), 1u32))
        .collect();
    group.bench_function("composition_8_children", |bencher| {
        bencher.iter(|| hash_composition(black_box(&children)))
    });

    group.finish();
}

fn bench_ingestion(c: &mut Criterion) {
    let paragraph = "The quick brown fox jumps over the lazy dog. \
                     Pack my box with five dozen liquor jugs. \
                     How vexingly quick daft zebras jump!";

    let sizes = [1usize, 8, 32];

    let mut group = c.benchmark_group("ingestion");
    for size in sizes {
        let text = paragraph.repeat(size);
        group.bench_with_input(BenchmarkId::new("text", size), &text, |bencher, text| {
            bencher.iter(|| {
                let sub = Substrate::new();
                let root = sub.ingest_text(black_box(text)).unwrap();
                black_box(root)
            })
        });
    }

    // Warm-substrate ingestion: everything deduplicates.
    group.bench_function("text_warm", |bencher| {
        let sub = Substrate::new();
        sub.ingest_text(paragraph).unwrap();
        bencher.iter(|| black_box(sub.ingest_text(black_box(paragraph)).unwrap()))
    });

    group.finish();
}

fn bench_reconstruction(c: &mut Criterion) {
    let mut group = c.benchmark_group("reconstruction");
    let sub = Substrate::new();
    let text = "The quick brown fox jumps over the lazy dog. ".repeat(32);
    let root = sub.ingest_text(&text).unwrap();

    group.bench_function("text_32x", |bencher| {
        bencher.iter(|| black_box(sub.reconstruct_text(black_box(root)).unwrap()))
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_projection,
    bench_hilbert,
    bench_hashing,
    bench_ingestion,
    bench_reconstruction
);
criterion_main!(benches);
