use criterion::{black_box, criterion_group, criterion_main, Criterion};
use primepi::leaves::{accumulate, LeafContext, LeafSums};
use primepi::partition::{default_segment_size, partition};
use primepi::pi::{pi_lmo, LmoParams};
use primepi::sieve::Tables;

fn bench_pi_lmo_1e10(c: &mut Criterion) {
    let mut group = c.benchmark_group("pi_lmo");
    group.sample_size(10);
    group.bench_function("pi_lmo(10^10)", |b| {
        b.iter(|| pi_lmo(black_box(10i128.pow(10)), rayon::current_num_threads(), None, None));
    });
    group.finish();
}

fn bench_accumulate_single_thread(c: &mut Criterion) {
    let x = 10i128.pow(10);
    let params = LmoParams::new(x, None);
    let tables = Tables::new(params.y);
    let ctx = LeafContext::new(x, params.y, params.c, &tables);
    let limit = ctx.limit();
    let segment_size = default_segment_size(limit);
    c.bench_function("accumulate(10^10, whole line)", |b| {
        b.iter(|| accumulate(black_box(&ctx), 1, limit, segment_size));
    });
}

fn bench_partition_all_threads(c: &mut Criterion) {
    let x = 10i128.pow(10);
    let params = LmoParams::new(x, None);
    let tables = Tables::new(params.y);
    let ctx = LeafContext::new(x, params.y, params.c, &tables);
    let limit = ctx.limit();
    let segment_size = default_segment_size(limit);
    let threads = rayon::current_num_threads();
    c.bench_function("partition(10^10, all threads)", |b| {
        b.iter(|| partition(black_box(&ctx), 1, limit, segment_size, threads));
    });
}

fn bench_checkpoint_save_load(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bench_checkpoint.json");
    let cp = primepi::checkpoint::Checkpoint::s2(
        10i128.pow(18),
        2_000_000,
        123_456_789,
        LeafSums {
            sum: -1_234_567_890_123,
            phi: (0..5_000).collect(),
            mu_sum: (0..5_000).map(|i| i % 7 - 3).collect(),
        },
    );

    c.bench_function("checkpoint_save_load", |b| {
        b.iter(|| {
            primepi::checkpoint::save(black_box(&path), black_box(&cp)).unwrap();
            primepi::checkpoint::load(black_box(&path)).unwrap();
        });
    });
}

criterion_group!(
    benches,
    bench_pi_lmo_1e10,
    bench_accumulate_single_thread,
    bench_partition_all_threads,
    bench_checkpoint_save_load,
);
criterion_main!(benches);
