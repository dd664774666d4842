use criterion::{black_box, criterion_group, criterion_main, Criterion};

use enclave_inference_bridge::tensor::shape::resolve;

fn bench_resolve(c: &mut Criterion) {
    let mut group = c.benchmark_group("shape_resolve");

    // [batch, 128, 768] f32 activations, batch inferred.
    let dynamic = [-1i64, 128, 768];
    let input_len = 4 * 128 * 768 * 4;
    group.bench_function("dynamic_batch_3d", |b| {
        b.iter(|| {
            let shape = resolve(black_box(&dynamic), black_box(input_len), 4).unwrap();
            black_box(shape);
        })
    });

    let fixed = [1i64, 512];
    group.bench_function("fixed_2d", |b| {
        b.iter(|| {
            let shape = resolve(black_box(&fixed), black_box(512 * 8), 8).unwrap();
            black_box(shape);
        })
    });

    group.bench_function("reject_two_dynamic", |b| {
        b.iter(|| {
            let err = resolve(black_box(&[-1, -1, 768]), black_box(input_len), 4).unwrap_err();
            black_box(err);
        })
    });

    group.finish();
}

criterion_group!(benches, bench_resolve);
criterion_main!(benches);
