use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

use enclave_inference_bridge::{
    Bridge, BridgeConfig, DType, DelegateHost, MockEngine, TensorSpec,
};

fn bench_infer(c: &mut Criterion) {
    // 384-wide embedding out of a 128-token input, as in a MiniLM-sized model.
    let engine = MockEngine::new(TensorSpec::new("input_ids", DType::I64, vec![-1]), 384);
    let output_size = engine.output_size();
    let bridge = Bridge::new(DelegateHost::new(engine), BridgeConfig::default());
    let session = bridge.load_model(b"weights").unwrap();
    let input: Vec<u8> = (0..128i64).flat_map(|t| t.to_le_bytes()).collect();

    let mut group = c.benchmark_group("bridge");
    group.throughput(Throughput::Bytes((input.len() + output_size) as u64));

    group.bench_function("infer_128_tokens", |b| {
        let mut output = vec![0u8; output_size];
        b.iter(|| {
            let n = bridge.infer(session, black_box(&input), &mut output).unwrap();
            black_box(n);
        })
    });

    group.bench_function("infer_too_small", |b| {
        let mut output = vec![0u8; 16];
        b.iter(|| {
            let err = bridge.infer(session, black_box(&input), &mut output).unwrap_err();
            black_box(err);
        })
    });

    group.bench_function("load_terminate", |b| {
        b.iter(|| {
            let s = bridge.load_model(black_box(b"weights")).unwrap();
            black_box(bridge.terminate(s).unwrap());
        })
    });

    group.finish();
}

criterion_group!(benches, bench_infer);
criterion_main!(benches);
