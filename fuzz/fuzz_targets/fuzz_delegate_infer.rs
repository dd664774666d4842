#![no_main]

use libfuzzer_sys::fuzz_target;

use enclave_inference_bridge::{
    Bridge, BridgeConfig, DType, DelegateHost, MockEngine, TensorSpec,
};

fuzz_target!(|data: &[u8]| {
    // Arbitrary input bytes and output capacities through the full bridge:
    // the caller buffer is either filled with exactly the result or untouched.
    if data.is_empty() {
        return;
    }
    let capacity = data[0] as usize;
    let input = &data[1..];

    let engine = MockEngine::new(TensorSpec::new("x", DType::F32, vec![-1, 2]), 3);
    let bridge = Bridge::new(DelegateHost::new(engine), BridgeConfig::default());
    let session = bridge.load_model(b"weights").unwrap();

    let mut output = vec![0u8; capacity];
    match bridge.infer(session, input, &mut output) {
        Ok(n) => assert!(n <= capacity),
        Err(_) => assert!(output.iter().all(|&b| b == 0)),
    }
    bridge.terminate(session).unwrap();
});
