#![no_main]

use libfuzzer_sys::fuzz_target;

use enclave_inference_bridge::tensor::shape::resolve;

fuzz_target!(|data: &[u8]| {
    // Arbitrary declared shapes and lengths must resolve or fail, never panic,
    // and a resolved shape must account for every input byte.
    if data.len() < 9 {
        return;
    }
    let element_size = [1usize, 2, 4, 8][(data[0] & 3) as usize];
    let input_len = u32::from_le_bytes([data[1], data[2], data[3], data[4]]) as usize;
    let declared: Vec<i64> = data[5..]
        .chunks_exact(4)
        .take(8)
        .map(|c| i32::from_le_bytes([c[0], c[1], c[2], c[3]]) as i64)
        .collect();

    if let Ok(shape) = resolve(&declared, input_len, element_size) {
        let elements: usize = shape.iter().product();
        assert_eq!(elements * element_size, input_len);
    }
});
