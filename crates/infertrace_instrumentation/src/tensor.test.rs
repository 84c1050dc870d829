#![cfg(test)]

use super::*;

#[test]
fn dtype_tags_parse_case_insensitively() {
    assert_eq!(DType::from_tag("Q4_K"), DType::Q4K);
    assert_eq!(DType::from_tag("f16"), DType::F16);
    assert_eq!(DType::from_tag("iq2_xxs"), DType::Unknown);

    for dtype in [DType::F32, DType::Q8_0, DType::Q2K, DType::Bf16] {
        assert_eq!(DType::from_tag(dtype.as_str()), dtype);
        let json = serde_json::to_string(&dtype).expect("dtype serialises");
        assert_eq!(json, format!("\"{}\"", dtype.as_str()));
    }
}

#[test]
fn quantization_flags() {
    assert!(!DType::F32.is_quantized());
    assert!(!DType::F16.is_quantized());
    assert!(DType::Q4_0.is_quantized());
    assert!(DType::Unknown.is_quantized());
}

#[test]
fn packed_sizes_follow_block_layout() {
    let f32_tensor = TensorMeta::new("w", &[64, 4], DType::F32);
    assert_eq!(f32_tensor.byte_size(), 1024);
    assert_eq!(f32_tensor.element_count(), 256);
    assert_eq!(f32_tensor.measured_compression_ratio(), 1.0);

    let q4 = TensorMeta::new("w", &[64, 4], DType::Q4_0);
    assert_eq!(q4.byte_size(), 8 * 18);
    assert!(q4.measured_compression_ratio() > 7.0);

    let empty = TensorMeta::new("empty", &[0], DType::F16);
    assert_eq!(empty.measured_compression_ratio(), 1.0);
}

#[test]
fn shapes_render_with_x_separators() {
    assert_eq!(format_shape(&[4096, 32]), "[4096x32]");
    assert_eq!(format_shape(&[]), "[]");
}

#[test]
fn integer_tensors_count_as_uncompressed() {
    assert_eq!(DType::I32.precision(), Precision::Full);
    assert_eq!(DType::Unknown.precision(), Precision::OtherQuantized);
}
