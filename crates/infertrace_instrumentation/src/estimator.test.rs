#![cfg(test)]

use super::*;

#[test]
fn op_names_map_to_kinds() {
    assert_eq!(OpKind::parse("mul_mat"), OpKind::MatMul);
    assert_eq!(OpKind::parse("gemm"), OpKind::MatMul);
    assert_eq!(OpKind::parse("attn_matmul_qk"), OpKind::MatMul);
    assert_eq!(OpKind::parse("soft_max_ext"), OpKind::Softmax);
    assert_eq!(OpKind::parse("ffn_silu"), OpKind::Silu);
    assert_eq!(OpKind::parse("GELU"), OpKind::Gelu);
    assert_eq!(OpKind::parse("rms_norm"), OpKind::Norm);
    assert_eq!(OpKind::parse("kv_cache_write"), OpKind::Cache);
    assert_eq!(OpKind::parse("weight_load"), OpKind::Load);
    assert_eq!(OpKind::parse("add"), OpKind::Add);
    assert_eq!(OpKind::parse("mul"), OpKind::Mul);
    assert_eq!(OpKind::parse("copy"), OpKind::Copy);
    assert_eq!(OpKind::parse("rope"), OpKind::Unknown);
}

#[test]
fn compression_ratio_is_fixed_per_precision() {
    let expected = [
        (Precision::Full, 1.0),
        (Precision::Half, 2.0),
        (Precision::Int8, 4.0),
        (Precision::Int4, 8.0),
        (Precision::Int2, 16.0),
        (Precision::OtherQuantized, 4.0),
    ];
    for (precision, ratio) in expected {
        assert_eq!(compression_ratio(precision), ratio, "{precision:?}");
    }
}

#[test]
fn matmul_gflops_is_exact() {
    let gflops = estimate_gflops(OpKind::MatMul, &[128, 64], Some(&[64, 256]));
    assert_eq!(gflops, 2.0 * 128.0 * 256.0 * 64.0 / 1e9);
}

#[test]
fn matmul_without_second_operand_is_unknown() {
    assert_eq!(estimate_gflops(OpKind::MatMul, &[128, 64], None), 0.0);
    assert_eq!(estimate_gflops(OpKind::MatMul, &[128], Some(&[64, 256])), 0.0);
}

#[test]
fn elementwise_gflops_use_per_element_costs() {
    let shape = [1000, 1000];
    assert_eq!(estimate_gflops(OpKind::Softmax, &shape, None), 3.0e6 / 1e9);
    assert_eq!(estimate_gflops(OpKind::Silu, &shape, None), 5.0e6 / 1e9);
    assert_eq!(estimate_gflops(OpKind::Gelu, &shape, None), 8.0e6 / 1e9);
    assert_eq!(estimate_gflops(OpKind::Norm, &shape, None), 5.0e6 / 1e9);
    assert_eq!(estimate_gflops(OpKind::Add, &shape, None), 1.0e6 / 1e9);
    assert_eq!(estimate_gflops(OpKind::Mul, &shape, None), 1.0e6 / 1e9);
    assert_eq!(estimate_gflops(OpKind::Unknown, &shape, None), 0.0);
    assert_eq!(estimate_gflops(OpKind::Copy, &shape, None), 0.0);
}

#[test]
fn duration_adds_overhead_and_respects_floor() {
    assert_eq!(estimate_duration_us(OpKind::Unknown, 0.0), 35);
    assert_eq!(estimate_duration_us(OpKind::Cache, 0.0), 20);
    let matmul = estimate_duration_us(OpKind::MatMul, 105.0);
    assert!((1049..=1050).contains(&matmul), "{matmul}");
    assert!(estimate_duration_us(OpKind::Cache, -5.0) >= MIN_DURATION_US);
}

#[test]
fn parallelism_steps_are_monotonic() {
    let samples = [
        0usize, 1, 10_000, 10_001, 100_000, 100_001, 1_000_000, 1_000_001, 10_000_000, 10_000_001, usize::MAX,
    ];
    let factors: Vec<u32> = samples.iter().map(|&n| parallelism_factor(n)).collect();
    assert!(factors.windows(2).all(|pair| pair[0] <= pair[1]), "{factors:?}");
    assert_eq!(factors, vec![4, 4, 4, 8, 8, 16, 16, 32, 32, 64, 64]);
}

#[test]
fn bandwidth_scales_with_size_and_precision() {
    const MIB: usize = 1024 * 1024;
    assert_eq!(estimate_bandwidth_gbps(OpKind::MatMul, MIB, Precision::Full), 300.0);
    assert_eq!(estimate_bandwidth_gbps(OpKind::MatMul, 400 * MIB, Precision::Full), 600.0);
    assert_eq!(estimate_bandwidth_gbps(OpKind::Load, 100 * MIB, Precision::Int4), 3200.0);
    assert_eq!(estimate_bandwidth_gbps(OpKind::Cache, 75 * MIB, Precision::Half), 800.0 * 2.0 * 0.75);
}

#[test]
fn utilization_is_capped() {
    assert_eq!(estimate_utilization_percent(OpKind::MatMul, 50_000_000), 95.0);
    assert_eq!(estimate_utilization_percent(OpKind::Unknown, 500_000), 25.0);
    assert_eq!(estimate_utilization_percent(OpKind::Softmax, 0), 0.0);
}

#[test]
fn only_bare_elementwise_names_are_cheap() {
    for op in ["add", "norm", "copy"] {
        assert!(is_cheap_elementwise(op), "{op}");
    }
    for op in ["rms_norm", "layer_norm", "group_norm", "mul", "cpy", "Add"] {
        assert!(!is_cheap_elementwise(op), "{op}");
    }
    assert_eq!(OpKind::parse("rms_norm"), OpKind::Norm);
}
