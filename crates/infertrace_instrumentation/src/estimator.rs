//! Closed-form cost estimates for tracked operations.
//!
//! None of these numbers are measured. They are deterministic approximations
//! that let a trace show the relative weight of operations: same inputs, same
//! outputs, on every machine.

use serde::Serialize;

use crate::tensor::Precision;

/// Reference GPU throughput used to turn FLOPs into time.
pub const PEAK_TFLOPS: f64 = 150.0;
/// Fraction of [`PEAK_TFLOPS`] a real kernel is assumed to reach.
pub const EFFICIENCY: f64 = 0.7;
/// Floor applied to every duration estimate.
pub const MIN_DURATION_US: u64 = 10;

const SIZE_REFERENCE_BYTES: f64 = 100.0 * 1024.0 * 1024.0;

/// Operation category recognised from an engine operation name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OpKind {
    /// Weight load or fresh allocation.
    Load,
    MatMul,
    Softmax,
    Silu,
    Gelu,
    Norm,
    Cache,
    Add,
    Mul,
    Copy,
    /// Anything else; costs nothing rather than a guess.
    Unknown,
}

impl OpKind {
    /// Classify an operation name by the substrings engines commonly use.
    #[must_use]
    pub fn parse(operation: &str) -> Self {
        let op = operation.to_ascii_lowercase();
        match op.as_str() {
            "matrix_load" | "weight_load" | "allocation" => return OpKind::Load,
            "gemm" => return OpKind::MatMul,
            "add" => return OpKind::Add,
            "mul" => return OpKind::Mul,
            "copy" | "cpy" | "dup" => return OpKind::Copy,
            _ => {}
        }

        if op.contains("mul_mat") || op.contains("matmul") {
            OpKind::MatMul
        } else if op.contains("silu") || op.contains("swiglu") {
            OpKind::Silu
        } else if op.contains("gelu") {
            OpKind::Gelu
        } else if op.contains("cache") {
            OpKind::Cache
        } else if op.contains("softmax") || op.contains("soft_max") {
            OpKind::Softmax
        } else if op.contains("norm") {
            OpKind::Norm
        } else {
            OpKind::Unknown
        }
    }

    const fn base_bandwidth_gbps(self) -> f64 {
        match self {
            OpKind::Load => 400.0,
            OpKind::MatMul => 600.0,
            OpKind::Silu | OpKind::Gelu => 300.0,
            OpKind::Cache => 800.0,
            OpKind::Softmax | OpKind::Norm => 350.0,
            OpKind::Add | OpKind::Mul | OpKind::Copy | OpKind::Unknown => 450.0,
        }
    }

    /// FLOPs per element for element-wise kinds; `None` for kinds priced otherwise.
    const fn flops_per_element(self) -> Option<f64> {
        match self {
            OpKind::Softmax => Some(3.0),
            OpKind::Silu | OpKind::Norm => Some(5.0),
            OpKind::Gelu => Some(8.0),
            OpKind::Add | OpKind::Mul => Some(1.0),
            OpKind::Load | OpKind::MatMul | OpKind::Cache | OpKind::Copy | OpKind::Unknown => None,
        }
    }

    const fn overhead_us(self) -> u64 {
        match self {
            OpKind::MatMul => 50,
            OpKind::Cache => 20,
            OpKind::Softmax | OpKind::Norm => 30,
            OpKind::Silu | OpKind::Gelu => 25,
            OpKind::Load | OpKind::Add | OpKind::Mul | OpKind::Copy | OpKind::Unknown => 35,
        }
    }

    const fn base_utilization_percent(self) -> f64 {
        match self {
            OpKind::MatMul => 85.0,
            OpKind::Softmax | OpKind::Norm => 60.0,
            OpKind::Silu | OpKind::Gelu => 70.0,
            OpKind::Load | OpKind::Cache | OpKind::Add | OpKind::Mul | OpKind::Copy | OpKind::Unknown => 50.0,
        }
    }
}

/// Storage compression relative to f32 for a precision class.
#[must_use]
pub const fn compression_ratio(precision: Precision) -> f64 {
    match precision {
        Precision::Full => 1.0,
        Precision::Half => 2.0,
        Precision::Int8 => 4.0,
        Precision::Int4 => 8.0,
        Precision::Int2 => 16.0,
        Precision::OtherQuantized => 4.0,
    }
}

/// Operations too cheap to log below verbose detail. Matched on the exact
/// name, so named normalizations such as `rms_norm` are still recorded.
#[must_use]
pub fn is_cheap_elementwise(operation: &str) -> bool {
    matches!(operation, "add" | "norm" | "copy")
}

/// Effective bandwidth in GB/s for moving `bytes` of `precision` data through `kind`.
#[must_use]
pub fn estimate_bandwidth_gbps(kind: OpKind, bytes: usize, precision: Precision) -> f64 {
    let size_factor = (bytes as f64 / SIZE_REFERENCE_BYTES).clamp(0.5, 1.0);
    kind.base_bandwidth_gbps() * compression_ratio(precision) * size_factor
}

/// GFLOPs for `kind` given the primary input shape and, for matmul, the secondary one.
///
/// A matmul of `(M, K) x (K, N)` reads `M = a[0]`, `K = a[1]` and `N = b[1]`;
/// a matmul missing either operand's dimensions is unknown and costs zero.
#[must_use]
pub fn estimate_gflops(kind: OpKind, a: &[usize], b: Option<&[usize]>) -> f64 {
    if kind == OpKind::MatMul {
        let (Some(&m), Some(&k), Some(&n)) = (a.first(), a.get(1), b.and_then(|b| b.get(1))) else {
            return 0.0;
        };
        return (2.0 * m as f64 * n as f64 * k as f64) / 1e9;
    }

    match kind.flops_per_element() {
        Some(per_element) => per_element * a.iter().product::<usize>() as f64 / 1e9,
        None => 0.0,
    }
}

/// Duration in microseconds: compute time at [`PEAK_TFLOPS`] x [`EFFICIENCY`] plus a per-kind overhead.
#[must_use]
pub fn estimate_duration_us(kind: OpKind, gflops: f64) -> u64 {
    let compute_us = (gflops.max(0.0) * 1000.0 / (PEAK_TFLOPS * EFFICIENCY)) as u64;
    (compute_us + kind.overhead_us()).max(MIN_DURATION_US)
}

/// Parallelism factor bucketed on element count.
#[must_use]
pub const fn parallelism_factor(elements: usize) -> u32 {
    match elements {
        e if e > 10_000_000 => 64,
        e if e > 1_000_000 => 32,
        e if e > 100_000 => 16,
        e if e > 10_000 => 8,
        _ => 4,
    }
}

/// Estimated compute-unit utilisation: larger tensors fill the device better, capped at 95%.
#[must_use]
pub fn estimate_utilization_percent(kind: OpKind, elements: usize) -> f64 {
    let size_factor = (elements as f64 / 1_000_000.0).min(1.2);
    (kind.base_utilization_percent() * size_factor).min(95.0)
}

#[path = "estimator.test.rs"]
mod tests;
