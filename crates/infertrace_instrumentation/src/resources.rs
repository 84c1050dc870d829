//! Resource-side records and their identifiers.

use std::fmt;

use serde::{Serialize, Serializer};

use crate::clock::Timestamp;
use crate::estimator::OpKind;
use crate::handoff::MemoryPressure;
use crate::serialize::{fixed, layer_index};
use crate::tensor::DType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Memory,
    Compute,
    Cache,
    Flow,
    Mlp,
}

impl ResourceKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Memory => "memory",
            ResourceKind::Compute => "compute",
            ResourceKind::Cache => "cache",
            ResourceKind::Flow => "flow",
            ResourceKind::Mlp => "mlp",
        }
    }
}

/// Identity of one tracked resource.
///
/// Renders as `{device}_{kind}_layer{layer}_{component}_{timestamp_us}`, with
/// `-1` standing in for "no layer". That string is the key of the live maps and
/// the value written to the log.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceId {
    pub device_id: String,
    pub kind: ResourceKind,
    pub layer: Option<u32>,
    pub component: String,
    pub timestamp_us: u64,
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let layer = self.layer.map_or(-1, i64::from);
        write!(
            f,
            "{}_{}_layer{}_{}_{}",
            self.device_id,
            self.kind.as_str(),
            layer,
            self.component,
            self.timestamp_us
        )
    }
}

impl Serialize for ResourceId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Where an allocation lives, judged from the owning component's name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryClass {
    Vram,
    Cache,
    Activation,
}

impl MemoryClass {
    #[must_use]
    pub fn classify(component: &str) -> Self {
        let component = component.to_ascii_lowercase();
        if ["weight", "qkv", "mlp"].iter().any(|tag| component.contains(tag)) {
            MemoryClass::Vram
        } else if component.contains("cache") {
            MemoryClass::Cache
        } else {
            MemoryClass::Activation
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MemoryResource {
    pub resource_id: ResourceId,
    pub component_type: String,
    #[serde(serialize_with = "layer_index")]
    pub layer_id: Option<u32>,
    pub tensor_name: String,
    pub allocation_size_bytes: usize,
    pub tensor_shape: Vec<usize>,
    pub precision: DType,
    pub memory_type: MemoryClass,
    #[serde(serialize_with = "fixed")]
    pub bandwidth_gbps: f64,
    #[serde(serialize_with = "fixed")]
    pub compression_ratio: f64,
    /// Hex rendering of the tensor's data address, for diagnostics only.
    pub memory_address: String,
    #[serde(skip)]
    pub allocated_at: Timestamp,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComputeResource {
    pub resource_id: ResourceId,
    pub operation: String,
    pub op_kind: OpKind,
    pub component_type: String,
    #[serde(serialize_with = "layer_index")]
    pub layer_id: Option<u32>,
    pub input_tensors: Vec<String>,
    pub output_shape: Vec<usize>,
    #[serde(serialize_with = "fixed")]
    pub compute_intensity_gflops: f64,
    pub estimated_duration_us: u64,
    pub parallelism_factor: u32,
    #[serde(serialize_with = "fixed")]
    pub memory_throughput_gbps: f64,
    #[serde(serialize_with = "fixed")]
    pub sm_utilization_percent: f64,
    #[serde(skip)]
    pub recorded_at: Timestamp,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComponentFlow {
    pub resource_id: ResourceId,
    pub from_component: String,
    pub to_component: String,
    #[serde(serialize_with = "layer_index")]
    pub layer_id: Option<u32>,
    pub data_size_bytes: u64,
    #[serde(serialize_with = "fixed")]
    pub transfer_bandwidth_gbps: f64,
    pub memory_pressure: MemoryPressure,
    pub transfer_time: Timestamp,
}

#[derive(Debug, Clone, Serialize)]
pub struct KvCacheResource {
    pub resource_id: ResourceId,
    pub layer_id: u32,
    pub seq_id: i32,
    pub cache_start_pos: i32,
    pub cache_end_pos: i32,
    pub key_cache_size_bytes: u64,
    pub value_cache_size_bytes: u64,
    #[serde(serialize_with = "fixed")]
    pub cache_hit_ratio: f64,
    pub cache_operation: String,
    #[serde(skip)]
    pub recorded_at: Timestamp,
}

/// Role of a feed-forward operation, parsed from names like `gate_proj` or `ffn_down`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MlpProjection {
    Gate,
    Up,
    Down,
    Other,
}

impl MlpProjection {
    #[must_use]
    pub fn parse(operation: &str) -> Self {
        let op = operation.to_ascii_lowercase();
        let core = op.strip_prefix("ffn_").unwrap_or(&op);
        let core = core.strip_suffix("_proj").unwrap_or(core);
        match core {
            "gate" => MlpProjection::Gate,
            "up" => MlpProjection::Up,
            "down" => MlpProjection::Down,
            _ => MlpProjection::Other,
        }
    }

    /// Peak activation memory: gate and up hold the weights plus two activation
    /// buffers, down holds one, anything else only the weights.
    #[must_use]
    pub const fn peak_bytes(self, weight_bytes: usize, activation_bytes: usize) -> usize {
        match self {
            MlpProjection::Gate | MlpProjection::Up => weight_bytes + 2 * activation_bytes,
            MlpProjection::Down => weight_bytes + activation_bytes,
            MlpProjection::Other => weight_bytes,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivationFn {
    Silu,
    Gelu,
    Linear,
}

impl ActivationFn {
    /// Gate projections feed SiLU; names mentioning GELU use it; the rest are linear.
    #[must_use]
    pub fn for_operation(operation: &str) -> Self {
        if MlpProjection::parse(operation) == MlpProjection::Gate {
            ActivationFn::Silu
        } else if operation.to_ascii_lowercase().contains("gelu") {
            ActivationFn::Gelu
        } else {
            ActivationFn::Linear
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MlpResource {
    pub resource_id: ResourceId,
    pub mlp_operation: String,
    #[serde(serialize_with = "layer_index")]
    pub layer_id: Option<u32>,
    pub weight_shape: Vec<usize>,
    pub activation_shape: Vec<usize>,
    pub intermediate_size_bytes: usize,
    #[serde(serialize_with = "fixed")]
    pub activation_memory_peak_mb: f64,
    pub activation_function: ActivationFn,
    #[serde(skip)]
    pub recorded_at: Timestamp,
}

pub(crate) const BYTES_PER_MIB: f64 = 1024.0 * 1024.0;

#[must_use]
pub(crate) fn bytes_to_mib(bytes: usize) -> f64 {
    bytes as f64 / BYTES_PER_MIB
}

#[path = "resources.test.rs"]
mod tests;
