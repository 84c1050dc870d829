//! Event schemas for the two trace logs.
//!
//! Each log line is a [`TraceLine`]: the event's tag and payload followed by the
//! wall-clock `timestamp` and the `session_id` it belongs to.

use serde::Serialize;

use crate::clock::Timestamp;
use crate::config::DetailLevel;
use crate::records::{SamplingState, StepMetrics, TensorSnapshot, TokenRecord};
use crate::resources::{ComponentFlow, ComputeResource, KvCacheResource, MemoryResource, MlpResource};
use crate::serialize::{fixed, layer_index};
use crate::tensor::ModelMetadata;

/// Events written by the token/step tracker.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TokenEvent {
    SessionStart {
        prompt: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        model_info: Option<ModelMetadata>,
        detail_level: DetailLevel,
    },
    SessionEnd {
        duration_ms: u64,
        total_steps: u32,
        input_token_count: usize,
        output_token_count: usize,
    },
    StepBegin {
        step_id: u32,
        step_name: String,
        #[serde(serialize_with = "layer_index")]
        layer_id: Option<u32>,
    },
    StepEnd {
        metrics: StepMetrics,
    },
    InputTokens {
        n_tokens: usize,
        tokens: Vec<TokenRecord>,
    },
    OutputToken {
        token: TokenRecord,
    },
    TensorMetadata {
        role: String,
        step_name: String,
        #[serde(serialize_with = "layer_index")]
        layer_id: Option<u32>,
        metadata: TensorSnapshot,
    },
    SamplingState {
        sampling: SamplingState,
    },
    KvCacheUpdate {
        layer_id: u32,
        seq_id: i32,
        pos_start: i32,
        pos_end: i32,
        operation: String,
    },
    PerformanceMetric {
        metric_name: String,
        #[serde(serialize_with = "fixed")]
        value: f64,
        unit: String,
    },
}

/// Events written by the resource tracker.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ResourceEvent {
    ResourceSessionStart {
        detail_level: DetailLevel,
        device_id: String,
    },
    ResourceSessionEnd,
    ResourceTrackingBegin,
    ResourceSessionSummary {
        #[serde(serialize_with = "fixed")]
        total_memory_mb: f64,
        #[serde(serialize_with = "fixed")]
        total_compute_gflops: f64,
        component_flows: usize,
        memory_resources: usize,
        compute_resources: usize,
        kv_cache_layers: usize,
    },
    LayerBegin {
        layer_id: u32,
    },
    LayerEnd {
        layer_id: u32,
        duration_us: u64,
        #[serde(serialize_with = "fixed")]
        layer_memory_mb: f64,
        #[serde(serialize_with = "fixed")]
        layer_compute_gflops: f64,
        memory_operations: usize,
        compute_operations: usize,
    },
    ComponentBegin {
        component_type: String,
        #[serde(serialize_with = "layer_index")]
        layer_id: Option<u32>,
    },
    ComponentEnd {
        component_type: String,
        #[serde(serialize_with = "layer_index")]
        layer_id: Option<u32>,
        duration_us: u64,
    },
    MemoryAllocation(MemoryResource),
    MemoryDeallocation {
        resource_id: String,
        component_type: String,
        #[serde(serialize_with = "layer_index")]
        layer_id: Option<u32>,
        freed_bytes: usize,
        lifetime_us: u64,
    },
    ComputeExecution(ComputeResource),
    ComponentHandoff(ComponentFlow),
    KvCacheOperation(KvCacheResource),
    MlpOperation(MlpResource),
}

/// One log line: an event stamped with time and session.
#[derive(Debug, Serialize)]
pub struct TraceLine<'a, E> {
    #[serde(flatten)]
    pub event: &'a E,
    pub timestamp: Timestamp,
    pub session_id: &'a str,
}

impl<'a, E: Serialize> TraceLine<'a, E> {
    #[must_use]
    pub fn new(event: &'a E, session_id: &'a str) -> Self {
        Self {
            event,
            timestamp: Timestamp::now(),
            session_id,
        }
    }
}
