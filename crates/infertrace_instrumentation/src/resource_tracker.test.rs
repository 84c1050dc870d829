#![cfg(test)]

use std::sync::mpsc::{self, Receiver};

use serde_json::Value;

use super::*;
use crate::exporters::ChannelSink;
use crate::handoff::{HandoffCost, MemoryPressure};
use crate::tensor::{DType, TensorMeta};

fn tracker_with(config: &TraceConfig) -> (ResourceTracker, Receiver<String>) {
    let (sender, receiver) = mpsc::channel();
    (ResourceTracker::with_sink(Box::new(ChannelSink::new(sender)), config), receiver)
}

fn tracker(level: DetailLevel) -> (ResourceTracker, Receiver<String>) {
    let config = TraceConfig {
        detail_level: level,
        ..TraceConfig::default()
    };
    let (tracker, receiver) = tracker_with(&config);
    // Skip the construction marker.
    let _ = receiver.try_recv();
    (tracker, receiver)
}

fn drain(receiver: &Receiver<String>) -> Vec<Value> {
    receiver
        .try_iter()
        .map(|line| serde_json::from_str(&line).expect("every line is valid JSON"))
        .collect()
}

fn names(events: &[Value]) -> Vec<&str> {
    events.iter().map(|e| e["event"].as_str().expect("event tag")).collect()
}

const KIB: usize = 1024;
const MIB: usize = 1024 * 1024;

#[test]
fn construction_and_drop_bracket_the_log() {
    let config = TraceConfig {
        detail_level: DetailLevel::Verbose,
        device_id: "gpu_7".into(),
        ..TraceConfig::default()
    };
    let (tracker, receiver) = tracker_with(&config);
    tracker.begin_session("sess_shared");
    drop(tracker);

    let events = drain(&receiver);
    assert_eq!(names(&events), vec!["resource_session_start", "resource_tracking_begin", "resource_session_end"]);
    assert_eq!(events[0]["detail_level"], "verbose");
    assert_eq!(events[0]["device_id"], "gpu_7");
    assert_eq!(events[1]["session_id"], "sess_shared");
    assert_eq!(events[2]["session_id"], "sess_shared");
}

#[test]
fn mismatched_end_layer_is_ignored() {
    let (tracker, receiver) = tracker(DetailLevel::Detailed);
    tracker.begin_layer(2);
    tracker.end_layer(5);
    tracker.end_layer(2);
    tracker.end_layer(2);

    let events = drain(&receiver);
    assert_eq!(names(&events), vec!["layer_begin", "layer_end"]);
    assert_eq!(events[1]["layer_id"], 2);
}

#[test]
fn mismatched_end_component_is_ignored() {
    let (tracker, receiver) = tracker(DetailLevel::Detailed);
    tracker.begin_layer(0);
    tracker.begin_component("attention");
    tracker.end_component("mlp");
    tracker.end_component("attention");

    let events = drain(&receiver);
    assert_eq!(names(&events), vec!["layer_begin", "component_begin", "component_end"]);
    assert_eq!(events[2]["component_type"], "attention");
    assert_eq!(events[2]["layer_id"], 0);
    assert!(events[2]["duration_us"].is_u64());
}

#[test]
fn small_allocations_need_detailed_level() {
    let tensor = TensorMeta::new("scratch", &[128, 1024], DType::F32);
    assert_eq!(tensor.byte_size, 512 * KIB);

    let (minimal, minimal_rx) = tracker(DetailLevel::Minimal);
    assert!(minimal.log_memory_allocation(&tensor, "activation").is_none());
    assert!(drain(&minimal_rx).is_empty());

    let (detailed, detailed_rx) = tracker(DetailLevel::Detailed);
    detailed.log_memory_allocation(&tensor, "activation");
    let events = drain(&detailed_rx);
    assert_eq!(names(&events), vec!["memory_allocation"]);
    assert_eq!(events[0]["allocation_size_bytes"], 512 * KIB);
    assert_eq!(events[0]["memory_type"], "activation");
    assert_eq!(events[0]["layer_id"], -1);
}

#[test]
fn memory_allocation_fields() {
    let (tracker, receiver) = tracker(DetailLevel::Minimal);
    let weights = TensorMeta::new("blk.3.attn_qkv.weight", &[4096, 4096], DType::Q4_0).with_address(0xdead_beef);

    tracker.begin_layer(3);
    tracker.log_memory_allocation(&weights, "attn_qkv");

    let events = drain(&receiver);
    let alloc = &events[1];
    assert_eq!(alloc["memory_type"], "vram");
    assert_eq!(alloc["precision"], "q4_0");
    assert_eq!(alloc["compression_ratio"], 8.0);
    assert_eq!(alloc["memory_address"], "0xdeadbeef");
    assert_eq!(alloc["layer_id"], 3);
    let id = alloc["resource_id"].as_str().expect("id is a string");
    assert!(id.starts_with("gpu_0_memory_layer3_attn_qkv_"), "{id}");
}

#[test]
fn layer_end_rolls_up_its_resources() {
    let (tracker, receiver) = tracker(DetailLevel::Detailed);
    let a = TensorMeta::new("x", &[128, 64], DType::F32);
    let b = TensorMeta::new("w", &[64, 256], DType::F32);
    let two_mib = TensorMeta::new("kv", &[MIB / 2], DType::F32);

    tracker.begin_layer(1);
    tracker.log_memory_allocation(&two_mib, "kv_cache");
    tracker.log_compute_operation("mul_mat", "attention", &[&a, &b], None);
    tracker.end_layer(1);

    tracker.begin_layer(2);
    tracker.log_memory_allocation(&two_mib, "scratch");
    tracker.end_layer(2);

    let events = drain(&receiver);
    let layer_ends: Vec<&Value> = events.iter().filter(|e| e["event"] == "layer_end").collect();
    assert_eq!(layer_ends.len(), 2);
    assert_eq!(layer_ends[0]["layer_memory_mb"], 2.0);
    assert_eq!(layer_ends[0]["memory_operations"], 1);
    assert_eq!(layer_ends[0]["compute_operations"], 1);
    assert_eq!(layer_ends[0]["layer_compute_gflops"], 0.004194);
    assert_eq!(layer_ends[1]["compute_operations"], 0);
}

#[test]
fn matmul_compute_estimates() {
    let (tracker, receiver) = tracker(DetailLevel::Detailed);
    let a = TensorMeta::new("x", &[128, 64], DType::F32);
    let b = TensorMeta::new("w", &[64, 256], DType::F32);
    let out = TensorMeta::new("y", &[128, 256], DType::F32);

    tracker.log_compute_operation("mul_mat", "attention", &[&a, &b], Some(&out));

    let events = drain(&receiver);
    let op = &events[0];
    assert_eq!(op["event"], "compute_execution");
    assert_eq!(op["op_kind"], "mat_mul");
    assert_eq!(op["input_tensors"], serde_json::json!(["x", "w"]));
    assert_eq!(op["output_shape"], serde_json::json!([128, 256]));
    assert_eq!(op["parallelism_factor"], 4);
    let stored = tracker.store().session_rollup();
    assert_eq!(stored.compute_gflops, 2.0 * 128.0 * 256.0 * 64.0 / 1e9);
}

#[test]
fn cheap_operations_need_verbose_level() {
    let (tracker, receiver) = tracker(DetailLevel::Detailed);
    let x = TensorMeta::new("x", &[4096], DType::F32);

    for op in ["add", "norm", "copy"] {
        tracker.log_compute_operation(op, "residual", &[&x], None);
    }
    tracker.log_compute_operation("mul_mat", "attention", &[], None);
    assert!(drain(&receiver).is_empty());

    tracker.set_level(DetailLevel::Verbose);
    tracker.log_compute_operation("add", "residual", &[&x], None);
    assert_eq!(names(&drain(&receiver)), vec!["compute_execution"]);
}

#[test]
fn named_normalizations_are_recorded_at_detailed_level() {
    let (tracker, receiver) = tracker(DetailLevel::Detailed);
    let x = TensorMeta::new("x", &[4096, 8], DType::F32);

    for op in ["rms_norm", "layer_norm", "norm", "soft_max", "scale"] {
        tracker.log_compute_operation(op, "attention", &[&x], Some(&x));
    }

    let events = drain(&receiver);
    let ops: Vec<&str> = events.iter().filter_map(|e| e["operation"].as_str()).collect();
    assert_eq!(ops, vec!["rms_norm", "layer_norm", "soft_max", "scale"]);
    assert_eq!(events[0]["op_kind"], "norm");
    assert!(events[0]["compute_intensity_gflops"].as_f64().is_some_and(|g| g > 0.0));
}

#[test]
fn kv_cache_records_overwrite_per_layer() {
    let (tracker, receiver) = tracker(DetailLevel::Detailed);
    tracker.log_kv_cache_operation(4, "store", 1001);
    tracker.log_kv_cache_operation(4, "update", 2000);

    let events = drain(&receiver);
    assert_eq!(events[0]["key_cache_size_bytes"], 500);
    assert_eq!(events[0]["value_cache_size_bytes"], 501);
    assert_eq!(events[1]["cache_hit_ratio"], 0.85);
    assert_eq!(events[1]["cache_end_pos"], 128);
    assert_ne!(events[0]["resource_id"], events[1]["resource_id"]);

    let latest = tracker.store().kv_cache(4).expect("layer 4 cached");
    assert_eq!(latest.cache_operation, "update");
    assert_eq!(tracker.store().session_rollup().kv_cache_layers, 1);
}

#[test]
fn mlp_peak_memory_and_activation() {
    let (tracker, receiver) = tracker(DetailLevel::Detailed);
    let weights = TensorMeta::new("ffn_gate", &[MIB / 4], DType::F32);
    let acts = TensorMeta::new("ffn_act", &[MIB / 8], DType::F32);

    tracker.log_mlp_operation("gate_proj", Some(&weights), Some(&acts));
    tracker.log_mlp_operation("down_proj", Some(&weights), Some(&acts));
    tracker.log_mlp_operation("gelu", Some(&weights), None);
    tracker.log_mlp_operation("up_proj", None, Some(&acts));

    let events = drain(&receiver);
    assert_eq!(events.len(), 3);
    assert_eq!(events[0]["activation_memory_peak_mb"], 2.0);
    assert_eq!(events[0]["activation_function"], "silu");
    assert_eq!(events[1]["activation_memory_peak_mb"], 1.5);
    assert_eq!(events[1]["activation_function"], "linear");
    assert_eq!(events[2]["activation_memory_peak_mb"], 1.0);
    assert_eq!(events[2]["activation_function"], "gelu");
}

#[test]
fn handoffs_use_table_with_fallback() {
    let (tracker, receiver) = tracker(DetailLevel::Detailed);
    tracker.log_component_handoff("attention", "mlp");
    tracker.log_component_handoff("mlp", "attention");
    tracker.log_component_handoff("input", "attention");
    tracker.log_component_handoff("mlp", "output");

    let events = drain(&receiver);
    let got: Vec<(u64, f64, &str)> = events
        .iter()
        .map(|e| {
            (
                e["data_size_bytes"].as_u64().expect("bytes"),
                e["transfer_bandwidth_gbps"].as_f64().expect("bandwidth"),
                e["memory_pressure"].as_str().expect("pressure"),
            )
        })
        .collect();
    assert_eq!(
        got,
        vec![(16384, 500.0, "medium"), (16384, 500.0, "low"), (8192, 400.0, "low"), (4096, 300.0, "low")]
    );
    assert_eq!(tracker.store().session_rollup().component_flows, 4);
}

#[test]
fn custom_handoff_profile() {
    let config = TraceConfig {
        handoffs: HandoffTable::default().with_rule(
            "attention",
            "mlp",
            HandoffCost {
                bytes: 8192 * 2,
                bandwidth_gbps: 900.0,
                pressure: MemoryPressure::High,
            },
        ),
        ..TraceConfig::default()
    };
    let (tracker, receiver) = tracker_with(&config);
    let _ = receiver.try_recv();

    tracker.log_component_handoff("attention", "mlp");
    let events = drain(&receiver);
    assert_eq!(events[0]["memory_pressure"], "high");
    assert_eq!(events[0]["transfer_bandwidth_gbps"], 900.0);
}

#[test]
fn deallocation_releases_tracked_memory() {
    let (tracker, receiver) = tracker(DetailLevel::Detailed);
    let tensor = TensorMeta::new("scratch", &[MIB], DType::F16);
    let id = tracker.log_memory_allocation(&tensor, "activation").expect("allocation recorded");
    assert_eq!(drain(&receiver)[0]["resource_id"], id.as_str());

    tracker.log_memory_deallocation("gpu_0_memory_layer-1_unknown_0");
    assert!(drain(&receiver).is_empty());

    tracker.log_memory_deallocation(&id);
    let events = drain(&receiver);
    assert_eq!(names(&events), vec!["memory_deallocation"]);
    assert_eq!(events[0]["freed_bytes"], 2 * MIB);
    assert_eq!(tracker.store().session_rollup().memory_resources, 0);
}

#[test]
fn session_summary_reports_totals_and_clears() {
    let (tracker, receiver) = tracker(DetailLevel::Detailed);
    let tensor = TensorMeta::new("w", &[MIB], DType::F32);
    tracker.log_memory_allocation(&tensor, "weights");
    tracker.log_memory_allocation(&tensor, "weights");
    tracker.log_component_handoff("attention", "mlp");
    tracker.end_session();

    let events = drain(&receiver);
    let summary = events.last().expect("summary");
    assert_eq!(summary["event"], "resource_session_summary");
    assert_eq!(summary["total_memory_mb"], 8.0);
    assert_eq!(summary["memory_resources"], 2);
    assert_eq!(summary["component_flows"], 1);
    assert_eq!(tracker.store().session_rollup().memory_resources, 0);
}

#[test]
fn disabled_tracker_is_silent() {
    let (tracker, receiver) = tracker(DetailLevel::Verbose);
    tracker.disable();
    tracker.begin_layer(0);
    tracker.log_kv_cache_operation(0, "store", 10);
    tracker.end_session();
    drop(tracker);
    assert!(drain(&receiver).is_empty());
}
