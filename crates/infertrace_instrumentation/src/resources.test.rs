#![cfg(test)]

use super::*;

fn id(layer: Option<u32>) -> ResourceId {
    ResourceId {
        device_id: "gpu_0".into(),
        kind: ResourceKind::Compute,
        layer,
        component: "attention".into(),
        timestamp_us: 1_700_000_000_000_123,
    }
}

#[test]
fn resource_id_renders_key() {
    assert_eq!(id(Some(3)).to_string(), "gpu_0_compute_layer3_attention_1700000000000123");
    assert_eq!(id(None).to_string(), "gpu_0_compute_layer-1_attention_1700000000000123");
    assert_eq!(
        serde_json::to_string(&id(Some(0))).expect("id serialises"),
        "\"gpu_0_compute_layer0_attention_1700000000000123\""
    );
}

#[test]
fn memory_class_follows_component_name() {
    assert_eq!(MemoryClass::classify("attn_weights"), MemoryClass::Vram);
    assert_eq!(MemoryClass::classify("QKV_proj"), MemoryClass::Vram);
    assert_eq!(MemoryClass::classify("mlp"), MemoryClass::Vram);
    assert_eq!(MemoryClass::classify("kv_cache"), MemoryClass::Cache);
    assert_eq!(MemoryClass::classify("scratch"), MemoryClass::Activation);
}

#[test]
fn mlp_projections_parse_common_spellings() {
    assert_eq!(MlpProjection::parse("gate_proj"), MlpProjection::Gate);
    assert_eq!(MlpProjection::parse("ffn_up"), MlpProjection::Up);
    assert_eq!(MlpProjection::parse("down_proj"), MlpProjection::Down);
    assert_eq!(MlpProjection::parse("upsample"), MlpProjection::Other);
}

#[test]
fn mlp_peak_memory_counts_activation_buffers() {
    assert_eq!(MlpProjection::Gate.peak_bytes(100, 10), 120);
    assert_eq!(MlpProjection::Up.peak_bytes(100, 10), 120);
    assert_eq!(MlpProjection::Down.peak_bytes(100, 10), 110);
    assert_eq!(MlpProjection::Other.peak_bytes(100, 10), 100);
}

#[test]
fn activation_function_labels() {
    assert_eq!(ActivationFn::for_operation("gate_proj"), ActivationFn::Silu);
    assert_eq!(ActivationFn::for_operation("gelu_tanh"), ActivationFn::Gelu);
    assert_eq!(ActivationFn::for_operation("down_proj"), ActivationFn::Linear);
}
