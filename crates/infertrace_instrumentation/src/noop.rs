//! Trackers that record nothing.
//!
//! Selected when a log cannot be opened or tracing is switched off. They have
//! no log to re-enable, so `enable` leaves them disabled.

use std::path::Path;

use crate::config::DetailLevel;
use crate::records::SamplingState;
use crate::tensor::{ModelMetadata, TensorInfo, TokenId, Vocabulary};
use crate::tracer::{ResourceTrace, TokenTrace};

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTokenTracer;

impl TokenTrace for NoopTokenTracer {
    fn begin_session(&mut self, _prompt: &str, _model: Option<&ModelMetadata>) {}

    fn end_session(&mut self) {}

    fn begin_step(&mut self, _name: &str, _layer: Option<u32>) {}

    fn end_step(&mut self, _notes: &str) {}

    fn log_input_tokens(&mut self, _tokens: &[TokenId], _vocab: Option<&dyn Vocabulary>) {}

    fn log_output_token(&mut self, _token: TokenId, _probability: f64, _vocab: Option<&dyn Vocabulary>) {}

    fn log_tensor_metadata(&mut self, _tensor: &dyn TensorInfo, _operation: &str, _role: &str) {}

    fn log_sampling_state(&mut self, _state: &SamplingState) {}

    fn log_kv_cache_update(&mut self, _layer: u32, _seq_id: i32, _pos_start: i32, _pos_end: i32, _operation: &str) {}

    fn log_performance_metric(&mut self, _name: &str, _value: f64, _unit: &str) {}

    fn enable(&mut self) {}

    fn disable(&mut self) {}

    fn set_level(&mut self, _level: DetailLevel) {}

    fn flush(&mut self) {}

    fn level(&self) -> DetailLevel {
        DetailLevel::Minimal
    }

    fn is_enabled(&self) -> bool {
        false
    }

    fn log_path(&self) -> Option<&Path> {
        None
    }

    fn session_id(&self) -> String {
        String::new()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopResourceTracer;

impl ResourceTrace for NoopResourceTracer {
    fn begin_session(&self, _session_id: &str) {}

    fn end_session(&self) {}

    fn begin_layer(&self, _layer: u32) {}

    fn end_layer(&self, _layer: u32) {}

    fn begin_component(&self, _component: &str) {}

    fn end_component(&self, _component: &str) {}

    fn log_memory_allocation(&self, _tensor: &dyn TensorInfo, _component: &str) -> Option<String> {
        None
    }

    fn log_memory_deallocation(&self, _resource_id: &str) {}

    fn log_compute_operation(
        &self,
        _operation: &str,
        _component: &str,
        _inputs: &[&dyn TensorInfo],
        _output: Option<&dyn TensorInfo>,
    ) {
    }

    fn log_component_handoff(&self, _from: &str, _to: &str) {}

    fn log_kv_cache_operation(&self, _layer: u32, _operation: &str, _total_bytes: u64) {}

    fn log_mlp_operation(&self, _operation: &str, _weights: Option<&dyn TensorInfo>, _activations: Option<&dyn TensorInfo>) {}

    fn enable(&self) {}

    fn disable(&self) {}

    fn set_level(&self, _level: DetailLevel) {}

    fn flush(&self) {}

    fn level(&self) -> DetailLevel {
        DetailLevel::Minimal
    }

    fn is_enabled(&self) -> bool {
        false
    }

    fn log_path(&self) -> Option<&Path> {
        None
    }

    fn session_id(&self) -> String {
        String::new()
    }
}
