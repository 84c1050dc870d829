//! Tracker interfaces the engine calls into, and their construction.
//!
//! Hosts hold a `Box<dyn TokenTrace>` and an `Arc<dyn ResourceTrace>`. When a
//! log cannot be opened (or tracing is switched off) the constructors hand back
//! the no-op implementation, so call sites never check for enablement.

use std::path::Path;
use std::sync::Arc;

use crate::config::{DetailLevel, TraceConfig};
use crate::noop::{NoopResourceTracer, NoopTokenTracer};
use crate::records::SamplingState;
use crate::resource_tracker::ResourceTracker;
use crate::tensor::{ModelMetadata, TensorInfo, TokenId, Vocabulary};
use crate::token_tracker::TokenTracker;

/// Session, step and token level tracing. Driven from a single thread.
pub trait TokenTrace: Send {
    /// Start a session; writes `session_start` with the prompt and optional model facts.
    fn begin_session(&mut self, prompt: &str, model: Option<&ModelMetadata>);

    /// Close the session with a `session_end` summary and flush the log.
    fn end_session(&mut self);

    /// Open a step. `layer` is `None` for steps not tied to a layer.
    fn begin_step(&mut self, name: &str, layer: Option<u32>);

    /// Close the open step; does nothing when no step is open.
    fn end_step(&mut self, notes: &str);

    /// Append a batch of prompt tokens. Batches accumulate within a session:
    /// positions continue from the previous batch and `input_token_count`
    /// reports the running total rather than the size of the last batch.
    fn log_input_tokens(&mut self, tokens: &[TokenId], vocab: Option<&dyn Vocabulary>);

    fn log_output_token(&mut self, token: TokenId, probability: f64, vocab: Option<&dyn Vocabulary>);

    fn log_tensor_metadata(&mut self, tensor: &dyn TensorInfo, operation: &str, role: &str);

    fn log_sampling_state(&mut self, state: &SamplingState);

    fn log_kv_cache_update(&mut self, layer: u32, seq_id: i32, pos_start: i32, pos_end: i32, operation: &str);

    fn log_performance_metric(&mut self, name: &str, value: f64, unit: &str);

    fn enable(&mut self);

    fn disable(&mut self);

    fn set_level(&mut self, level: DetailLevel);

    fn flush(&mut self);

    fn level(&self) -> DetailLevel;

    fn is_enabled(&self) -> bool;

    /// File the trace is written to, if any. The destination is fixed for the
    /// tracker's lifetime; writing elsewhere means opening a new tracker.
    fn log_path(&self) -> Option<&Path>;

    fn session_id(&self) -> String;
}

/// Memory, compute and data-flow tracing. Safe to call from several threads at once.
pub trait ResourceTrace: Send + Sync {
    /// Adopt `session_id` (usually the token tracker's) and write `resource_tracking_begin`.
    fn begin_session(&self, session_id: &str);

    /// Write `resource_session_summary` and release the live resource maps.
    fn end_session(&self);

    fn begin_layer(&self, layer: u32);

    /// Close `layer` with a rollup; ignored unless `layer` is the open one.
    fn end_layer(&self, layer: u32);

    fn begin_component(&self, component: &str);

    /// Ignored unless `component` is the open one.
    fn end_component(&self, component: &str);

    /// Record an allocation; returns its resource id when the record was written.
    fn log_memory_allocation(&self, tensor: &dyn TensorInfo, component: &str) -> Option<String>;

    /// Forget a previously logged allocation; unknown ids are ignored.
    fn log_memory_deallocation(&self, resource_id: &str);

    fn log_compute_operation(
        &self,
        operation: &str,
        component: &str,
        inputs: &[&dyn TensorInfo],
        output: Option<&dyn TensorInfo>,
    );

    fn log_component_handoff(&self, from: &str, to: &str);

    fn log_kv_cache_operation(&self, layer: u32, operation: &str, total_bytes: u64);

    fn log_mlp_operation(&self, operation: &str, weights: Option<&dyn TensorInfo>, activations: Option<&dyn TensorInfo>);

    fn enable(&self);

    fn disable(&self);

    fn set_level(&self, level: DetailLevel);

    fn flush(&self);

    fn level(&self) -> DetailLevel;

    fn is_enabled(&self) -> bool;

    /// File the trace is written to, if any. Fixed at construction, like the
    /// token tracker's.
    fn log_path(&self) -> Option<&Path>;

    fn session_id(&self) -> String;
}

/// Open the token tracker described by `config`, or a no-op tracker if that fails.
#[must_use]
pub fn open_token_tracer(config: &TraceConfig) -> Box<dyn TokenTrace> {
    if config.disabled {
        tracing::info!(target: "instrument", "token tracing disabled by configuration");
        return Box::new(NoopTokenTracer);
    }
    match TokenTracker::open(&config.token_log_path, config.detail_level) {
        Ok(tracker) => Box::new(tracker),
        Err(error) => {
            tracing::error!(target: "instrument", %error, "token tracing disabled");
            Box::new(NoopTokenTracer)
        }
    }
}

/// Open the resource tracker described by `config`, or a no-op tracker if that fails.
#[must_use]
pub fn open_resource_tracer(config: &TraceConfig) -> Arc<dyn ResourceTrace> {
    if config.disabled {
        tracing::info!(target: "instrument", "resource tracing disabled by configuration");
        return Arc::new(NoopResourceTracer);
    }
    match ResourceTracker::open(config) {
        Ok(tracker) => Arc::new(tracker),
        Err(error) => {
            tracing::error!(target: "instrument", %error, "resource tracing disabled");
            Arc::new(NoopResourceTracer)
        }
    }
}
