//! Memory, compute, cache and data-flow tracing.

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use crate::clock::{Timestamp, generate_session_id};
use crate::config::{DetailLevel, TraceConfig};
use crate::estimator::{
    OpKind, compression_ratio, estimate_bandwidth_gbps, estimate_duration_us, estimate_gflops, estimate_utilization_percent,
    is_cheap_elementwise, parallelism_factor,
};
use crate::event::{ResourceEvent, TraceLine};
use crate::exporters::{EventSink, JsonlSink, SinkError};
use crate::handoff::HandoffTable;
use crate::resources::{
    ActivationFn, ComponentFlow, ComputeResource, KvCacheResource, MemoryClass, MemoryResource, MlpProjection, MlpResource,
    ResourceId, ResourceKind, bytes_to_mib,
};
use crate::serialize::to_line;
use crate::store::ResourceStore;
use crate::tensor::TensorInfo;
use crate::tracer::ResourceTrace;

const SESSION_PREFIX: &str = "resource";

/// Allocations below this size are dropped at [`DetailLevel::Minimal`].
pub const MINIMAL_ALLOCATION_BYTES: usize = 1024 * 1024;

const KV_COMPONENT: &str = "kv_cache";
const KV_SEQ_ID: i32 = 0;
const KV_WINDOW: (i32, i32) = (0, 128);
const KV_HIT_RATIO: f64 = 0.85;

#[derive(Default)]
struct Scope {
    layer: Option<(u32, Timestamp)>,
    component: Option<(String, Timestamp)>,
}

/// Records resource usage for the layers and components the engine walks through.
///
/// Every method takes `&self`; share the tracker behind an `Arc`. Resource ids
/// carry a per-tracker timestamp that strictly increases, so two records never
/// collide on the same key even when created within the same microsecond.
pub struct ResourceTracker {
    sink: Box<dyn EventSink>,
    device_id: String,
    handoffs: HandoffTable,
    level: AtomicU8,
    enabled: AtomicBool,
    session_id: Mutex<String>,
    scope: Mutex<Scope>,
    store: ResourceStore,
    last_id_us: AtomicU64,
}

impl ResourceTracker {
    /// Append to `config.resource_log_path`.
    pub fn open(config: &TraceConfig) -> Result<Self, SinkError> {
        let sink = JsonlSink::open(&config.resource_log_path)?;
        tracing::info!(
            target: "instrument",
            path = %config.resource_log_path.display(),
            level = %config.detail_level,
            device = %config.device_id,
            "resource tracing enabled"
        );
        Ok(Self::with_sink(Box::new(sink), config))
    }

    /// Build a tracker over `sink`; writes `resource_session_start` immediately.
    #[must_use]
    pub fn with_sink(sink: Box<dyn EventSink>, config: &TraceConfig) -> Self {
        let tracker = Self {
            sink,
            device_id: config.device_id.clone(),
            handoffs: config.handoffs.clone(),
            level: AtomicU8::new(config.detail_level as u8),
            enabled: AtomicBool::new(true),
            session_id: Mutex::new(generate_session_id(SESSION_PREFIX)),
            scope: Mutex::new(Scope::default()),
            store: ResourceStore::new(),
            last_id_us: AtomicU64::new(0),
        };
        tracker.emit(&ResourceEvent::ResourceSessionStart {
            detail_level: config.detail_level,
            device_id: tracker.device_id.clone(),
        });
        tracker
    }

    /// Live resource maps backing the rollups.
    #[must_use]
    pub fn store(&self) -> &ResourceStore {
        &self.store
    }

    fn active(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    fn scope(&self) -> MutexGuard<'_, Scope> {
        self.scope.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn current_layer(&self) -> Option<u32> {
        self.scope().layer.map(|(layer, _)| layer)
    }

    fn next_timestamp_us(&self, now: &Timestamp) -> u64 {
        let wall = now.epoch_micros();
        let previous = self
            .last_id_us
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |last| Some(wall.max(last + 1)))
            .unwrap_or(wall);
        wall.max(previous + 1)
    }

    fn resource_id(&self, kind: ResourceKind, layer: Option<u32>, component: &str, now: &Timestamp) -> ResourceId {
        ResourceId {
            device_id: self.device_id.clone(),
            kind,
            layer,
            component: component.to_owned(),
            timestamp_us: self.next_timestamp_us(now),
        }
    }

    fn emit(&self, event: &ResourceEvent) {
        let session_id = self.session_id();
        let line = TraceLine::new(event, &session_id);
        match to_line(&line) {
            Ok(text) => {
                self.sink.write_line(&text);
                if self.level() >= DetailLevel::Verbose {
                    tracing::debug!(target: "instrument", line = %text, "resource trace");
                }
            }
            Err(error) => tracing::error!(target: "instrument", %error, "failed to serialise resource event"),
        }
    }
}

impl ResourceTrace for ResourceTracker {
    fn begin_session(&self, session_id: &str) {
        if !self.active() {
            return;
        }
        *self.session_id.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = session_id.to_owned();
        tracing::debug!(target: "instrument", session_id, "resource session started");
        self.emit(&ResourceEvent::ResourceTrackingBegin);
    }

    fn end_session(&self) {
        if !self.active() {
            return;
        }
        let rollup = self.store.session_rollup();
        self.emit(&ResourceEvent::ResourceSessionSummary {
            total_memory_mb: bytes_to_mib(rollup.memory_bytes),
            total_compute_gflops: rollup.compute_gflops,
            component_flows: rollup.component_flows,
            memory_resources: rollup.memory_resources,
            compute_resources: rollup.compute_resources,
            kv_cache_layers: rollup.kv_cache_layers,
        });
        self.store.clear();
        self.sink.flush();
    }

    fn begin_layer(&self, layer: u32) {
        if !self.active() {
            return;
        }
        self.scope().layer = Some((layer, Timestamp::now()));
        self.emit(&ResourceEvent::LayerBegin { layer_id: layer });
    }

    fn end_layer(&self, layer: u32) {
        if !self.active() {
            return;
        }
        let started = {
            let mut scope = self.scope();
            let Some((open, started)) = scope.layer else {
                return;
            };
            if open != layer {
                return;
            }
            scope.layer = None;
            started
        };
        let elapsed = Timestamp::now().since(&started);
        let rollup = self.store.layer_rollup(layer);
        self.emit(&ResourceEvent::LayerEnd {
            layer_id: layer,
            duration_us: u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX),
            layer_memory_mb: bytes_to_mib(rollup.memory_bytes),
            layer_compute_gflops: rollup.compute_gflops,
            memory_operations: rollup.memory_operations,
            compute_operations: rollup.compute_operations,
        });
    }

    fn begin_component(&self, component: &str) {
        if !self.active() {
            return;
        }
        let layer = {
            let mut scope = self.scope();
            scope.component = Some((component.to_owned(), Timestamp::now()));
            scope.layer.map(|(layer, _)| layer)
        };
        self.emit(&ResourceEvent::ComponentBegin {
            component_type: component.to_owned(),
            layer_id: layer,
        });
    }

    fn end_component(&self, component: &str) {
        if !self.active() {
            return;
        }
        let (started, layer) = {
            let mut scope = self.scope();
            let started = match &scope.component {
                Some((open, started)) if open == component => *started,
                _ => return,
            };
            scope.component = None;
            (started, scope.layer.map(|(layer, _)| layer))
        };
        let elapsed = Timestamp::now().since(&started);
        self.emit(&ResourceEvent::ComponentEnd {
            component_type: component.to_owned(),
            layer_id: layer,
            duration_us: u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX),
        });
    }

    fn log_memory_allocation(&self, tensor: &dyn TensorInfo, component: &str) -> Option<String> {
        if !self.active() {
            return None;
        }
        let bytes = tensor.byte_size();
        if self.level() == DetailLevel::Minimal && bytes < MINIMAL_ALLOCATION_BYTES {
            return None;
        }

        let now = Timestamp::now();
        let layer = self.current_layer();
        let precision = tensor.dtype().precision();
        let resource = MemoryResource {
            resource_id: self.resource_id(ResourceKind::Memory, layer, component, &now),
            component_type: component.to_owned(),
            layer_id: layer,
            tensor_name: tensor.name().to_owned(),
            allocation_size_bytes: bytes,
            tensor_shape: tensor.shape().to_vec(),
            precision: tensor.dtype(),
            memory_type: MemoryClass::classify(component),
            bandwidth_gbps: estimate_bandwidth_gbps(OpKind::Load, bytes, precision),
            compression_ratio: compression_ratio(precision),
            memory_address: format!("{:#x}", tensor.address()),
            allocated_at: now,
        };
        let key = resource.resource_id.to_string();
        self.store.upsert_memory(resource.clone());
        self.emit(&ResourceEvent::MemoryAllocation(resource));
        Some(key)
    }

    fn log_memory_deallocation(&self, resource_id: &str) {
        if !self.active() {
            return;
        }
        let Some(resource) = self.store.remove_memory(resource_id) else {
            return;
        };
        let lifetime = Timestamp::now().since(&resource.allocated_at);
        self.emit(&ResourceEvent::MemoryDeallocation {
            resource_id: resource_id.to_owned(),
            component_type: resource.component_type,
            layer_id: resource.layer_id,
            freed_bytes: resource.allocation_size_bytes,
            lifetime_us: u64::try_from(lifetime.as_micros()).unwrap_or(u64::MAX),
        });
    }

    fn log_compute_operation(
        &self,
        operation: &str,
        component: &str,
        inputs: &[&dyn TensorInfo],
        output: Option<&dyn TensorInfo>,
    ) {
        if !self.active() {
            return;
        }
        let Some(primary) = inputs.first() else {
            return;
        };
        if is_cheap_elementwise(operation) && self.level() < DetailLevel::Verbose {
            return;
        }
        let kind = OpKind::parse(operation);

        let now = Timestamp::now();
        let layer = self.current_layer();
        let secondary = inputs.get(1).map(|tensor| tensor.shape());
        let gflops = estimate_gflops(kind, primary.shape(), secondary);
        let elements = primary.element_count();
        let resource = ComputeResource {
            resource_id: self.resource_id(ResourceKind::Compute, layer, component, &now),
            operation: operation.to_owned(),
            op_kind: kind,
            component_type: component.to_owned(),
            layer_id: layer,
            input_tensors: inputs.iter().map(|tensor| tensor.name().to_owned()).collect(),
            output_shape: output.map(|tensor| tensor.shape().to_vec()).unwrap_or_default(),
            compute_intensity_gflops: gflops,
            estimated_duration_us: estimate_duration_us(kind, gflops),
            parallelism_factor: parallelism_factor(elements),
            memory_throughput_gbps: estimate_bandwidth_gbps(kind, primary.byte_size(), primary.dtype().precision()),
            sm_utilization_percent: estimate_utilization_percent(kind, elements),
            recorded_at: now,
        };
        self.store.upsert_compute(resource.clone());
        self.emit(&ResourceEvent::ComputeExecution(resource));
    }

    fn log_component_handoff(&self, from: &str, to: &str) {
        if !self.active() {
            return;
        }
        let now = Timestamp::now();
        let layer = self.current_layer();
        let cost = self.handoffs.lookup(from, to);
        let flow = ComponentFlow {
            resource_id: self.resource_id(ResourceKind::Flow, layer, &format!("{from}_to_{to}"), &now),
            from_component: from.to_owned(),
            to_component: to.to_owned(),
            layer_id: layer,
            data_size_bytes: cost.bytes,
            transfer_bandwidth_gbps: cost.bandwidth_gbps,
            memory_pressure: cost.pressure,
            transfer_time: now,
        };
        self.store.push_flow(flow.clone());
        self.emit(&ResourceEvent::ComponentHandoff(flow));
    }

    fn log_kv_cache_operation(&self, layer: u32, operation: &str, total_bytes: u64) {
        if !self.active() {
            return;
        }
        let now = Timestamp::now();
        let key_bytes = total_bytes / 2;
        let resource = KvCacheResource {
            resource_id: self.resource_id(ResourceKind::Cache, Some(layer), KV_COMPONENT, &now),
            layer_id: layer,
            seq_id: KV_SEQ_ID,
            cache_start_pos: KV_WINDOW.0,
            cache_end_pos: KV_WINDOW.1,
            key_cache_size_bytes: key_bytes,
            value_cache_size_bytes: total_bytes - key_bytes,
            cache_hit_ratio: KV_HIT_RATIO,
            cache_operation: operation.to_owned(),
            recorded_at: now,
        };
        self.store.upsert_kv(resource.clone());
        self.emit(&ResourceEvent::KvCacheOperation(resource));
    }

    fn log_mlp_operation(&self, operation: &str, weights: Option<&dyn TensorInfo>, activations: Option<&dyn TensorInfo>) {
        if !self.active() {
            return;
        }
        let Some(weights) = weights else {
            return;
        };
        let now = Timestamp::now();
        let layer = self.current_layer();
        let activation_bytes = activations.map_or(0, |tensor| tensor.byte_size());
        let peak = MlpProjection::parse(operation).peak_bytes(weights.byte_size(), activation_bytes);
        let resource = MlpResource {
            resource_id: self.resource_id(ResourceKind::Mlp, layer, operation, &now),
            mlp_operation: operation.to_owned(),
            layer_id: layer,
            weight_shape: weights.shape().to_vec(),
            activation_shape: activations.map(|tensor| tensor.shape().to_vec()).unwrap_or_default(),
            intermediate_size_bytes: activation_bytes,
            activation_memory_peak_mb: bytes_to_mib(peak),
            activation_function: ActivationFn::for_operation(operation),
            recorded_at: now,
        };
        self.emit(&ResourceEvent::MlpOperation(resource));
    }

    fn enable(&self) {
        self.enabled.store(true, Ordering::Release);
    }

    fn disable(&self) {
        self.enabled.store(false, Ordering::Release);
    }

    fn set_level(&self, level: DetailLevel) {
        let previous = DetailLevel::from_u8(self.level.swap(level as u8, Ordering::AcqRel));
        tracing::debug!(target: "instrument", from = %previous, to = %level, "resource trace level changed");
    }

    fn flush(&self) {
        self.sink.flush();
    }

    fn level(&self) -> DetailLevel {
        DetailLevel::from_u8(self.level.load(Ordering::Acquire))
    }

    fn is_enabled(&self) -> bool {
        self.active()
    }

    fn log_path(&self) -> Option<&Path> {
        self.sink.path()
    }

    fn session_id(&self) -> String {
        self.session_id
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl Drop for ResourceTracker {
    fn drop(&mut self) {
        if self.active() {
            self.emit(&ResourceEvent::ResourceSessionEnd);
        }
        self.sink.flush();
    }
}

#[path = "resource_tracker.test.rs"]
mod tests;
