//! Live resource maps used for layer and session rollups.

use std::sync::{Mutex, MutexGuard};

use rustc_hash::FxHashMap;

use crate::resources::{ComponentFlow, ComputeResource, KvCacheResource, MemoryResource};

#[derive(Default)]
struct Maps {
    memory: FxHashMap<String, MemoryResource>,
    compute: FxHashMap<String, ComputeResource>,
    kv_cache: FxHashMap<u32, KvCacheResource>,
    flows: Vec<ComponentFlow>,
}

/// Totals over the resources attributed to one layer.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LayerRollup {
    pub memory_bytes: usize,
    pub compute_gflops: f64,
    pub memory_operations: usize,
    pub compute_operations: usize,
}

/// Totals over everything still held by the store.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SessionRollup {
    pub memory_bytes: usize,
    pub compute_gflops: f64,
    pub memory_resources: usize,
    pub compute_resources: usize,
    pub kv_cache_layers: usize,
    pub component_flows: usize,
}

/// Every map sits behind a single lock, so a rollup never observes a half-applied update.
#[derive(Default)]
pub struct ResourceStore {
    inner: Mutex<Maps>,
}

impl ResourceStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn maps(&self) -> MutexGuard<'_, Maps> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn upsert_memory(&self, resource: MemoryResource) {
        self.maps().memory.insert(resource.resource_id.to_string(), resource);
    }

    pub fn remove_memory(&self, resource_id: &str) -> Option<MemoryResource> {
        self.maps().memory.remove(resource_id)
    }

    pub fn upsert_compute(&self, resource: ComputeResource) {
        self.maps().compute.insert(resource.resource_id.to_string(), resource);
    }

    /// Store the latest cache record for its layer, returning the one it replaces.
    pub fn upsert_kv(&self, resource: KvCacheResource) -> Option<KvCacheResource> {
        self.maps().kv_cache.insert(resource.layer_id, resource)
    }

    #[must_use]
    pub fn kv_cache(&self, layer: u32) -> Option<KvCacheResource> {
        self.maps().kv_cache.get(&layer).cloned()
    }

    pub fn push_flow(&self, flow: ComponentFlow) {
        self.maps().flows.push(flow);
    }

    #[must_use]
    pub fn layer_rollup(&self, layer: u32) -> LayerRollup {
        let maps = self.maps();
        let mut rollup = LayerRollup::default();
        for resource in maps.memory.values().filter(|r| r.layer_id == Some(layer)) {
            rollup.memory_bytes += resource.allocation_size_bytes;
            rollup.memory_operations += 1;
        }
        for resource in maps.compute.values().filter(|r| r.layer_id == Some(layer)) {
            rollup.compute_gflops += resource.compute_intensity_gflops;
            rollup.compute_operations += 1;
        }
        rollup
    }

    #[must_use]
    pub fn session_rollup(&self) -> SessionRollup {
        let maps = self.maps();
        SessionRollup {
            memory_bytes: maps.memory.values().map(|r| r.allocation_size_bytes).sum(),
            compute_gflops: maps.compute.values().map(|r| r.compute_intensity_gflops).sum(),
            memory_resources: maps.memory.len(),
            compute_resources: maps.compute.len(),
            kv_cache_layers: maps.kv_cache.len(),
            component_flows: maps.flows.len(),
        }
    }

    pub fn clear(&self) {
        let mut maps = self.maps();
        maps.memory.clear();
        maps.compute.clear();
        maps.kv_cache.clear();
        maps.flows.clear();
    }
}
