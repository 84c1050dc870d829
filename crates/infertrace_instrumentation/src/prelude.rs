//! Convenience re-exports for instrumented engines.

pub use crate::clock::{Timestamp, generate_session_id};
pub use crate::config::{DETAIL_LEVEL, DetailLevel, TraceConfig, TraceConfigError};
pub use crate::event::{ResourceEvent, TokenEvent, TraceLine};
pub use crate::exporters::{ChannelSink, EventSink, JsonlSink, SinkError};
pub use crate::handoff::{HandoffCost, HandoffTable, MemoryPressure};
pub use crate::noop::{NoopResourceTracer, NoopTokenTracer};
pub use crate::records::{LayerInfo, SamplingState};
pub use crate::resource_tracker::ResourceTracker;
pub use crate::tensor::{DType, ModelMetadata, TensorInfo, TensorMeta, TokenId, Vocabulary, format_shape};
pub use crate::token_tracker::TokenTracker;
pub use crate::tracer::{ResourceTrace, TokenTrace, open_resource_tracer, open_token_tracer};

pub use infertrace_env::{
    DEVICE_ID, DISABLED, EnvVarError, EnvVarGuard, LOG_LEVEL, RESOURCE_LOG_PATH, TOKEN_LOG_PATH, TraceEnvVar,
};

pub use tracing::Level;
