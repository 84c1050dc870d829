//! Dual-layer tracing for LLM inference: a token/step tracker and a resource
//! tracker, each appending one JSON object per line to its own log.

pub mod clock;
pub mod config;
pub mod estimator;
pub mod event;
pub mod exporters;
pub mod handoff;
pub mod noop;
pub mod prelude;
pub mod records;
pub mod resource_tracker;
pub mod resources;
pub mod serialize;
pub mod store;
pub mod tensor;
pub mod token_tracker;
pub mod tracer;

pub use config::{DetailLevel, TraceConfig, TraceConfigError};
pub use resource_tracker::ResourceTracker;
pub use token_tracker::TokenTracker;
pub use tracer::{ResourceTrace, TokenTrace, open_resource_tracer, open_token_tracer};

mod tests;
