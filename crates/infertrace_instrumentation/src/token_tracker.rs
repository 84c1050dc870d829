//! Session, step and token tracing.

use std::path::Path;

use crate::clock::{Timestamp, generate_session_id};
use crate::config::DetailLevel;
use crate::event::{TokenEvent, TraceLine};
use crate::exporters::{EventSink, JsonlSink, SinkError};
use crate::records::{SamplingState, StepMetrics, TensorSnapshot, TokenRecord};
use crate::serialize::to_line;
use crate::tensor::{ModelMetadata, TensorInfo, TokenId, Vocabulary};
use crate::tracer::TokenTrace;

const SESSION_PREFIX: &str = "sess";

struct OpenStep {
    name: String,
    layer: Option<u32>,
    started: Timestamp,
}

/// Writes the token/step trace for one inference session at a time.
///
/// Steps are strictly sequential: opening a step while another is open
/// replaces it, and the replaced step is never counted.
pub struct TokenTracker {
    sink: Box<dyn EventSink>,
    level: DetailLevel,
    enabled: bool,
    session_id: String,
    session_start: Timestamp,
    steps_completed: u32,
    current_step: Option<OpenStep>,
    input_count: usize,
    output_count: usize,
}

impl TokenTracker {
    /// Append to the log at `path`.
    pub fn open(path: impl AsRef<Path>, level: DetailLevel) -> Result<Self, SinkError> {
        let sink = JsonlSink::open(path.as_ref())?;
        tracing::info!(target: "instrument", path = %path.as_ref().display(), %level, "token tracing enabled");
        Ok(Self::with_sink(Box::new(sink), level))
    }

    #[must_use]
    pub fn with_sink(sink: Box<dyn EventSink>, level: DetailLevel) -> Self {
        Self {
            sink,
            level,
            enabled: true,
            session_id: generate_session_id(SESSION_PREFIX),
            session_start: Timestamp::now(),
            steps_completed: 0,
            current_step: None,
            input_count: 0,
            output_count: 0,
        }
    }

    /// Steps closed so far in the current session.
    #[must_use]
    pub fn steps_completed(&self) -> u32 {
        self.steps_completed
    }

    fn emit(&self, event: &TokenEvent) {
        let line = TraceLine::new(event, &self.session_id);
        match to_line(&line) {
            Ok(text) => {
                self.sink.write_line(&text);
                if self.level >= DetailLevel::Verbose {
                    tracing::debug!(target: "instrument", line = %text, "token trace");
                }
            }
            Err(error) => tracing::error!(target: "instrument", %error, "failed to serialise token event"),
        }
    }
}

impl TokenTrace for TokenTracker {
    fn begin_session(&mut self, prompt: &str, model: Option<&ModelMetadata>) {
        if !self.enabled {
            return;
        }
        self.session_id = generate_session_id(SESSION_PREFIX);
        self.session_start = Timestamp::now();
        self.steps_completed = 0;
        self.current_step = None;
        self.input_count = 0;
        self.output_count = 0;

        tracing::debug!(target: "instrument", session_id = %self.session_id, "token session started");
        self.emit(&TokenEvent::SessionStart {
            prompt: prompt.to_owned(),
            model_info: model.copied(),
            detail_level: self.level,
        });
    }

    fn end_session(&mut self) {
        if !self.enabled {
            return;
        }
        let elapsed = Timestamp::now().since(&self.session_start);
        self.emit(&TokenEvent::SessionEnd {
            duration_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            total_steps: self.steps_completed,
            input_token_count: self.input_count,
            output_token_count: self.output_count,
        });
        self.sink.flush();
        tracing::debug!(
            target: "instrument",
            session_id = %self.session_id,
            steps = self.steps_completed,
            "token session ended"
        );
    }

    fn begin_step(&mut self, name: &str, layer: Option<u32>) {
        if !self.enabled {
            return;
        }
        self.current_step = Some(OpenStep {
            name: name.to_owned(),
            layer,
            started: Timestamp::now(),
        });
        if self.level >= DetailLevel::Detailed {
            self.emit(&TokenEvent::StepBegin {
                step_id: self.steps_completed,
                step_name: name.to_owned(),
                layer_id: layer,
            });
        }
    }

    fn end_step(&mut self, notes: &str) {
        if !self.enabled {
            return;
        }
        let Some(step) = self.current_step.take() else {
            return;
        };
        let elapsed = Timestamp::now().since(&step.started);
        self.emit(&TokenEvent::StepEnd {
            metrics: StepMetrics {
                step_name: step.name,
                step_id: self.steps_completed,
                layer_id: step.layer,
                execution_time_us: u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX),
                notes: notes.to_owned(),
            },
        });
        self.steps_completed += 1;
    }

    fn log_input_tokens(&mut self, tokens: &[TokenId], vocab: Option<&dyn Vocabulary>) {
        if !self.enabled {
            return;
        }
        let records: Vec<TokenRecord> = tokens
            .iter()
            .enumerate()
            .map(|(i, &token)| {
                let position = u32::try_from(self.input_count + i).unwrap_or(u32::MAX);
                TokenRecord::new(token, 1.0, position, vocab)
            })
            .collect();
        self.input_count += records.len();
        self.emit(&TokenEvent::InputTokens {
            n_tokens: records.len(),
            tokens: records,
        });
    }

    fn log_output_token(&mut self, token: TokenId, probability: f64, vocab: Option<&dyn Vocabulary>) {
        if !self.enabled {
            return;
        }
        let position = u32::try_from(self.output_count).unwrap_or(u32::MAX);
        self.output_count += 1;
        self.emit(&TokenEvent::OutputToken {
            token: TokenRecord::new(token, probability, position, vocab),
        });
    }

    fn log_tensor_metadata(&mut self, tensor: &dyn TensorInfo, operation: &str, role: &str) {
        if !self.enabled || self.level < DetailLevel::Detailed {
            return;
        }
        let (step_name, layer_id) = match &self.current_step {
            Some(step) => (step.name.clone(), step.layer),
            None => (String::new(), None),
        };
        self.emit(&TokenEvent::TensorMetadata {
            role: role.to_owned(),
            step_name,
            layer_id,
            metadata: TensorSnapshot::capture(tensor, operation),
        });
    }

    fn log_sampling_state(&mut self, state: &SamplingState) {
        if !self.enabled {
            return;
        }
        self.emit(&TokenEvent::SamplingState { sampling: state.clone() });
    }

    fn log_kv_cache_update(&mut self, layer: u32, seq_id: i32, pos_start: i32, pos_end: i32, operation: &str) {
        if !self.enabled || self.level < DetailLevel::Detailed {
            return;
        }
        self.emit(&TokenEvent::KvCacheUpdate {
            layer_id: layer,
            seq_id,
            pos_start,
            pos_end,
            operation: operation.to_owned(),
        });
    }

    fn log_performance_metric(&mut self, name: &str, value: f64, unit: &str) {
        if !self.enabled {
            return;
        }
        self.emit(&TokenEvent::PerformanceMetric {
            metric_name: name.to_owned(),
            value,
            unit: unit.to_owned(),
        });
    }

    fn enable(&mut self) {
        self.enabled = true;
    }

    fn disable(&mut self) {
        self.enabled = false;
    }

    fn set_level(&mut self, level: DetailLevel) {
        tracing::debug!(target: "instrument", from = %self.level, to = %level, "token trace level changed");
        self.level = level;
    }

    fn flush(&mut self) {
        self.sink.flush();
    }

    fn level(&self) -> DetailLevel {
        self.level
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn log_path(&self) -> Option<&Path> {
        self.sink.path()
    }

    fn session_id(&self) -> String {
        self.session_id.clone()
    }
}

#[path = "token_tracker.test.rs"]
mod tests;
