//! Token-level records carried by the step tracker's events.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::clock::Timestamp;
use crate::serialize::{fixed, fixed_map, fixed_seq, layer_index};
use crate::tensor::{DType, TensorInfo, TokenId, Vocabulary};

#[derive(Debug, Clone, Serialize)]
pub struct TokenRecord {
    pub token_id: TokenId,
    pub token_text: String,
    #[serde(serialize_with = "fixed")]
    pub probability: f64,
    pub position: u32,
    pub seq_id: i32,
    pub timestamp: Timestamp,
}

impl TokenRecord {
    pub(crate) fn new(token_id: TokenId, probability: f64, position: u32, vocab: Option<&dyn Vocabulary>) -> Self {
        Self {
            token_id,
            token_text: vocab.and_then(|v| v.token_text(token_id)).unwrap_or_default(),
            probability,
            position,
            seq_id: 0,
            timestamp: Timestamp::now(),
        }
    }
}

/// Shape-level description of a tensor at one point in the pipeline.
///
/// The value statistics are placeholders: reading tensor contents would stall
/// the engine, so they are written as zero.
#[derive(Debug, Clone, Serialize)]
pub struct TensorSnapshot {
    pub name: String,
    pub operation: String,
    pub shape: Vec<usize>,
    pub dtype: DType,
    pub element_count: usize,
    #[serde(serialize_with = "fixed")]
    pub min_val: f64,
    #[serde(serialize_with = "fixed")]
    pub max_val: f64,
    #[serde(serialize_with = "fixed")]
    pub mean_val: f64,
    #[serde(serialize_with = "fixed")]
    pub std_val: f64,
    pub memory_bytes: usize,
    pub timestamp: Timestamp,
}

impl TensorSnapshot {
    #[must_use]
    pub fn capture(tensor: &dyn TensorInfo, operation: &str) -> Self {
        Self {
            name: tensor.name().to_owned(),
            operation: operation.to_owned(),
            shape: tensor.shape().to_vec(),
            dtype: tensor.dtype(),
            element_count: tensor.element_count(),
            min_val: 0.0,
            max_val: 0.0,
            mean_val: 0.0,
            std_val: 0.0,
            memory_bytes: tensor.byte_size(),
            timestamp: Timestamp::now(),
        }
    }
}

/// Per-layer context attached to a sampling decision.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LayerInfo {
    pub layer_id: u32,
    /// e.g. `attention`, `feed_forward`, `norm`.
    pub layer_type: String,
    /// e.g. `self_attention`, `mlp`, `layer_norm`.
    pub operation: String,
    pub execution_time_us: u64,
    #[serde(serialize_with = "fixed_map")]
    pub layer_metrics: BTreeMap<String, f64>,
}

/// Snapshot of the candidates considered for one output token.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SamplingState {
    #[serde(serialize_with = "fixed_seq")]
    pub logits_sample: Vec<f64>,
    pub top_tokens: Vec<TokenId>,
    #[serde(serialize_with = "fixed_seq")]
    pub top_probs: Vec<f64>,
    pub top_token_texts: Vec<String>,
    pub selected_token: TokenId,
    #[serde(serialize_with = "fixed")]
    pub selected_prob: f64,
    pub sampling_method: String,
    #[serde(serialize_with = "fixed_map")]
    pub sampling_params: BTreeMap<String, f64>,
    pub layer_details: Vec<LayerInfo>,
}

impl SamplingState {
    /// Build the top-`k` view of a full logit row, softmax taken over the whole row.
    ///
    /// The highest-probability candidate is preselected with method `greedy`;
    /// samplers that pick differently overwrite `selected_*` and `sampling_method`.
    #[must_use]
    pub fn from_logits(logits: &[f32], k: usize, vocab: Option<&dyn Vocabulary>) -> Self {
        let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let denom: f64 = logits.iter().map(|&l| f64::from(l - max).exp()).sum();

        let mut ranked: Vec<(usize, f32)> = logits.iter().copied().enumerate().collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked.truncate(k);

        let mut state = SamplingState {
            sampling_method: "greedy".to_owned(),
            ..Default::default()
        };
        for (index, logit) in ranked {
            let token = TokenId::try_from(index).unwrap_or(TokenId::MAX);
            state.logits_sample.push(f64::from(logit));
            state.top_tokens.push(token);
            state.top_probs.push(f64::from(logit - max).exp() / denom);
            state
                .top_token_texts
                .push(vocab.and_then(|v| v.token_text(token)).unwrap_or_default());
        }
        if let (Some(&token), Some(&prob)) = (state.top_tokens.first(), state.top_probs.first()) {
            state.selected_token = token;
            state.selected_prob = prob;
        }
        state
    }
}

/// Summary written when a step closes.
#[derive(Debug, Clone, Serialize)]
pub struct StepMetrics {
    pub step_name: String,
    pub step_id: u32,
    #[serde(serialize_with = "layer_index")]
    pub layer_id: Option<u32>,
    pub execution_time_us: u64,
    pub notes: String,
}

#[path = "records.test.rs"]
mod tests;
