//! A toy decoder that drives both tracers the way a real engine would.
//!
//! Nothing is computed: tensors are shape descriptors and logits follow a fixed
//! pattern, so repeated runs produce the same token stream.

use std::sync::Arc;
use std::time::Instant;

use infertrace_instrumentation::prelude::*;

const WORDS: &[&str] = &[
    "<s>", "Hello", " world", "!", " How", " are", " you", " today", "?", " I", " am", " fine", ".", "\n",
];
const N_EMBD: usize = 256;
const N_FF: usize = 688;
const N_HEAD: usize = 4;
const N_CTX: usize = 2048;
const TOP_K: usize = 5;

/// Word-level vocabulary with a naive whitespace tokenizer.
pub struct ToyVocab;

impl ToyVocab {
    pub fn encode(&self, text: &str) -> Vec<TokenId> {
        let mut tokens = vec![0];
        for (index, word) in text.split_whitespace().enumerate() {
            let word = word.trim_end_matches(['!', '?', '.']);
            let candidate = if index == 0 { word.to_owned() } else { format!(" {word}") };
            let id = WORDS.iter().position(|w| *w == candidate).unwrap_or(WORDS.len() - 1);
            tokens.push(TokenId::try_from(id).unwrap_or(0));
        }
        tokens
    }
}

impl Vocabulary for ToyVocab {
    fn n_tokens(&self) -> usize {
        WORDS.len()
    }

    fn token_text(&self, token: TokenId) -> Option<String> {
        usize::try_from(token).ok().and_then(|i| WORDS.get(i)).map(|w| (*w).to_owned())
    }
}

/// Shape of the simulated run.
#[derive(Debug, Clone, Copy)]
pub struct RunShape {
    pub layers: u32,
    pub max_tokens: usize,
}

/// Totals reported back to the caller.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunSummary {
    pub input_tokens: usize,
    pub generated: usize,
}

pub struct Simulator {
    tokens: Box<dyn TokenTrace>,
    resources: Arc<dyn ResourceTrace>,
    vocab: ToyVocab,
    shape: RunShape,
}

impl Simulator {
    pub fn new(config: &TraceConfig, shape: RunShape) -> Self {
        Self {
            tokens: open_token_tracer(config),
            resources: open_resource_tracer(config),
            vocab: ToyVocab,
            shape,
        }
    }

    pub fn token_log(&self) -> Option<&std::path::Path> {
        self.tokens.log_path()
    }

    pub fn resource_log(&self) -> Option<&std::path::Path> {
        self.resources.log_path()
    }

    pub fn run(&mut self, prompt: &str) -> RunSummary {
        let model = ModelMetadata {
            n_vocab: u32::try_from(WORDS.len()).unwrap_or(u32::MAX),
            n_ctx_train: N_CTX as u32,
            n_embd: N_EMBD as u32,
            n_layer: self.shape.layers,
            n_head: N_HEAD as u32,
        };

        self.tokens.begin_session(prompt, Some(&model));
        self.resources.begin_session(&self.tokens.session_id());

        let input = self.vocab.encode(prompt);
        self.tokens.log_input_tokens(&input, Some(&self.vocab));
        self.resources.log_component_handoff("input", "attention");
        tracing::info!(target: "instrument", tokens = input.len(), "prompt encoded");

        let started = Instant::now();
        let mut context = input.len();
        let mut last = input.last().copied().unwrap_or(0);
        let mut generated = 0;

        for step in 0..self.shape.max_tokens {
            let rows = if step == 0 { input.len() } else { 1 };
            for layer in 0..self.shape.layers {
                self.decode_layer(layer, rows, context, step == 0);
            }

            let logits = fixed_logits(last, step);
            let state = SamplingState::from_logits(&logits, TOP_K, Some(&self.vocab));
            self.tokens.log_sampling_state(&state);
            self.tokens
                .log_output_token(state.selected_token, state.selected_prob, Some(&self.vocab));
            self.resources.log_component_handoff("mlp", "output");

            last = state.selected_token;
            context += 1;
            generated += 1;
            tracing::debug!(target: "instrument", step, token = last, "token sampled");
        }

        let elapsed = started.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.tokens
                .log_performance_metric("tokens_per_second", generated as f64 / elapsed, "tok/s");
        }

        self.tokens.end_session();
        self.resources.end_session();

        RunSummary {
            input_tokens: input.len(),
            generated,
        }
    }

    fn decode_layer(&mut self, layer: u32, rows: usize, context: usize, first_pass: bool) {
        let tokens = &mut self.tokens;
        let resources = &self.resources;

        tokens.begin_step("decode_layer", Some(layer));
        resources.begin_layer(layer);

        let hidden = TensorMeta::new(format!("blk.{layer}.attn_norm-in"), &[rows, N_EMBD], DType::F32);
        let qkv = TensorMeta::new(format!("blk.{layer}.attn_qkv.weight"), &[N_EMBD, 3 * N_EMBD], DType::Q8_0);
        let out = TensorMeta::new(format!("blk.{layer}.attn_output.weight"), &[N_EMBD, N_EMBD], DType::F16);
        let scores = TensorMeta::new(format!("blk.{layer}.kq"), &[N_HEAD, rows, context], DType::F32);

        resources.begin_component("attention");
        if first_pass {
            resources.log_memory_allocation(&qkv, "attn_qkv");
            resources.log_memory_allocation(&out, "attn_output");
        }
        tokens.log_tensor_metadata(&hidden, "rms_norm", "input");
        resources.log_compute_operation("rms_norm", "attention", &[&hidden], Some(&hidden));
        resources.log_compute_operation("mul_mat", "attention", &[&hidden, &qkv], None);

        let kv_bytes = (context * N_EMBD * 2 * 2) as u64;
        resources.log_kv_cache_operation(layer, "store", kv_bytes);
        let pos_end = i32::try_from(context).unwrap_or(i32::MAX);
        let pos_start = pos_end.saturating_sub(i32::try_from(rows).unwrap_or(i32::MAX));
        tokens.log_kv_cache_update(layer, 0, pos_start, pos_end, "store");

        let scratch = resources.log_memory_allocation(&scores, "attention");
        resources.log_compute_operation("soft_max", "attention", &[&scores], Some(&scores));
        resources.log_compute_operation("mul_mat", "attention", &[&hidden, &out], Some(&hidden));
        resources.log_compute_operation("add", "attention", &[&hidden, &hidden], Some(&hidden));
        if let Some(id) = scratch {
            resources.log_memory_deallocation(&id);
        }
        resources.end_component("attention");

        resources.log_component_handoff("attention", "mlp");

        let gate = TensorMeta::new(format!("blk.{layer}.ffn_gate.weight"), &[N_EMBD, N_FF], DType::Q4K);
        let up = TensorMeta::new(format!("blk.{layer}.ffn_up.weight"), &[N_EMBD, N_FF], DType::Q4K);
        let down = TensorMeta::new(format!("blk.{layer}.ffn_down.weight"), &[N_FF, N_EMBD], DType::Q4K);
        let ff = TensorMeta::new(format!("blk.{layer}.ffn_inp"), &[rows, N_FF], DType::F32);

        resources.begin_component("mlp");
        if first_pass {
            for weight in [&gate, &up, &down] {
                resources.log_memory_allocation(weight, "mlp");
            }
        }
        resources.log_mlp_operation("gate_proj", Some(&gate), Some(&hidden));
        resources.log_mlp_operation("up_proj", Some(&up), Some(&hidden));
        resources.log_compute_operation("silu", "mlp", &[&ff], Some(&ff));
        resources.log_mlp_operation("down_proj", Some(&down), Some(&ff));
        resources.end_component("mlp");

        resources.log_component_handoff("mlp", "attention");
        resources.end_layer(layer);
        tokens.end_step(if first_pass { "prefill" } else { "decode" });
    }
}

/// Deterministic logits peaked on the word after `last`, drifting with `step`.
fn fixed_logits(last: TokenId, step: usize) -> Vec<f32> {
    let n = WORDS.len();
    let favoured = (usize::try_from(last).unwrap_or(0) + 1 + step % 2) % n;
    (0..n)
        .map(|i| {
            let distance = (i + n - favoured) % n;
            4.0 - distance as f32 * 0.5
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_maps_known_words_and_falls_back_to_newline() {
        let tokens = ToyVocab.encode("Hello world! banana");
        assert_eq!(tokens, vec![0, 1, 2, 13]);
        assert_eq!(ToyVocab.token_text(2).as_deref(), Some(" world"));
        assert_eq!(ToyVocab.token_text(-1), None);
    }

    #[test]
    fn logits_favour_the_next_word() {
        let logits = fixed_logits(1, 0);
        let best = logits
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i);
        assert_eq!(best, Some(2));
    }

    #[test]
    fn disabled_run_still_generates() {
        let config = TraceConfig {
            disabled: true,
            ..TraceConfig::default()
        };
        let mut sim = Simulator::new(&config, RunShape { layers: 1, max_tokens: 3 });
        let summary = sim.run("Hello world!");
        assert_eq!(summary.generated, 3);
        assert_eq!(summary.input_tokens, 3);
        assert!(sim.token_log().is_none());
    }
}
