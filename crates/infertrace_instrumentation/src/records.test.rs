#![cfg(test)]

use super::*;
use crate::tensor::TensorMeta;

struct Letters;

impl Vocabulary for Letters {
    fn n_tokens(&self) -> usize {
        26
    }

    fn token_text(&self, token: TokenId) -> Option<String> {
        let offset = u8::try_from(token).ok().filter(|t| *t < 26)?;
        Some(char::from(b'a' + offset).to_string())
    }
}

#[test]
fn token_text_is_best_effort() {
    let known = TokenRecord::new(2, 1.0, 0, Some(&Letters));
    assert_eq!(known.token_text, "c");

    let unknown = TokenRecord::new(99, 1.0, 1, Some(&Letters));
    assert_eq!(unknown.token_text, "");

    let without_vocab = TokenRecord::new(2, 0.3, 2, None);
    assert_eq!(without_vocab.token_text, "");
}

#[test]
fn tensor_snapshot_zero_fills_statistics() {
    let tensor = TensorMeta::new("blk.0.attn_q", &[64, 8], DType::F16);
    let snapshot = TensorSnapshot::capture(&tensor, "mul_mat");

    assert_eq!(snapshot.name, "blk.0.attn_q");
    assert_eq!(snapshot.shape, vec![64, 8]);
    assert_eq!(snapshot.element_count, 512);
    assert_eq!(snapshot.memory_bytes, 1024);
    assert_eq!((snapshot.min_val, snapshot.max_val, snapshot.mean_val, snapshot.std_val), (0.0, 0.0, 0.0, 0.0));
}

#[test]
fn sampling_state_ranks_top_k() {
    let logits = [0.5_f32, 3.0, -1.0, 2.0];
    let state = SamplingState::from_logits(&logits, 2, Some(&Letters));

    assert_eq!(state.top_tokens, vec![1, 3]);
    assert_eq!(state.top_token_texts, vec!["b".to_string(), "d".to_string()]);
    assert_eq!(state.selected_token, 1);
    assert!(state.top_probs[0] > state.top_probs[1]);

    let full = SamplingState::from_logits(&logits, logits.len(), None);
    let total: f64 = full.top_probs.iter().sum();
    assert!((total - 1.0).abs() < 1e-9);
}

#[test]
fn empty_logits_produce_empty_state() {
    let state = SamplingState::from_logits(&[], 5, None);
    assert!(state.top_tokens.is_empty());
    assert_eq!(state.selected_prob, 0.0);
}
