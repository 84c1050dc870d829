use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use infertrace_instrumentation::prelude::*;
use serde_json::Value;

fn unique_log_path(stem: &str) -> PathBuf {
    let unique = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time went backwards")
        .as_nanos();
    std::env::temp_dir().join(format!("infertrace_{stem}_{unique}.jsonl"))
}

fn read_events(path: &std::path::Path) -> Vec<Value> {
    std::fs::read_to_string(path)
        .expect("log readable")
        .lines()
        .map(|line| serde_json::from_str(line).expect("valid JSON line"))
        .collect()
}

struct Words(Vec<&'static str>);

impl Vocabulary for Words {
    fn n_tokens(&self) -> usize {
        self.0.len()
    }

    fn token_text(&self, token: TokenId) -> Option<String> {
        usize::try_from(token).ok().and_then(|i| self.0.get(i)).map(|w| (*w).to_owned())
    }
}

#[test]
fn both_logs_share_a_session() {
    let config = TraceConfig {
        detail_level: DetailLevel::Detailed,
        token_log_path: unique_log_path("session_tokens"),
        resource_log_path: unique_log_path("session_resources"),
        ..TraceConfig::default()
    };
    let vocab = Words(vec!["Hello", " world", "!", " Hi", "\n"]);
    let model = ModelMetadata {
        n_vocab: 5,
        n_ctx_train: 4096,
        n_embd: 64,
        n_layer: 2,
        n_head: 4,
    };

    {
        let mut tokens = open_token_tracer(&config);
        let resources = open_resource_tracer(&config);

        tokens.begin_session("Hello world!", Some(&model));
        resources.begin_session(&tokens.session_id());
        tokens.log_input_tokens(&[0, 1, 2], Some(&vocab));

        for layer in 0..2 {
            tokens.begin_step("decode_layer", Some(layer));
            resources.begin_layer(layer);
            resources.begin_component("attention");
            let weights = TensorMeta::new(format!("blk.{layer}.attn_qkv.weight"), &[1024, 1024], DType::F16);
            let hidden = TensorMeta::new("hidden", &[3, 1024], DType::F32);
            resources.log_memory_allocation(&weights, "attn_qkv");
            resources.log_compute_operation("mul_mat", "attention", &[&hidden, &weights], None);
            resources.log_kv_cache_operation(layer, "store", 3 * 1024 * 4 * 2);
            resources.end_component("attention");
            resources.log_component_handoff("attention", "mlp");
            resources.end_layer(layer);
            tokens.end_step("");
        }

        let state = SamplingState::from_logits(&[0.1, 0.2, 0.3, 2.5, 0.0], 3, Some(&vocab));
        tokens.log_sampling_state(&state);
        tokens.log_output_token(state.selected_token, state.selected_prob, Some(&vocab));
        tokens.end_session();
        resources.end_session();
    }

    let token_events = read_events(&config.token_log_path);
    let start = &token_events[0];
    assert_eq!(start["event"], "session_start");
    assert_eq!(start["model_info"]["n_layer"], 2);
    assert_eq!(token_events[1]["tokens"][1]["token_text"], " world");

    let output = token_events
        .iter()
        .find(|event| event["event"] == "output_token")
        .expect("output token logged");
    assert_eq!(output["token"]["token_id"], 3);
    assert_eq!(output["token"]["token_text"], " Hi");

    let end = token_events.last().expect("session end");
    assert_eq!(end["total_steps"], 2);
    assert_eq!(end["input_token_count"], 3);
    assert_eq!(end["output_token_count"], 1);

    let resource_events = read_events(&config.resource_log_path);
    let session_id = start["session_id"].as_str().expect("session id");
    assert!(
        resource_events
            .iter()
            .skip(1)
            .all(|event| event["session_id"] == session_id),
        "resource events after tracking_begin carry the token session id"
    );
    let layer_ends: Vec<&Value> = resource_events.iter().filter(|e| e["event"] == "layer_end").collect();
    assert_eq!(layer_ends.len(), 2);
    assert_eq!(layer_ends[0]["layer_memory_mb"], 2.0);
    assert_eq!(layer_ends[0]["compute_operations"], 1);

    std::fs::remove_file(&config.token_log_path).expect("token log removable");
    std::fs::remove_file(&config.resource_log_path).expect("resource log removable");
}
