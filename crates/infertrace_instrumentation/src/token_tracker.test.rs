#![cfg(test)]

use std::sync::mpsc::{self, Receiver};

use serde_json::Value;

use super::*;
use crate::exporters::ChannelSink;
use crate::tensor::{DType, TensorMeta};

fn tracker(level: DetailLevel) -> (TokenTracker, Receiver<String>) {
    let (sender, receiver) = mpsc::channel();
    (TokenTracker::with_sink(Box::new(ChannelSink::new(sender)), level), receiver)
}

fn drain(receiver: &Receiver<String>) -> Vec<Value> {
    receiver
        .try_iter()
        .map(|line| serde_json::from_str(&line).expect("every line is valid JSON"))
        .collect()
}

fn names(events: &[Value]) -> Vec<&str> {
    events.iter().map(|e| e["event"].as_str().expect("event tag")).collect()
}

#[test]
fn hello_world_session_summary() {
    let (mut tracker, receiver) = tracker(DetailLevel::Detailed);

    tracker.begin_session("Hello world!", None);
    tracker.log_input_tokens(&[15496, 995, 0, 13, 198], None);
    for name in ["embed", "decode", "sample"] {
        tracker.begin_step(name, None);
        tracker.end_step("");
    }
    tracker.log_output_token(42, 0.42, None);
    tracker.end_session();

    let events = drain(&receiver);
    let end = events.last().expect("session_end written");
    assert_eq!(end["event"], "session_end");
    assert_eq!(end["input_token_count"], 5);
    assert_eq!(end["output_token_count"], 1);
    assert_eq!(end["total_steps"], 3);

    let start = &events[0];
    assert_eq!(start["event"], "session_start");
    assert_eq!(start["prompt"], "Hello world!");
    assert!(start.get("model_info").is_none());

    for event in &events {
        assert_eq!(event["session_id"], start["session_id"]);
        assert!(event["timestamp"].is_string());
    }
}

#[test]
fn unmatched_end_step_is_ignored() {
    let (mut tracker, receiver) = tracker(DetailLevel::Detailed);
    tracker.begin_session("", None);
    tracker.end_step("nothing open");
    assert_eq!(tracker.steps_completed(), 0);

    tracker.begin_step("decode", Some(4));
    tracker.end_step("done");
    tracker.end_step("again");
    assert_eq!(tracker.steps_completed(), 1);

    let events = drain(&receiver);
    assert_eq!(names(&events), vec!["session_start", "step_begin", "step_end"]);
    assert_eq!(events[2]["metrics"]["layer_id"], 4);
    assert_eq!(events[2]["metrics"]["notes"], "done");
}

#[test]
fn open_step_is_not_counted() {
    let (mut tracker, receiver) = tracker(DetailLevel::Minimal);
    tracker.begin_session("prompt", None);
    tracker.begin_step("first", None);
    tracker.end_step("");
    tracker.begin_step("dangling", None);
    tracker.end_session();

    let events = drain(&receiver);
    assert_eq!(events.last().expect("summary")["total_steps"], 1);
}

#[test]
fn end_session_without_steps_still_summarises() {
    let (mut tracker, receiver) = tracker(DetailLevel::Minimal);
    tracker.begin_session("", None);
    tracker.end_session();

    let events = drain(&receiver);
    assert_eq!(names(&events), vec!["session_start", "session_end"]);
    assert_eq!(events[1]["total_steps"], 0);
    assert_eq!(events[1]["input_token_count"], 0);
}

#[test]
fn minimal_level_gates_detailed_events() {
    let (mut tracker, receiver) = tracker(DetailLevel::Minimal);
    let tensor = TensorMeta::new("attn_out", &[4096, 8], DType::F32);

    tracker.begin_step("decode", Some(0));
    tracker.log_tensor_metadata(&tensor, "mul_mat", "output");
    tracker.log_kv_cache_update(0, 0, 0, 8, "store");
    tracker.end_step("");
    tracker.log_sampling_state(&SamplingState::default());
    assert_eq!(names(&drain(&receiver)), vec!["step_end", "sampling_state"]);

    tracker.set_level(DetailLevel::Detailed);
    tracker.begin_step("decode", Some(1));
    tracker.log_tensor_metadata(&tensor, "mul_mat", "output");
    tracker.log_kv_cache_update(1, 0, 0, 8, "store");
    tracker.end_step("");

    let events = drain(&receiver);
    assert_eq!(names(&events), vec!["step_begin", "tensor_metadata", "kv_cache_update", "step_end"]);
    assert_eq!(events[1]["step_name"], "decode");
    assert_eq!(events[1]["layer_id"], 1);
    assert_eq!(events[1]["metadata"]["shape"], serde_json::json!([4096, 8]));
    assert_eq!(events[1]["metadata"]["dtype"], "f32");
}

#[test]
fn token_positions_and_probabilities() {
    let (mut tracker, receiver) = tracker(DetailLevel::Detailed);
    tracker.log_input_tokens(&[1, 2], None);
    tracker.log_input_tokens(&[3], None);
    tracker.log_output_token(7, 0.25, None);
    tracker.log_output_token(8, 0.5, None);

    let events = drain(&receiver);
    assert_eq!(events[0]["n_tokens"], 2);
    assert_eq!(events[0]["tokens"][1]["probability"], 1.0);
    assert_eq!(events[0]["tokens"][1]["seq_id"], 0);
    assert_eq!(events[1]["tokens"][0]["position"], 2);
    assert_eq!(events[2]["token"]["position"], 0);
    assert_eq!(events[3]["token"]["position"], 1);
    assert_eq!(events[3]["token"]["probability"], 0.5);
}

#[test]
fn input_batches_accumulate_into_session_count() {
    let (mut tracker, receiver) = tracker(DetailLevel::Detailed);
    tracker.begin_session("batched", None);
    tracker.log_input_tokens(&[1, 2, 3, 4, 5], None);
    tracker.log_input_tokens(&[6, 7], None);
    tracker.end_session();

    let events = drain(&receiver);
    assert_eq!(events[2]["tokens"][0]["position"], 5);
    assert_eq!(events[2]["tokens"][1]["position"], 6);
    assert_eq!(events.last().expect("session end")["input_token_count"], 7);
}

#[test]
fn disabled_tracker_writes_nothing() {
    let (mut tracker, receiver) = tracker(DetailLevel::Verbose);
    tracker.disable();
    assert!(!tracker.is_enabled());

    tracker.begin_session("quiet", None);
    tracker.begin_step("decode", None);
    tracker.end_step("");
    tracker.log_output_token(1, 1.0, None);
    tracker.end_session();
    assert!(drain(&receiver).is_empty());

    tracker.enable();
    tracker.log_performance_metric("tokens_per_second", 12.3456789, "tok/s");
    let events = drain(&receiver);
    assert_eq!(names(&events), vec!["performance_metric"]);
    assert_eq!(events[0]["value"], 12.345679);
}

#[test]
fn prompt_text_is_escaped() {
    let (mut tracker, receiver) = tracker(DetailLevel::Minimal);
    let prompt = "say \"hi\"\\\n\tnow\r";
    tracker.begin_session(prompt, None);

    let lines: Vec<String> = receiver.try_iter().collect();
    assert_eq!(lines.len(), 1);
    assert!(!lines[0].contains('\n'));
    let event: Value = serde_json::from_str(&lines[0]).expect("valid JSON");
    assert_eq!(event["prompt"], prompt);
}

#[test]
fn session_ids_change_per_session() {
    let (mut tracker, _receiver) = tracker(DetailLevel::Minimal);
    tracker.begin_session("one", None);
    let first = tracker.session_id();
    tracker.begin_session("two", None);
    assert_ne!(first, tracker.session_id());
    assert!(first.starts_with("sess_"));
    assert!(tracker.log_path().is_none());
}
