use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
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

const THREADS: usize = 8;
const PER_THREAD: usize = 200;

#[test]
fn concurrent_resource_logging_never_interleaves() {
    let config = TraceConfig {
        detail_level: DetailLevel::Verbose,
        resource_log_path: unique_log_path("concurrency"),
        ..TraceConfig::default()
    };
    let tracker: Arc<dyn ResourceTrace> = Arc::new(ResourceTracker::open(&config).expect("log opens"));
    tracker.begin_session("sess_concurrency");

    let handles: Vec<_> = (0..THREADS)
        .map(|worker| {
            let tracker = Arc::clone(&tracker);
            thread::spawn(move || {
                let tensor = TensorMeta::new(format!("worker_{worker}"), &[64, 64], DType::F16);
                for i in 0..PER_THREAD {
                    if i % 2 == 0 {
                        tracker.log_memory_allocation(&tensor, "activation \"scratch\"\n");
                    } else {
                        tracker.log_compute_operation("mul_mat", "attention", &[&tensor, &tensor], Some(&tensor));
                    }
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("worker finished");
    }
    tracker.end_session();
    drop(tracker);

    let contents = std::fs::read_to_string(&config.resource_log_path).expect("log readable");
    let events: Vec<Value> = contents
        .lines()
        .map(|line| serde_json::from_str(line).expect("every line is one JSON object"))
        .collect();

    // start, tracking_begin, the workers' records, summary, end
    assert_eq!(events.len(), THREADS * PER_THREAD + 4);

    let ids: HashSet<&str> = events
        .iter()
        .filter_map(|event| event.get("resource_id").and_then(Value::as_str))
        .collect();
    assert_eq!(ids.len(), THREADS * PER_THREAD, "resource ids are unique");

    let summary = events
        .iter()
        .find(|event| event["event"] == "resource_session_summary")
        .expect("summary written");
    assert_eq!(summary["memory_resources"], THREADS * PER_THREAD / 2);
    assert_eq!(summary["compute_resources"], THREADS * PER_THREAD / 2);
    assert_eq!(events.last().expect("end marker")["event"], "resource_session_end");

    std::fs::remove_file(&config.resource_log_path).expect("temporary log removable");
}
