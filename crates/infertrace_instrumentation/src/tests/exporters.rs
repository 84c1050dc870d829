use std::sync::mpsc;
use std::time::Duration;

use crate::prelude::*;

#[test]
fn jsonl_sink_appends_lines() {
    let path = super::unique_log_path("sink");

    {
        let sink = JsonlSink::open(&path).expect("jsonl sink should open file");
        assert_eq!(sink.path(), Some(path.as_path()));
        sink.write_line(r#"{"event":"first"}"#);
    }
    {
        let sink = JsonlSink::open(&path).expect("jsonl sink should reopen file");
        sink.write_line(r#"{"event":"second"}"#);
        sink.flush();
    }

    let contents = std::fs::read_to_string(&path).expect("jsonl sink should write file");
    assert_eq!(contents, "{\"event\":\"first\"}\n{\"event\":\"second\"}\n");

    std::fs::remove_file(&path).expect("temporary jsonl file should be removable");
}

#[test]
fn jsonl_sink_reports_open_failure() {
    let path = super::unique_log_path("absent").join("trace.jsonl");
    match JsonlSink::open(&path) {
        Err(SinkError::Open { path: failed, .. }) => assert_eq!(failed, path),
        Ok(_) => panic!("opening inside a missing directory should fail"),
    }
}

#[test]
fn channel_sink_forwards_lines() {
    let (sender, receiver) = mpsc::channel();
    let sink = ChannelSink::new(sender);

    sink.write_line("one");
    sink.write_line("two");

    let first = receiver
        .recv_timeout(Duration::from_secs(1))
        .expect("channel should receive first line");
    assert_eq!(first, "one");
    assert_eq!(receiver.try_recv().as_deref(), Ok("two"));
    assert!(sink.path().is_none());
}

#[test]
fn trackers_report_their_log_paths() {
    let config = TraceConfig {
        token_log_path: super::unique_log_path("token_paths"),
        resource_log_path: super::unique_log_path("resource_paths"),
        ..TraceConfig::default()
    };

    {
        let token = open_token_tracer(&config);
        let resource = open_resource_tracer(&config);
        assert_eq!(token.log_path(), Some(config.token_log_path.as_path()));
        assert_eq!(resource.log_path(), Some(config.resource_log_path.as_path()));
    }

    std::fs::remove_file(&config.token_log_path).expect("token log created");
    std::fs::remove_file(&config.resource_log_path).expect("resource log created");
}
