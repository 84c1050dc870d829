use std::path::PathBuf;

use infertrace_env::{DEVICE_ID, DISABLED, EnvVarError, EnvVarGuard, LOG_LEVEL, TOKEN_LOG_PATH, TraceEnvVar};
use serial_test::serial;
use tracing::Level;

#[test]
#[serial]
fn guard_restores_previous_value() {
    let _outer = EnvVarGuard::set(TraceEnvVar::DeviceId, "gpu_1");
    {
        let guard = DEVICE_ID.set_guard("cpu".to_string()).expect("device id formats");
        assert_eq!(guard.as_str(), "cpu");
        assert_eq!(DEVICE_ID.get().expect("parses"), Some("cpu".to_string()));
    }
    assert_eq!(DEVICE_ID.get().expect("parses"), Some("gpu_1".to_string()));
}

#[test]
#[serial]
fn unset_guard_removes_and_restores() {
    let _outer = EnvVarGuard::set(TraceEnvVar::TokenLogPath, "/tmp/outer.log");
    {
        let _cleared = TOKEN_LOG_PATH.unset_guard();
        assert_eq!(TOKEN_LOG_PATH.get().expect("unset reads as none"), None);
    }
    assert_eq!(TOKEN_LOG_PATH.get().expect("parses"), Some(PathBuf::from("/tmp/outer.log")));
}

#[test]
#[serial]
fn malformed_values_report_parse_errors() {
    let _level = EnvVarGuard::set(TraceEnvVar::LogLevel, "loud");
    match LOG_LEVEL.get() {
        Err(EnvVarError::Parse { name, value, .. }) => {
            assert_eq!(name, "INFERTRACE_LOG_LEVEL");
            assert_eq!(value, "loud");
        }
        other => panic!("expected parse error, got {other:?}"),
    }
    assert_eq!(LOG_LEVEL.get_or_warn(), None);

    let _device = EnvVarGuard::set(TraceEnvVar::DeviceId, "gpu 0");
    assert!(DEVICE_ID.get().is_err());
}

#[test]
#[serial]
fn typed_values_parse() {
    let _level = LOG_LEVEL.set_guard(Level::DEBUG).expect("level formats");
    assert_eq!(LOG_LEVEL.get().expect("parses"), Some(Level::DEBUG));

    let _disabled = EnvVarGuard::set(TraceEnvVar::Disabled, "YES");
    assert_eq!(DISABLED.get().expect("parses"), Some(true));

    let _disabled = EnvVarGuard::set(TraceEnvVar::Disabled, "off");
    assert_eq!(DISABLED.get().expect("parses"), Some(false));
}

#[test]
#[serial]
fn grouped_guard_restores_every_variable() {
    let _device = EnvVarGuard::set(TraceEnvVar::DeviceId, "gpu_1");
    {
        let _all = EnvVarGuard::unset_all(TraceEnvVar::ALL).and_set(TraceEnvVar::DeviceId, "gpu_2");
        assert_eq!(DEVICE_ID.get().expect("parses"), Some("gpu_2".to_string()));
        assert_eq!(DISABLED.get().expect("unset reads as none"), None);
    }
    assert_eq!(DEVICE_ID.get().expect("parses"), Some("gpu_1".to_string()));
}
