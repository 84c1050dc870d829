use serial_test::serial;

use crate::config::DEFAULT_TOKEN_LOG_PATH;
use crate::prelude::*;

fn clear_trace_env() -> EnvVarGuard {
    EnvVarGuard::unset_all(TraceEnvVar::ALL)
}

#[test]
#[serial]
fn trace_config_defaults_when_unset() {
    let _clean = clear_trace_env();

    let config = TraceConfig::from_env().expect("empty environment is valid");
    assert_eq!(config.log_level, Level::INFO);
    assert_eq!(config.detail_level, DetailLevel::Detailed);
    assert_eq!(config.token_log_path, std::path::Path::new(DEFAULT_TOKEN_LOG_PATH));
    assert_eq!(config.resource_log_path, std::path::Path::new("llama_resource_trace.jsonl"));
    assert_eq!(config.device_id, "gpu_0");
    assert!(!config.disabled);
}

#[test]
#[serial]
fn trace_config_reads_environment() {
    let _clean = clear_trace_env();
    let _log_level = LOG_LEVEL.set_guard(Level::DEBUG).expect("log level should set");
    let _detail = DETAIL_LEVEL.set_guard(DetailLevel::Verbose).expect("detail level should set");
    let _token = TOKEN_LOG_PATH.set_guard("/tmp/tokens.log".into()).expect("token path should set");
    let _resource = RESOURCE_LOG_PATH
        .set_guard("/tmp/resources.jsonl".into())
        .expect("resource path should set");
    let _device = DEVICE_ID.set_guard("metal_1".to_string()).expect("device should set");
    let _disabled = DISABLED.set_guard(true).expect("flag should set");

    let config = TraceConfig::from_env().expect("configuration should parse");
    assert_eq!(config.log_level, Level::DEBUG);
    assert_eq!(config.detail_level, DetailLevel::Verbose);
    assert_eq!(config.token_log_path, std::path::Path::new("/tmp/tokens.log"));
    assert_eq!(config.resource_log_path, std::path::Path::new("/tmp/resources.jsonl"));
    assert_eq!(config.device_id, "metal_1");
    assert!(config.disabled);
}

#[test]
#[serial]
fn trace_config_rejects_malformed_values() {
    let _clean = clear_trace_env();

    {
        let _level = EnvVarGuard::set(TraceEnvVar::LogLevel, "loud");
        match TraceConfig::from_env() {
            Err(TraceConfigError::InvalidLogLevel { value }) => assert_eq!(value, "loud"),
            other => panic!("expected invalid log level error, got {other:?}"),
        }
    }

    {
        let _detail = EnvVarGuard::set(TraceEnvVar::DetailLevel, "everything");
        match TraceConfig::from_env() {
            Err(TraceConfigError::InvalidDetailLevel { value }) => assert_eq!(value, "everything"),
            other => panic!("expected invalid detail level error, got {other:?}"),
        }
    }

    {
        let _disabled = EnvVarGuard::set(TraceEnvVar::Disabled, "maybe");
        match TraceConfig::from_env() {
            Err(TraceConfigError::InvalidBoolean { name, value }) => {
                assert_eq!(name, TraceEnvVar::Disabled.key());
                assert_eq!(value, "maybe");
            }
            other => panic!("expected invalid boolean error, got {other:?}"),
        }
    }

}

#[test]
#[serial]
fn malformed_device_id_falls_back_to_default() {
    let _clean = clear_trace_env().and_set(TraceEnvVar::DeviceId, "gpu 0");

    let config = TraceConfig::from_env().expect("device id is not fatal");
    assert_eq!(config.device_id, "gpu_0");
}

#[test]
fn detail_levels_are_ordered_and_parse_loosely() {
    assert!(DetailLevel::Minimal < DetailLevel::Detailed);
    assert!(DetailLevel::Detailed < DetailLevel::Verbose);
    assert_eq!(" VERBOSE ".parse::<DetailLevel>(), Ok(DetailLevel::Verbose));
    assert!("loud".parse::<DetailLevel>().is_err());
    assert_eq!(DetailLevel::Minimal.to_string(), "minimal");
}

#[test]
fn disabled_config_selects_noop_trackers() {
    let config = TraceConfig {
        disabled: true,
        ..TraceConfig::default()
    };
    let token = open_token_tracer(&config);
    let resource = open_resource_tracer(&config);
    assert!(!token.is_enabled());
    assert!(!resource.is_enabled());
    assert!(token.log_path().is_none());
    assert!(resource.log_path().is_none());
}

#[test]
fn unopenable_log_selects_noop_trackers() {
    let missing_dir = super::unique_log_path("missing_dir").join("nested").join("trace.jsonl");
    let config = TraceConfig {
        token_log_path: missing_dir.clone(),
        resource_log_path: missing_dir,
        ..TraceConfig::default()
    };

    let mut token = open_token_tracer(&config);
    token.enable();
    token.begin_session("never written", None);
    assert!(!token.is_enabled());

    let resource = open_resource_tracer(&config);
    resource.enable();
    assert!(!resource.is_enabled());
}
