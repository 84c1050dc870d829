use super::*;

fn parse(args: &[&str]) -> CliConfig {
    CliConfig::try_parse_from(std::iter::once("infertrace").chain(args.iter().copied())).expect("arguments parse")
}

#[test]
fn test_cli_config_default_prompt() {
    let config = parse(&[]);
    assert_eq!(config.get_prompt(), "Hello world!");
    assert_eq!(config.layers, 2);
    assert_eq!(config.max_tokens, 4);
    assert!(config.validate().is_ok());

    let blank = parse(&["   "]);
    assert_eq!(blank.get_prompt(), "Hello world!");
}

#[test]
fn test_cli_config_custom_prompt() {
    let config = parse(&["Tell me a story"]);
    assert_eq!(config.get_prompt(), "Tell me a story");
}

#[test]
fn test_cli_overrides_environment_config() {
    let config = parse(&[
        "--detail",
        "verbose",
        "--token-log",
        "/tmp/t.log",
        "--resource-log",
        "/tmp/r.jsonl",
        "--device",
        "metal_0",
    ]);
    let mut trace = TraceConfig::default();
    config.apply(&mut trace);

    assert_eq!(trace.detail_level, DetailLevel::Verbose);
    assert_eq!(trace.token_log_path, PathBuf::from("/tmp/t.log"));
    assert_eq!(trace.resource_log_path, PathBuf::from("/tmp/r.jsonl"));
    assert_eq!(trace.device_id, "metal_0");
}

#[test]
fn test_cli_without_overrides_keeps_config() {
    let config = parse(&[]);
    let mut trace = TraceConfig::default();
    config.apply(&mut trace);
    assert_eq!(trace.detail_level, DetailLevel::Detailed);
    assert_eq!(trace.device_id, "gpu_0");
}

#[test]
fn test_cli_validation_rejects_degenerate_runs() {
    assert!(matches!(
        parse(&["--layers", "0"]).validate(),
        Err(CliError::InvalidValue { flag: "layers", .. })
    ));
    assert!(matches!(
        parse(&["--max-tokens", "0"]).validate(),
        Err(CliError::InvalidValue { flag: "max-tokens", .. })
    ));
    assert!(matches!(
        parse(&["--device", "gpu 0"]).validate(),
        Err(CliError::InvalidValue { flag: "device", .. })
    ));
}

#[test]
fn test_cli_rejects_unknown_detail_level() {
    assert!(CliConfig::try_parse_from(["infertrace", "--detail", "loud"]).is_err());
}

#[test]
fn test_verbose_flag_raises_diagnostic_level() {
    let mut trace = TraceConfig::default();
    parse(&["-v"]).apply(&mut trace);
    assert_eq!(trace.log_level, Level::DEBUG);

    parse(&["-vv"]).apply(&mut trace);
    assert_eq!(trace.log_level, Level::TRACE);
}
