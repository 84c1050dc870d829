use anyhow::Result;
use clap::Parser;
use infertrace_instrumentation::TraceConfig;
use tracing_subscriber::EnvFilter;

mod cli;
mod simulate;

use simulate::{RunShape, Simulator};

fn main() -> Result<()> {
    let cli = cli::CliConfig::parse();
    cli.validate()?;

    let mut config = TraceConfig::from_env()?;
    cli.apply(&mut config);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.log_level.as_str().to_ascii_lowercase()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    tracing::info!(
        detail = %config.detail_level,
        device = %config.device_id,
        disabled = config.disabled,
        "starting simulated run"
    );

    let mut simulator = Simulator::new(
        &config,
        RunShape {
            layers: cli.layers,
            max_tokens: cli.max_tokens,
        },
    );
    let summary = simulator.run(&cli.get_prompt());

    println!("input tokens:     {}", summary.input_tokens);
    println!("generated tokens: {}", summary.generated);
    match (simulator.token_log(), simulator.resource_log()) {
        (Some(tokens), Some(resources)) => {
            println!("token log:        {}", tokens.display());
            println!("resource log:     {}", resources.display());
        }
        _ => println!("tracing disabled; no logs written"),
    }
    Ok(())
}
