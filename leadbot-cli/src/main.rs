use clap::Parser;
use leadbot_cli::{Cli, commands};
use leadbot_telemetry::{TelemetryConfig, init_telemetry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_telemetry(&TelemetryConfig::new("leadbot").with_format(cli.config.log_format))?;

    commands::run(cli.config, cli.command).await
}
