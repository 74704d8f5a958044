//! # emoji-art
//!
//! Command-line entry point.

use std::sync::Arc;

use clap::Parser;
use emoji_cli::{App, CliArgs, CliConfig};
use emoji_core::FileGateway;
use emoji_runtime::DefaultTransport;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing with optional JSON format.
///
/// Logs go to stderr so command output stays clean on stdout.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,emoji_runtime=debug,emoji_core=debug"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    // RUST_LOG_FORMAT=json for machine-readable logs
    if std::env::var("RUST_LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer.json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let args = CliArgs::parse();
    let config = CliConfig::from(&args);
    tracing::debug!("Data directory: {}", config.data_dir.display());

    let gateway = Arc::new(FileGateway::new(&config.data_dir)?);
    let transport = Arc::new(DefaultTransport::new(config.fetch.clone())?);
    let mut app = App::new(gateway, transport, config)?;

    let mut stdout = std::io::stdout().lock();
    app.execute(args.command, &mut stdout).await
}
