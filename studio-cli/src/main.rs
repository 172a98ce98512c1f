//! # Studio
//!
//! Command-line host for the design surface engine.

use clap::Parser;
use studio_cli::{run, CliArgs, CliConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing on stderr with optional JSON format.
///
/// Set `RUST_LOG` to control log levels (default: studio crates at info).
/// Set `RUST_LOG_FORMAT=json` for JSON output.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("warn,studio_cli=info,studio_core=info,studio_assets=info")
    });

    // stdout carries the scene summary
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr);

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

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let args = CliArgs::parse();
    let config = CliConfig::from(&args);
    tracing::debug!("Assets root: {}", config.assets_root.display());

    let summary = run(&config, &args.command).await?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
