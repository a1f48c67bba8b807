use anyhow::{Context, Result};
use clap::Parser;
use net_dump::config::{config_dir, Config};
use net_dump::proxy::{BindPolicy, Forwarder, HyperForwarder, ListenerSet};
use net_dump::TranscriptWriter;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "net-dump")]
#[command(
    author,
    version,
    about = "HTTP/HTTPS proxy that writes a transcript of every exchange to disk"
)]
struct Args {
    /// Configuration file (JSON)
    config: PathBuf,

    /// Log filter (trace, debug, info, warn, error, or a full EnvFilter directive)
    #[arg(long, env = "NET_DUMP_LOG", default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long)]
    json_logs: bool,

    /// Validate configuration and exit
    #[arg(long)]
    validate: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    if args.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .init();
    }

    let config = Config::from_file(&args.config)?;
    let mappings = config.resolve_mappings(&config_dir(&args.config))?;

    if args.validate {
        info!("Configuration is valid ({} mappings)", mappings.len());
        return Ok(());
    }

    let writer = Arc::new(TranscriptWriter::new(
        config.request_logs.clone(),
        config.main_log.clone(),
    ));
    writer.prepare().with_context(|| {
        format!(
            "Failed to create log directories for {}",
            config.request_logs.display()
        )
    })?;

    let forwarder: Arc<dyn Forwarder> =
        Arc::new(HyperForwarder::new().context("Failed to build backend TLS client")?);

    let policy = if config.abort_on_bind_error {
        BindPolicy::AbortAll
    } else {
        BindPolicy::Isolate
    };
    let mut listeners = ListenerSet::start(mappings, writer, forwarder, policy).await?;

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    info!("Shutting down");
    listeners.shutdown().await;

    Ok(())
}
