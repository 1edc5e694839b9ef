//! iconbridge controller daemon
//!
//! Serves the panel protocol over stdin/stdout as JSON lines. The document
//! is a set of SVG files given on the command line; logs go to stderr.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

use iconbridge_backend::stdio::{pump_messages, pump_requests};
use iconbridge_backend::{Config, Controller, FileStore, SvgDirectoryHost};
use iconbridge_shared::bridge::channel;
use iconbridge_shared::logging::init_logging;
use iconbridge_shared::RemoteVerifier;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// SVG files, or a single directory of SVG files, forming the selection
    #[arg(required = true)]
    source: Vec<PathBuf>,

    /// Storage file path, overriding the configuration
    #[arg(short, long)]
    storage: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = args.config.clone().unwrap_or_else(Config::default_path);
    let mut config = Config::load_or_default(&config_path)
        .with_context(|| format!("Failed to load configuration from {:?}", config_path))?;
    if let Some(storage) = args.storage {
        config.storage.path = storage;
    }

    init_logging(&config.subscriber_config(args.debug));
    info!("Starting iconbridge controller v{}", env!("CARGO_PKG_VERSION"));

    let store = FileStore::open(&config.storage.path).context("Failed to open storage")?;
    let host = Arc::new(
        SvgDirectoryHost::from_sources(&args.source).context("Failed to load SVG sources")?,
    );
    let verifier = RemoteVerifier::new(
        config.verification_timeout(),
        &config.verification.user_agent,
    );

    let (message_outbox, message_inbox) = channel();
    let (request_outbox, request_inbox) = channel();
    let controller = Controller::new(store, host, verifier, message_outbox).configured(&config);

    let writer = tokio::spawn(pump_messages(message_inbox, tokio::io::stdout()));
    let reader = tokio::spawn(pump_requests(tokio::io::stdin(), request_outbox));

    tokio::select! {
        _ = controller.run(request_inbox) => {}
        signal = tokio::signal::ctrl_c() => match signal {
            Ok(()) => info!("Interrupted, shutting down"),
            Err(e) => warn!("Failed to listen for interrupt: {}", e),
        },
    }

    reader.abort();
    drop(controller);

    match writer.await {
        Ok(Ok(written)) => info!("Controller stopped after {} messages", written),
        Ok(Err(e)) => {
            error!("Message stream failed: {:#}", e);
            return Err(e);
        }
        Err(e) => warn!("Message writer did not finish: {}", e),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_parsing() {
        let args = Args::try_parse_from([
            "iconbridge-backend",
            "--debug",
            "--storage",
            "/tmp/store.json",
            "icons/",
        ])
        .unwrap();

        assert!(args.debug);
        assert_eq!(args.storage, Some(PathBuf::from("/tmp/store.json")));
        assert_eq!(args.source, vec![PathBuf::from("icons/")]);
    }

    #[test]
    fn test_source_is_required() {
        assert!(Args::try_parse_from(["iconbridge-backend"]).is_err());
    }
}
