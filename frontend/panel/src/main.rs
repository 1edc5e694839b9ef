//! iconbridge command line panel
//!
//! Runs the controller in-process and drives it over the bridge exactly as
//! the panel would: every command is a request followed by a wait for its
//! correlated response.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use iconbridge_backend::{Config, Controller, FileStore, SvgDirectoryHost};
use iconbridge_panel::state::NotificationLevel;
use iconbridge_panel::{DirectorySink, PanelSession};
use iconbridge_shared::bridge::channel;
use iconbridge_shared::logging::{init_logging, LoggingConfig};
use iconbridge_shared::models::redact_token;
use iconbridge_shared::{
    Density, ExportFormat, Locale, PanelMessage, RemoteVerifier, RepositoryKind, UiRequest,
};

/// How long to wait for the controller's `init` snapshot
const READY_TIMEOUT: Duration = Duration::from_secs(10);

/// Limit for requests that only touch storage
const RESPONSE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Storage file path, overriding the configuration
    #[arg(short, long)]
    storage: Option<PathBuf>,

    /// SVG files, or a single directory of SVG files, forming the selection
    #[arg(long, num_args = 1.., global = true)]
    source: Vec<PathBuf>,

    /// Language for notices (en, ru)
    #[arg(short, long, value_parser = parse_locale)]
    locale: Option<Locale>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List repositories and where to create their tokens
    Repos,
    /// Show the active repository, stored tokens and selection size
    Status,
    /// Make a repository the active one
    Select {
        #[arg(value_parser = parse_kind)]
        kind: RepositoryKind,
    },
    /// Manage repository tokens
    Token {
        #[command(subcommand)]
        action: TokenAction,
    },
    /// Export the selection into a zip archive
    Export(ExportArgs),
}

#[derive(Subcommand)]
enum TokenAction {
    /// Store a token
    Save {
        token: String,
        /// Repository; defaults to the active one
        #[arg(short, long, value_parser = parse_kind)]
        kind: Option<RepositoryKind>,
    },
    /// Remove a stored token
    Clear {
        #[arg(short, long, value_parser = parse_kind)]
        kind: Option<RepositoryKind>,
    },
    /// Verify a stored token against its service
    Check {
        #[arg(short, long, value_parser = parse_kind)]
        kind: Option<RepositoryKind>,
    },
}

#[derive(clap::Args)]
struct ExportArgs {
    /// svg, png or jpg
    #[arg(short, long, value_parser = parse_format)]
    format: Option<ExportFormat>,

    /// Density tier for raster formats; repeat for several (default: all)
    #[arg(long = "density", value_parser = parse_density)]
    densities: Vec<Density>,

    /// Put every asset in the unsorted folder
    #[arg(long)]
    no_group: bool,

    /// JPEG quality between 0 and 1
    #[arg(short, long)]
    quality: Option<f32>,

    /// Archive name
    #[arg(short, long)]
    name: Option<String>,

    /// Directory to save the archive in
    #[arg(short, long, default_value = ".")]
    out: PathBuf,
}

fn parse_kind(value: &str) -> Result<RepositoryKind, String> {
    value.parse().map_err(|e| {
        let known: Vec<&str> = RepositoryKind::ALL.iter().map(|k| k.as_str()).collect();
        format!("{} (expected one of: {})", e, known.join(", "))
    })
}

fn parse_format(value: &str) -> Result<ExportFormat, String> {
    ExportFormat::ALL
        .into_iter()
        .find(|format| format.extension() == value.to_ascii_lowercase())
        .ok_or_else(|| format!("unknown format: {} (expected svg, png or jpg)", value))
}

fn parse_density(value: &str) -> Result<Density, String> {
    Density::ALL
        .into_iter()
        .find(|density| density.as_str() == value.to_ascii_lowercase())
        .ok_or_else(|| format!("unknown density: {}", value))
}

fn parse_locale(value: &str) -> Result<Locale, String> {
    value.parse()
}

/// Print pending notices; returns whether any of them was a failure
fn flush_notifications(session: &PanelSession) -> bool {
    let mut failed = false;
    for notice in session.with_state(|state| state.notifications.drain()) {
        match notice.level {
            NotificationLevel::Success => println!("{}", notice.text),
            NotificationLevel::Failure => {
                eprintln!("{}", notice.text);
                failed = true;
            }
        }
    }
    failed
}

/// Send `request`, wait for its answer and print the resulting notices.
///
/// Returns whether the request succeeded.
async fn respond(
    session: &PanelSession,
    request: UiRequest,
    limit: Option<Duration>,
) -> Result<bool> {
    let response = session.request_and_wait(request, limit).await?;
    let failed = flush_notifications(session);
    Ok(!failed && !matches!(response, PanelMessage::Error { .. }))
}

fn print_repositories(session: &PanelSession) {
    let state = session.state();
    for kind in RepositoryKind::ALL {
        let config = kind.config();
        let marker = if kind == state.active_kind() { "*" } else { " " };
        println!(
            "{} {:<16} {} ({} {})",
            marker,
            kind.as_str(),
            kind.label(),
            config.service(),
            config.display_path()
        );
        println!("    create a token: {}", config.token_settings_url());
    }
}

fn print_status(session: &PanelSession) {
    let state = session.state();
    let active = state.active_kind();
    println!("Repository: {} ({})", active.label(), active.as_str());
    println!("Selection:  {}", state.selection.count().unwrap_or(0));
    println!("Format:     {}", state.export.format());
    println!("Tokens:");
    for kind in RepositoryKind::ALL {
        let token = state.auth.saved_token(kind);
        let shown = if token.is_empty() {
            format!("not set ({})", kind.token_placeholder())
        } else {
            redact_token(token)
        };
        println!("  {:<16} {}", kind.as_str(), shown);
    }
}

async fn run_command(
    session: &PanelSession,
    command: Command,
    config: &Config,
) -> Result<bool> {
    let active = session.state().active_kind();

    match command {
        Command::Repos => print_repositories(session),
        Command::Status => print_status(session),
        Command::Select { kind } => {
            let request = UiRequest::set_selected(kind);
            let succeeded = respond(session, request, Some(RESPONSE_TIMEOUT)).await?;
            if succeeded {
                println!("Active repository: {}", session.state().active_kind().label());
            }
            return Ok(succeeded);
        }
        Command::Token { action } => {
            let (request, limit) = match action {
                TokenAction::Save { token, kind } => {
                    let kind = kind.unwrap_or(active);
                    let request = session.with_state(|state| {
                        state.auth.edit(kind, token);
                        state.auth.save_request(kind)
                    });
                    (request, RESPONSE_TIMEOUT)
                }
                TokenAction::Clear { kind } => {
                    let kind = kind.unwrap_or(active);
                    let request = session.with_state(|state| state.auth.clear_request(kind));
                    (request, RESPONSE_TIMEOUT)
                }
                TokenAction::Check { kind } => {
                    let kind = kind.unwrap_or(active);
                    let request = session.with_state(|state| state.auth.begin_check(kind));
                    // The controller enforces the verification timeout itself
                    (request, config.verification_timeout() + RESPONSE_TIMEOUT)
                }
            };
            return respond(session, request, Some(limit)).await;
        }
        Command::Export(options) => {
            let request = session.with_state(|state| {
                if let Some(format) = options.format {
                    if !state.export.set_format(format) {
                        bail!(
                            "{} only accepts SVG exports",
                            state.active_kind().label()
                        );
                    }
                }
                if !options.densities.is_empty() {
                    state.export.set_densities(options.densities.clone());
                }
                state.export.set_group_by_size(!options.no_group);
                state.export.set_quality(options.quality);
                state.export.set_zip_name(options.name.clone());
                Ok(state.export.start())
            })?;

            let succeeded = respond(session, request, None).await?;
            for path in session.take_downloads() {
                println!("{}", path.display());
            }
            return Ok(succeeded);
        }
    }

    Ok(true)
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    let config_path = args.config.clone().unwrap_or_else(Config::default_path);
    let mut config = Config::load_or_default(&config_path)
        .with_context(|| format!("Failed to load configuration from {:?}", config_path))?;
    if let Some(storage) = args.storage {
        config.storage.path = storage;
    }

    // Quiet unless asked; RUST_LOG still wins
    let logging = if args.debug {
        config.subscriber_config(true)
    } else {
        LoggingConfig::with_level(tracing::Level::WARN)
    };
    init_logging(&logging);
    debug!("Configuration from {:?}", config_path);

    let locale = args.locale.unwrap_or(config.ui.locale);

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
    let controller = Controller::new(store, host, verifier, message_outbox)
        .configured(&config)
        .with_locale(locale);
    let controller_task = tokio::spawn(async move { controller.run(request_inbox).await });

    let out_dir = match &args.command {
        Command::Export(options) => options.out.clone(),
        _ => PathBuf::from("."),
    };
    let session = PanelSession::new(
        request_outbox,
        message_inbox,
        Arc::new(DirectorySink::new(out_dir)),
        locale,
    );

    session
        .wait_until(
            |state| state.is_initialized() && state.selection.count().is_some(),
            READY_TIMEOUT,
        )
        .await
        .context("Controller did not start")?;
    if flush_notifications(&session) {
        warn!("Controller reported an error while starting");
    }

    let outcome = run_command(&session, args.command, &config).await;

    drop(session);
    if let Err(e) = controller_task.await {
        warn!("Controller task ended abnormally: {}", e);
    }

    Ok(if outcome? {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
