use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

use api::config::{DEFAULT_DB_URL, ServerConfig};
use api::router::build_app_router;
use api::state::AppState;
use folio_core::Clock;
use services::AppServices;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidPort { raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidPort { raw } => write!(f, "invalid --port value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- serve     [--db <sqlite_url>] [--port <port>]");
    eprintln!("  cargo run -p app -- reconcile [--db <sqlite_url>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db {DEFAULT_DB_URL}");
    eprintln!("  --port 3000");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  BUILDFOLIO_DB_URL, HOST, PORT, JWT_SECRET,");
    eprintln!("  CORS_ORIGINS, REQUEST_TIMEOUT_SECS, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Serve,
    Reconcile,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "serve" => Some(Self::Serve),
            "reconcile" => Some(Self::Reconcile),
            _ => None,
        }
    }
}

/// Command-line overrides; anything left unset falls back to the environment.
#[derive(Debug, Default)]
struct Args {
    db_url: Option<String>,
    port: Option<u16>,
}

impl Args {
    fn parse(
        cmd: Command,
        args: &mut impl Iterator<Item = String>,
    ) -> Result<Self, ArgsError> {
        let mut parsed = Self::default();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    parsed.db_url = Some(normalize_sqlite_url(value));
                }
                "--port" if cmd == Command::Serve => {
                    let value = require_value(args, "--port")?;
                    let port = value
                        .trim()
                        .parse::<u16>()
                        .map_err(|_| ArgsError::InvalidPort { raw: value.clone() })?;
                    parsed.port = Some(port);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(parsed)
    }
}

/// Turn a bare path into an absolute `sqlite://` URL that creates the file.
fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}?mode=rwc", absolute.display())
}

/// Command-line value first, then the configured one, then the default; all
/// normalized so both subcommands accept the same spellings.
fn resolve_db_url(flag: Option<String>, configured: Option<String>) -> String {
    flag.or(configured)
        .filter(|url| !url.trim().is_empty())
        .map_or_else(|| DEFAULT_DB_URL.into(), normalize_sqlite_url)
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "app=info,api=info,services=info,storage=info,tower_http=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn serve(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = ServerConfig::from_env()?;
    config.db_url = resolve_db_url(args.db_url, Some(std::mem::take(&mut config.db_url)));
    if let Some(port) = args.port {
        config.port = port;
    }
    tracing::info!(host = %config.host, port = config.port, "Loaded server configuration");

    let services = AppServices::new_sqlite(&config.db_url, Clock::default()).await?;
    tracing::info!("Database ready");

    let addr = SocketAddr::new(config.host.parse()?, config.port);
    let state = AppState {
        services,
        config: Arc::new(config),
    };
    let app = build_app_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Starting server");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Graceful shutdown complete");
    Ok(())
}

async fn reconcile(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let db_url = resolve_db_url(args.db_url, std::env::var("BUILDFOLIO_DB_URL").ok());

    let services = AppServices::new_sqlite(&db_url, Clock::default()).await?;
    let report = services.progress().reconcile_all().await?;

    println!(
        "reconciled {} instances: {} rewritten, {} pruned, {} backfilled, {} certificates issued",
        report.instances,
        report.rewritten,
        report.pruned,
        report.backfilled,
        report.certificates_issued
    );
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv = std::env::args().skip(1);

    // No subcommand means serve.
    let mut rest: Vec<String> = Vec::new();
    let cmd = match argv.next() {
        None => Command::Serve,
        Some(first) if first == "--help" || first == "-h" => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with("--") => {
            rest.push(first);
            Command::Serve
        }
        Some(first) => Command::from_arg(&first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            ArgsError::UnknownArg(first.clone())
        })?,
    };
    rest.extend(argv);

    let parsed = Args::parse(cmd, &mut rest.into_iter()).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    match cmd {
        Command::Serve => serve(parsed).await,
        Command::Reconcile => reconcile(parsed).await,
    }
}

/// Resolves on Ctrl-C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "Failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    init_tracing();

    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
