use std::{net::SocketAddr, process::exit};

use axum::{
    Router,
    extract::{MatchedPath, Request},
};
use axum_server::Handle;
use clap::Parser;
use rusqlite::Connection;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use ledger_ingest::{
    AppState, PaginationConfig, UploadConfig, build_router, cors_layer, graceful_shutdown,
};

/// The REST API server for ledger_ingest.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// The port to serve the API from.
    #[arg(short, long, env = "PORT", default_value_t = 9000)]
    port: u16,

    /// File path to the application SQLite database.
    #[arg(long, env = "DATABASE_PATH", default_value = "transactions.db")]
    db_path: String,

    /// The minimum level of log messages, e.g. "debug" or "info".
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// The deployment environment. Logs are compact in "production" and
    /// pretty printed otherwise.
    #[arg(long, env = "ENV", default_value = "development")]
    environment: String,

    /// The name the service reports in health checks and logs.
    #[arg(long, env = "SERVICE_NAME", default_value = "ledger-ingest")]
    service_name: String,

    /// A comma separated list of origins allowed to call the API, or "*".
    #[arg(long, env = "CORS_ALLOW_ORIGINS", default_value = "*")]
    cors_allow_origins: String,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    setup_logging(&args.log_level, &args.environment);

    tracing::info!(
        service = %args.service_name,
        version = env!("CARGO_PKG_VERSION"),
        environment = %args.environment,
        port = args.port,
        "Starting application"
    );

    let conn = match Connection::open(&args.db_path) {
        Ok(conn) => conn,
        Err(error) => {
            tracing::error!("Could not open database at {}: {error}", args.db_path);
            exit(1);
        }
    };

    let state = match AppState::new(
        conn,
        &args.service_name,
        PaginationConfig::default(),
        UploadConfig::default(),
    ) {
        Ok(state) => state,
        Err(error) => {
            tracing::error!("Could not initialize database: {error}");
            exit(1);
        }
    };

    let handle = Handle::new();
    tokio::spawn(graceful_shutdown(handle.clone()));

    let router =
        add_tracing_layer(build_router(state)).layer(cors_layer(&args.cors_allow_origins));

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    tracing::info!("HTTP server listening on {}", addr);

    if let Err(error) = axum_server::bind(addr)
        .handle(handle)
        .serve(router.into_make_service())
        .await
    {
        tracing::error!("Server error: {error}");
        exit(1);
    }

    tracing::info!("Server stopped");
}

fn setup_logging(log_level: &str, environment: &str) {
    let filter = EnvFilter::try_new(log_level).unwrap_or_else(|error| {
        eprintln!("Invalid log level {log_level:?} ({error}), falling back to \"info\"");
        EnvFilter::new("info")
    });

    let registry = tracing_subscriber::registry().with(filter);

    if environment == "production" {
        registry
            .with(tracing_subscriber::fmt::layer().compact())
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }
}

fn add_tracing_layer(router: Router) -> Router {
    let tracing_layer = TraceLayer::new_for_http()
        .make_span_with(|req: &Request| {
            let method = req.method();
            let uri = req.uri();

            let matched_path = req
                .extensions()
                .get::<MatchedPath>()
                .map(|matched_path| matched_path.as_str());

            tracing::debug_span!("request", %method, %uri, matched_path)
        })
        // By default, `TraceLayer` will log 5xx responses but we're doing our specific
        // logging of errors so disable that
        .on_failure(());

    router.layer(tracing_layer)
}
