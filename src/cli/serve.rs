//! Serve command implementation

use crate::cli::ServeArgs;
use crate::config::{AppConfig, DiagFormat, DiagnosticsConfig};
use crate::engine::{Record, Sink};
use crate::logging::{
    Config, Exchange, Locals, RequestLoggerLayer, UuidRequestId,
};
use crate::{LevelLogger, Logger};
use axum::error_handling::HandleErrorLayer;
use axum::extract::Path;
use axum::http::{HeaderName, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{BoxError, Router};
use std::net::SocketAddr;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tower::timeout::error::Elapsed;
use tower::timeout::TimeoutLayer;
use tower::ServiceBuilder;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Load configuration with CLI overrides
pub fn load_config_with_overrides(args: &ServeArgs) -> anyhow::Result<AppConfig> {
    // Load from file if it exists, otherwise use defaults
    let mut config = if args.config.exists() {
        AppConfig::load(Some(&args.config))?
    } else {
        tracing::debug!("Config file not found, using defaults");
        AppConfig::default()
    };

    config = config.with_env_overrides();

    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(ref host) = args.host {
        config.server.host = host.clone();
    }
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }

    Ok(config)
}

/// Initialize tracing for the server's own diagnostics
///
/// Diagnostics go to stderr so stdout carries only the JSON request log.
pub fn init_tracing(config: &DiagnosticsConfig) -> anyhow::Result<()> {
    let filter_str = crate::logging::build_filter_directives(config);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

    match config.format {
        DiagFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .pretty()
                        .with_writer(std::io::stderr),
                )
                .try_init()?;
        }
        DiagFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                )
                .try_init()?;
        }
    }

    Ok(())
}

/// User resolved by a handler, picked up by the after-next enricher.
#[derive(Debug, Clone)]
struct UserId(String);

async fn hello(logger: Logger) -> &'static str {
    logger.debug(&"saying hello");
    "hello"
}

async fn health() -> &'static str {
    "ok"
}

async fn user(Path(id): Path<String>, locals: Locals, logger: Logger) -> String {
    logger.debugf(format_args!("looking up user {}", id));
    locals.insert(UserId(id.clone()));
    format!("user {}", id)
}

async fn sleep(Path(ms): Path<u64>) -> String {
    tokio::time::sleep(Duration::from_millis(ms)).await;
    format!("slept {}ms", ms)
}

fn error_status(error: &BoxError) -> StatusCode {
    if error.is::<Elapsed>() {
        StatusCode::REQUEST_TIMEOUT
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

/// Errors the request logger was configured to pass through.
async fn handle_unhandled(error: BoxError) -> Response {
    (error_status(&error), error.to_string()).into_response()
}

/// Build the demo application, logging requests to `sink`
pub fn build_app(config: &AppConfig, sink: Sink) -> anyhow::Result<Router> {
    let logger = config.logging.build_logger(sink);
    let request_id_header =
        HeaderName::from_bytes(config.logging.request.request_id_header.as_bytes())?;

    let request_config: Config = config
        .logging
        .request
        .to_config(logger)?
        .error_handler(|error, _exchange: &Exchange<'_>| {
            (error_status(error), error.to_string()).into_response()
        })
        .after_next_enricher(|exchange, chain| match exchange.locals().get::<UserId>() {
            Some(UserId(id)) => chain.str("user", id),
            None => chain,
        });

    let middleware = ServiceBuilder::new()
        .layer(HandleErrorLayer::new(handle_unhandled))
        .layer(SetRequestIdLayer::new(
            request_id_header.clone(),
            UuidRequestId,
        ))
        .layer(PropagateRequestIdLayer::new(request_id_header))
        .layer(RequestLoggerLayer::new(request_config))
        .layer(TimeoutLayer::new(config.server.request_timeout()));

    Ok(Router::new()
        .route("/", get(hello))
        .route("/health", get(health))
        .route("/users/:id", get(user))
        .route("/sleep/:ms", get(sleep))
        .layer(middleware))
}

/// Wait for shutdown signal (SIGINT or SIGTERM)
async fn shutdown_signal(cancel_token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install CTRL+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, shutting down...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, shutting down...");
        }
        _ = cancel_token.cancelled() => {}
    }

    cancel_token.cancel();
}

/// Main serve command handler
pub async fn run_serve(args: ServeArgs) -> anyhow::Result<()> {
    let config = load_config_with_overrides(&args)?;
    config.validate()?;

    init_tracing(&config.logging.diagnostics)?;

    if let Some(level) = config.logging.global_level {
        if let Err(installed) = crate::engine::init_global_level(level) {
            tracing::warn!(%installed, "Global log level already set");
        }
    }

    tracing::info!("Starting reqlog demo server");
    tracing::debug!(?config, "Loaded configuration");

    let app = build_app(&config, Sink::stdout())?;

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "Demo server listening");

    let cancel_token = CancellationToken::new();
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(cancel_token))
    .await?;

    tracing::info!("Demo server stopped");
    Ok(())
}
