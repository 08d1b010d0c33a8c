use clap::Parser;
use std::env;
use tracing::{info, warn, Level};
use tracing_subscriber::{
    fmt::{self, time::ChronoUtc},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use copilot_server::{create_app, AnonymousAccess, AppConfig, CopilotServer};
use error_common::{log_error, CopilotError, Result};

/// Clinical Copilot HTTP server
#[derive(Parser, Debug)]
#[command(name = "copilot-server")]
#[command(about = "Consultation recording, transcription and EHR note API")]
struct Args {
    /// Server bind address
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    host: String,

    /// Server port
    #[arg(short, long, env = "PORT", default_value = "5000")]
    port: u16,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Keep all data in memory instead of Postgres
    #[arg(long)]
    in_memory: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is normal in production
    let _ = dotenvy::dotenv();
    let args = Args::parse();

    init_tracing(args.verbose)?;

    if let Err(e) = run(args).await {
        log_error("startup", &e);
        return Err(e);
    }
    Ok(())
}

async fn run(args: Args) -> Result<()> {
    info!(version = env!("CARGO_PKG_VERSION"), "Starting Clinical Copilot server");

    let config = AppConfig::from_env(args.in_memory)?;
    let config = if args.in_memory {
        AppConfig {
            database_url: None,
            ..config
        }
    } else {
        config
    };

    let server = CopilotServer::from_config(&config).await?;
    info!(
        persistent = server.database.is_some(),
        diagnosis = server.diagnosis_enabled(),
        "Services initialized"
    );
    if let AnonymousAccess::Allowed { user_id, .. } = &server.anonymous {
        warn!(
            user_id = *user_id,
            "ALLOW_ANONYMOUS is enabled: requests without a valid token act as the demo user"
        );
    }

    let database = server.database.clone();
    let app = create_app(server);

    let addr = format!("{}:{}", args.host, args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| CopilotError::NetworkError(format!("Failed to bind to {}: {}", addr, e)))?;

    info!(address = %addr, "Server listening; API available under /api");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| CopilotError::ServerError(format!("HTTP server error: {}", e)))?;

    if let Some(db) = database {
        db.close().await;
    }
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Could not listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// Human-readable output in development, JSON lines when
/// `COPILOT_ENV=production`. `RUST_LOG` overrides the default filter.
fn init_tracing(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };

    let is_production = env::var("COPILOT_ENV")
        .map(|v| v.eq_ignore_ascii_case("production"))
        .unwrap_or(false);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "copilot_server={level},database_layer={level},voice_recognition_service={level},\
             diagnosis_service={level},ehr_document={level},tower_http=info,sqlx=warn,hyper=info,reqwest=info",
            level = level
        )
        .into()
    });

    let result = if is_production {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(false)
                    .json(),
            )
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_line_number(true)
                    .pretty(),
            )
            .try_init()
    };

    result.map_err(|e| CopilotError::LoggingError(e.to_string()))
}
