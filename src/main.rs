use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

use actix_web::web;
use sqlx::postgres::PgPoolOptions;
use tokio::sync::watch;

use tokenkeep::auth::{CredentialHasher, TokenService};
use tokenkeep::configuration::get_configuration;
use tokenkeep::revocation::{PgRevocationStore, RevocationStore, RevocationSweeper};
use tokenkeep::routes::CookiePolicy;
use tokenkeep::session::SessionFacade;
use tokenkeep::startup::run;
use tokenkeep::telemetry::init_telemetry;
use tokenkeep::users::{PgUserStore, UserStore};

fn io_error(kind: std::io::ErrorKind, message: &str) -> std::io::Error {
    std::io::Error::new(kind, message.to_string())
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    init_telemetry();

    tracing::info!("Starting application");

    let configuration = match get_configuration() {
        Ok(config) => {
            tracing::info!("Configuration loaded successfully");
            config
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to read configuration");
            return Err(io_error(
                std::io::ErrorKind::InvalidInput,
                "Configuration error",
            ));
        }
    };

    tracing::info!(
        host = %configuration.database.host,
        database = %configuration.database.database_name,
        "Connecting to database"
    );

    let pool = PgPoolOptions::new()
        .max_connections(configuration.database.max_connections)
        .connect(&configuration.database.connection_string())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to create connection pool");
            io_error(
                std::io::ErrorKind::ConnectionRefused,
                "Database connection error",
            )
        })?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to run database migrations");
            io_error(std::io::ErrorKind::Other, "Database migration error")
        })?;

    tracing::info!("Database ready");

    let revocations: Arc<dyn RevocationStore> = Arc::new(PgRevocationStore::new(pool.clone()));
    let users: Arc<dyn UserStore> = Arc::new(PgUserStore::new(pool.clone()));

    let (tokens, hasher) = match (
        TokenService::from_settings(&configuration.jwt, revocations.clone()),
        CredentialHasher::from_settings(&configuration.credentials),
    ) {
        (Ok(tokens), Ok(hasher)) => (tokens, hasher),
        (Err(e), _) | (_, Err(e)) => {
            tracing::error!(error = %e, "Invalid security settings");
            return Err(io_error(
                std::io::ErrorKind::InvalidInput,
                "Configuration error",
            ));
        }
    };

    let sessions = web::Data::new(SessionFacade::new(users, hasher, Arc::new(tokens)));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweep_interval = Duration::from_secs(configuration.revocation.purge_interval_seconds.max(1));
    let sweeper = RevocationSweeper::new(revocations, sweep_interval).spawn(shutdown_rx);

    let address = format!(
        "{}:{}",
        configuration.application.host, configuration.application.port
    );
    let listener = TcpListener::bind(&address)?;
    tracing::info!(address = %address, "Server listening");

    let cookies = CookiePolicy {
        secure: configuration.application.secure_cookies,
    };

    let served = run(listener, sessions, cookies)?.await;

    tracing::info!("Server stopped; shutting down background tasks");

    let _ = shutdown_tx.send(true);
    if let Err(e) = sweeper.await {
        tracing::error!(error = %e, "Revocation sweeper task failed");
    }

    pool.close().await;

    served
}
