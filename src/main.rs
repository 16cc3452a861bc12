/// Identity Service - main entry point
///
/// REST API for the credential lifecycle: signup, email verification,
/// login, password reset and provider (Google/Facebook) login.
use std::net::SocketAddr;
use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use identity_service::{
    config::Config,
    db::PgAccountRepository,
    routes,
    security::TokenIssuer,
    services::{HcaptchaVerifier, HttpIdentityVerifier, LifecycleEngine, SmtpNotifier},
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::from_env()?;

    tracing::info!(
        "Starting Identity Service on {}:{}",
        config.server_host,
        config.server_port
    );

    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&db_pool).await?;
    tracing::info!("Database connection pool initialized");

    let http = reqwest::Client::new();

    let engine = LifecycleEngine::new(
        PgAccountRepository::new(db_pool),
        SmtpNotifier::new(&config.smtp())?,
        HttpIdentityVerifier::new(http.clone()),
        HcaptchaVerifier::new(http, config.hcaptcha_secret.clone()),
        TokenIssuer::new(&config.jwt_secret),
    );

    let state = AppState {
        engine: Arc::new(engine),
    };

    let addr: SocketAddr = format!("{}:{}", config.server_host, config.server_port).parse()?;
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("REST API listening on {}", addr);

    axum::serve(listener, routes::router(state)).await?;

    Ok(())
}
