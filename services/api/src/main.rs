use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use common::database::{self, DatabaseConfig};
use common::store::DocumentStore;

use api::config::AppConfig;
use api::email::{EmailConfig, SmtpMailer};
use api::geocoder::{GeocoderConfig, HttpGeocoder};
use api::jwt::{JwtConfig, JwtService};
use api::routes;
use api::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env();
    let db_config = DatabaseConfig::from_env()?;
    let pool = database::init_pool(&db_config).await?;
    database::health_check(&pool).await?;
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| common::error::StoreError::Migration(e.to_string()))?;
    info!("Database ready");

    let jwt = JwtService::new(JwtConfig::from_env()?);
    let mailer = Arc::new(SmtpMailer::new(EmailConfig::from_env()?)?);
    let geocoder = Arc::new(HttpGeocoder::new(GeocoderConfig::from_env()?));
    let store = DocumentStore::new(pool);

    let state = AppState::new(config.clone(), jwt, store, mailer, geocoder);
    let app = routes::router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("API listening on {addr}");
    axum::serve(listener, app).await?;

    Ok(())
}
