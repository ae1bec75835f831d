use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use ars_api::{app, worker, AppState, AuthConfig};
use ars_booking::Stores;
use ars_store::{Config, DbClient, InMemoryStore, PgStore, RedisClient};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ars_api=debug,ars_booking=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting reservation API on port {}", config.server.port);

    let mut business_rules = config.business_rules.clone();
    let stores = if config.database.url.is_empty() {
        tracing::warn!("No database configured, using the in-memory store");
        Stores::shared(Arc::new(InMemoryStore::new()))
    } else {
        let db = DbClient::new(&config.database.url)
            .await
            .context("Failed to connect to Postgres")?;
        db.migrate().await.context("Failed to run migrations")?;
        business_rules = db
            .fetch_business_rules(business_rules)
            .await
            .context("Failed to load business rules")?;
        Stores::shared(Arc::new(PgStore::new(db.pool.clone())))
    };

    let redis = match &config.redis {
        Some(redis) => match RedisClient::new(&redis.url).await {
            Ok(client) => Some(Arc::new(client)),
            Err(e) => {
                tracing::warn!("Redis unavailable, rate limiting disabled: {}", e);
                None
            }
        },
        None => None,
    };

    let state = AppState::new(
        stores,
        business_rules.clone(),
        AuthConfig {
            secret: config.auth.jwt_secret.clone(),
            expiration: config.auth.jwt_expiration_seconds,
        },
        &config.server.public_url,
        redis,
    );

    tokio::spawn(worker::start_hold_expiry_worker(
        state.reservations.clone(),
        tokio::time::Duration::from_secs(business_rules.hold_sweep_seconds.max(1)),
    ));

    let app = app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;
    Ok(())
}
