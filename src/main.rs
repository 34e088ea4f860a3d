mod bot;
mod commands;
mod config;
mod db;
mod format;
mod handlers;
mod matrix;
mod models;
mod report;

use anyhow::{Context, Result};
use axum::{routing::get, Router};
use std::sync::Arc;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "oncall_bot=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment variables
    dotenv::dotenv().ok();
    let config = config::Config::from_env()?;

    // Set up database
    tracing::info!("Connecting to database: {}", config.database_url);
    let db_pool = db::create_pool(&config.database_url).await
        .context("Failed to create database pool")?;

    tracing::info!("Running database migrations");
    db::run_migrations(&db_pool).await
        .context("Failed to run migrations")?;

    let client = matrix::MatrixClient::new(
        &config.homeserver_url,
        config.user_id.clone(),
        config.access_token.clone(),
    )?;

    let bot = bot::Bot::new(
        config.user_id.clone(),
        Arc::new(client),
        Arc::new(db::RoomRepository::new(db_pool.clone())),
        Arc::new(db::ShiftRepository::new(db_pool.clone())),
        Arc::new(db::FollowUpRepository::new(db_pool)),
    )?
    .with_auto_join(config.auto_join)
    .with_holidays(config.week_holidays.clone());
    let bot = Arc::new(bot);
    tracing::info!("Weekly holidays: {:?}", bot.holidays.days());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let poller = {
        let bot = bot.clone();
        let shutdown_rx = shutdown_rx.clone();
        let interval = config.sync_interval;
        tokio::spawn(async move { bot.run(interval, shutdown_rx).await })
    };

    // Health check listener
    let app = Router::new()
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http());

    let addr = format!("{}:{}", config.host, config.port);
    tracing::info!("Starting health check server on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    let mut server_shutdown = shutdown_rx;
    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = server_shutdown.wait_for(|stop| *stop).await;
            })
            .await
    });

    tokio::signal::ctrl_c().await.context("Failed to listen for shutdown signal")?;
    tracing::info!("Shutting down");
    shutdown_tx.send(true).ok();

    poller.await.context("Polling task panicked")?;
    server.await.context("Health check task panicked")??;

    Ok(())
}

async fn health_check() -> &'static str {
    "OK"
}
