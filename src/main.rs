use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use price_sentinel::db::{AlertRepository, PriceRepository};
use price_sentinel::notifier::{Notifier, SmtpNotifier};
use price_sentinel::quote::{MoralisQuoteSource, QuoteSource};
use price_sentinel::services::{AlertService, PriceQueryService};
use price_sentinel::stores::{AlertStore, PriceStore};
use price_sentinel::tasks::{
    ChangeDetector,
    PriceIngestionTask,
    RetentionSweeper,
    TaskRegistry,
    ThresholdEvaluator,
};
use price_sentinel::{AppError, Config, Result};
use sea_orm_migration::MigratorTrait;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "price_sentinel=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env().map_err(|e| AppError::Config(e.to_string()))?;

    // Initialize database connection
    let db = sea_orm::Database::connect(&config.database_url)
        .await
        .map_err(AppError::Database)?;

    tracing::info!("Database connected successfully");

    // Run migrations
    migration::Migrator::up(&db, None)
        .await
        .map_err(AppError::Database)?;

    tracing::info!("Migrations completed successfully");

    // External collaborators
    let quote_source: Arc<dyn QuoteSource> =
        Arc::new(MoralisQuoteSource::new(&config).map_err(AppError::Quote)?);
    let notifier: Arc<dyn Notifier> =
        Arc::new(SmtpNotifier::new(&config.smtp).map_err(AppError::Notify)?);

    // Repositories
    let price_repository = Arc::new(PriceRepository::new(db.clone()));
    let alert_repository = Arc::new(AlertRepository::new(db.clone()));

    let prices: Arc<dyn PriceStore> = price_repository.clone();
    let alerts: Arc<dyn AlertStore> = alert_repository.clone();

    // Background tasks, each on its own timer with a skip-if-running guard
    let mut registry = TaskRegistry::new();
    registry.spawn(
        Arc::new(PriceIngestionTask::new(quote_source, prices.clone())),
        config.ingest_interval,
    );
    registry.spawn(
        Arc::new(ThresholdEvaluator::new(
            alerts,
            prices.clone(),
            notifier.clone(),
        )),
        config.evaluate_interval,
    );
    registry.spawn(
        Arc::new(ChangeDetector::new(
            prices.clone(),
            notifier,
            config.change_notify_email.clone(),
            config.change_threshold_pct,
            config.change_window_secs,
            config.change_cooldown_secs,
        )),
        config.detect_interval,
    );
    registry.spawn(
        Arc::new(RetentionSweeper::new(prices.clone(), config.retention_days)),
        config.retention_interval,
    );

    // HTTP API
    let app_state = price_sentinel::api::AppState::new(
        Arc::new(AlertService::new(alert_repository)),
        Arc::new(PriceQueryService::new(prices)),
    );

    let app = Router::new()
        .route("/health", get(health_check))
        .route(
            "/api/alerts",
            post(price_sentinel::api::alerts::create_alert)
                .get(price_sentinel::api::alerts::list_alerts),
        )
        .route(
            "/api/alerts/active",
            get(price_sentinel::api::alerts::list_active_alerts),
        )
        .route(
            "/api/alerts/{id}",
            get(price_sentinel::api::alerts::get_alert)
                .patch(price_sentinel::api::alerts::update_alert)
                .delete(price_sentinel::api::alerts::delete_alert),
        )
        .route(
            "/api/prices/latest",
            get(price_sentinel::api::prices::latest_prices),
        )
        .route(
            "/api/prices/hourly",
            get(price_sentinel::api::prices::hourly_prices),
        )
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Start server
    let addr = format!("{}:{}", config.server_host, config.server_port);
    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    // Stop the timers after the server drains; in-flight task runs finish
    // on the runtime.
    registry.shutdown().await;

    Ok(())
}

async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({ "status": "ok" }))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
}
