use std::io;
use std::time::Duration;

use actix_web::{middleware, web, App, HttpServer};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use notification_service::handlers::{
    admin::register_routes as register_admin,
    notifications::register_routes as register_notifications,
};
use notification_service::scheduler::Scheduler;
use notification_service::websocket::{self, HealthMonitor};
use notification_service::{metrics, Config, ConnectionRegistry, NotificationRouter, NotificationStore};

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,actix_web=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting notification service");

    let config = Config::from_env()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))?;

    let db_pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(&config.database.url)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "failed to connect to database");
            io::Error::new(io::ErrorKind::Other, "database connection failed")
        })?;
    tracing::info!("Successfully connected to database");

    notification_service::migrations::run_all(&db_pool)
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;

    // Registry owned here, injected everywhere; dropped on shutdown
    let registry = ConnectionRegistry::new();
    let store = NotificationStore::new(db_pool.clone());
    let router = NotificationRouter::new(store.clone(), registry.clone());
    tracing::info!("Connection registry initialized");

    let monitor = HealthMonitor::new(
        registry.clone(),
        Duration::from_secs(config.websocket.sweep_interval_secs),
        Duration::from_secs(config.websocket.idle_timeout_secs),
    );
    let _monitor_handle = monitor.spawn();

    let _producer_handles =
        Scheduler::new(store.clone(), router.clone(), config.scheduler.clone()).spawn();
    tracing::info!("Scheduled producers started");

    let addr = format!("0.0.0.0:{}", config.app.port);
    tracing::info!("Starting HTTP server on {}", addr);

    let app_config = config.clone();
    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(app_config.clone()))
            .app_data(web::Data::new(db_pool.clone()))
            .app_data(web::Data::new(registry.clone()))
            .app_data(web::Data::new(store.clone()))
            .app_data(web::Data::new(router.clone()))
            .wrap(middleware::Logger::default())
            .wrap(metrics::MetricsMiddleware)
            .route("/health", web::get().to(|| async { "OK" }))
            .route("/metrics", web::get().to(metrics::serve_metrics))
            .route("/ws", web::get().to(websocket::ws_entry))
            .configure(|cfg| {
                register_notifications(cfg);
                register_admin(cfg);
            })
    })
    .bind(&addr)?
    .run()
    .await
}
