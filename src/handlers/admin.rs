//! Admin-only operations: delivery statistics, manual pushes, platform-wide
//! broadcasts, and a registry health snapshot. All require an admin-class
//! credential (admin or supervisor).

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use super::ApiResponse;
use crate::auth::AuthenticatedUser;
use crate::error::{AppError, AppResult};
use crate::models::{EventType, NewNotification, RoleClass};
use crate::router::{DeliveryTarget, NotificationRouter};
use crate::store::NotificationStore;
use crate::websocket::ConnectionRegistry;

#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    pub days: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct TestPushRequest {
    pub recipient_id: Uuid,
    pub title: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BroadcastRequest {
    /// "customers" | "maids" | "admins" | "all"
    pub target: String,
    pub title: String,
    pub message: String,
    pub data: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct MaintenanceRequest {
    pub message: String,
    pub starts_at: Option<chrono::DateTime<chrono::Utc>>,
    pub ends_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct EmergencyRequest {
    pub message: String,
}

/// GET /api/v1/admin/notifications/stats?days=7
pub async fn stats(
    user: AuthenticatedUser,
    store: web::Data<NotificationStore>,
    query: web::Query<StatsQuery>,
) -> AppResult<HttpResponse> {
    user.require_admin()?;
    let days = query.days.unwrap_or(7).clamp(1, 365);
    let stats = store.stats(days).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(stats)))
}

/// POST /api/v1/admin/notifications/test
pub async fn test_push(
    user: AuthenticatedUser,
    router: web::Data<NotificationRouter>,
    body: web::Json<TestPushRequest>,
) -> AppResult<HttpResponse> {
    user.require_admin()?;

    let event = NewNotification::new(
        EventType::System,
        body.title.clone().unwrap_or_else(|| "Test notification".to_string()),
        body.message
            .clone()
            .unwrap_or_else(|| "This is a test notification".to_string()),
    );
    let outcome = router
        .deliver(event, DeliveryTarget::User(body.recipient_id))
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(json!({
        "recipient_id": body.recipient_id,
        "pushed": outcome.pushed > 0,
        "persisted": outcome.persisted,
    }))))
}

/// POST /api/v1/admin/notifications/broadcast
pub async fn broadcast(
    user: AuthenticatedUser,
    router: web::Data<NotificationRouter>,
    body: web::Json<BroadcastRequest>,
) -> AppResult<HttpResponse> {
    user.require_admin()?;

    let target = match body.target.as_str() {
        "all" => DeliveryTarget::All,
        other => RoleClass::parse(other)
            .map(DeliveryTarget::Role)
            .ok_or_else(|| AppError::BadRequest(format!("unknown broadcast target: {}", other)))?,
    };

    let mut event = NewNotification::new(EventType::System, body.title.clone(), body.message.clone());
    if let Some(data) = body.data.clone() {
        event = event.with_data(data);
    }

    let outcome = router.deliver(event, target).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(json!({
        "pushed": outcome.pushed,
        "persisted": outcome.persisted,
    }))))
}

/// POST /api/v1/admin/notifications/maintenance
///
/// Maintenance windows are transient announcements: pushed to every live
/// connection, never persisted.
pub async fn maintenance(
    user: AuthenticatedUser,
    router: web::Data<NotificationRouter>,
    body: web::Json<MaintenanceRequest>,
) -> AppResult<HttpResponse> {
    user.require_admin()?;

    let event = NewNotification::new(
        EventType::Maintenance,
        "Scheduled maintenance",
        body.message.clone(),
    )
    .with_data(json!({
        "starts_at": body.starts_at,
        "ends_at": body.ends_at,
    }));

    let outcome = router.deliver(event, DeliveryTarget::All).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(json!({ "pushed": outcome.pushed }))))
}

/// POST /api/v1/admin/notifications/emergency
pub async fn emergency(
    user: AuthenticatedUser,
    router: web::Data<NotificationRouter>,
    body: web::Json<EmergencyRequest>,
) -> AppResult<HttpResponse> {
    user.require_admin()?;

    let event = NewNotification::new(EventType::Emergency, "Emergency alert", body.message.clone());
    let outcome = router.deliver(event, DeliveryTarget::All).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(json!({ "pushed": outcome.pushed }))))
}

/// GET /api/v1/admin/notifications/health
pub async fn connection_health(
    user: AuthenticatedUser,
    registry: web::Data<ConnectionRegistry>,
) -> AppResult<HttpResponse> {
    user.require_admin()?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(registry.stats())))
}

/// Register routes
pub fn register_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1/admin/notifications")
            .route("/stats", web::get().to(stats))
            .route("/test", web::post().to(test_push))
            .route("/broadcast", web::post().to(broadcast))
            .route("/maintenance", web::post().to(maintenance))
            .route("/emergency", web::post().to(emergency))
            .route("/health", web::get().to(connection_health)),
    );
}
