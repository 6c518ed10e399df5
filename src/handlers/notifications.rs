//! Caller-scoped notification endpoints.
//!
//! Every operation is bound to the authenticated caller's own records;
//! ownership is enforced in the store queries, so a foreign id simply
//! reads as NotFound.

use actix_web::{web, HttpResponse};
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use super::ApiResponse;
use crate::auth::AuthenticatedUser;
use crate::error::AppResult;
use crate::models::Notification;
use crate::store::{ListFilter, NotificationStore};

#[derive(Debug, Serialize)]
pub struct NotificationPage {
    pub notifications: Vec<Notification>,
    pub unread_count: i64,
    pub page: i64,
    pub limit: i64,
}

/// List the caller's notifications with pagination and filters
///
/// GET /api/v1/notifications
pub async fn list_notifications(
    user: AuthenticatedUser,
    store: web::Data<NotificationStore>,
    query: web::Query<ListFilter>,
) -> AppResult<HttpResponse> {
    let filter = query.into_inner();
    let notifications = store.list(user.user_id, &filter).await?;
    let unread_count = store.unread_count(user.user_id).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(NotificationPage {
        notifications,
        unread_count,
        page: filter.page(),
        limit: filter.limit(),
    })))
}

/// List only unread notifications
///
/// GET /api/v1/notifications/unread
pub async fn list_unread(
    user: AuthenticatedUser,
    store: web::Data<NotificationStore>,
) -> AppResult<HttpResponse> {
    let filter = ListFilter {
        unread_only: Some(true),
        ..Default::default()
    };
    let notifications = store.list(user.user_id, &filter).await?;
    let unread_count = store.unread_count(user.user_id).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(NotificationPage {
        notifications,
        unread_count,
        page: filter.page(),
        limit: filter.limit(),
    })))
}

/// Mark one notification read (idempotent; `read_at` keeps its first value)
///
/// PUT /api/v1/notifications/{id}/read
pub async fn mark_read(
    user: AuthenticatedUser,
    store: web::Data<NotificationStore>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let notification = store.mark_read(path.into_inner(), user.user_id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(notification)))
}

/// Mark all of the caller's unread notifications read
///
/// PUT /api/v1/notifications/read-all
pub async fn mark_all_read(
    user: AuthenticatedUser,
    store: web::Data<NotificationStore>,
) -> AppResult<HttpResponse> {
    let updated = store.mark_all_read(user.user_id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(json!({ "updated": updated }))))
}

/// Delete one of the caller's notifications
///
/// DELETE /api/v1/notifications/{id}
pub async fn delete_notification(
    user: AuthenticatedUser,
    store: web::Data<NotificationStore>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    store.delete(path.into_inner(), user.user_id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(json!({ "deleted": true }))))
}

/// Register routes
pub fn register_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1/notifications")
            .route("", web::get().to(list_notifications))
            .route("/unread", web::get().to(list_unread))
            .route("/read-all", web::put().to(mark_all_read))
            .route("/{id}/read", web::put().to(mark_read))
            .route("/{id}", web::delete().to(delete_notification)),
    );
}
