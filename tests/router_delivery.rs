//! Delivery semantics: live push and offline persistence as two independent,
//! best-effort operations.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use notification_service::models::{
    EventType, NewNotification, Notification, RoleClass, UserRole,
};
use notification_service::router::{DeliveryTarget, NotificationRouter};
use notification_service::websocket::{ConnectionRegistry, Outbound};
use notification_service::{AppError, AppResult, EventStore};
use serde_json::json;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};
use uuid::Uuid;

/// In-memory event store with a switchable outage, standing in for Postgres.
#[derive(Clone, Default)]
struct MemoryStore {
    records: Arc<Mutex<Vec<Notification>>>,
    members: Arc<Mutex<Vec<(Uuid, UserRole)>>>,
    down: Arc<AtomicBool>,
}

impl MemoryStore {
    fn add_member(&self, user_id: Uuid, role: UserRole) {
        self.members.lock().unwrap().push((user_id, role));
    }

    fn go_down(&self) {
        self.down.store(true, Ordering::SeqCst);
    }

    fn records(&self) -> Vec<Notification> {
        self.records.lock().unwrap().clone()
    }
}

impl EventStore for MemoryStore {
    fn insert(
        &self,
        recipient_id: Uuid,
        event: &NewNotification,
        delivered: bool,
    ) -> impl Future<Output = AppResult<Notification>> + Send {
        async move {
            if self.down.load(Ordering::SeqCst) {
                return Err(AppError::Database(sqlx::Error::PoolClosed));
            }
            let record = Notification {
                id: Uuid::new_v4(),
                recipient_id,
                event_type: event.event_type,
                title: event.title.clone(),
                message: event.message.clone(),
                data: event.data.clone(),
                delivered,
                is_read: false,
                read_at: None,
                created_at: Utc::now(),
            };
            self.records.lock().unwrap().push(record.clone());
            Ok(record)
        }
    }

    fn user_ids_with_roles(
        &self,
        roles: &[UserRole],
    ) -> impl Future<Output = AppResult<Vec<Uuid>>> + Send {
        async move {
            if self.down.load(Ordering::SeqCst) {
                return Err(AppError::Database(sqlx::Error::PoolClosed));
            }
            Ok(self
                .members
                .lock()
                .unwrap()
                .iter()
                .filter(|(_, role)| roles.contains(role))
                .map(|(id, _)| *id)
                .collect())
        }
    }
}

fn fixture() -> (
    ConnectionRegistry,
    MemoryStore,
    NotificationRouter<MemoryStore>,
) {
    let registry = ConnectionRegistry::new();
    let store = MemoryStore::default();
    let router = NotificationRouter::new(store.clone(), registry.clone());
    (registry, store, router)
}

fn connect(
    registry: &ConnectionRegistry,
    role: UserRole,
) -> (Uuid, UnboundedReceiver<Outbound>) {
    let user_id = Uuid::new_v4();
    let (tx, rx) = unbounded_channel();
    registry.register(user_id, Uuid::new_v4(), format!("user-{user_id}"), role, tx);
    (user_id, rx)
}

#[tokio::test]
async fn single_identity_persists_exactly_one_copy_live_or_not() {
    let (registry, store, router) = fixture();

    let offline = Uuid::new_v4();
    let outcome = router
        .deliver(
            NewNotification::new(EventType::PaymentSuccess, "Payment received", "Thank you"),
            DeliveryTarget::User(offline),
        )
        .await
        .unwrap();
    assert_eq!(outcome.pushed, 0);
    assert_eq!(outcome.persisted, 1);

    let (live, mut rx) = connect(&registry, UserRole::Customer);
    let outcome = router
        .deliver(
            NewNotification::new(EventType::PaymentSuccess, "Payment received", "Thank you"),
            DeliveryTarget::User(live),
        )
        .await
        .unwrap();
    assert_eq!(outcome.pushed, 1);
    assert_eq!(outcome.persisted, 1);
    assert!(rx.try_recv().is_ok());

    let records = store.records();
    assert_eq!(records.len(), 2);
    assert!(!records.iter().find(|r| r.recipient_id == offline).unwrap().delivered);
    assert!(records.iter().find(|r| r.recipient_id == live).unwrap().delivered);
}

#[tokio::test]
async fn role_broadcast_persists_per_member_and_pushes_per_live() {
    let (registry, store, router) = fixture();

    let (live_maid, mut live_rx) = connect(&registry, UserRole::Maid);
    let offline_maid = Uuid::new_v4();
    let customer = Uuid::new_v4();
    store.add_member(live_maid, UserRole::Maid);
    store.add_member(offline_maid, UserRole::FloatingMaid);
    store.add_member(customer, UserRole::Customer);

    let outcome = router
        .deliver(
            NewNotification::new(EventType::System, "Shift update", "Schedules published"),
            DeliveryTarget::Role(RoleClass::Maids),
        )
        .await
        .unwrap();

    // Push per live member, persist per role member
    assert_eq!(outcome.pushed, 1);
    assert_eq!(outcome.persisted, 2);
    assert!(live_rx.try_recv().is_ok());

    let records = store.records();
    assert!(records.iter().find(|r| r.recipient_id == live_maid).unwrap().delivered);
    assert!(!records.iter().find(|r| r.recipient_id == offline_maid).unwrap().delivered);
    assert!(!records.iter().any(|r| r.recipient_id == customer));
}

#[tokio::test]
async fn offline_recipient_copy_replays_the_full_event() {
    let (_registry, store, router) = fixture();
    let customer = Uuid::new_v4();

    let event = NewNotification::new(
        EventType::SubscriptionExpiring,
        "Subscription expiring soon",
        "Your Weekly Shine plan expires in 3 day(s). Renew to keep your visits.",
    )
    .with_data(json!({"days_remaining": 3}));

    router
        .deliver(event.clone(), DeliveryTarget::User(customer))
        .await
        .unwrap();

    // The stored copy is unread and matches the input exactly
    let records = store.records();
    assert_eq!(records.len(), 1);
    let copy = &records[0];
    assert_eq!(copy.event_type, EventType::SubscriptionExpiring);
    assert_eq!(copy.title, event.title);
    assert_eq!(copy.message, event.message);
    assert_eq!(copy.data, event.data);
    assert!(!copy.is_read);
    assert!(copy.read_at.is_none());
}

#[tokio::test]
async fn global_broadcast_pushes_without_persisting() {
    let (registry, store, router) = fixture();
    let (_admin, mut admin_rx) = connect(&registry, UserRole::Admin);
    let (_maid, mut maid_rx) = connect(&registry, UserRole::Maid);

    let outcome = router
        .deliver(
            NewNotification::new(EventType::Emergency, "Emergency alert", "Service disruption"),
            DeliveryTarget::All,
        )
        .await
        .unwrap();

    assert_eq!(outcome.pushed, 2);
    assert_eq!(outcome.persisted, 0);
    assert!(admin_rx.try_recv().is_ok());
    assert!(maid_rx.try_recv().is_ok());
    assert!(store.records().is_empty());
}

#[tokio::test]
async fn role_broadcast_survives_store_outage_after_live_push() {
    let (registry, store, router) = fixture();
    let (_maid, mut maid_rx) = connect(&registry, UserRole::Maid);
    store.go_down();

    let outcome = router
        .deliver(
            NewNotification::new(EventType::System, "Shift update", "Schedules published"),
            DeliveryTarget::Role(RoleClass::Maids),
        )
        .await
        .expect("pushes already went out; the outage is logged, not surfaced");

    assert_eq!(outcome.pushed, 1);
    assert_eq!(outcome.persisted, 0);
    assert!(matches!(maid_rx.try_recv().unwrap(), Outbound::Frame(_)));
}

#[tokio::test]
async fn store_outage_surfaces_only_when_nothing_was_pushed() {
    let (_registry, store, router) = fixture();
    store.go_down();

    // No live members: persistence was the only delivery path
    let role_result = router
        .deliver(
            NewNotification::new(EventType::System, "Shift update", "Schedules published"),
            DeliveryTarget::Role(RoleClass::Maids),
        )
        .await;
    assert!(role_result.is_err());

    let user_result = router
        .deliver(
            NewNotification::new(EventType::System, "Hello", "Offline user"),
            DeliveryTarget::User(Uuid::new_v4()),
        )
        .await;
    assert!(user_result.is_err());
}
