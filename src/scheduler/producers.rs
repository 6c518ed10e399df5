//! The five scheduled producers: pure query-then-emit passes.

use chrono::{Duration, Utc};
use serde_json::json;

use crate::error::AppResult;
use crate::models::{
    AbsentRecord, EventType, ExpiringSubscription, NewNotification, PendingPayment,
    PerformanceSnapshot, ReminderBooking,
};
use crate::router::{DeliveryTarget, NotificationRouter};
use crate::store::NotificationStore;

/// Expiry lookahead window for subscription reminders
const EXPIRY_LOOKAHEAD_DAYS: i64 = 7;
/// Payments pending longer than this get a reminder
const PAYMENT_REMINDER_AGE_HOURS: i64 = 24;
/// Performance score below this floor triggers an alert
const SCORE_FLOOR: f64 = 3.0;
/// Cancellation ratio above this ceiling triggers an alert
const CANCELLATION_CEILING: f64 = 0.2;

async fn emit(router: &NotificationRouter, event: NewNotification, target: DeliveryTarget) -> usize {
    match router.deliver(event, target).await {
        Ok(_) => 1,
        Err(e) => {
            tracing::error!(error = %e, "producer emission failed");
            0
        }
    }
}

/// Remind customers and assigned maids about tomorrow's visits.
pub async fn visit_reminders(
    store: NotificationStore,
    router: NotificationRouter,
) -> AppResult<usize> {
    let tomorrow = Utc::now().date_naive() + Duration::days(1);

    let bookings = sqlx::query_as::<_, ReminderBooking>(
        r#"
        SELECT id, customer_id, maid_id, scheduled_date, scheduled_time
        FROM bookings
        WHERE scheduled_date = $1
          AND status IN ('pending', 'assigned', 'confirmed')
        "#,
    )
    .bind(tomorrow)
    .fetch_all(store.pool())
    .await?;

    let mut emitted = 0;
    for booking in bookings {
        let data = json!({
            "booking_id": booking.id,
            "scheduled_date": booking.scheduled_date,
            "scheduled_time": booking.scheduled_time,
        });

        let customer_event = NewNotification::new(
            EventType::BookingReminder,
            "Upcoming cleaning visit",
            format!(
                "Your cleaning visit is scheduled tomorrow at {}",
                booking.scheduled_time
            ),
        )
        .with_data(data.clone());
        emitted += emit(&router, customer_event, DeliveryTarget::User(booking.customer_id)).await;

        if let Some(maid_id) = booking.maid_id {
            let maid_event = NewNotification::new(
                EventType::BookingReminder,
                "Visit scheduled tomorrow",
                format!(
                    "You have a cleaning visit tomorrow at {}",
                    booking.scheduled_time
                ),
            )
            .with_data(data);
            emitted += emit(&router, maid_event, DeliveryTarget::User(maid_id)).await;
        }
    }

    Ok(emitted)
}

/// Warn customers whose active subscription ends within the lookahead window.
pub async fn subscription_expiry(
    store: NotificationStore,
    router: NotificationRouter,
) -> AppResult<usize> {
    let today = Utc::now().date_naive();
    let horizon = today + Duration::days(EXPIRY_LOOKAHEAD_DAYS);

    let subscriptions = sqlx::query_as::<_, ExpiringSubscription>(
        r#"
        SELECT id, customer_id, plan_name, end_date
        FROM subscriptions
        WHERE status = 'active'
          AND end_date BETWEEN $1 AND $2
        "#,
    )
    .bind(today)
    .bind(horizon)
    .fetch_all(store.pool())
    .await?;

    let mut emitted = 0;
    for subscription in subscriptions {
        let days_remaining = (subscription.end_date - today).num_days();
        let event = NewNotification::new(
            EventType::SubscriptionExpiring,
            "Subscription expiring soon",
            format!(
                "Your {} plan expires in {} day(s). Renew to keep your visits.",
                subscription.plan_name, days_remaining
            ),
        )
        .with_data(json!({
            "subscription_id": subscription.id,
            "plan_name": subscription.plan_name,
            "end_date": subscription.end_date,
            "days_remaining": days_remaining,
        }));
        emitted += emit(&router, event, DeliveryTarget::User(subscription.customer_id)).await;
    }

    Ok(emitted)
}

/// Remind customers about payments pending past the reminder age.
pub async fn payment_reminders(
    store: NotificationStore,
    router: NotificationRouter,
) -> AppResult<usize> {
    let cutoff = Utc::now() - Duration::hours(PAYMENT_REMINDER_AGE_HOURS);

    let payments = sqlx::query_as::<_, PendingPayment>(
        r#"
        SELECT p.id, p.booking_id, b.customer_id, p.amount_cents
        FROM payments p
        JOIN bookings b ON b.id = p.booking_id
        WHERE p.status = 'pending'
          AND p.created_at < $1
        "#,
    )
    .bind(cutoff)
    .fetch_all(store.pool())
    .await?;

    let mut emitted = 0;
    for payment in payments {
        let event = NewNotification::new(
            EventType::PaymentReminder,
            "Payment pending",
            format!(
                "A payment of {:.2} for your booking is still pending",
                payment.amount_cents as f64 / 100.0
            ),
        )
        .with_data(json!({
            "payment_id": payment.id,
            "booking_id": payment.booking_id,
            "amount_cents": payment.amount_cents,
        }));
        emitted += emit(&router, event, DeliveryTarget::User(payment.customer_id)).await;
    }

    Ok(emitted)
}

/// Alert maids whose latest snapshot breaches either performance threshold.
/// The two thresholds are independent: breaching both emits two alerts.
pub async fn performance_alerts(
    store: NotificationStore,
    router: NotificationRouter,
) -> AppResult<usize> {
    let snapshots = sqlx::query_as::<_, PerformanceSnapshot>(
        r#"
        SELECT DISTINCT ON (p.maid_id) p.maid_id, p.overall_score, p.cancellation_rate
        FROM maid_performance p
        JOIN users u ON u.id = p.maid_id
        WHERE u.is_active = true
        ORDER BY p.maid_id, p.recorded_at DESC
        "#,
    )
    .fetch_all(store.pool())
    .await?;

    let mut emitted = 0;
    for snapshot in snapshots {
        if snapshot.overall_score < SCORE_FLOOR {
            let event = NewNotification::new(
                EventType::PerformanceAlert,
                "Performance below expectations",
                format!(
                    "Your overall score is {:.1}, below the required {:.1}",
                    snapshot.overall_score, SCORE_FLOOR
                ),
            )
            .with_data(json!({
                "overall_score": snapshot.overall_score,
                "threshold": SCORE_FLOOR,
            }));
            emitted += emit(&router, event, DeliveryTarget::User(snapshot.maid_id)).await;
        }

        if snapshot.cancellation_rate > CANCELLATION_CEILING {
            let event = NewNotification::new(
                EventType::PerformanceAlert,
                "High cancellation rate",
                format!(
                    "Your cancellation rate is {:.0}%, above the allowed {:.0}%",
                    snapshot.cancellation_rate * 100.0,
                    CANCELLATION_CEILING * 100.0
                ),
            )
            .with_data(json!({
                "cancellation_rate": snapshot.cancellation_rate,
                "threshold": CANCELLATION_CEILING,
            }));
            emitted += emit(&router, event, DeliveryTarget::User(snapshot.maid_id)).await;
        }
    }

    Ok(emitted)
}

/// Alert each maid marked absent today.
pub async fn attendance_alerts(
    store: NotificationStore,
    router: NotificationRouter,
) -> AppResult<usize> {
    let today = Utc::now().date_naive();

    let absences = sqlx::query_as::<_, AbsentRecord>(
        "SELECT maid_id, work_date FROM attendance WHERE work_date = $1 AND status = 'absent'",
    )
    .bind(today)
    .fetch_all(store.pool())
    .await?;

    let mut emitted = 0;
    for absence in absences {
        let event = NewNotification::new(
            EventType::AttendanceAlert,
            "Absence recorded",
            "You were marked absent today. Contact your supervisor if this is incorrect.",
        )
        .with_data(json!({ "work_date": absence.work_date }));
        emitted += emit(&router, event, DeliveryTarget::User(absence.maid_id)).await;
    }

    Ok(emitted)
}
