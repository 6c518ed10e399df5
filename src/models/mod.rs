use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Event type enumeration
///
/// Closed set of everything the platform notifies about: booking lifecycle,
/// payment lifecycle, subscription lifecycle, maid operations, and
/// system/administrative messages. Serialized in SCREAMING_SNAKE_CASE both on
/// the wire and in the database.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    // Booking lifecycle
    BookingCreated,
    BookingAssigned,
    BookingStarted,
    BookingCompleted,
    BookingCancelled,
    BookingRescheduled,
    BookingReminder,
    // Payment lifecycle
    PaymentSuccess,
    PaymentFailed,
    PaymentRefunded,
    PaymentReminder,
    // Subscription lifecycle
    SubscriptionCreated,
    SubscriptionRenewed,
    SubscriptionCancelled,
    SubscriptionExpiring,
    // Maid operations
    MaidAssigned,
    PerformanceAlert,
    AttendanceAlert,
    IssueReported,
    IssueResolved,
    // System / administrative
    System,
    Maintenance,
    Emergency,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::BookingCreated => "BOOKING_CREATED",
            EventType::BookingAssigned => "BOOKING_ASSIGNED",
            EventType::BookingStarted => "BOOKING_STARTED",
            EventType::BookingCompleted => "BOOKING_COMPLETED",
            EventType::BookingCancelled => "BOOKING_CANCELLED",
            EventType::BookingRescheduled => "BOOKING_RESCHEDULED",
            EventType::BookingReminder => "BOOKING_REMINDER",
            EventType::PaymentSuccess => "PAYMENT_SUCCESS",
            EventType::PaymentFailed => "PAYMENT_FAILED",
            EventType::PaymentRefunded => "PAYMENT_REFUNDED",
            EventType::PaymentReminder => "PAYMENT_REMINDER",
            EventType::SubscriptionCreated => "SUBSCRIPTION_CREATED",
            EventType::SubscriptionRenewed => "SUBSCRIPTION_RENEWED",
            EventType::SubscriptionCancelled => "SUBSCRIPTION_CANCELLED",
            EventType::SubscriptionExpiring => "SUBSCRIPTION_EXPIRING",
            EventType::MaidAssigned => "MAID_ASSIGNED",
            EventType::PerformanceAlert => "PERFORMANCE_ALERT",
            EventType::AttendanceAlert => "ATTENDANCE_ALERT",
            EventType::IssueReported => "ISSUE_REPORTED",
            EventType::IssueResolved => "ISSUE_RESOLVED",
            EventType::System => "SYSTEM",
            EventType::Maintenance => "MAINTENANCE",
            EventType::Emergency => "EMERGENCY",
        }
    }

    /// Parse from the stored text column. Unknown values collapse to System
    /// so old rows survive enum changes.
    pub fn parse(s: &str) -> EventType {
        match s {
            "BOOKING_CREATED" => EventType::BookingCreated,
            "BOOKING_ASSIGNED" => EventType::BookingAssigned,
            "BOOKING_STARTED" => EventType::BookingStarted,
            "BOOKING_COMPLETED" => EventType::BookingCompleted,
            "BOOKING_CANCELLED" => EventType::BookingCancelled,
            "BOOKING_RESCHEDULED" => EventType::BookingRescheduled,
            "BOOKING_REMINDER" => EventType::BookingReminder,
            "PAYMENT_SUCCESS" => EventType::PaymentSuccess,
            "PAYMENT_FAILED" => EventType::PaymentFailed,
            "PAYMENT_REFUNDED" => EventType::PaymentRefunded,
            "PAYMENT_REMINDER" => EventType::PaymentReminder,
            "SUBSCRIPTION_CREATED" => EventType::SubscriptionCreated,
            "SUBSCRIPTION_RENEWED" => EventType::SubscriptionRenewed,
            "SUBSCRIPTION_CANCELLED" => EventType::SubscriptionCancelled,
            "SUBSCRIPTION_EXPIRING" => EventType::SubscriptionExpiring,
            "MAID_ASSIGNED" => EventType::MaidAssigned,
            "PERFORMANCE_ALERT" => EventType::PerformanceAlert,
            "ATTENDANCE_ALERT" => EventType::AttendanceAlert,
            "ISSUE_REPORTED" => EventType::IssueReported,
            "ISSUE_RESOLVED" => EventType::IssueResolved,
            "MAINTENANCE" => EventType::Maintenance,
            "EMERGENCY" => EventType::Emergency,
            _ => EventType::System,
        }
    }
}

/// User role as stored in the users table
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Customer,
    Maid,
    FloatingMaid,
    Admin,
    Supervisor,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Customer => "customer",
            UserRole::Maid => "maid",
            UserRole::FloatingMaid => "floating_maid",
            UserRole::Admin => "admin",
            UserRole::Supervisor => "supervisor",
        }
    }

    pub fn parse(s: &str) -> Option<UserRole> {
        match s {
            "customer" => Some(UserRole::Customer),
            "maid" => Some(UserRole::Maid),
            "floating_maid" => Some(UserRole::FloatingMaid),
            "admin" => Some(UserRole::Admin),
            "supervisor" => Some(UserRole::Supervisor),
            _ => None,
        }
    }

    /// Coarse grouping used for registry partitioning and group addressing.
    pub fn role_class(&self) -> RoleClass {
        match self {
            UserRole::Customer => RoleClass::Customers,
            UserRole::Maid | UserRole::FloatingMaid => RoleClass::Maids,
            UserRole::Admin | UserRole::Supervisor => RoleClass::Admins,
        }
    }

    pub fn is_admin_class(&self) -> bool {
        self.role_class() == RoleClass::Admins
    }
}

/// Role class for group delivery targets
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RoleClass {
    Customers,
    Maids,
    Admins,
}

impl RoleClass {
    pub fn parse(s: &str) -> Option<RoleClass> {
        match s {
            "customers" => Some(RoleClass::Customers),
            "maids" => Some(RoleClass::Maids),
            "admins" => Some(RoleClass::Admins),
            _ => None,
        }
    }

    /// Concrete roles belonging to this class, for membership queries.
    pub fn member_roles(&self) -> &'static [UserRole] {
        match self {
            RoleClass::Customers => &[UserRole::Customer],
            RoleClass::Maids => &[UserRole::Maid, UserRole::FloatingMaid],
            RoleClass::Admins => &[UserRole::Admin, UserRole::Supervisor],
        }
    }
}

/// Public identity profile sent back in the auth acknowledgement
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserProfile {
    pub id: Uuid,
    pub name: String,
    pub role: UserRole,
}

/// Persisted notification record
///
/// Always owned by exactly one recipient; broadcasts persist one copy per
/// recipient rather than a one-to-many relation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub recipient_id: Uuid,
    pub event_type: EventType,
    pub title: String,
    pub message: String,
    pub data: Option<serde_json::Value>,
    /// Whether a live push attempt was made at delivery time
    pub delivered: bool,
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// A notification about to enter the delivery pipeline (no identity yet;
/// the store assigns one per persisted copy).
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub event_type: EventType,
    pub title: String,
    pub message: String,
    pub data: Option<serde_json::Value>,
}

impl NewNotification {
    pub fn new(event_type: EventType, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            event_type,
            title: title.into(),
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }
}

// ---------------------------------------------------------------------------
// Producer query projections
// ---------------------------------------------------------------------------

/// Booking scheduled for tomorrow, joined for the reminder producer
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ReminderBooking {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub maid_id: Option<Uuid>,
    pub scheduled_date: NaiveDate,
    pub scheduled_time: String,
}

/// Active subscription ending inside the lookahead window
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ExpiringSubscription {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub plan_name: String,
    pub end_date: NaiveDate,
}

/// Payment still pending past the reminder age
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PendingPayment {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub customer_id: Uuid,
    pub amount_cents: i64,
}

/// Latest performance snapshot per active maid
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PerformanceSnapshot {
    pub maid_id: Uuid,
    pub overall_score: f64,
    pub cancellation_rate: f64,
}

/// Attendance row marked absent for today
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AbsentRecord {
    pub maid_id: Uuid,
    pub work_date: NaiveDate,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_round_trips_through_text_column() {
        let all = [
            EventType::BookingCreated,
            EventType::BookingAssigned,
            EventType::BookingStarted,
            EventType::BookingCompleted,
            EventType::BookingCancelled,
            EventType::BookingRescheduled,
            EventType::BookingReminder,
            EventType::PaymentSuccess,
            EventType::PaymentFailed,
            EventType::PaymentRefunded,
            EventType::PaymentReminder,
            EventType::SubscriptionCreated,
            EventType::SubscriptionRenewed,
            EventType::SubscriptionCancelled,
            EventType::SubscriptionExpiring,
            EventType::MaidAssigned,
            EventType::PerformanceAlert,
            EventType::AttendanceAlert,
            EventType::IssueReported,
            EventType::IssueResolved,
            EventType::System,
            EventType::Maintenance,
            EventType::Emergency,
        ];
        for event_type in all {
            assert_eq!(EventType::parse(event_type.as_str()), event_type);
        }
    }

    #[test]
    fn test_event_type_serde_matches_as_str() {
        let json = serde_json::to_string(&EventType::MaidAssigned).unwrap();
        assert_eq!(json, "\"MAID_ASSIGNED\"");
        assert_eq!(
            serde_json::to_string(&EventType::SubscriptionExpiring).unwrap(),
            format!("\"{}\"", EventType::SubscriptionExpiring.as_str())
        );
    }

    #[test]
    fn test_unknown_event_type_falls_back_to_system() {
        assert_eq!(EventType::parse("SOMETHING_ELSE"), EventType::System);
    }

    #[test]
    fn test_role_class_partition() {
        assert_eq!(UserRole::Customer.role_class(), RoleClass::Customers);
        assert_eq!(UserRole::Maid.role_class(), RoleClass::Maids);
        assert_eq!(UserRole::FloatingMaid.role_class(), RoleClass::Maids);
        assert_eq!(UserRole::Admin.role_class(), RoleClass::Admins);
        assert_eq!(UserRole::Supervisor.role_class(), RoleClass::Admins);
    }

    #[test]
    fn test_role_parse_rejects_unknown() {
        assert_eq!(UserRole::parse("maid"), Some(UserRole::Maid));
        assert_eq!(UserRole::parse("janitor"), None);
    }

    #[test]
    fn test_role_class_member_roles_cover_admin_class() {
        let members = RoleClass::Admins.member_roles();
        assert!(members.contains(&UserRole::Admin));
        assert!(members.contains(&UserRole::Supervisor));
    }
}
