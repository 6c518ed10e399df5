//! Wire protocol shape tests: what a client actually sends and receives.

use notification_service::models::{EventType, NewNotification, UserProfile, UserRole};
use notification_service::websocket::{ClientFrame, EventFrame, ServerFrame};
use serde_json::json;
use uuid::Uuid;

#[test]
fn handshake_frames_round_trip() {
    // Client opens the exchange with an auth frame
    let inbound: ClientFrame =
        serde_json::from_str(r#"{"type":"auth","token":"eyJhbGciOiJIUzI1NiJ9.x.y"}"#).unwrap();
    assert!(matches!(inbound, ClientFrame::Auth { .. }));

    // Server acknowledges with the public profile
    let ack = ServerFrame::auth_success(UserProfile {
        id: Uuid::new_v4(),
        name: "Fatima".to_string(),
        role: UserRole::FloatingMaid,
    });
    let ack_json: serde_json::Value = serde_json::from_str(&ack.to_json()).unwrap();
    assert_eq!(ack_json["type"], "auth_success");
    assert_eq!(ack_json["user"]["role"], "floating_maid");
}

#[test]
fn ping_elicits_pong() {
    let inbound: ClientFrame = serde_json::from_str(r#"{"type":"ping"}"#).unwrap();
    assert_eq!(inbound, ClientFrame::Ping);

    let pong: serde_json::Value = serde_json::from_str(&ServerFrame::pong().to_json()).unwrap();
    assert_eq!(pong["type"], "pong");
}

#[test]
fn unknown_inbound_frames_are_rejected_by_the_parser() {
    for raw in [
        r#"{"type":"typing"}"#,
        r#"{"type":"auth"}"#, // auth without token
        r#"[1,2,3]"#,
        "not json",
    ] {
        assert!(
            serde_json::from_str::<ClientFrame>(raw).is_err(),
            "should not parse: {raw}"
        );
    }
}

#[test]
fn push_frame_carries_the_full_event_record() {
    let event = NewNotification::new(
        EventType::SubscriptionExpiring,
        "Subscription expiring soon",
        "Your Weekly Shine plan expires in 3 day(s). Renew to keep your visits.",
    )
    .with_data(json!({
        "subscription_id": "7b0c2c1e-0000-0000-0000-000000000001",
        "days_remaining": 3,
    }));

    let frame = EventFrame::from_notification(&event);
    let wire: serde_json::Value = serde_json::from_str(&frame.to_json()).unwrap();

    // type/title/message/data survive exactly; a timestamp is appended
    assert_eq!(wire["type"], "SUBSCRIPTION_EXPIRING");
    assert_eq!(wire["title"], "Subscription expiring soon");
    assert_eq!(
        wire["message"],
        "Your Weekly Shine plan expires in 3 day(s). Renew to keep your visits."
    );
    assert_eq!(wire["data"]["days_remaining"], 3);
    assert!(wire["timestamp"].is_i64());

    // And the frame itself round-trips
    let parsed: EventFrame = serde_json::from_value(wire).unwrap();
    assert_eq!(parsed, frame);
}

#[test]
fn every_event_type_has_a_stable_wire_tag() {
    // A client dispatches on the `type` field; tags must match the stored
    // text representation
    for event_type in [
        EventType::BookingCreated,
        EventType::BookingReminder,
        EventType::PaymentSuccess,
        EventType::SubscriptionExpiring,
        EventType::MaidAssigned,
        EventType::PerformanceAlert,
        EventType::AttendanceAlert,
        EventType::Maintenance,
        EventType::Emergency,
    ] {
        let wire = serde_json::to_value(event_type).unwrap();
        assert_eq!(wire, event_type.as_str());
    }
}
