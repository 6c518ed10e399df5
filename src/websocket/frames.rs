//! Wire frames for the notification channel.
//!
//! Control frames carry lowercase `type` tags (`auth`, `auth_success`,
//! `ping`, `pong`); pushed event frames reuse the `type` key for the
//! event's own SCREAMING_SNAKE_CASE tag, so a client can dispatch on a
//! single field.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::models::{EventType, NewNotification, UserProfile};

/// Inbound frames the server understands. Anything that fails to parse is
/// ignored per protocol.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    /// First application message on a new channel
    Auth { token: String },
    /// Application-level liveness ping
    Ping,
}

/// Outbound control frames
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    AuthSuccess { user: UserProfile },
    Pong { timestamp: i64 },
}

impl ServerFrame {
    pub fn auth_success(user: UserProfile) -> Self {
        ServerFrame::AuthSuccess { user }
    }

    pub fn pong() -> Self {
        ServerFrame::Pong {
            timestamp: Utc::now().timestamp(),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Server-to-client push frame: the serialized event record plus a timestamp.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EventFrame {
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub title: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    pub timestamp: i64,
}

impl EventFrame {
    pub fn from_notification(event: &NewNotification) -> Self {
        Self {
            event_type: event.event_type,
            title: event.title.clone(),
            message: event.message.clone(),
            data: event.data.clone(),
            timestamp: Utc::now().timestamp(),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserRole;
    use serde_json::json;
    use uuid::Uuid;

    #[test]
    fn test_auth_frame_parses() {
        let frame: ClientFrame =
            serde_json::from_str(r#"{"type":"auth","token":"abc.def.ghi"}"#).unwrap();
        assert_eq!(
            frame,
            ClientFrame::Auth {
                token: "abc.def.ghi".to_string()
            }
        );
    }

    #[test]
    fn test_ping_frame_parses() {
        let frame: ClientFrame = serde_json::from_str(r#"{"type":"ping"}"#).unwrap();
        assert_eq!(frame, ClientFrame::Ping);
    }

    #[test]
    fn test_unknown_frames_fail_to_parse() {
        assert!(serde_json::from_str::<ClientFrame>(r#"{"type":"subscribe"}"#).is_err());
        assert!(serde_json::from_str::<ClientFrame>(r#"{"hello":"world"}"#).is_err());
    }

    #[test]
    fn test_auth_success_wire_shape() {
        let user = UserProfile {
            id: Uuid::new_v4(),
            name: "Amira".to_string(),
            role: UserRole::Maid,
        };
        let json: serde_json::Value =
            serde_json::from_str(&ServerFrame::auth_success(user.clone()).to_json()).unwrap();
        assert_eq!(json["type"], "auth_success");
        assert_eq!(json["user"]["id"], user.id.to_string());
        assert_eq!(json["user"]["name"], "Amira");
        assert_eq!(json["user"]["role"], "maid");
    }

    #[test]
    fn test_pong_wire_shape() {
        let json: serde_json::Value = serde_json::from_str(&ServerFrame::pong().to_json()).unwrap();
        assert_eq!(json["type"], "pong");
        assert!(json["timestamp"].is_i64());
    }

    #[test]
    fn test_event_frame_uses_event_tag_as_type() {
        let event = NewNotification::new(
            EventType::MaidAssigned,
            "New assignment",
            "You have been assigned to a booking",
        )
        .with_data(json!({"booking_id": "b-1"}));

        let frame = EventFrame::from_notification(&event);
        let json: serde_json::Value = serde_json::from_str(&frame.to_json()).unwrap();
        assert_eq!(json["type"], "MAID_ASSIGNED");
        assert_eq!(json["title"], "New assignment");
        assert_eq!(json["data"]["booking_id"], "b-1");
        assert!(json["timestamp"].is_i64());
    }

    #[test]
    fn test_event_frame_omits_empty_data() {
        let event = NewNotification::new(EventType::Emergency, "Alert", "Evacuate");
        let json: serde_json::Value =
            serde_json::from_str(&EventFrame::from_notification(&event).to_json()).unwrap();
        assert!(json.get("data").is_none());
    }
}
