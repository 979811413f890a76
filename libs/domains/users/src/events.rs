//! Change-notification envelope.
//!
//! Wire format: `{"type": "user.created", "timestamp": "<RFC3339>", "payload": {...}}`

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::models::UserResponse;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    #[serde(rename = "user.created")]
    UserCreated,
    #[serde(rename = "user.updated")]
    UserUpdated,
    #[serde(rename = "user.deleted")]
    UserDeleted,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::UserCreated => "user.created",
            EventType::UserUpdated => "user.updated",
            EventType::UserDeleted => "user.deleted",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user.created" => Ok(EventType::UserCreated),
            "user.updated" => Ok(EventType::UserUpdated),
            "user.deleted" => Ok(EventType::UserDeleted),
            other => Err(format!("unknown event type: {other}")),
        }
    }
}

/// Immutable once built; the timestamp is taken at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub timestamp: DateTime<Utc>,
    pub payload: Value,
}

impl Event {
    pub fn new(event_type: EventType, payload: Value) -> Self {
        Self {
            event_type,
            timestamp: Utc::now(),
            payload,
        }
    }
}

/// Sanitized user as JSON; `UserResponse` has no password to leak.
pub fn user_payload(user: &UserResponse) -> Value {
    serde_json::to_value(user).unwrap_or_else(|_| json!({ "id": user.id }))
}

pub fn deleted_payload(id: Uuid) -> Value {
    json!({ "id": id })
}

/// Envelope as read off the queue.
///
/// The type stays a plain string so an unknown tag is distinguishable from a
/// malformed envelope.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct IncomingEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    #[allow(dead_code)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub payload: Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> UserResponse {
        UserResponse {
            id: Uuid::new_v4(),
            first_name: "Alice".into(),
            last_name: "Bob".into(),
            nickname: "AB123".into(),
            email: "alice@bob.com".into(),
            country: "UK".into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_created_wire_format() {
        let user = sample();
        let event = Event::new(EventType::UserCreated, user_payload(&user));
        let json = serde_json::to_value(event).unwrap();

        assert_eq!(json["type"], "user.created");
        assert!(json["timestamp"].as_str().unwrap().contains('T'));
        assert_eq!(json["payload"]["id"], user.id.to_string());
        assert!(json["payload"].get("password").is_none());
    }

    #[test]
    fn test_deleted_payload_is_id_only() {
        let id = Uuid::new_v4();
        let event = Event::new(EventType::UserDeleted, deleted_payload(id));
        let json = serde_json::to_value(event).unwrap();

        assert_eq!(json["type"], "user.deleted");
        assert_eq!(json["payload"], json!({ "id": id.to_string() }));
    }

    #[test]
    fn test_event_type_parse() {
        assert_eq!("user.updated".parse::<EventType>(), Ok(EventType::UserUpdated));
        assert!("user.renamed".parse::<EventType>().is_err());
        assert_eq!(EventType::UserDeleted.to_string(), "user.deleted");
    }

    #[test]
    fn test_incoming_accepts_unknown_type() {
        let incoming: IncomingEvent =
            serde_json::from_str(r#"{"type":"user.renamed","payload":{}}"#).unwrap();
        assert_eq!(incoming.event_type, "user.renamed");
        assert!(incoming.timestamp.is_none());
    }
}
