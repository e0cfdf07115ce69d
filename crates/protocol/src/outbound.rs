//! Outbound frame shapes: the envelope carried by ordinary responses, and
//! the bare relay/broadcast shapes used by room signaling.

use chrono::{DateTime, Utc};
use parlor_common::ServerError;
use serde::Serialize;
use serde_json::Value;

/// `{ type, status, timestamp, data?, message? }` — every outbound frame
/// except relay/broadcast frames.
#[derive(Debug, Clone, Serialize)]
pub struct Envelope {
    pub r#type: String,
    pub status: Status,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Error,
}

impl Envelope {
    pub fn success(r#type: impl Into<String>, data: Option<Value>) -> Self {
        Self {
            r#type: r#type.into(),
            status: Status::Success,
            timestamp: Utc::now(),
            data,
            message: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            r#type: "error".into(),
            status: Status::Error,
            timestamp: Utc::now(),
            data: None,
            message: Some(message.into()),
        }
    }
}

/// Convert a handler failure into the `error` envelope the client sees.
/// Transport-level failures and panics are not routed through here; this
/// only covers errors that keep the connection open.
pub fn error_envelope(err: &ServerError) -> Envelope {
    Envelope::error(err.to_string())
}

/// A room-signaling or presence frame: no `status`/`timestamp` envelope.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum RelayFrame {
    #[serde(rename = "user-list")]
    UserList { users: Vec<RoomPeer> },
    #[serde(rename = "user-joined")]
    UserJoined { user_id: String, name: String },
    #[serde(rename = "user-left")]
    UserLeft { user_id: String },
    #[serde(rename = "offer")]
    Offer { sender_id: String, offer: String },
    #[serde(rename = "answer")]
    Answer { sender_id: String, answer: String },
    #[serde(rename = "ice-candidate")]
    IceCandidate {
        sender_id: String,
        candidate: Value,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct RoomPeer {
    pub id: String,
    pub name: String,
}
