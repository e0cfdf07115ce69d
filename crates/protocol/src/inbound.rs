//! Inbound frame decoding and per-type schema validation.
//!
//! Every frame is a self-delimited JSON object with a mandatory `type`
//! discriminator. Decoding is a two-step process so an unrecognized `type`
//! produces `InvalidType` instead of a generic serde error: first we peek at
//! `type` via [`RawFrame`], then decode the full [`InboundMessage`] variant.

use parlor_common::ServerError;
use serde::{Deserialize, Serialize};

/// Just enough of a frame to read its discriminator before committing to a
/// full decode.
#[derive(Debug, Deserialize)]
pub struct RawFrame {
    pub r#type: String,
}

/// All recognised inbound message types.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum InboundMessage {
    #[serde(rename = "register")]
    Register(RegisterPayload),
    #[serde(rename = "login")]
    Login(LoginPayload),
    #[serde(rename = "create_group")]
    CreateGroup(CreateGroupPayload),
    #[serde(rename = "private_message")]
    PrivateMessage(PrivateMessagePayload),
    #[serde(rename = "group_message")]
    GroupMessage(GroupMessagePayload),
    #[serde(rename = "get_user_contacts")]
    GetUserContacts,
    #[serde(rename = "join")]
    Join(JoinPayload),
    #[serde(rename = "offer")]
    Offer(OfferPayload),
    #[serde(rename = "answer")]
    Answer(AnswerPayload),
    #[serde(rename = "ice-candidate")]
    IceCandidate(IceCandidatePayload),
    #[serde(rename = "leave")]
    Leave,
    #[serde(rename = "create-room")]
    CreateRoom(CreateRoomPayload),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterPayload {
    pub username: String,
    pub password: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginPayload {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateGroupPayload {
    pub name: String,
    pub members: Vec<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrivateMessagePayload {
    pub sender_id: i64,
    pub receiver_id: i64,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupMessagePayload {
    pub content: String,
    pub group_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinPayload {
    pub room_id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfferPayload {
    pub target_id: String,
    pub offer: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerPayload {
    pub target_id: String,
    pub answer: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IceCandidatePayload {
    pub target_id: String,
    pub candidate: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRoomPayload {
    #[serde(default)]
    pub room_id: Option<String>,
}

/// Decode a raw text frame into a validated [`InboundMessage`].
///
/// Returns `InvalidFrame` if the payload isn't JSON, `InvalidType` if the
/// `type` field doesn't match a known discriminator, and `Validation` if the
/// type is known but required fields are missing/out of range.
pub fn decode(text: &str) -> Result<InboundMessage, ServerError> {
    let raw: RawFrame = serde_json::from_str(text).map_err(|_| ServerError::InvalidFrame)?;

    if !KNOWN_TYPES.contains(&raw.r#type.as_str()) {
        return Err(ServerError::InvalidType(raw.r#type));
    }

    let value: serde_json::Value =
        serde_json::from_str(text).map_err(|_| ServerError::InvalidFrame)?;
    let msg: InboundMessage = serde_json::from_value(value)
        .map_err(|e| ServerError::Validation(field_error_message(&raw.r#type, &e)))?;

    validate(&msg)?;
    Ok(msg)
}

const KNOWN_TYPES: &[&str] = &[
    "register",
    "login",
    "create_group",
    "private_message",
    "group_message",
    "get_user_contacts",
    "join",
    "offer",
    "answer",
    "ice-candidate",
    "leave",
    "create-room",
];

fn field_error_message(r#type: &str, e: &serde_json::Error) -> String {
    format!("{type}: missing or malformed field(s) ({e})")
}

/// Per-type field-constraint validation (lengths, ranges) beyond what serde
/// structural decoding already enforces.
fn validate(msg: &InboundMessage) -> Result<(), ServerError> {
    match msg {
        InboundMessage::Register(p) => {
            let mut errors = Vec::new();
            if !(3..=50).contains(&p.username.chars().count()) {
                errors.push("username must be 3..50 characters".to_string());
            }
            if p.password.chars().count() < 8 {
                errors.push("password must be at least 8 characters".to_string());
            }
            if p.email.trim().is_empty() {
                errors.push("email must be present".to_string());
            }
            validation_result(errors)
        },
        InboundMessage::Login(p) => {
            let mut errors = Vec::new();
            if p.username.is_empty() {
                errors.push("username must be present".to_string());
            }
            if p.password.is_empty() {
                errors.push("password must be present".to_string());
            }
            validation_result(errors)
        },
        InboundMessage::CreateGroup(p) => {
            let mut errors = Vec::new();
            if !(3..=50).contains(&p.name.chars().count()) {
                errors.push("name must be 3..50 characters".to_string());
            }
            validation_result(errors)
        },
        InboundMessage::PrivateMessage(p) => {
            let mut errors = Vec::new();
            if !(1..=500).contains(&p.content.chars().count()) {
                errors.push("content must be 1..500 characters".to_string());
            }
            validation_result(errors)
        },
        InboundMessage::GroupMessage(p) => {
            let mut errors = Vec::new();
            if !(1..=500).contains(&p.content.chars().count()) {
                errors.push("content must be 1..500 characters".to_string());
            }
            validation_result(errors)
        },
        InboundMessage::Join(p) => {
            let mut errors = Vec::new();
            if p.room_id.is_empty() {
                errors.push("room_id must be present".to_string());
            }
            if p.name.is_empty() {
                errors.push("name must be present".to_string());
            }
            validation_result(errors)
        },
        InboundMessage::Offer(p) => {
            let mut errors = Vec::new();
            if p.target_id.is_empty() {
                errors.push("target_id must be present".to_string());
            }
            validation_result(errors)
        },
        InboundMessage::Answer(p) => {
            let mut errors = Vec::new();
            if p.target_id.is_empty() {
                errors.push("target_id must be present".to_string());
            }
            validation_result(errors)
        },
        InboundMessage::IceCandidate(p) => {
            let mut errors = Vec::new();
            if p.target_id.is_empty() {
                errors.push("target_id must be present".to_string());
            }
            validation_result(errors)
        },
        InboundMessage::GetUserContacts
        | InboundMessage::Leave
        | InboundMessage::CreateRoom(_) => Ok(()),
    }
}

fn validation_result(errors: Vec<String>) -> Result<(), ServerError> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ServerError::Validation(errors.join(", ")))
    }
}

/// The message `type` string, used for state-machine and logging checks
/// without re-matching on the whole enum.
pub fn type_name(msg: &InboundMessage) -> &'static str {
    match msg {
        InboundMessage::Register(_) => "register",
        InboundMessage::Login(_) => "login",
        InboundMessage::CreateGroup(_) => "create_group",
        InboundMessage::PrivateMessage(_) => "private_message",
        InboundMessage::GroupMessage(_) => "group_message",
        InboundMessage::GetUserContacts => "get_user_contacts",
        InboundMessage::Join(_) => "join",
        InboundMessage::Offer(_) => "offer",
        InboundMessage::Answer(_) => "answer",
        InboundMessage::IceCandidate(_) => "ice-candidate",
        InboundMessage::Leave => "leave",
        InboundMessage::CreateRoom(_) => "create-room",
    }
}

/// Whether this message type is allowed on a connection that hasn't
/// authenticated yet. Only `register` and `login` are; every other inbound
/// type — including the signaling ones — requires a prior successful login
/// on this same connection.
pub fn allowed_pre_auth(msg: &InboundMessage) -> bool {
    matches!(msg, InboundMessage::Register(_) | InboundMessage::Login(_))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn decodes_register() {
        let text = r#"{"type":"register","username":"alice","password":"hunter2hunter","email":"a@x"}"#;
        let msg = decode(text).unwrap();
        assert_eq!(type_name(&msg), "register");
    }

    #[test]
    fn rejects_unknown_type() {
        let text = r#"{"type":"frobnicate"}"#;
        let err = decode(text).unwrap_err();
        assert!(matches!(err, ServerError::InvalidType(t) if t == "frobnicate"));
    }

    #[test]
    fn rejects_bad_json() {
        let err = decode("not json").unwrap_err();
        assert!(matches!(err, ServerError::InvalidFrame));
    }

    #[test]
    fn rejects_short_username() {
        let text = r#"{"type":"register","username":"ab","password":"hunter2hunter","email":"a@x"}"#;
        let err = decode(text).unwrap_err();
        assert!(matches!(err, ServerError::Validation(_)));
    }

    #[test]
    fn rejects_missing_fields_as_validation_error() {
        let text = r#"{"type":"register","username":"ab"}"#;
        let err = decode(text).unwrap_err();
        assert!(matches!(err, ServerError::Validation(_)));
    }

    #[test]
    fn only_register_and_login_are_allowed_pre_auth() {
        let text = r#"{"type":"join","room_id":"r","name":"n"}"#;
        let msg = decode(text).unwrap();
        assert!(!allowed_pre_auth(&msg));

        let text = r#"{"type":"leave"}"#;
        let msg = decode(text).unwrap();
        assert!(!allowed_pre_auth(&msg));

        let text = r#"{"type":"login","username":"a","password":"p"}"#;
        let msg = decode(text).unwrap();
        assert!(allowed_pre_auth(&msg));
    }
}
