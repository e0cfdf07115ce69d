//! Wire schema for the messaging/signaling protocol.
//!
//! Every frame is a single-line UTF-8 JSON object carrying a `type`
//! discriminator. [`inbound::decode`] turns raw text into a validated
//! [`inbound::InboundMessage`]; [`outbound`] builds the matching reply
//! shapes.

pub mod inbound;
pub mod outbound;

pub use inbound::{InboundMessage, decode, type_name};
pub use outbound::{Envelope, RelayFrame, RoomPeer, Status, error_envelope};
