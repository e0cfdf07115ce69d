//! The messaging and WebRTC-signaling server: connection lifecycle, session
//! and room registries, the message router, and the delivery engine.

pub mod connection;
pub mod delivery;
pub mod router;
pub mod rooms;
pub mod server;
pub mod sessions;
pub mod signaling;
pub mod state;
pub mod ws;

pub use state::{ServerState, SharedState};
