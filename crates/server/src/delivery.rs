use parlor_common::ServerError;
use parlor_db::Repository;
use parlor_protocol::outbound::Envelope;

use crate::sessions::SessionRegistry;

/// Attempt to hand a persisted message straight to its recipient's live
/// connection. Delivery is best-effort and not retried:
/// if the recipient isn't connected, or their write side has already gone
/// stale, the message stays `is_delivered = 0` in storage.
pub async fn deliver(
    sessions: &SessionRegistry,
    repo: &Repository,
    message_id: i64,
    recipient_id: i64,
    frame: &Envelope,
) -> Result<bool, ServerError> {
    let Some(handle) = sessions.get(recipient_id).await else {
        return Ok(false);
    };

    let json = serde_json::to_string(frame).map_err(|e| ServerError::Internal(e.to_string()))?;
    if !handle.send(&json) {
        // Write loop is gone but the session map hasn't caught up yet —
        // purge it now instead of waiting for that connection's own cleanup.
        sessions.remove_if_current(recipient_id, &handle.conn_id).await;
        return Ok(false);
    }

    repo.mark_delivered(message_id).await?;
    Ok(true)
}

/// Push a frame to a recipient's live connection without touching storage.
/// Used for group fan-out, where `messages.is_delivered` tracks the shared
/// row rather than any one recipient, so no single push should flip it.
pub async fn push(
    sessions: &SessionRegistry,
    recipient_id: i64,
    frame: &Envelope,
) -> Result<bool, ServerError> {
    let Some(handle) = sessions.get(recipient_id).await else {
        return Ok(false);
    };

    let json = serde_json::to_string(frame).map_err(|e| ServerError::Internal(e.to_string()))?;
    if !handle.send(&json) {
        sessions.remove_if_current(recipient_id, &handle.conn_id).await;
        return Ok(false);
    }

    Ok(true)
}
