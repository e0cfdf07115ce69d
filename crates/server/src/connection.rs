use tokio::sync::mpsc;

/// One item queued for a connection's write loop.
#[derive(Debug)]
pub enum OutboundFrame {
    Text(String),
    Close,
}

/// Per-connection send handle, registered in [`crate::sessions::SessionRegistry`]
/// and [`crate::rooms::RoomRegistry`] under the connection's id. Cloning is
/// cheap — it's just the id plus a channel sender.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    pub conn_id: String,
    sender: mpsc::UnboundedSender<OutboundFrame>,
}

impl ConnectionHandle {
    pub fn new(conn_id: String, sender: mpsc::UnboundedSender<OutboundFrame>) -> Self {
        Self { conn_id, sender }
    }

    /// Send a pre-serialized frame to this connection's write loop. Returns
    /// `false` if the write loop has already exited — the caller's cue to
    /// treat this handle as stale and purge it from whichever registry holds
    /// it.
    pub fn send(&self, frame: &str) -> bool {
        self.sender.send(OutboundFrame::Text(frame.to_string())).is_ok()
    }

    /// Tell this connection's write loop to close the socket, once any
    /// already-queued frames have been flushed.
    pub fn close(&self) {
        let _ = self.sender.send(OutboundFrame::Close);
    }
}

/// Connection lifecycle: a socket starts `Connected` and
/// becomes `Authorized` once `register` or `login` succeeds. There is no
/// `Closed` variant — a closed connection is simply removed from every
/// registry that held it.
#[derive(Debug, Clone)]
pub enum ConnectionState {
    Connected,
    Authorized { user_id: i64, username: String },
}

impl ConnectionState {
    pub fn is_authorized(&self) -> bool {
        matches!(self, Self::Authorized { .. })
    }

    pub fn user_id(&self) -> Option<i64> {
        match self {
            Self::Authorized { user_id, .. } => Some(*user_id),
            Self::Connected => None,
        }
    }
}
