use cw_protocol::FrameError;
use tokio_tungstenite::tungstenite;

/// Errors surfaced by client operations.
///
/// The two protocol-level kinds mirror the wire error frames; transport
/// failures pass through untranslated in `Ws`.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The framing contract was violated: unparseable frame, wrong frame
    /// where a specific one was expected, or a conversation id mismatch.
    #[error("protocol error: {0}")]
    Protocol(String),
    /// Application-level failure delivered by the server. The code is opaque
    /// to this library.
    #[error("application error {code}: {reason}")]
    App { code: i64, reason: String },
    /// Underlying WebSocket failure, surfaced as-is.
    #[error("websocket: {0}")]
    Ws(#[from] tungstenite::Error),
    /// The peer closed the connection before the expected frame arrived.
    #[error("connection closed before the conversation finished")]
    Disconnected,
}

impl From<FrameError> for ClientError {
    fn from(e: FrameError) -> Self {
        match e {
            FrameError::Protocol(reason) => ClientError::Protocol(reason),
            FrameError::App { code, reason } => ClientError::App { code, reason },
        }
    }
}
