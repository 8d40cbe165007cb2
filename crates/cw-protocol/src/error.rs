// Error taxonomy shared by both dialects.

use thiserror::Error;

/// Frozen protocol-error reason strings.
pub mod reasons {
    pub const INVALID_MESSAGE: &str = "Invalid message received.";
    pub const CONVERSATION_MISMATCH: &str = "Received incompatible conversation id.";
    pub const REPLY_MISMATCH: &str = "Got a reply for different request.";
    pub const SERIALIZE_DATA: &str = "Can't serialize data message.";
    pub const SERIALIZE_REQUEST: &str = "Can't serialize request message.";
}

/// An error produced while framing or interpreting wire messages.
///
/// `Protocol` marks a violation of the framing contract itself; `App` is an
/// application-level failure the server delivered inside an `app-error`
/// frame. The `code` is opaque to this library.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error("application error {code}: {reason}")]
    App { code: i64, reason: String },
}

impl FrameError {
    pub fn invalid_message() -> Self {
        Self::Protocol(reasons::INVALID_MESSAGE.to_owned())
    }

    pub fn conversation_mismatch() -> Self {
        Self::Protocol(reasons::CONVERSATION_MISMATCH.to_owned())
    }

    pub fn reply_mismatch() -> Self {
        Self::Protocol(reasons::REPLY_MISMATCH.to_owned())
    }
}
