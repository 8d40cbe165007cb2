// Conversation-framed dialect.
//
// Every frame carries a per-frame `id` and (except for some protocol errors)
// the id of the conversation it belongs to. A conversation is opened by
// `start`, closed by `stop`, and may carry `data` frames in both directions;
// a unidirectional run of `data` frames ends with one `stream-end`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{FrameError, reasons};

// ---------------------------------------------------------------------------
// Frame payloads
// ---------------------------------------------------------------------------

/// Opens a conversation. First frame on every connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Start {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub chat_id: Uuid,
}

/// Closes a conversation. Last frame the server sends on the success path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stop {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub chat_id: Uuid,
}

/// One payload, in either direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Data {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub chat_id: Uuid,
    pub payload: Value,
}

/// Terminates a run of `data` frames in one direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamEnd {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub chat_id: Uuid,
}

/// Application-level failure relayed by the server. Terminates the
/// conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppError {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub chat_id: Uuid,
    pub code: i64,
    pub reason: String,
}

/// Protocol-level failure. `chat_id` may be absent when the error occurred
/// before a conversation was established.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolError {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    #[serde(default)]
    pub chat_id: Option<Uuid>,
    pub reason: String,
}

impl Start {
    pub fn new(chat_id: Uuid) -> Self {
        Self { id: Uuid::new_v4(), chat_id }
    }
}

impl Stop {
    pub fn new(chat_id: Uuid) -> Self {
        Self { id: Uuid::new_v4(), chat_id }
    }
}

impl Data {
    pub fn new(chat_id: Uuid, payload: Value) -> Self {
        Self { id: Uuid::new_v4(), chat_id, payload }
    }
}

impl StreamEnd {
    pub fn new(chat_id: Uuid) -> Self {
        Self { id: Uuid::new_v4(), chat_id }
    }
}

// ---------------------------------------------------------------------------
// Top-level discriminated union
// ---------------------------------------------------------------------------

/// All frames of the conversation-framed dialect.
///
/// Serializes/deserializes using the `type` field as a tag:
///
/// ```json
/// { "type": "data", "id": "...", "chatId": "...", "payload": ... }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
#[serde(rename_all = "kebab-case")]
pub enum ChatFrame {
    Start(Start),
    Stop(Stop),
    Data(Data),
    StreamEnd(StreamEnd),
    AppError(AppError),
    ProtocolError(ProtocolError),
}

impl ChatFrame {
    /// Decode one text frame. Anything that does not deserialize as a known
    /// frame is a protocol violation; the caller never sees raw serde errors.
    pub fn parse(text: &str) -> Result<Self, FrameError> {
        serde_json::from_str(text).map_err(|_| FrameError::invalid_message())
    }

    /// Serialize to compact JSON for the wire.
    pub fn to_json(&self) -> Result<String, FrameError> {
        serde_json::to_string(self)
            .map_err(|_| FrameError::Protocol(reasons::SERIALIZE_DATA.to_owned()))
    }

    /// Promote error frames into the matching [`FrameError`].
    ///
    /// A server may answer any expectation with `app-error` or
    /// `protocol-error` in place of the expected frame; callers run every
    /// inbound frame through this before matching on the variant they want.
    /// Error frames short-circuit conversation-id verification.
    pub fn into_result(self) -> Result<Self, FrameError> {
        match self {
            ChatFrame::AppError(e) => Err(FrameError::App { code: e.code, reason: e.reason }),
            ChatFrame::ProtocolError(e) => Err(FrameError::Protocol(e.reason)),
            other => Ok(other),
        }
    }

    /// Demand a `data` frame; error frames promote, anything else is invalid.
    pub fn expect_data(self) -> Result<Data, FrameError> {
        match self.into_result()? {
            ChatFrame::Data(data) => Ok(data),
            _ => Err(FrameError::invalid_message()),
        }
    }

    /// Demand a `stop` frame; error frames promote, anything else is invalid.
    pub fn expect_stop(self) -> Result<Stop, FrameError> {
        match self.into_result()? {
            ChatFrame::Stop(stop) => Ok(stop),
            _ => Err(FrameError::invalid_message()),
        }
    }
}
