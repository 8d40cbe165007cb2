// Stateless request/reply dialect.
//
// No conversation envelope: a `request` carries its own id and the matching
// `reply` echoes it in `request`. Streamed exchanges reuse `data` frames and
// the bare `stream-end` marker.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{FrameError, reasons};

// ---------------------------------------------------------------------------
// Frame payloads
// ---------------------------------------------------------------------------

/// One payload pushed by the server outside request/reply correlation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Data {
    pub payload: Value,
}

/// A client request; the server's reply echoes `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub payload: Value,
}

/// A server reply correlated to a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    pub request: Uuid,
    pub payload: Value,
}

/// Terminates a run of requests or replies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamEnd {}

/// Application-level failure relayed by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppError {
    pub code: i64,
    pub reason: String,
}

/// Protocol-level failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolError {
    pub reason: String,
}

impl Request {
    pub fn new(payload: Value) -> Self {
        Self { id: Uuid::new_v4(), payload }
    }
}

// ---------------------------------------------------------------------------
// Top-level discriminated union
// ---------------------------------------------------------------------------

/// All frames of the request/reply dialect, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
#[serde(rename_all = "kebab-case")]
pub enum RpcFrame {
    Data(Data),
    Request(Request),
    Reply(Reply),
    StreamEnd(StreamEnd),
    AppError(AppError),
    ProtocolError(ProtocolError),
}

impl RpcFrame {
    /// Decode one text frame; unknown shapes are a protocol violation.
    pub fn parse(text: &str) -> Result<Self, FrameError> {
        serde_json::from_str(text).map_err(|_| FrameError::invalid_message())
    }

    /// Serialize to compact JSON for the wire.
    pub fn to_json(&self) -> Result<String, FrameError> {
        serde_json::to_string(self)
            .map_err(|_| FrameError::Protocol(reasons::SERIALIZE_REQUEST.to_owned()))
    }

    /// Promote error frames into the matching [`FrameError`].
    pub fn into_result(self) -> Result<Self, FrameError> {
        match self {
            RpcFrame::AppError(e) => Err(FrameError::App { code: e.code, reason: e.reason }),
            RpcFrame::ProtocolError(e) => Err(FrameError::Protocol(e.reason)),
            other => Ok(other),
        }
    }

    /// Demand a `data` frame; error frames promote, anything else is invalid.
    pub fn expect_data(self) -> Result<Data, FrameError> {
        match self.into_result()? {
            RpcFrame::Data(data) => Ok(data),
            _ => Err(FrameError::invalid_message()),
        }
    }

    /// Demand the reply to `request`; a reply correlated to some other
    /// request is its own protocol violation.
    pub fn expect_reply(self, request: Uuid) -> Result<Reply, FrameError> {
        match self.into_result()? {
            RpcFrame::Reply(reply) if reply.request == request => Ok(reply),
            RpcFrame::Reply(_) => Err(FrameError::reply_mismatch()),
            _ => Err(FrameError::invalid_message()),
        }
    }
}
