//! Sending strategies.
//!
//! A sender owns the write half of the socket for the lifetime of the call
//! and emits zero or more frames. The receiving side decides when a
//! still-running sender is cancelled (see [`crate::receive`]).

use cw_protocol::chat::{ChatFrame, Data, StreamEnd};
use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use serde_json::Value;
use uuid::Uuid;

use crate::error::ClientError;
use crate::transport::{self, WsSink};

/// What a call writes to the server after the conversation opens.
///
/// Synchronous sequences are lifted into the `Stream` variant with
/// `futures_util::stream::iter`.
pub enum Sender {
    /// Writes nothing.
    Null,
    /// Writes one `data` frame.
    Single(Value),
    /// Writes one `data` frame per item, in source order, then `stream-end`.
    Stream(BoxStream<'static, Value>),
}

impl Sender {
    /// Run the sender to completion, consuming the write half.
    ///
    /// A source that ends normally is sealed with `stream-end`; frames reach
    /// the transport in source order.
    pub async fn send(self, mut sink: WsSink, chat_id: Uuid) -> Result<(), ClientError> {
        match self {
            Sender::Null => Ok(()),
            Sender::Single(payload) => {
                let frame = ChatFrame::Data(Data::new(chat_id, payload));
                transport::send_text(&mut sink, frame.to_json()?).await
            }
            Sender::Stream(mut items) => {
                while let Some(payload) = items.next().await {
                    let frame = ChatFrame::Data(Data::new(chat_id, payload));
                    transport::send_text(&mut sink, frame.to_json()?).await?;
                }
                let end = ChatFrame::StreamEnd(StreamEnd::new(chat_id));
                transport::send_text(&mut sink, end.to_json()?).await
            }
        }
    }
}
