//! Receiving strategies and their composition with a running sender.
//!
//! The `chain_*` functions spawn the sender onto its own task and own its
//! termination: once the receiving side is finished (single reply in hand,
//! stream end, server error, or the consumer walking away) the sender is
//! aborted and the abort is absorbed. A sender that failed on its own has
//! its error surfaced to the caller instead.

use async_stream::try_stream;
use cw_protocol::chat::ChatFrame;
use cw_protocol::reasons;
use futures_util::Stream;
use serde_json::Value;
use std::future::Future;
use tokio_util::task::AbortOnDropHandle;
use uuid::Uuid;

use crate::chat;
use crate::error::ClientError;
use crate::transport::{self, WsSource};

/// Read one `data` frame for this conversation and return its payload.
pub async fn single(source: &mut WsSource, chat_id: Uuid) -> Result<Value, ClientError> {
    let text = transport::expect_text(source).await?;
    let data = ChatFrame::parse(&text)?.expect_data()?;
    if data.chat_id != chat_id {
        return Err(ClientError::Protocol(
            reasons::CONVERSATION_MISMATCH.to_owned(),
        ));
    }
    Ok(data.payload)
}

/// One step of a streamed response.
enum StreamStep {
    Item(Value),
    End,
}

/// Read the next stream frame: a payload, or the end marker. The
/// conversation id is verified on every frame, `stream-end` included; error
/// frames are promoted before any id check.
async fn stream_step(source: &mut WsSource, chat_id: Uuid) -> Result<StreamStep, ClientError> {
    let text = transport::expect_text(source).await?;
    match ChatFrame::parse(&text)?.into_result()? {
        ChatFrame::Data(data) if data.chat_id == chat_id => Ok(StreamStep::Item(data.payload)),
        ChatFrame::StreamEnd(end) if end.chat_id == chat_id => Ok(StreamStep::End),
        ChatFrame::Data(_) | ChatFrame::StreamEnd(_) => Err(ClientError::Protocol(
            reasons::CONVERSATION_MISMATCH.to_owned(),
        )),
        _ => Err(ClientError::Protocol(reasons::INVALID_MESSAGE.to_owned())),
    }
}

/// Abort a sender we are done with and absorb the cancellation. A sender
/// that already failed on its own surfaces its error; a sender panic is
/// resumed here.
async fn finish_sending(
    sending: AbortOnDropHandle<Result<(), ClientError>>,
) -> Result<(), ClientError> {
    sending.abort();
    match sending.await {
        Ok(result) => result,
        Err(join) if join.is_cancelled() => Ok(()),
        Err(join) => std::panic::resume_unwind(join.into_panic()),
    }
}

/// Null receiver chain: nothing to read, just drive the sender.
pub async fn chain_null<F>(sending: F) -> Result<(), ClientError>
where
    F: Future<Output = Result<(), ClientError>>,
{
    sending.await
}

/// Single receiver chain: run the sender concurrently, take the one reply,
/// then cancel whatever is left of the sender.
///
/// Once the reply is in hand the caller's result is complete; a
/// still-running sender (e.g. a slow upload whose reply arrived early) must
/// not outlive the conversation.
pub async fn chain_single<F>(
    sending: F,
    source: &mut WsSource,
    chat_id: Uuid,
) -> Result<Value, ClientError>
where
    F: Future<Output = Result<(), ClientError>> + Send + 'static,
{
    let sending = AbortOnDropHandle::new(tokio::spawn(sending));
    let received = single(source, chat_id).await;
    match (received, finish_sending(sending).await) {
        (Ok(payload), Ok(())) => Ok(payload),
        (Ok(_), Err(send_err)) => Err(send_err),
        (Err(recv_err), _) => Err(recv_err),
    }
}

/// Stream receiver chain: run the sender concurrently and yield payloads
/// until `stream-end`, then cancel the sender and wait out the server's
/// `stop`.
///
/// Dropping the returned stream mid-iteration aborts the sender through the
/// task guard and tears the connection down with it; the stop exchange only
/// happens after a clean end of stream.
pub fn chain_stream<F>(
    sending: F,
    mut source: WsSource,
    chat_id: Uuid,
) -> impl Stream<Item = Result<Value, ClientError>> + Send
where
    F: Future<Output = Result<(), ClientError>> + Send + 'static,
{
    try_stream! {
        let sending = AbortOnDropHandle::new(tokio::spawn(sending));
        loop {
            match stream_step(&mut source, chat_id).await? {
                StreamStep::Item(payload) => yield payload,
                StreamStep::End => break,
            }
        }
        finish_sending(sending).await?;
        chat::close(&mut source, chat_id).await?;
    }
}
