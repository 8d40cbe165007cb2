//! Conversation envelope.
//!
//! Every call opens a conversation by sending `start` with a freshly
//! generated id, and on the success path waits for the server's `stop`
//! carrying the same id. Error paths skip the stop exchange entirely: the
//! connection is torn down instead, so a failing call never blocks on a
//! frame that may never arrive. The client never sends `stop` itself.

use cw_protocol::chat::{ChatFrame, Start};
use cw_protocol::reasons;
use futures_util::{Sink, Stream};
use tokio_tungstenite::tungstenite;
use tokio_tungstenite::tungstenite::protocol::Message;
use tracing::debug;
use uuid::Uuid;

use crate::error::ClientError;
use crate::transport;

/// Send the opening `start` frame and return the generated conversation id.
pub async fn open<S>(sink: &mut S) -> Result<Uuid, ClientError>
where
    S: Sink<Message, Error = tungstenite::Error> + Unpin,
{
    let start = Start::new(Uuid::new_v4());
    let chat_id = start.chat_id;
    transport::send_text(sink, ChatFrame::Start(start).to_json()?).await?;
    debug!(%chat_id, "conversation opened");
    Ok(chat_id)
}

/// Wait for the server's closing `stop` frame and verify its id.
pub async fn close<S>(source: &mut S, chat_id: Uuid) -> Result<(), ClientError>
where
    S: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
{
    let text = transport::expect_text(source).await?;
    let stop = ChatFrame::parse(&text)?.expect_stop()?;
    if stop.chat_id != chat_id {
        return Err(ClientError::Protocol(
            reasons::CONVERSATION_MISMATCH.to_owned(),
        ));
    }
    debug!(%chat_id, "conversation closed");
    Ok(())
}
