//! WebSocket transport glue.
//!
//! One protocol frame is exactly one WebSocket text message; the transport
//! layer only moves text in and out. Framing semantics live in cw-protocol.
//!
//! The send/receive helpers are generic over the sink/stream bounds so they
//! work on a whole [`WsStream`] (request/reply dialect) as well as on its
//! split halves (conversation dialect, where the sender task owns the write
//! half and the receive loop owns the read half).

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::{HeaderName, HeaderValue};
use tokio_tungstenite::tungstenite::protocol::{Message, WebSocketConfig};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async_with_config, tungstenite};
use tracing::{debug, trace};

use crate::error::ClientError;

pub type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;
pub type WsSink = SplitSink<WsStream, Message>;
pub type WsSource = SplitStream<WsStream>;

// ---------------------------------------------------------------------------
// Connect options
// ---------------------------------------------------------------------------

/// Options forwarded to the WebSocket connect call.
///
/// Construction-time options on a client apply to every call; per-call
/// options layer on top via [`CallOptions::merge`].
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    /// Extra headers for the upgrade request (e.g. authorization).
    pub headers: Vec<(String, String)>,
    /// Low-level socket configuration passed through to tungstenite.
    pub ws_config: Option<WebSocketConfig>,
}

impl CallOptions {
    /// Add one upgrade-request header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Set the socket configuration.
    pub fn ws_config(mut self, config: WebSocketConfig) -> Self {
        self.ws_config = Some(config);
        self
    }

    /// Layer `over` on top of `self`: a same-name header from `over` wins
    /// (names compared case-insensitively), as does its socket config when
    /// set.
    pub fn merge(self, over: CallOptions) -> CallOptions {
        let mut headers: Vec<(String, String)> = self
            .headers
            .into_iter()
            .filter(|(name, _)| {
                !over
                    .headers
                    .iter()
                    .any(|(other, _)| other.eq_ignore_ascii_case(name))
            })
            .collect();
        headers.extend(over.headers);
        CallOptions {
            headers,
            ws_config: over.ws_config.or(self.ws_config),
        }
    }
}

// ---------------------------------------------------------------------------
// Connect
// ---------------------------------------------------------------------------

/// Open a WebSocket connection to `url`, applying the options to the
/// upgrade request. Connect failures surface as [`ClientError::Ws`].
pub async fn connect(url: &str, opts: &CallOptions) -> Result<WsStream, ClientError> {
    let mut request = url.into_client_request()?;
    for (name, value) in &opts.headers {
        let name: HeaderName = name
            .parse()
            .map_err(|e: tungstenite::http::header::InvalidHeaderName| {
                tungstenite::Error::HttpFormat(e.into())
            })?;
        let value: HeaderValue = value
            .parse()
            .map_err(|e: tungstenite::http::header::InvalidHeaderValue| {
                tungstenite::Error::HttpFormat(e.into())
            })?;
        request.headers_mut().insert(name, value);
    }

    let (ws, _response) = connect_async_with_config(request, opts.ws_config.clone(), false).await?;
    debug!(%url, "connected");
    Ok(ws)
}

// ---------------------------------------------------------------------------
// Text frame helpers
// ---------------------------------------------------------------------------

/// Send one text frame.
pub async fn send_text<S>(sink: &mut S, text: String) -> Result<(), ClientError>
where
    S: Sink<Message, Error = tungstenite::Error> + Unpin,
{
    trace!(len = text.len(), "send frame");
    sink.send(Message::Text(text.into())).await?;
    Ok(())
}

/// Wait for the next text frame, skipping control frames.
///
/// Returns `Ok(None)` when the peer closes cleanly; transport failures
/// surface as [`ClientError::Ws`].
pub async fn next_text<S>(source: &mut S) -> Result<Option<String>, ClientError>
where
    S: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
{
    loop {
        match source.next().await {
            None => return Ok(None),
            Some(Err(e)) => return Err(ClientError::Ws(e)),
            Some(Ok(Message::Text(text))) => {
                trace!(len = text.len(), "recv frame");
                return Ok(Some(text.to_string()));
            }
            Some(Ok(Message::Close(_))) => return Ok(None),
            Some(Ok(_)) => continue,
        }
    }
}

/// Like [`next_text`], but a closed connection is an error: the caller is
/// still owed a frame.
pub async fn expect_text<S>(source: &mut S) -> Result<String, ClientError>
where
    S: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
{
    next_text(source).await?.ok_or(ClientError::Disconnected)
}
