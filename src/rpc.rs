//! Request/reply operations.
//!
//! The envelope-free dialect: no conversation framing, replies correlated to
//! requests by id. Each operation opens its own connection, writes all of
//! its input up front, then reads. Streamed results end on `stream-end`
//! except [`subscribe`], which runs until the server closes the connection.
//!
//! The free functions take a full URL plus explicit options;
//! [`RpcClient`] binds a base URL and construction-time options the same way
//! [`crate::Client`] does for the conversation dialect.

use async_stream::try_stream;
use cw_protocol::reasons;
use cw_protocol::rpc::{Request, RpcFrame, StreamEnd};
use futures_util::{Stream, StreamExt, pin_mut};
use serde_json::Value;
use uuid::Uuid;

use crate::client::{PayloadStream, lead, untrail};
use crate::error::ClientError;
use crate::transport::{self, CallOptions, WsStream};

/// Read one pushed payload.
pub async fn get(url: &str, opts: &CallOptions) -> Result<Value, ClientError> {
    let mut ws = transport::connect(url, opts).await?;
    let text = transport::expect_text(&mut ws).await?;
    Ok(RpcFrame::parse(&text)?.expect_data()?.payload)
}

/// Read pushed payloads until `stream-end`.
pub async fn get_stream(url: &str, opts: &CallOptions) -> Result<PayloadStream, ClientError> {
    let mut ws = transport::connect(url, opts).await?;
    let stream = try_stream! {
        loop {
            let text = transport::expect_text(&mut ws).await?;
            match RpcFrame::parse(&text)?.into_result()? {
                RpcFrame::Data(data) => yield data.payload,
                RpcFrame::StreamEnd(_) => break,
                _ => Err(ClientError::Protocol(reasons::INVALID_MESSAGE.to_owned()))?,
            }
        }
    };
    Ok(stream.boxed())
}

/// Read pushed payloads until the server closes the connection.
pub async fn subscribe(url: &str, opts: &CallOptions) -> Result<PayloadStream, ClientError> {
    let mut ws = transport::connect(url, opts).await?;
    let stream = try_stream! {
        while let Some(text) = transport::next_text(&mut ws).await? {
            yield RpcFrame::parse(&text)?.expect_data()?.payload;
        }
    };
    Ok(stream.boxed())
}

/// Send one request and read its reply.
pub async fn request(url: &str, payload: Value, opts: &CallOptions) -> Result<Value, ClientError> {
    let request = Request::new(payload);
    let request_id = request.id;

    let mut ws = transport::connect(url, opts).await?;
    transport::send_text(&mut ws, RpcFrame::Request(request).to_json()?).await?;

    let text = transport::expect_text(&mut ws).await?;
    Ok(RpcFrame::parse(&text)?.expect_reply(request_id)?.payload)
}

/// Send a run of requests sealed by `stream-end`, then read one reply.
///
/// The reply is correlated against the last request sent; an empty source
/// leaves nothing to correlate and fails with the reply-mismatch protocol
/// error before any read.
pub async fn request_stream_in<S>(
    url: &str,
    payloads: S,
    opts: &CallOptions,
) -> Result<Value, ClientError>
where
    S: Stream<Item = Value>,
{
    let mut ws = transport::connect(url, opts).await?;
    let request_id = send_request_stream(&mut ws, payloads).await?;

    let text = transport::expect_text(&mut ws).await?;
    Ok(RpcFrame::parse(&text)?.expect_reply(request_id)?.payload)
}

/// Send one request and read replies until `stream-end`.
pub async fn request_stream_out(
    url: &str,
    payload: Value,
    opts: &CallOptions,
) -> Result<PayloadStream, ClientError> {
    let request = Request::new(payload);
    let request_id = request.id;

    let mut ws = transport::connect(url, opts).await?;
    transport::send_text(&mut ws, RpcFrame::Request(request).to_json()?).await?;
    Ok(reply_stream(ws, request_id))
}

/// Send a run of requests sealed by `stream-end`, then read replies until
/// `stream-end`. Replies are correlated against the last request sent.
pub async fn request_stream_in_out<S>(
    url: &str,
    payloads: S,
    opts: &CallOptions,
) -> Result<PayloadStream, ClientError>
where
    S: Stream<Item = Value>,
{
    let mut ws = transport::connect(url, opts).await?;
    let request_id = send_request_stream(&mut ws, payloads).await?;
    Ok(reply_stream(ws, request_id))
}

// ---------------------------------------------------------------------------
// Shared pieces
// ---------------------------------------------------------------------------

/// Write one request per payload plus the closing `stream-end`; returns the
/// last request id for reply correlation.
async fn send_request_stream<S>(ws: &mut WsStream, payloads: S) -> Result<Uuid, ClientError>
where
    S: Stream<Item = Value>,
{
    let mut last_request = None;
    pin_mut!(payloads);
    while let Some(payload) = payloads.next().await {
        let request = Request::new(payload);
        last_request = Some(request.id);
        transport::send_text(ws, RpcFrame::Request(request).to_json()?).await?;
    }
    transport::send_text(ws, RpcFrame::StreamEnd(StreamEnd {}).to_json()?).await?;

    last_request.ok_or_else(|| ClientError::Protocol(reasons::REPLY_MISMATCH.to_owned()))
}

/// Yield correlated reply payloads until `stream-end`.
fn reply_stream(mut ws: WsStream, request_id: Uuid) -> PayloadStream {
    let stream = try_stream! {
        loop {
            let text = transport::expect_text(&mut ws).await?;
            match RpcFrame::parse(&text)?.into_result()? {
                RpcFrame::Reply(reply) if reply.request == request_id => yield reply.payload,
                RpcFrame::Reply(_) => {
                    Err(ClientError::Protocol(reasons::REPLY_MISMATCH.to_owned()))?;
                }
                RpcFrame::StreamEnd(_) => break,
                _ => Err(ClientError::Protocol(reasons::INVALID_MESSAGE.to_owned()))?,
            }
        }
    };
    stream.boxed()
}

// ---------------------------------------------------------------------------
// Facade
// ---------------------------------------------------------------------------

/// The request/reply twin of [`crate::Client`]: same construction, the call
/// shapes of this dialect.
#[derive(Debug, Clone)]
pub struct RpcClient {
    base_url: String,
    options: CallOptions,
}

impl RpcClient {
    /// Create a client for `url` (trailing slash tolerated).
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_options(url, CallOptions::default())
    }

    /// Create a client with connect options applied to every call.
    pub fn with_options(url: impl Into<String>, options: CallOptions) -> Self {
        Self {
            base_url: untrail(url.into()),
            options,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, lead(path))
    }

    pub async fn get(&self, path: &str) -> Result<Value, ClientError> {
        get(&self.url(path), &self.options).await
    }

    pub async fn get_stream(&self, path: &str) -> Result<PayloadStream, ClientError> {
        get_stream(&self.url(path), &self.options).await
    }

    pub async fn subscribe(&self, path: &str) -> Result<PayloadStream, ClientError> {
        subscribe(&self.url(path), &self.options).await
    }

    pub async fn request(&self, path: &str, payload: Value) -> Result<Value, ClientError> {
        request(&self.url(path), payload, &self.options).await
    }

    pub async fn request_stream_in<S>(&self, path: &str, payloads: S) -> Result<Value, ClientError>
    where
        S: Stream<Item = Value>,
    {
        request_stream_in(&self.url(path), payloads, &self.options).await
    }

    pub async fn request_stream_out(
        &self,
        path: &str,
        payload: Value,
    ) -> Result<PayloadStream, ClientError> {
        request_stream_out(&self.url(path), payload, &self.options).await
    }

    pub async fn request_stream_in_out<S>(
        &self,
        path: &str,
        payloads: S,
    ) -> Result<PayloadStream, ClientError>
    where
        S: Stream<Item = Value>,
    {
        request_stream_in_out(&self.url(path), payloads, &self.options).await
    }
}
