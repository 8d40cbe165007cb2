//! Public client facade for the conversation dialect.
//!
//! Six operations, each fixing one sending strategy and one receiving
//! strategy over a fresh connection; everything else (envelope, chaining,
//! cancellation) is shared composition.

use futures_util::stream::BoxStream;
use futures_util::{Stream, StreamExt};
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::chat;
use crate::error::ClientError;
use crate::receive;
use crate::send::Sender;
use crate::transport::{self, CallOptions, WsSink, WsSource};

/// A streamed result: payloads in server emission order, ending after the
/// first `stream-end`.
pub type PayloadStream = BoxStream<'static, Result<Value, ClientError>>;

/// A client bound to one server base URL.
///
/// Each operation opens its own connection and conversation; the client
/// itself holds no connection state and is cheap to clone.
#[derive(Debug, Clone)]
pub struct Client {
    base_url: String,
    options: CallOptions,
}

impl Client {
    /// Create a client for `url` (trailing slash tolerated).
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_options(url, CallOptions::default())
    }

    /// Create a client with construction-time connect options, applied to
    /// every call unless overridden per call.
    pub fn with_options(url: impl Into<String>, options: CallOptions) -> Self {
        Self {
            base_url: untrail(url.into()),
            options,
        }
    }

    // -----------------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------------

    /// Read one payload from `path`.
    pub async fn get(&self, path: &str) -> Result<Value, ClientError> {
        self.get_with(path, CallOptions::default()).await
    }

    pub async fn get_with(&self, path: &str, opts: CallOptions) -> Result<Value, ClientError> {
        self.call_unary(path, Sender::Null, opts).await
    }

    /// Read a stream of payloads from `path`.
    pub async fn subscribe(&self, path: &str) -> Result<PayloadStream, ClientError> {
        self.subscribe_with(path, CallOptions::default()).await
    }

    pub async fn subscribe_with(
        &self,
        path: &str,
        opts: CallOptions,
    ) -> Result<PayloadStream, ClientError> {
        self.call_streaming(path, Sender::Null, opts).await
    }

    /// Send one payload to `path` and read one payload back.
    pub async fn request(&self, path: &str, data: Value) -> Result<Value, ClientError> {
        self.request_with(path, data, CallOptions::default()).await
    }

    pub async fn request_with(
        &self,
        path: &str,
        data: Value,
        opts: CallOptions,
    ) -> Result<Value, ClientError> {
        self.call_unary(path, Sender::Single(data), opts).await
    }

    /// Send a stream of payloads to `path` and read one payload back.
    ///
    /// Pre-materialized sequences are lifted with
    /// `futures_util::stream::iter`.
    pub async fn request_stream_in<S>(&self, path: &str, data: S) -> Result<Value, ClientError>
    where
        S: Stream<Item = Value> + Send + 'static,
    {
        self.request_stream_in_with(path, data, CallOptions::default())
            .await
    }

    pub async fn request_stream_in_with<S>(
        &self,
        path: &str,
        data: S,
        opts: CallOptions,
    ) -> Result<Value, ClientError>
    where
        S: Stream<Item = Value> + Send + 'static,
    {
        self.call_unary(path, Sender::Stream(data.boxed()), opts)
            .await
    }

    /// Send one payload to `path` and read a stream of payloads back.
    pub async fn request_stream_out(
        &self,
        path: &str,
        data: Value,
    ) -> Result<PayloadStream, ClientError> {
        self.request_stream_out_with(path, data, CallOptions::default())
            .await
    }

    pub async fn request_stream_out_with(
        &self,
        path: &str,
        data: Value,
        opts: CallOptions,
    ) -> Result<PayloadStream, ClientError> {
        self.call_streaming(path, Sender::Single(data), opts).await
    }

    /// Send a stream of payloads to `path` and read a stream back.
    pub async fn request_stream_in_out<S>(
        &self,
        path: &str,
        data: S,
    ) -> Result<PayloadStream, ClientError>
    where
        S: Stream<Item = Value> + Send + 'static,
    {
        self.request_stream_in_out_with(path, data, CallOptions::default())
            .await
    }

    pub async fn request_stream_in_out_with<S>(
        &self,
        path: &str,
        data: S,
        opts: CallOptions,
    ) -> Result<PayloadStream, ClientError>
    where
        S: Stream<Item = Value> + Send + 'static,
    {
        self.call_streaming(path, Sender::Stream(data.boxed()), opts)
            .await
    }

    // -----------------------------------------------------------------------
    // Composer
    // -----------------------------------------------------------------------

    /// Unary composition: sender + single receiver, then the stop exchange.
    async fn call_unary(
        &self,
        path: &str,
        sender: Sender,
        opts: CallOptions,
    ) -> Result<Value, ClientError> {
        let (sink, mut source, chat_id) = self.open_call(path, opts).await?;
        let sending = sender.send(sink, chat_id);
        let payload = receive::chain_single(sending, &mut source, chat_id).await?;
        chat::close(&mut source, chat_id).await?;
        Ok(payload)
    }

    /// Streaming composition: sender + stream receiver. The returned stream
    /// owns the connection and finishes the stop exchange after a clean
    /// `stream-end`.
    async fn call_streaming(
        &self,
        path: &str,
        sender: Sender,
        opts: CallOptions,
    ) -> Result<PayloadStream, ClientError> {
        let (sink, source, chat_id) = self.open_call(path, opts).await?;
        let sending = sender.send(sink, chat_id);
        Ok(receive::chain_stream(sending, source, chat_id).boxed())
    }

    /// Connect, split the socket, and open the conversation.
    async fn open_call(
        &self,
        path: &str,
        opts: CallOptions,
    ) -> Result<(WsSink, WsSource, Uuid), ClientError> {
        let url = format!("{}{}", self.base_url, lead(path));
        let opts = self.options.clone().merge(opts);
        let ws = transport::connect(&url, &opts).await?;
        let (mut sink, source) = ws.split();
        let chat_id = chat::open(&mut sink).await?;
        debug!(%url, %chat_id, "call opened");
        Ok((sink, source, chat_id))
    }
}

/// Strip one trailing slash from a base URL.
pub(crate) fn untrail(mut url: String) -> String {
    if url.ends_with('/') {
        url.pop();
    }
    url
}

/// Ensure a path starts with exactly the slash that joins it to the base.
pub(crate) fn lead(path: &str) -> String {
    if path.starts_with('/') {
        path.to_owned()
    } else {
        format!("/{path}")
    }
}
