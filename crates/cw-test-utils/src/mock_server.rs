// mock_server: A scriptable mock WebSocket server for client testing.
//
// Binds to port 0 (random) and hands every accepted connection to the
// test-supplied handler on its own task, so each test scripts the exact
// server side of the exchange it needs. Helpers panic on contract
// violations; this is fixture code, failing loudly is the point.

use std::future::Future;
use std::net::SocketAddr;

use cw_protocol::chat::{self, ChatFrame};
use cw_protocol::rpc::RpcFrame;
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::protocol::Message;
use uuid::Uuid;

/// A mock WebSocket server driven by a per-connection handler.
///
/// Each test spins up its own isolated instance:
///
/// ```ignore
/// let server = MockServer::start(|mut conn| async move {
///     let chat_id = conn.accept_chat().await;
///     conn.send_data(chat_id, json!({"foo": "bar"})).await;
///     conn.send_stop(chat_id).await;
/// })
/// .await?;
/// ```
pub struct MockServer {
    addr: SocketAddr,
    /// Handle to the background accept loop; dropped with the server.
    _task: tokio::task::JoinHandle<()>,
}

impl MockServer {
    /// Start the mock server, binding to a random available port. Client
    /// connections are accepted in a background task, one spawned handler
    /// per connection.
    pub async fn start<F, Fut>(handler: F) -> Result<Self, Box<dyn std::error::Error>>
    where
        F: Fn(ServerConn) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let task = tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, _peer)) => {
                        let conn = match tokio_tungstenite::accept_async(stream).await {
                            Ok(ws) => ServerConn { ws },
                            // Handshake failures are expected when a test
                            // drops a half-open client.
                            Err(_) => continue,
                        };
                        tokio::spawn(handler(conn));
                    }
                    Err(_) => break,
                }
            }
        });

        Ok(Self { addr, _task: task })
    }

    /// The address the server is listening on.
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// The `ws://` URL of the server.
    pub fn url(&self) -> String {
        format!("ws://{}", self.addr)
    }
}

/// The server side of one accepted connection.
pub struct ServerConn {
    ws: WebSocketStream<TcpStream>,
}

impl ServerConn {
    // -----------------------------------------------------------------------
    // Raw frames
    // -----------------------------------------------------------------------

    /// Send one text frame verbatim (e.g. deliberately malformed input).
    pub async fn send_text(&mut self, text: &str) {
        self.ws
            .send(Message::Text(text.to_owned().into()))
            .await
            .expect("mock server failed to send");
    }

    /// Wait for the next text frame; `None` once the client is gone.
    pub async fn recv_text(&mut self) -> Option<String> {
        loop {
            match self.ws.next().await {
                None => return None,
                // The client tearing the connection down mid-test is a
                // normal ending for abandonment scenarios.
                Some(Err(_)) => return None,
                Some(Ok(Message::Text(text))) => return Some(text.to_string()),
                Some(Ok(Message::Close(_))) => return None,
                Some(Ok(Message::Ping(data))) => {
                    let _ = self.ws.send(Message::Pong(data)).await;
                }
                Some(Ok(_)) => {}
            }
        }
    }

    /// Close the connection from the server side.
    pub async fn close(&mut self) {
        let _ = self.ws.send(Message::Close(None)).await;
    }

    // -----------------------------------------------------------------------
    // Conversation dialect
    // -----------------------------------------------------------------------

    pub async fn send_chat(&mut self, frame: &ChatFrame) {
        let json = frame.to_json().expect("mock server frame serialization");
        self.send_text(&json).await;
    }

    pub async fn recv_chat(&mut self) -> Option<ChatFrame> {
        let text = self.recv_text().await?;
        Some(ChatFrame::parse(&text).expect("mock server received invalid chat frame"))
    }

    /// Expect the opening `start` frame and return the client's
    /// conversation id.
    pub async fn accept_chat(&mut self) -> Uuid {
        match self.recv_chat().await {
            Some(ChatFrame::Start(start)) => start.chat_id,
            other => panic!("expected start frame, got {other:?}"),
        }
    }

    /// Expect a `data` frame for this conversation and return its payload.
    pub async fn recv_data(&mut self, chat_id: Uuid) -> Value {
        match self.recv_chat().await {
            Some(ChatFrame::Data(data)) => {
                assert_eq!(data.chat_id, chat_id, "data frame for wrong conversation");
                data.payload
            }
            other => panic!("expected data frame, got {other:?}"),
        }
    }

    /// Expect the client's `stream-end` for this conversation.
    pub async fn recv_stream_end(&mut self, chat_id: Uuid) {
        match self.recv_chat().await {
            Some(ChatFrame::StreamEnd(end)) => {
                assert_eq!(end.chat_id, chat_id, "stream-end for wrong conversation");
            }
            other => panic!("expected stream-end frame, got {other:?}"),
        }
    }

    pub async fn send_data(&mut self, chat_id: Uuid, payload: Value) {
        self.send_chat(&ChatFrame::Data(chat::Data::new(chat_id, payload)))
            .await;
    }

    pub async fn send_stream_end(&mut self, chat_id: Uuid) {
        self.send_chat(&ChatFrame::StreamEnd(chat::StreamEnd::new(chat_id)))
            .await;
    }

    pub async fn send_stop(&mut self, chat_id: Uuid) {
        self.send_chat(&ChatFrame::Stop(chat::Stop::new(chat_id)))
            .await;
    }

    pub async fn send_app_error(&mut self, chat_id: Uuid, code: i64, reason: &str) {
        self.send_chat(&ChatFrame::AppError(chat::AppError {
            id: Uuid::new_v4(),
            chat_id,
            code,
            reason: reason.to_owned(),
        }))
        .await;
    }

    pub async fn send_protocol_error(&mut self, chat_id: Option<Uuid>, reason: &str) {
        self.send_chat(&ChatFrame::ProtocolError(chat::ProtocolError {
            id: Uuid::new_v4(),
            chat_id,
            reason: reason.to_owned(),
        }))
        .await;
    }

    // -----------------------------------------------------------------------
    // Request/reply dialect
    // -----------------------------------------------------------------------

    pub async fn send_rpc(&mut self, frame: &RpcFrame) {
        let json = frame.to_json().expect("mock server frame serialization");
        self.send_text(&json).await;
    }

    pub async fn recv_rpc(&mut self) -> Option<RpcFrame> {
        let text = self.recv_text().await?;
        Some(RpcFrame::parse(&text).expect("mock server received invalid rpc frame"))
    }

    /// Expect a `request` frame and return it.
    pub async fn recv_request(&mut self) -> cw_protocol::rpc::Request {
        match self.recv_rpc().await {
            Some(RpcFrame::Request(request)) => request,
            other => panic!("expected request frame, got {other:?}"),
        }
    }
}
