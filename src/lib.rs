//! chatwire: a client for a chat-framed messaging protocol over WebSocket.
//!
//! Each call opens its own connection, wraps the exchange in a conversation
//! envelope (`start` .. `stop`), and composes one sending strategy with one
//! receiving strategy over the two halves of the socket. Six operations fall
//! out of that composition:
//!
//! | Operation               | Sends            | Returns            |
//! |-------------------------|------------------|--------------------|
//! | `get`                   | nothing          | one payload        |
//! | `subscribe`             | nothing          | stream of payloads |
//! | `request`               | one payload      | one payload        |
//! | `request_stream_in`     | payload stream   | one payload        |
//! | `request_stream_out`    | one payload      | stream of payloads |
//! | `request_stream_in_out` | payload stream   | stream of payloads |
//!
//! Servers that speak the envelope-free request/reply dialect are covered by
//! the [`rpc`] module, which offers the same call shapes without the
//! conversation framing.

pub mod chat;
pub mod client;
pub mod error;
pub mod receive;
pub mod rpc;
pub mod send;
pub mod transport;

pub use client::{Client, PayloadStream};
pub use error::ClientError;
pub use rpc::RpcClient;
pub use send::Sender;
pub use transport::CallOptions;
