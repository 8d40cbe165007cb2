//! Happy-path coverage for the six conversation-dialect operations.
//!
//! Every test scripts its own mock server; assertions about what the server
//! received flow back to the test over a channel.

use chatwire::Client;
use cw_test_utils::{MockServer, ServerConn};
use futures_util::{StreamExt, stream};
use serde_json::{Value, json};

// ---------------------------------------------------------------------------
// Harness helpers
// ---------------------------------------------------------------------------

/// Drain a streamed result, panicking on the first error item.
async fn collect(mut results: chatwire::PayloadStream) -> Vec<Value> {
    let mut items = Vec::new();
    while let Some(item) = results.next().await {
        items.push(item.expect("stream item"));
    }
    items
}

// ---------------------------------------------------------------------------
// get / subscribe (nothing sent)
// ---------------------------------------------------------------------------

/// Test: `get` returns the one payload the server pushed, then completes
/// the stop exchange.
#[tokio::test]
async fn get_returns_single_payload() {
    let server = MockServer::start(|mut conn: ServerConn| async move {
        let chat_id = conn.accept_chat().await;
        conn.send_data(chat_id, json!({"foo": "bar"})).await;
        conn.send_stop(chat_id).await;
    })
    .await
    .unwrap();

    let result = Client::new(server.url()).get("/").await.unwrap();
    assert_eq!(result, json!({"foo": "bar"}));
}

/// Test: `subscribe` yields payloads in emission order and ends at
/// `stream-end`.
#[tokio::test]
async fn subscribe_yields_payloads_in_order() {
    let server = MockServer::start(|mut conn: ServerConn| async move {
        let chat_id = conn.accept_chat().await;
        conn.send_data(chat_id, json!({"foo": "bar"})).await;
        conn.send_data(chat_id, json!({"bar": "foo"})).await;
        conn.send_stream_end(chat_id).await;
        conn.send_stop(chat_id).await;
    })
    .await
    .unwrap();

    let results = Client::new(server.url()).subscribe("/").await.unwrap();
    assert_eq!(
        collect(results).await,
        vec![json!({"foo": "bar"}), json!({"bar": "foo"})]
    );
}

/// Test: an immediate `stream-end` produces an empty, clean stream.
#[tokio::test]
async fn subscribe_handles_empty_stream() {
    let server = MockServer::start(|mut conn: ServerConn| async move {
        let chat_id = conn.accept_chat().await;
        conn.send_stream_end(chat_id).await;
        conn.send_stop(chat_id).await;
    })
    .await
    .unwrap();

    let results = Client::new(server.url()).subscribe("/").await.unwrap();
    assert!(collect(results).await.is_empty());
}

// ---------------------------------------------------------------------------
// request (one payload each way)
// ---------------------------------------------------------------------------

/// Test: `request` sends exactly one `data` frame and returns the reply.
#[tokio::test]
async fn request_round_trips_one_payload() {
    let (seen_tx, mut seen_rx) = tokio::sync::mpsc::unbounded_channel();

    let server = MockServer::start(move |mut conn: ServerConn| {
        let seen_tx = seen_tx.clone();
        async move {
            let chat_id = conn.accept_chat().await;
            let incoming = conn.recv_data(chat_id).await;
            seen_tx.send(incoming).unwrap();
            conn.send_data(chat_id, json!({"foo": "bar"})).await;
            conn.send_stop(chat_id).await;
        }
    })
    .await
    .unwrap();

    let result = Client::new(server.url()).request("/", json!({})).await.unwrap();
    assert_eq!(result, json!({"foo": "bar"}));
    assert_eq!(seen_rx.recv().await.unwrap(), json!({}));
}

// ---------------------------------------------------------------------------
// request_stream_in (stream up, one payload down)
// ---------------------------------------------------------------------------

/// Test: the server sees N `data` frames in source order plus one
/// `stream-end`, and the client returns the single reply.
#[tokio::test]
async fn request_stream_in_sends_all_payloads_then_end() {
    let (seen_tx, mut seen_rx) = tokio::sync::mpsc::unbounded_channel();

    let server = MockServer::start(move |mut conn: ServerConn| {
        let seen_tx = seen_tx.clone();
        async move {
            let chat_id = conn.accept_chat().await;
            let first = conn.recv_data(chat_id).await;
            let second = conn.recv_data(chat_id).await;
            conn.recv_stream_end(chat_id).await;
            seen_tx.send(vec![first, second]).unwrap();
            conn.send_data(chat_id, json!({"ok": true})).await;
            conn.send_stop(chat_id).await;
        }
    })
    .await
    .unwrap();

    let payloads = stream::iter(vec![json!({"a": 1}), json!({"b": 2})]);
    let result = Client::new(server.url())
        .request_stream_in("/", payloads)
        .await
        .unwrap();

    assert_eq!(result, json!({"ok": true}));
    assert_eq!(
        seen_rx.recv().await.unwrap(),
        vec![json!({"a": 1}), json!({"b": 2})]
    );
}

/// Test: a reply arriving before the upload finished cancels the sender
/// without surfacing any error to the caller.
#[tokio::test]
async fn request_stream_in_slow_sender_is_cancelled_cleanly() {
    let server = MockServer::start(|mut conn: ServerConn| async move {
        let chat_id = conn.accept_chat().await;
        // Read one upload frame, then answer without waiting for the rest.
        let _ = conn.recv_data(chat_id).await;
        conn.send_data(chat_id, json!({"done": true})).await;
        conn.send_stop(chat_id).await;
    })
    .await
    .unwrap();

    // One item, then a source that never produces another.
    let payloads = stream::iter(vec![json!({"a": 1})]).chain(stream::pending());
    let result = Client::new(server.url())
        .request_stream_in("/", payloads)
        .await
        .unwrap();

    assert_eq!(result, json!({"done": true}));
}

// ---------------------------------------------------------------------------
// request_stream_out / request_stream_in_out (stream down)
// ---------------------------------------------------------------------------

/// Test: `request_stream_out` sends one payload and yields the server's
/// frames in order.
#[tokio::test]
async fn request_stream_out_yields_replies_in_order() {
    let server = MockServer::start(|mut conn: ServerConn| async move {
        let chat_id = conn.accept_chat().await;
        let incoming = conn.recv_data(chat_id).await;
        assert_eq!(incoming, json!({"query": 7}));
        conn.send_data(chat_id, json!(1)).await;
        conn.send_data(chat_id, json!(2)).await;
        conn.send_stream_end(chat_id).await;
        conn.send_stop(chat_id).await;
    })
    .await
    .unwrap();

    let results = Client::new(server.url())
        .request_stream_out("/", json!({"query": 7}))
        .await
        .unwrap();
    assert_eq!(collect(results).await, vec![json!(1), json!(2)]);
}

/// Test: full-duplex streaming — upload sealed by `stream-end`, download
/// yielded until `stream-end`.
#[tokio::test]
async fn request_stream_in_out_streams_both_ways() {
    let server = MockServer::start(|mut conn: ServerConn| async move {
        let chat_id = conn.accept_chat().await;
        let incoming = conn.recv_data(chat_id).await;
        assert_eq!(incoming, json!({}));
        conn.recv_stream_end(chat_id).await;
        conn.send_data(chat_id, json!({"x": 1})).await;
        conn.send_data(chat_id, json!({"y": 2})).await;
        conn.send_stream_end(chat_id).await;
        conn.send_stop(chat_id).await;
    })
    .await
    .unwrap();

    let results = Client::new(server.url())
        .request_stream_in_out("/", stream::iter(vec![json!({})]))
        .await
        .unwrap();
    assert_eq!(collect(results).await, vec![json!({"x": 1}), json!({"y": 2})]);
}

// ---------------------------------------------------------------------------
// URL handling and per-call options
// ---------------------------------------------------------------------------

/// Test: base URLs with trailing slashes and paths without leading slashes
/// join to the same endpoint.
#[tokio::test]
async fn url_join_tolerates_slash_variants() {
    let server = MockServer::start(|mut conn: ServerConn| async move {
        let chat_id = conn.accept_chat().await;
        conn.send_data(chat_id, json!("pong")).await;
        conn.send_stop(chat_id).await;
    })
    .await
    .unwrap();

    let with_slash = Client::new(format!("{}/", server.url()));
    assert_eq!(with_slash.get("ping").await.unwrap(), json!("pong"));

    let without_slash = Client::new(server.url());
    assert_eq!(without_slash.get("/ping").await.unwrap(), json!("pong"));
}

/// Test: per-call options ride along without disturbing the call.
#[tokio::test]
async fn per_call_options_are_applied() {
    let server = MockServer::start(|mut conn: ServerConn| async move {
        let chat_id = conn.accept_chat().await;
        conn.send_data(chat_id, json!("ok")).await;
        conn.send_stop(chat_id).await;
    })
    .await
    .unwrap();

    let client = Client::with_options(
        server.url(),
        chatwire::CallOptions::default().header("X-Token", "construction"),
    );
    let result = client
        .get_with(
            "/",
            chatwire::CallOptions::default().header("X-Token", "per-call"),
        )
        .await
        .unwrap();
    assert_eq!(result, json!("ok"));
}
