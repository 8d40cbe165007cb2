// cw-test-utils: Shared test fixtures for the client suite.
//
// Provides a scriptable mock WebSocket server: every test describes the
// exact server side of the exchange it needs, for either dialect.

pub mod mock_server;

pub use mock_server::{MockServer, ServerConn};
