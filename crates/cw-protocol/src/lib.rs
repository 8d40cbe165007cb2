// cw-protocol: Wire message types and serialization for both client dialects.
//
// Two dialects share one error taxonomy:
// - `chat`: conversation-framed messages, every frame tagged with the
//   conversation id it belongs to.
// - `rpc`: stateless request/reply messages correlated by request id.
//
// All messages use a top-level `type` field for discriminated
// (de)serialization; field names are camelCase on the wire.

pub mod chat;
pub mod error;
pub mod rpc;

pub use error::{FrameError, reasons};
