//! HTTP Server
//!
//! JSON request/response facade over the gateway core. Every route answers
//! with a `ResultEnvelope`.

mod handler;
mod protocol;
mod router;
mod state;

pub use handler::*;
pub use protocol::*;
pub use router::*;
pub use state::*;
