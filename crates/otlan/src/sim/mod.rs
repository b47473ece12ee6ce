//! Simulated Field Network
//!
//! An in-process BACnet network built from a project directory. The binary
//! serves it when no wire stack is attached, and tests drive the gateway
//! against it.

mod config;
mod loader;
mod network;

pub use config::*;
pub use loader::*;
pub use network::*;
