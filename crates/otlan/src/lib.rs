//! otlan - BACnet/IP to HTTP gateway
//!
//! Exposes read, write, batched read, discovery, and point enumeration of
//! BACnet devices over a JSON API. The field network is reached through the
//! `bacnet::FieldBus` trait; `sim` provides an in-memory network loaded from
//! a project directory.

pub mod bacnet;
pub mod config;
pub mod error;
pub mod server;
pub mod sim;
