//! Field-bus stack interface
//!
//! The gateway never speaks the wire protocol itself. Discovery, property
//! reads/writes and batched reads are delegated to a `FieldBus`
//! implementation that is injected at startup and shared by every request.

use std::fmt;

use async_trait::async_trait;
use serde::Serialize;

use super::reference::PropertyReference;
use super::types::{DeviceAddress, DeviceAnnouncement, ObjectIdentifier, PropertyValue};

/// Error class and code returned by a device for a failed property access
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorValue {
    pub class: String,
    pub code: String,
}

impl ErrorValue {
    pub fn new(class: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            code: code.into(),
        }
    }
}

impl fmt::Display for ErrorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.class, self.code)
    }
}

/// Reason carried by an Abort-PDU
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbortReason {
    SegmentationNotSupported,
    BufferOverflow,
    Other(String),
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SegmentationNotSupported => f.write_str("segmentation-not-supported"),
            Self::BufferOverflow => f.write_str("buffer-overflow"),
            Self::Other(reason) => f.write_str(reason),
        }
    }
}

/// Rejection reported by the stack for a confirmed request
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    #[error("BACnet error: {0}")]
    Error(ErrorValue),

    #[error("BACnet reject: {0}")]
    Reject(String),

    #[error("BACnet abort: {0}")]
    Abort(AbortReason),

    /// The stack received a value it could not map to a known value class
    #[error("BACnet decode error: no object class for {0}")]
    NoObjectClass(String),

    #[error("BACnet value error: {0}")]
    InvalidValue(String),

    #[error("BACnet timeout: no response from {0}")]
    Timeout(String),
}

impl ProtocolError {
    pub fn is_segmentation_not_supported(&self) -> bool {
        matches!(self, Self::Abort(AbortReason::SegmentationNotSupported))
    }
}

/// Properties to read from one object in a batched read
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PropertyRequestBlock {
    pub object: ObjectIdentifier,
    pub properties: Vec<PropertyReference>,
}

/// One result of a batched read
#[derive(Debug, Clone, PartialEq)]
pub struct ReadAccessResult {
    pub object: ObjectIdentifier,
    pub property: PropertyReference,
    pub result: Result<PropertyValue, ErrorValue>,
}

/// Field-bus stack operations consumed by the gateway
#[async_trait]
pub trait FieldBus: Send + Sync {
    /// Who-Is for instances `low..=high`; a global broadcast unless
    /// `destination` is given
    async fn who_is(
        &self,
        low: u32,
        high: u32,
        destination: Option<&DeviceAddress>,
    ) -> Result<Vec<DeviceAnnouncement>, ProtocolError>;

    /// ReadProperty
    async fn read_property(
        &self,
        address: &DeviceAddress,
        object: &ObjectIdentifier,
        property: &PropertyReference,
    ) -> Result<PropertyValue, ProtocolError>;

    /// WriteProperty, with the array index taken from `property`
    async fn write_property(
        &self,
        address: &DeviceAddress,
        object: &ObjectIdentifier,
        property: &PropertyReference,
        value: PropertyValue,
        priority: Option<u8>,
    ) -> Result<(), ProtocolError>;

    /// ReadPropertyMultiple; per-item failures are embedded in the results
    async fn read_property_multiple(
        &self,
        address: &DeviceAddress,
        requests: &[PropertyRequestBlock],
    ) -> Result<Vec<ReadAccessResult>, ProtocolError>;
}
