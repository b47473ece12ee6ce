//! Gateway Errors
//!
//! Every failure a caller can observe is one of these variants. Handlers turn
//! them into a failed `ResultEnvelope`; only `Internal` hides its detail.

use crate::bacnet::ProtocolError;

/// Errors produced by the orchestration layer
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GatewayError {
    #[error("{0}")]
    Validation(String),

    #[error("Property specification incorrect: '{0}'")]
    MalformedPropertyReference(String),

    #[error("Device not found: {0}")]
    DeviceNotFound(u32),

    #[error("Multiple devices found: {0}")]
    AmbiguousDevice(u32),

    #[error("Unrecognized object type: {0}")]
    UnrecognizedObjectType(String),

    #[error("Unrecognized property '{property}' for object type {object_type}")]
    UnrecognizedProperty { object_type: String, property: String },

    #[error("No objects or properties were requested")]
    EmptyRequest,

    #[error("null is only for releasing overrides and requires a priority to release that override")]
    PriorityRequiredForRelease,

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("Object list length is not an integer: {0}")]
    InvalidInventoryLength(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// True for errors raised before any network activity because the request
    /// itself is malformed
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::Validation(_)
                | Self::MalformedPropertyReference(_)
                | Self::UnrecognizedObjectType(_)
                | Self::UnrecognizedProperty { .. }
                | Self::EmptyRequest
                | Self::PriorityRequiredForRelease
        )
    }

    /// Message safe to show to a caller
    pub fn user_message(&self) -> String {
        match self {
            Self::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

/// Result type for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bacnet::ErrorValue;

    #[test]
    fn test_protocol_error_is_verbatim() {
        let err = GatewayError::from(ProtocolError::Error(ErrorValue::new("property", "write-access-denied")));
        assert_eq!(err.to_string(), "BACnet error: property, write-access-denied");
        assert!(!err.is_validation());
    }

    #[test]
    fn test_internal_error_is_opaque() {
        let err = GatewayError::Internal("join handle dropped".to_string());
        assert_eq!(err.user_message(), "Internal server error");
    }

    #[test]
    fn test_validation_family() {
        assert!(GatewayError::EmptyRequest.is_validation());
        assert!(GatewayError::PriorityRequiredForRelease.is_validation());
        assert!(!GatewayError::DeviceNotFound(12).is_validation());
    }
}
