//! HTTP Request and Response Bodies
//!
//! Request bodies are deserialized by hand from the raw bytes so that a
//! malformed body still gets a `ResultEnvelope` back.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::bacnet::{DeviceAnnouncement, DiscoveredDevice, DiscoveredPoint};
use crate::config::GatewayConfig;

fn default_property() -> String {
    "present-value".to_string()
}

/// Query of the single-property read
#[derive(Debug, Clone, Deserialize)]
pub struct ReadQuery {
    #[serde(default = "default_property")]
    pub property_identifier: String,
}

/// Query of the single-instance Who-Is
#[derive(Debug, Clone, Deserialize)]
pub struct WhoIsQuery {
    /// Send the Who-Is to this address instead of broadcasting
    pub address: Option<String>,
}

/// Body of `POST /bacnet/write`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WritePropertyRequest {
    pub device_instance: i64,
    pub object_identifier: String,
    #[serde(default = "default_property")]
    pub property_identifier: String,
    /// Number, string, or `"null"` to release a command
    pub value: Value,
    pub priority: Option<i64>,
}

/// One `(object, property)` pair of a batched read
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyPair {
    pub object_identifier: String,
    pub property_identifier: String,
}

/// One object with its properties, grouped by the caller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectRequest {
    pub object_identifier: String,
    pub properties: Vec<String>,
}

/// Body of `POST /bacnet/read-multiple`
///
/// Either `requests` (flat pairs, grouped by the compiler) or `objects`
/// (already grouped). When both are given, `objects` wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadMultipleRequest {
    pub device_instance: i64,
    #[serde(default)]
    pub requests: Vec<PropertyPair>,
    #[serde(default)]
    pub objects: Vec<ObjectRequest>,
}

/// Payload of a single-property read
#[derive(Debug, Clone, Serialize)]
pub struct ReadResult {
    pub device_instance: i64,
    pub object_identifier: String,
    pub property_identifier: String,
    pub read_result: Value,
}

/// Payload of a write
#[derive(Debug, Clone, Serialize)]
pub struct WriteResult {
    pub device_instance: i64,
    pub object_identifier: String,
    pub property_identifier: String,
    pub written_value: Value,
    pub priority: Option<i64>,
}

/// Payload of a batched read
#[derive(Debug, Clone, Serialize)]
pub struct ReadMultipleResult {
    pub device_instance: i64,
    pub results: Value,
}

/// Payload of a single-instance Who-Is
#[derive(Debug, Clone, Serialize)]
pub struct WhoIsResult {
    pub device_instance: i64,
    pub devices: Vec<DeviceAnnouncement>,
}

/// Payload of a range Who-Is
#[derive(Debug, Clone, Serialize)]
pub struct WhoIsRangeResult {
    pub start: i64,
    pub end: i64,
    pub devices: Vec<DiscoveredDevice>,
}

/// Payload of point discovery
#[derive(Debug, Clone, Serialize)]
pub struct PointsResult {
    pub device_instance: i64,
    pub points: Vec<DiscoveredPoint>,
}

/// Payload of the configuration endpoint
#[derive(Debug, Clone, Serialize)]
pub struct ConfigResult<'a> {
    pub version: &'static str,
    pub gateway: &'a GatewayConfig,
}

/// Health check response
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    /// Devices with a learned address
    pub cached_devices: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_write_request_defaults() {
        let request: WritePropertyRequest = serde_json::from_value(json!({
            "device_instance": 201201,
            "object_identifier": "analog-value,11",
            "value": "null",
            "priority": 8
        }))
        .unwrap();
        assert_eq!(request.property_identifier, "present-value");
        assert_eq!(request.value, json!("null"));
        assert_eq!(request.priority, Some(8));
    }

    #[test]
    fn test_read_multiple_shapes() {
        let flat: ReadMultipleRequest = serde_json::from_value(json!({
            "device_instance": 1,
            "requests": [{"object_identifier": "analog-input,2", "property_identifier": "units"}]
        }))
        .unwrap();
        assert_eq!(flat.requests.len(), 1);
        assert!(flat.objects.is_empty());

        let grouped: ReadMultipleRequest = serde_json::from_value(json!({
            "device_instance": 1,
            "objects": [{"object_identifier": "analog-input,2", "properties": ["present-value", "units"]}]
        }))
        .unwrap();
        assert_eq!(grouped.objects[0].properties.len(), 2);
    }
}
