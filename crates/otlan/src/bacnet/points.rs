//! Point enumeration
//!
//! Reads a device's object inventory and the name of every object in it.
//! Devices that cannot return `object-list` in one response are walked one
//! element at a time.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{GatewayError, GatewayResult};

use super::cache::AddressCache;
use super::reference::PropertyReference;
use super::schema::VendorSchema;
use super::stack::{FieldBus, ProtocolError};
use super::types::{AddressCacheEntry, DeviceInstance, ObjectIdentifier, ObjectType, PropertyValue};

/// One object on a device
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiscoveredPoint {
    pub object_identifier: ObjectIdentifier,
    /// Object name, or a description of why it could not be read
    pub name: String,
}

/// Walks device inventories
#[derive(Clone)]
pub struct PointEnumerator {
    bus: Arc<dyn FieldBus>,
    schema: Arc<dyn VendorSchema>,
    cache: AddressCache,
}

impl PointEnumerator {
    pub fn new(bus: Arc<dyn FieldBus>, schema: Arc<dyn VendorSchema>, cache: AddressCache) -> Self {
        Self { bus, schema, cache }
    }

    /// List every object on `device` with its name, in inventory order
    ///
    /// An undiscoverable device yields an empty list.
    pub async fn enumerate(&self, device: DeviceInstance) -> GatewayResult<Vec<DiscoveredPoint>> {
        let entry = match self.cache.resolve(device).await {
            Ok(entry) => entry,
            Err(GatewayError::DeviceNotFound(_)) => {
                debug!("Device {} not found, no points", device);
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };

        let inventory = self.inventory(&entry).await?;
        debug!("Device {} lists {} objects", device, inventory.len());

        let objects: Vec<ObjectIdentifier> = inventory
            .into_iter()
            .filter(|object| {
                let known = self.schema.object_class(entry.vendor_id, object.object_type).is_some();
                if !known {
                    warn!("Skipping {} on device {}: no object class for vendor {}", object, device, entry.vendor_id);
                }
                known
            })
            .collect();

        let object_name = PropertyReference::new("object-name");
        let reads = objects.iter().map(|object| {
            let entry = &entry;
            let object_name = &object_name;
            async move {
                let name = match self.bus.read_property(&entry.address, object, object_name).await {
                    Ok(PropertyValue::CharacterString(name)) => name,
                    Ok(other) => format!("Invalid object name: {:?}", other),
                    Err(e) => format!("Error reading object name: {}", e),
                };
                DiscoveredPoint {
                    object_identifier: *object,
                    name,
                }
            }
        });

        Ok(futures::future::join_all(reads).await)
    }

    /// Object identifiers listed by the device object
    async fn inventory(&self, entry: &AddressCacheEntry) -> GatewayResult<Vec<ObjectIdentifier>> {
        let device = ObjectIdentifier::new(ObjectType::DEVICE, entry.instance.value());

        match self
            .bus
            .read_property(&entry.address, &device, &PropertyReference::new("object-list"))
            .await
        {
            Ok(value) => match value.elements() {
                Some(items) if !items.is_empty() => Ok(identifiers(items)),
                _ => {
                    debug!("Empty object-list from {}, reading element by element", device);
                    self.inventory_by_element(entry, &device).await
                }
            },
            Err(e) if needs_fallback(&e) => {
                debug!("Bulk object-list read failed ({}), reading element by element", e);
                self.inventory_by_element(entry, &device).await
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn inventory_by_element(
        &self,
        entry: &AddressCacheEntry,
        device: &ObjectIdentifier,
    ) -> GatewayResult<Vec<ObjectIdentifier>> {
        let length = self
            .bus
            .read_property(&entry.address, device, &PropertyReference::indexed("object-list", 0))
            .await?;
        let length = length
            .as_index()
            .ok_or_else(|| GatewayError::InvalidInventoryLength(format!("{:?}", length)))?;
        let length = u32::try_from(length).map_err(|_| GatewayError::InvalidInventoryLength(length.to_string()))?;

        let mut objects = Vec::with_capacity(length as usize);
        for index in 1..=length {
            let value = self
                .bus
                .read_property(&entry.address, device, &PropertyReference::indexed("object-list", index))
                .await?;
            match value {
                PropertyValue::ObjectIdentifier(object) => objects.push(object),
                other => warn!("object-list[{}] of {} is not an object identifier: {:?}", index, device, other),
            }
        }
        Ok(objects)
    }
}

/// Failures of the bulk read that the element walk can recover from
fn needs_fallback(error: &ProtocolError) -> bool {
    error.is_segmentation_not_supported() || matches!(error, ProtocolError::NoObjectClass(_))
}

fn identifiers(items: &[PropertyValue]) -> Vec<ObjectIdentifier> {
    items
        .iter()
        .filter_map(|item| match item {
            PropertyValue::ObjectIdentifier(object) => Some(*object),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bacnet::schema::StandardSchema;
    use crate::bacnet::stack::{AbortReason, ErrorValue};
    use crate::bacnet::types::Segmentation;
    use crate::sim::{SimDevice, SimObject, SimulatedNetwork};

    fn oid(s: &str) -> ObjectIdentifier {
        s.parse().unwrap()
    }

    fn device() -> SimDevice {
        SimDevice::new(201201, "10.0.1.20:47808")
            .with_object(SimObject::new(oid("analog-input,1"), "OA-T"))
            .with_object(SimObject::new(oid("analog-value,301"), "SA-SP"))
            .with_object(SimObject::new(oid("binary-output,2"), "SF-C"))
    }

    fn enumerator(network: SimulatedNetwork) -> (Arc<SimulatedNetwork>, PointEnumerator) {
        let network = Arc::new(network);
        let cache = AddressCache::new(network.clone());
        let enumerator = PointEnumerator::new(network.clone(), Arc::new(StandardSchema::new()), cache);
        (network, enumerator)
    }

    #[tokio::test]
    async fn test_enumerate_bulk() {
        let network = SimulatedNetwork::new();
        network.add_device(device());
        let (_, enumerator) = enumerator(network);

        let points = enumerator.enumerate(DeviceInstance::new(201201).unwrap()).await.unwrap();
        let names: Vec<_> = points.iter().map(|p| p.name.as_str()).collect();

        // the device object itself heads its own object-list
        assert_eq!(points[0].object_identifier, oid("device,201201"));
        assert_eq!(&names[1..], &["OA-T", "SA-SP", "SF-C"]);
    }

    #[tokio::test]
    async fn test_enumerate_falls_back_without_segmentation() {
        let network = SimulatedNetwork::new();
        network.add_device(device().with_segmentation(Segmentation::None));
        let (network, enumerator) = enumerator(network);

        let points = enumerator.enumerate(DeviceInstance::new(201201).unwrap()).await.unwrap();
        assert_eq!(points.len(), 4);
        assert_eq!(points[3].name, "SF-C");
        // length read, then one read per element
        assert!(network.read_count() >= 1 + 1 + 4);
    }

    #[tokio::test]
    async fn test_enumerate_falls_back_on_no_object_class() {
        let network = SimulatedNetwork::new();
        network.add_device(device().with_fault(
            oid("device,201201"),
            PropertyReference::new("object-list"),
            ProtocolError::NoObjectClass("object-list".to_string()),
        ));
        let (_, enumerator) = enumerator(network);

        let points = enumerator.enumerate(DeviceInstance::new(201201).unwrap()).await.unwrap();
        assert_eq!(points.len(), 4);
        assert_eq!(points[1].object_identifier, oid("analog-input,1"));
    }

    #[tokio::test]
    async fn test_enumerate_other_abort_is_fatal() {
        let network = SimulatedNetwork::new();
        network.add_device(device().with_fault(
            oid("device,201201"),
            PropertyReference::new("object-list"),
            ProtocolError::Abort(AbortReason::BufferOverflow),
        ));
        let (_, enumerator) = enumerator(network);

        let err = enumerator.enumerate(DeviceInstance::new(201201).unwrap()).await.unwrap_err();
        assert!(matches!(err, GatewayError::Protocol(ProtocolError::Abort(AbortReason::BufferOverflow))));
    }

    #[tokio::test]
    async fn test_enumerate_non_integer_length() {
        let network = SimulatedNetwork::new();
        network.add_device(
            device()
                .with_segmentation(Segmentation::None)
                .with_override(
                    oid("device,201201"),
                    PropertyReference::indexed("object-list", 0),
                    PropertyValue::CharacterString("four".to_string()),
                ),
        );
        let (_, enumerator) = enumerator(network);

        let err = enumerator.enumerate(DeviceInstance::new(201201).unwrap()).await.unwrap_err();
        assert!(matches!(err, GatewayError::InvalidInventoryLength(_)));
    }

    #[tokio::test]
    async fn test_enumerate_skips_unknown_classes_and_degrades_names() {
        let network = SimulatedNetwork::new();
        network.add_device(
            device()
                .with_object(SimObject::new(oid("600,9"), "Vendor box"))
                .with_fault(
                    oid("analog-value,301"),
                    PropertyReference::new("object-name"),
                    ProtocolError::Error(ErrorValue::new("property", "read-access-denied")),
                ),
        );
        let (_, enumerator) = enumerator(network);

        let points = enumerator.enumerate(DeviceInstance::new(201201).unwrap()).await.unwrap();
        assert_eq!(points.len(), 4);
        assert!(points.iter().all(|p| !p.object_identifier.object_type.is_proprietary()));
        assert_eq!(points[2].name, "Error reading object name: BACnet error: property, read-access-denied");
        assert_eq!(points[3].name, "SF-C");
    }

    #[tokio::test]
    async fn test_enumerate_includes_less_common_standard_types() {
        let network = SimulatedNetwork::new();
        network.add_device(
            SimDevice::new(5, "10.0.0.5:47808")
                .with_object(SimObject::new(oid("accumulator,1"), "KWH-ACC"))
                .with_object(SimObject::new(oid("file,1"), "TREND-EXPORT"))
                .with_object(SimObject::new(oid("structured-view,1"), "AHU-1 VIEW")),
        );
        let (_, enumerator) = enumerator(network);

        let points = enumerator.enumerate(DeviceInstance::new(5).unwrap()).await.unwrap();
        let names: Vec<_> = points.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["Device 5", "KWH-ACC", "TREND-EXPORT", "AHU-1 VIEW"]);
    }

    #[tokio::test]
    async fn test_enumerate_missing_device_is_empty() {
        let (_, enumerator) = enumerator(SimulatedNetwork::new());
        let points = enumerator.enumerate(DeviceInstance::new(7).unwrap()).await.unwrap();
        assert!(points.is_empty());
    }
}
