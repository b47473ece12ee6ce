//! Gateway orchestration
//!
//! `BacnetService` is built once per process from an injected field-bus stack
//! and vendor schema, and shared by every request handler.

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::error::{GatewayError, GatewayResult};

use super::cache::{AddressCache, DiscoveredDevice};
use super::compiler::{self, GroupedRequest};
use super::points::{DiscoveredPoint, PointEnumerator};
use super::reconcile::{coerce_write_value, encode_batch, encode_value};
use super::reference::{self, PropertyReference};
use super::schema::VendorSchema;
use super::stack::{FieldBus, PropertyRequestBlock};
use super::types::{DeviceAddress, DeviceAnnouncement, DeviceInstance, ObjectIdentifier};

/// A validated write request
#[derive(Debug, Clone, PartialEq)]
pub struct WriteDirective {
    pub device: DeviceInstance,
    pub object: ObjectIdentifier,
    pub property: PropertyReference,
    pub value: Value,
    pub priority: Option<u8>,
}

impl WriteDirective {
    /// Validate raw write input without touching the network
    pub fn new(
        device: DeviceInstance,
        object: &str,
        property: &str,
        value: Value,
        priority: Option<i64>,
    ) -> GatewayResult<Self> {
        let object = ObjectIdentifier::parse(object)?;
        let property = reference::parse_standard(property)?;
        let priority = priority
            .map(|p| {
                u8::try_from(p)
                    .ok()
                    .filter(|p| (1..=16).contains(p))
                    .ok_or_else(|| GatewayError::Validation(format!("priority {} is outside 1..=16", p)))
            })
            .transpose()?;

        if priority.is_none() && (value.is_null() || value.as_str() == Some("null")) {
            return Err(GatewayError::PriorityRequiredForRelease);
        }

        Ok(Self {
            device,
            object,
            property,
            value,
            priority,
        })
    }
}

/// Orchestrates discovery, reads, writes and point enumeration
#[derive(Clone)]
pub struct BacnetService {
    bus: Arc<dyn FieldBus>,
    schema: Arc<dyn VendorSchema>,
    cache: AddressCache,
    points: PointEnumerator,
}

impl BacnetService {
    pub fn new(bus: Arc<dyn FieldBus>, schema: Arc<dyn VendorSchema>) -> Self {
        let cache = AddressCache::new(Arc::clone(&bus));
        let points = PointEnumerator::new(Arc::clone(&bus), Arc::clone(&schema), cache.clone());
        Self {
            bus,
            schema,
            cache,
            points,
        }
    }

    pub fn cache(&self) -> &AddressCache {
        &self.cache
    }

    /// Read one property and encode its value
    ///
    /// `property` may carry an array index, `priority-array[8]`.
    pub async fn read_property(&self, device: DeviceInstance, object: &str, property: &str) -> GatewayResult<Value> {
        let object = ObjectIdentifier::parse(object)?;
        let property = reference::parse_standard(property)?;

        let entry = self.cache.resolve(device).await?;
        debug!("Reading {} {} from device {} at {}", object, property, device, entry.address);

        let value = self.bus.read_property(&entry.address, &object, &property).await?;
        Ok(encode_value(&value))
    }

    /// Write one property
    pub async fn write_property(&self, directive: &WriteDirective) -> GatewayResult<()> {
        let entry = self.cache.resolve(directive.device).await?;

        let declared = self
            .schema
            .object_class(entry.vendor_id, directive.object.object_type)
            .and_then(|class| {
                // an indexed write targets one element, whose type the schema does not declare
                match directive.property.array_index {
                    None => self.schema.property_type(&class, &directive.property.property_identifier),
                    Some(_) => None,
                }
            });
        let value = coerce_write_value(&directive.value, declared, directive.priority)?;

        debug!(
            "Writing {:?} to {} {} on device {} at priority {:?}",
            value, directive.object, directive.property, directive.device, directive.priority
        );
        self.bus
            .write_property(&entry.address, &directive.object, &directive.property, value, directive.priority)
            .await?;
        Ok(())
    }

    /// Batched read from a flat token stream
    ///
    /// Token syntax is checked before the device is resolved; object classes
    /// and property names after, against the device's vendor.
    pub async fn read_multiple<S: AsRef<str>>(&self, device: DeviceInstance, tokens: &[S]) -> GatewayResult<Value> {
        let blocks = compiler::parse_tokens(self.schema.as_ref(), tokens)?;
        self.read_blocks(device, blocks).await
    }

    /// Batched read from caller-grouped objects
    pub async fn read_grouped(&self, device: DeviceInstance, groups: &[GroupedRequest<'_>]) -> GatewayResult<Value> {
        let blocks = compiler::parse_grouped(self.schema.as_ref(), groups)?;
        self.read_blocks(device, blocks).await
    }

    async fn read_blocks(&self, device: DeviceInstance, blocks: Vec<PropertyRequestBlock>) -> GatewayResult<Value> {
        let entry = self.cache.resolve(device).await?;
        compiler::check_blocks(self.schema.as_ref(), entry.vendor_id, &blocks)?;
        debug!("Reading {} objects from device {}", blocks.len(), device);

        let results = self.bus.read_property_multiple(&entry.address, &blocks).await?;
        Ok(encode_batch(&results))
    }

    /// Who-Is for one instance, broadcast or directed at `address`
    pub async fn who_is(&self, device: DeviceInstance, address: Option<&str>) -> GatewayResult<Vec<DeviceAnnouncement>> {
        let destination = address.map(DeviceAddress::new);
        self.cache.who_is(device, destination.as_ref()).await
    }

    /// Who-Is over `start..=end` with each device's description
    pub async fn who_is_range(&self, start: DeviceInstance, end: DeviceInstance) -> GatewayResult<Vec<DiscoveredDevice>> {
        if start > end {
            return Err(GatewayError::Validation(format!(
                "range start {} is greater than range end {}",
                start, end
            )));
        }
        self.cache.resolve_range(start, end).await
    }

    /// Every object on a device with its name
    pub async fn discover_points(&self, device: DeviceInstance) -> GatewayResult<Vec<DiscoveredPoint>> {
        self.points.enumerate(device).await
    }
}
