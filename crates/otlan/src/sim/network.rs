//! Simulated Network
//!
//! Devices with objects and properties held in memory, answering the
//! `FieldBus` operations the way a field controller would: indexed array
//! reads, priority-array commands, aborts on oversized responses from
//! devices without segmentation, and per-item errors on batched reads.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::{debug, info};

use crate::bacnet::{
    vocabulary::is_wildcard_property, AbortReason, DeviceAddress, DeviceAnnouncement, ErrorValue, FieldBus,
    ObjectIdentifier, ObjectType, PropertyReference, PropertyRequestBlock, PropertyValue, ProtocolError,
    ReadAccessResult, Segmentation,
};

use super::config::{DeviceConfig, PointConfig, Project};
use super::loader::LoadError;

const PRIORITY_LEVELS: usize = 16;

/// Priority used for a command written without one
const DEFAULT_PRIORITY: u8 = 16;

/// Properties a client can never write
const READ_ONLY: &[&str] = &["object-identifier", "object-type", "object-list", "priority-array"];

fn property_error(code: &str) -> ErrorValue {
    ErrorValue::new("property", code)
}

/// One object on a simulated device
#[derive(Debug, Clone)]
pub struct SimObject {
    identifier: ObjectIdentifier,
    properties: BTreeMap<String, PropertyValue>,
    /// Command slots of a commandable object, highest priority first
    priority_array: Option<Vec<Option<PropertyValue>>>,
}

impl SimObject {
    pub fn new(identifier: ObjectIdentifier, name: impl Into<String>) -> Self {
        let mut properties = BTreeMap::new();
        properties.insert("object-identifier".to_string(), PropertyValue::ObjectIdentifier(identifier));
        properties.insert("object-name".to_string(), PropertyValue::CharacterString(name.into()));
        properties.insert(
            "object-type".to_string(),
            PropertyValue::Enumerated(u32::from(identifier.object_type.number())),
        );
        if identifier.object_type != ObjectType::DEVICE {
            properties.insert("status-flags".to_string(), PropertyValue::BitString(vec![false; 4]));
            properties.insert("event-state".to_string(), PropertyValue::Enumerated(0));
            properties.insert("out-of-service".to_string(), PropertyValue::Boolean(false));
        }

        let priority_array = identifier
            .object_type
            .is_commandable()
            .then(|| vec![None; PRIORITY_LEVELS]);

        Self {
            identifier,
            properties,
            priority_array,
        }
    }

    pub fn with_property(mut self, property: impl Into<String>, value: PropertyValue) -> Self {
        self.properties.insert(property.into(), value);
        self
    }

    pub fn identifier(&self) -> ObjectIdentifier {
        self.identifier
    }

    /// Every readable property identifier, sorted
    fn property_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.properties.keys().cloned().collect();
        if self.priority_array.is_some() {
            names.extend(["priority-array".to_string(), "relinquish-default".to_string()]);
            names.sort();
            names.dedup();
        }
        names
    }

    fn relinquish_default(&self) -> Option<&PropertyValue> {
        self.properties
            .get("relinquish-default")
            .or_else(|| self.properties.get("present-value"))
    }

    fn whole_value(&self, property: &str) -> Result<PropertyValue, ErrorValue> {
        if let Some(slots) = &self.priority_array {
            match property {
                "present-value" => {
                    return slots
                        .iter()
                        .flatten()
                        .next()
                        .or_else(|| self.relinquish_default())
                        .cloned()
                        .ok_or_else(|| property_error("unknown-property"));
                }
                "relinquish-default" => {
                    return self
                        .relinquish_default()
                        .cloned()
                        .ok_or_else(|| property_error("unknown-property"));
                }
                "priority-array" => {
                    return Ok(PropertyValue::Array(
                        slots
                            .iter()
                            .map(|slot| slot.clone().unwrap_or(PropertyValue::Null))
                            .collect(),
                    ));
                }
                _ => {}
            }
        }

        self.properties
            .get(property)
            .cloned()
            .ok_or_else(|| property_error("unknown-property"))
    }

    fn read(&self, property: &PropertyReference) -> Result<PropertyValue, ErrorValue> {
        select(self.whole_value(&property.property_identifier)?, property.array_index)
    }

    fn write(
        &mut self,
        property: &PropertyReference,
        value: PropertyValue,
        priority: Option<u8>,
    ) -> Result<(), ErrorValue> {
        let name = property.property_identifier.as_str();
        if READ_ONLY.contains(&name) {
            return Err(property_error("write-access-denied"));
        }

        let base = self.relinquish_default().cloned();
        if let (Some(slots), "present-value") = (&mut self.priority_array, name) {
            if property.array_index.is_some() {
                return Err(property_error("property-is-not-an-array"));
            }
            let level = usize::from(priority.unwrap_or(DEFAULT_PRIORITY));
            let slot = slots
                .get_mut(level.wrapping_sub(1))
                .ok_or_else(|| ErrorValue::new("services", "parameter-out-of-range"))?;
            *slot = match value {
                PropertyValue::Null => None,
                value => Some(match &base {
                    Some(base) => conform(base, value).ok_or_else(|| property_error("invalid-data-type"))?,
                    None => value,
                }),
            };
            return Ok(());
        }

        if value == PropertyValue::Null {
            return Err(property_error("invalid-data-type"));
        }

        let current = self
            .properties
            .get_mut(name)
            .ok_or_else(|| property_error("unknown-property"))?;

        match property.array_index {
            None => {
                *current = conform(current, value).ok_or_else(|| property_error("invalid-data-type"))?;
            }
            Some(index) => {
                let items = match current {
                    PropertyValue::Array(items) => items,
                    _ => return Err(property_error("property-is-not-an-array")),
                };
                let position = usize::try_from(index)
                    .ok()
                    .filter(|i| *i >= 1)
                    .map(|i| i - 1)
                    .filter(|i| *i < items.len())
                    .ok_or_else(|| property_error("invalid-array-index"))?;
                let element = &mut items[position];
                *element = conform(element, value).ok_or_else(|| property_error("invalid-data-type"))?;
            }
        }
        Ok(())
    }
}

/// Apply an array index to a whole property value
fn select(value: PropertyValue, index: Option<u32>) -> Result<PropertyValue, ErrorValue> {
    let Some(index) = index else {
        return Ok(value);
    };
    let PropertyValue::Array(items) = value else {
        return Err(property_error("property-is-not-an-array"));
    };
    if index == 0 {
        return Ok(PropertyValue::Unsigned(items.len() as u64));
    }
    items
        .into_iter()
        .nth(index as usize - 1)
        .ok_or_else(|| property_error("invalid-array-index"))
}

/// Fit a written value to the type already held by the property
fn conform(current: &PropertyValue, value: PropertyValue) -> Option<PropertyValue> {
    use PropertyValue as V;

    match (current, value) {
        (V::Real(_), V::Unsigned(n)) => Some(V::Real(n as f32)),
        (V::Real(_), V::Signed(n)) => Some(V::Real(n as f32)),
        (V::Real(_), V::Double(d)) => Some(V::Real(d as f32)),
        (V::Double(_), V::Real(r)) => Some(V::Double(f64::from(r))),
        (V::Double(_), V::Unsigned(n)) => Some(V::Double(n as f64)),
        (V::Double(_), V::Signed(n)) => Some(V::Double(n as f64)),
        (V::Enumerated(_), V::Unsigned(n)) => u32::try_from(n).ok().map(V::Enumerated),
        (V::Enumerated(_), V::Boolean(b)) => Some(V::Enumerated(u32::from(b))),
        (V::Unsigned(_), V::Enumerated(n)) => Some(V::Unsigned(u64::from(n))),
        (V::Signed(_), V::Unsigned(n)) => i64::try_from(n).ok().map(V::Signed),
        (V::Unsigned(_), V::Signed(n)) => u64::try_from(n).ok().map(V::Unsigned),
        (current, value) if std::mem::discriminant(current) == std::mem::discriminant(&value) => Some(value),
        _ => None,
    }
}

/// A simulated device: its device object, its other objects, and any
/// injected faults
#[derive(Debug, Clone)]
pub struct SimDevice {
    instance: u32,
    address: DeviceAddress,
    vendor_id: u16,
    max_apdu: u16,
    segmentation: Segmentation,
    /// The device object first, then the rest in object-list order
    objects: Vec<SimObject>,
    faults: HashMap<(ObjectIdentifier, PropertyReference), ProtocolError>,
    overrides: HashMap<(ObjectIdentifier, PropertyReference), PropertyValue>,
}

impl SimDevice {
    pub fn new(instance: u32, address: impl Into<String>) -> Self {
        let device = SimObject::new(
            ObjectIdentifier::new(ObjectType::DEVICE, instance),
            format!("Device {}", instance),
        )
        .with_property("system-status", PropertyValue::Enumerated(0))
        .with_property("vendor-name", PropertyValue::CharacterString("otlan".to_string()))
        .with_property("vendor-identifier", PropertyValue::Unsigned(0))
        .with_property("model-name", PropertyValue::CharacterString("simulated".to_string()))
        .with_property("protocol-version", PropertyValue::Unsigned(1))
        .with_property("protocol-revision", PropertyValue::Unsigned(22))
        .with_property("max-apdu-length-accepted", PropertyValue::Unsigned(1476))
        .with_property("segmentation-supported", PropertyValue::Enumerated(0));

        Self {
            instance,
            address: DeviceAddress::new(address),
            vendor_id: 0,
            max_apdu: 1476,
            segmentation: Segmentation::Both,
            objects: vec![device],
            faults: HashMap::new(),
            overrides: HashMap::new(),
        }
    }

    fn device_object(&mut self) -> &mut SimObject {
        &mut self.objects[0]
    }

    fn with_device_property(mut self, property: &str, value: PropertyValue) -> Self {
        self.device_object().properties.insert(property.to_string(), value);
        self
    }

    pub fn with_name(self, name: impl Into<String>) -> Self {
        self.with_device_property("object-name", PropertyValue::CharacterString(name.into()))
    }

    pub fn with_description(self, description: impl Into<String>) -> Self {
        self.with_device_property("description", PropertyValue::CharacterString(description.into()))
    }

    pub fn with_model_name(self, model_name: impl Into<String>) -> Self {
        self.with_device_property("model-name", PropertyValue::CharacterString(model_name.into()))
    }

    pub fn with_vendor_id(mut self, vendor_id: u16) -> Self {
        self.vendor_id = vendor_id;
        self.with_device_property("vendor-identifier", PropertyValue::Unsigned(u64::from(vendor_id)))
    }

    pub fn with_max_apdu(mut self, max_apdu: u16) -> Self {
        self.max_apdu = max_apdu;
        self.with_device_property("max-apdu-length-accepted", PropertyValue::Unsigned(u64::from(max_apdu)))
    }

    pub fn with_segmentation(mut self, segmentation: Segmentation) -> Self {
        self.segmentation = segmentation;
        let code = match segmentation {
            Segmentation::Both => 0,
            Segmentation::Transmit => 1,
            Segmentation::Receive => 2,
            Segmentation::None => 3,
        };
        self.with_device_property("segmentation-supported", PropertyValue::Enumerated(code))
    }

    pub fn with_object(mut self, object: SimObject) -> Self {
        self.objects.push(object);
        self
    }

    /// Fail every read of exactly `property` on `object` with `error`
    pub fn with_fault(mut self, object: ObjectIdentifier, property: PropertyReference, error: ProtocolError) -> Self {
        self.faults.insert((object, property), error);
        self
    }

    /// Answer reads of exactly `property` on `object` with `value`
    pub fn with_override(mut self, object: ObjectIdentifier, property: PropertyReference, value: PropertyValue) -> Self {
        self.overrides.insert((object, property), value);
        self
    }

    pub fn instance(&self) -> u32 {
        self.instance
    }

    pub fn address(&self) -> &DeviceAddress {
        &self.address
    }

    fn announcement(&self) -> DeviceAnnouncement {
        DeviceAnnouncement {
            device_id: self.instance,
            address: self.address.clone(),
            max_apdu: self.max_apdu,
            vendor_id: self.vendor_id,
            segmentation: self.segmentation,
        }
    }

    fn is_device_object(&self, object: &ObjectIdentifier) -> bool {
        object.object_type == ObjectType::DEVICE && object.instance == self.instance
    }

    fn object_list(&self) -> PropertyValue {
        PropertyValue::Array(
            self.objects
                .iter()
                .map(|object| PropertyValue::ObjectIdentifier(object.identifier))
                .collect(),
        )
    }

    fn object(&self, identifier: &ObjectIdentifier) -> Option<&SimObject> {
        self.objects.iter().find(|object| object.identifier == *identifier)
    }

    /// Single ReadProperty
    fn read(&self, object: &ObjectIdentifier, property: &PropertyReference) -> Result<PropertyValue, ProtocolError> {
        if let Some(fault) = self.faults.get(&(*object, property.clone())) {
            return Err(fault.clone());
        }
        if let Some(value) = self.overrides.get(&(*object, property.clone())) {
            return Ok(value.clone());
        }

        if self.is_device_object(object) && property.property_identifier == "object-list" {
            if property.array_index.is_none() && self.segmentation == Segmentation::None {
                return Err(ProtocolError::Abort(AbortReason::SegmentationNotSupported));
            }
            return select(self.object_list(), property.array_index).map_err(ProtocolError::Error);
        }

        let target = self
            .object(object)
            .ok_or_else(|| ProtocolError::Error(ErrorValue::new("object", "unknown-object")))?;
        target.read(property).map_err(ProtocolError::Error)
    }

    /// Results for one property of a ReadPropertyMultiple block
    fn read_access(
        &self,
        object: &ObjectIdentifier,
        property: &PropertyReference,
        results: &mut Vec<ReadAccessResult>,
    ) -> Result<(), ProtocolError> {
        let expanded = match (is_wildcard_property(&property.property_identifier), self.object(object)) {
            (true, Some(target)) => {
                let mut names = target.property_names();
                if self.is_device_object(object) {
                    names.push("object-list".to_string());
                }
                names.into_iter().map(PropertyReference::new).collect()
            }
            _ => vec![property.clone()],
        };

        for property in expanded {
            let result = if self.is_device_object(object) && property.property_identifier == "object-list" {
                // object-list inside a batch counts toward the same segmented response
                select(self.object_list(), property.array_index)
            } else {
                match self.read(object, &property) {
                    Ok(value) => Ok(value),
                    Err(ProtocolError::Error(error)) => Err(error),
                    Err(other) => return Err(other),
                }
            };
            results.push(ReadAccessResult {
                object: *object,
                property,
                result,
            });
        }
        Ok(())
    }

    fn write(
        &mut self,
        object: &ObjectIdentifier,
        property: &PropertyReference,
        value: PropertyValue,
        priority: Option<u8>,
    ) -> Result<(), ProtocolError> {
        let target = self
            .objects
            .iter_mut()
            .find(|candidate| candidate.identifier == *object)
            .ok_or_else(|| ProtocolError::Error(ErrorValue::new("object", "unknown-object")))?;
        target.write(property, value, priority).map_err(ProtocolError::Error)
    }

    /// Build a device from its project file
    pub fn from_config(config: &DeviceConfig) -> Result<Self, LoadError> {
        let info = &config.device;
        let invalid = |reason: String| LoadError::InvalidDevice {
            instance: info.instance,
            reason,
        };

        if info.instance > crate::bacnet::MAX_INSTANCE {
            return Err(invalid("instance is out of range".to_string()));
        }

        let address = info.address.clone().unwrap_or_else(|| default_address(info.instance));
        let mut device = SimDevice::new(info.instance, address)
            .with_name(&info.name)
            .with_vendor_id(info.vendor_id)
            .with_max_apdu(info.max_apdu)
            .with_segmentation(info.segmentation);
        if let Some(description) = &info.description {
            device = device.with_description(description);
        }
        if let Some(model_name) = &info.model_name {
            device = device.with_model_name(model_name);
        }

        for point in &config.points {
            device = device.with_object(point_object(point).map_err(invalid)?);
        }
        Ok(device)
    }
}

/// Address for a device file that does not name one
fn default_address(instance: u32) -> String {
    format!("10.{}.{}.{}:47808", (instance >> 16) & 0xff, (instance >> 8) & 0xff, instance & 0xff)
}

fn point_object(point: &PointConfig) -> Result<SimObject, String> {
    let identifier = ObjectIdentifier::parse(&point.object).map_err(|e| format!("{}: {}", point.object, e))?;
    let object_type = identifier.object_type;
    let mut object = SimObject::new(identifier, &point.name);

    if let Some(description) = &point.description {
        object = object.with_property("description", PropertyValue::CharacterString(description.clone()));
    }

    let present_value = match &point.present_value {
        Some(value) => Some(typed_present_value(object_type, value).map_err(|e| format!("{}: {}", point.object, e))?),
        None => default_present_value(object_type),
    };
    if let Some(value) = present_value {
        object = object.with_property("present-value", value);
    }

    if let Some(units) = &point.units {
        object = object.with_property("units", PropertyValue::Enumerated(units_number(units)?));
    }

    for (property, value) in &point.properties {
        let value = toml_value(value).map_err(|e| format!("{} {}: {}", point.object, property, e))?;
        object = object.with_property(property.clone(), value);
    }

    Ok(object)
}

fn default_present_value(object_type: ObjectType) -> Option<PropertyValue> {
    match object_type {
        ObjectType::ANALOG_INPUT | ObjectType::ANALOG_OUTPUT | ObjectType::ANALOG_VALUE => {
            Some(PropertyValue::Real(0.0))
        }
        ObjectType::BINARY_INPUT | ObjectType::BINARY_OUTPUT | ObjectType::BINARY_VALUE => {
            Some(PropertyValue::Enumerated(0))
        }
        ObjectType::MULTI_STATE_INPUT | ObjectType::MULTI_STATE_OUTPUT | ObjectType::MULTI_STATE_VALUE => {
            Some(PropertyValue::Unsigned(1))
        }
        _ => None,
    }
}

/// Present value of a configured point, typed by its object type
fn typed_present_value(object_type: ObjectType, value: &toml::Value) -> Result<PropertyValue, String> {
    use toml::Value as T;

    match object_type {
        ObjectType::ANALOG_INPUT | ObjectType::ANALOG_OUTPUT | ObjectType::ANALOG_VALUE | ObjectType::LOOP => {
            match value {
                T::Float(f) => Ok(PropertyValue::Real(*f as f32)),
                T::Integer(i) => Ok(PropertyValue::Real(*i as f32)),
                other => Err(format!("analog present_value must be a number, got {}", other)),
            }
        }
        ObjectType::BINARY_INPUT | ObjectType::BINARY_OUTPUT | ObjectType::BINARY_VALUE => match value {
            T::Boolean(b) => Ok(PropertyValue::Enumerated(u32::from(*b))),
            T::Integer(0) => Ok(PropertyValue::Enumerated(0)),
            T::Integer(1) => Ok(PropertyValue::Enumerated(1)),
            T::String(s) if s == "inactive" => Ok(PropertyValue::Enumerated(0)),
            T::String(s) if s == "active" => Ok(PropertyValue::Enumerated(1)),
            other => Err(format!("binary present_value must be active or inactive, got {}", other)),
        },
        ObjectType::MULTI_STATE_INPUT | ObjectType::MULTI_STATE_OUTPUT | ObjectType::MULTI_STATE_VALUE => {
            match value {
                T::Integer(i) if *i >= 1 => Ok(PropertyValue::Unsigned(*i as u64)),
                other => Err(format!("multi-state present_value must be a state number, got {}", other)),
            }
        }
        ObjectType::INTEGER_VALUE => match value {
            T::Integer(i) => Ok(PropertyValue::Signed(*i)),
            other => Err(format!("integer present_value must be an integer, got {}", other)),
        },
        _ => toml_value(value),
    }
}

/// Engineering units commonly found on HVAC points
const UNITS: &[(&str, u32)] = &[
    ("square-meters", 0),
    ("volts", 5),
    ("kilowatts", 48),
    ("kilowatt-hours", 19),
    ("pascals", 53),
    ("inches-of-water", 58),
    ("degrees-celsius", 62),
    ("degrees-fahrenheit", 64),
    ("cubic-feet-per-minute", 84),
    ("liters-per-second", 87),
    ("no-units", 95),
    ("parts-per-million", 96),
    ("percent", 98),
    ("percent-relative-humidity", 29),
];

fn units_number(units: &toml::Value) -> Result<u32, String> {
    match units {
        toml::Value::Integer(i) => u32::try_from(*i).map_err(|_| format!("units {} out of range", i)),
        toml::Value::String(name) => UNITS
            .iter()
            .find(|(candidate, _)| candidate == name)
            .map(|(_, number)| *number)
            .ok_or_else(|| format!("unknown units '{}'", name)),
        other => Err(format!("units must be a name or number, got {}", other)),
    }
}

/// Property value inferred from a TOML value
fn toml_value(value: &toml::Value) -> Result<PropertyValue, String> {
    match value {
        toml::Value::String(s) => Ok(PropertyValue::CharacterString(s.clone())),
        toml::Value::Integer(i) if *i >= 0 => Ok(PropertyValue::Unsigned(*i as u64)),
        toml::Value::Integer(i) => Ok(PropertyValue::Signed(*i)),
        toml::Value::Float(f) => Ok(PropertyValue::Real(*f as f32)),
        toml::Value::Boolean(b) => Ok(PropertyValue::Boolean(*b)),
        toml::Value::Array(items) => items
            .iter()
            .map(toml_value)
            .collect::<Result<Vec<_>, _>>()
            .map(PropertyValue::Array),
        other => Err(format!("unsupported value {}", other)),
    }
}

/// In-memory field network implementing `FieldBus`
pub struct SimulatedNetwork {
    devices: RwLock<Vec<SimDevice>>,
    latency: Option<Duration>,
    who_is_count: AtomicUsize,
    read_count: AtomicUsize,
}

impl SimulatedNetwork {
    pub fn new() -> Self {
        Self {
            devices: RwLock::new(Vec::new()),
            latency: None,
            who_is_count: AtomicUsize::new(0),
            read_count: AtomicUsize::new(0),
        }
    }

    /// Delay every request by `latency`
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = (!latency.is_zero()).then_some(latency);
        self
    }

    /// Build a network from a loaded project
    pub fn from_project(project: &Project) -> Result<Self, LoadError> {
        let network = Self::new().with_latency(Duration::from_millis(project.manifest.network.latency_ms));
        for config in &project.devices {
            network.add_device(SimDevice::from_config(config)?);
        }
        info!("Simulated network '{}' with {} devices", project.name(), network.device_count());
        Ok(network)
    }

    pub fn add_device(&self, device: SimDevice) {
        debug!("Adding simulated device {} at {}", device.instance, device.address);
        self.devices.write().push(device);
    }

    pub fn device_count(&self) -> usize {
        self.devices.read().len()
    }

    /// Who-Is requests served so far
    pub fn who_is_count(&self) -> usize {
        self.who_is_count.load(Ordering::SeqCst)
    }

    /// Confirmed read requests served so far
    pub fn read_count(&self) -> usize {
        self.read_count.load(Ordering::SeqCst)
    }

    async fn delay(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn no_response(address: &DeviceAddress) -> ProtocolError {
        ProtocolError::Timeout(address.to_string())
    }
}

impl Default for SimulatedNetwork {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FieldBus for SimulatedNetwork {
    async fn who_is(
        &self,
        low: u32,
        high: u32,
        destination: Option<&DeviceAddress>,
    ) -> Result<Vec<DeviceAnnouncement>, ProtocolError> {
        self.who_is_count.fetch_add(1, Ordering::SeqCst);
        self.delay().await;

        let devices = self.devices.read();
        Ok(devices
            .iter()
            .filter(|device| (low..=high).contains(&device.instance))
            .filter(|device| destination.is_none_or(|address| *address == device.address))
            .map(SimDevice::announcement)
            .collect())
    }

    async fn read_property(
        &self,
        address: &DeviceAddress,
        object: &ObjectIdentifier,
        property: &PropertyReference,
    ) -> Result<PropertyValue, ProtocolError> {
        self.read_count.fetch_add(1, Ordering::SeqCst);
        self.delay().await;

        let devices = self.devices.read();
        let device = devices
            .iter()
            .find(|device| device.address == *address)
            .ok_or_else(|| Self::no_response(address))?;
        device.read(object, property)
    }

    async fn write_property(
        &self,
        address: &DeviceAddress,
        object: &ObjectIdentifier,
        property: &PropertyReference,
        value: PropertyValue,
        priority: Option<u8>,
    ) -> Result<(), ProtocolError> {
        self.delay().await;

        let mut devices = self.devices.write();
        let device = devices
            .iter_mut()
            .find(|device| device.address == *address)
            .ok_or_else(|| Self::no_response(address))?;
        device.write(object, property, value, priority)
    }

    async fn read_property_multiple(
        &self,
        address: &DeviceAddress,
        requests: &[PropertyRequestBlock],
    ) -> Result<Vec<ReadAccessResult>, ProtocolError> {
        self.read_count.fetch_add(1, Ordering::SeqCst);
        self.delay().await;

        let devices = self.devices.read();
        let device = devices
            .iter()
            .find(|device| device.address == *address)
            .ok_or_else(|| Self::no_response(address))?;

        let mut results = Vec::new();
        for block in requests {
            for property in &block.properties {
                device.read_access(&block.object, property, &mut results)?;
            }
        }
        Ok(results)
    }
}
