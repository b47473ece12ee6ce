//! Vendor object-model schema
//!
//! Maps an object type (possibly vendor-proprietary) to the set of properties
//! it declares and their datatypes. The compiler, the point enumerator and
//! the write path consult it through the `VendorSchema` trait.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::GatewayError;

use super::types::{ObjectIdentifier, ObjectType};
use super::vocabulary::OBJECT_TYPES;

/// Declared datatype of a property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PropertyType {
    Boolean,
    Unsigned,
    Signed,
    Real,
    Double,
    OctetString,
    CharacterString,
    BitString,
    Enumerated,
    Date,
    Time,
    ObjectIdentifier,
    Array,
    List,
    Sequence,
    /// Any application datatype (schedule values and the like)
    Any,
}

/// An object class: the properties one object type declares
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectClass {
    pub name: String,
    pub object_type: ObjectType,
    properties: BTreeMap<String, PropertyType>,
}

impl ObjectClass {
    pub fn new(name: impl Into<String>, object_type: ObjectType) -> Self {
        Self {
            name: name.into(),
            object_type,
            properties: BTreeMap::new(),
        }
    }

    /// Declare a property
    pub fn with_property(mut self, property: impl Into<String>, property_type: PropertyType) -> Self {
        self.properties.insert(property.into(), property_type);
        self
    }

    fn with_properties(mut self, properties: &[(&str, PropertyType)]) -> Self {
        for (name, property_type) in properties {
            self.properties.insert((*name).to_string(), *property_type);
        }
        self
    }

    pub fn property_type(&self, property: &str) -> Option<PropertyType> {
        self.properties.get(property).copied()
    }

    /// Declared property names, sorted
    pub fn property_names(&self) -> impl Iterator<Item = &str> {
        self.properties.keys().map(String::as_str)
    }
}

/// Object-model lookups consumed by the gateway
pub trait VendorSchema: Send + Sync {
    /// Object class for `object_type` as defined by `vendor_id`
    fn object_class(&self, vendor_id: u16, object_type: ObjectType) -> Option<Arc<ObjectClass>>;

    /// Declared type of `property` on `class`
    fn property_type(&self, class: &ObjectClass, property: &str) -> Option<PropertyType> {
        class.property_type(property)
    }

    /// Interpret a token as an object identifier
    fn resolve_identifier(&self, token: &str) -> Result<ObjectIdentifier, GatewayError> {
        ObjectIdentifier::parse_lenient(token)
    }
}

/// Vendor-defined object class loaded from configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProprietaryClassConfig {
    pub vendor_id: u16,
    pub object_type: u16,
    pub name: String,
    #[serde(default)]
    pub properties: BTreeMap<String, PropertyType>,
}

use PropertyType as T;

const COMMON: &[(&str, PropertyType)] = &[
    ("object-identifier", T::ObjectIdentifier),
    ("object-name", T::CharacterString),
    ("object-type", T::Enumerated),
    ("description", T::CharacterString),
    ("property-list", T::Array),
];

const STATUS: &[(&str, PropertyType)] = &[
    ("status-flags", T::BitString),
    ("event-state", T::Enumerated),
    ("reliability", T::Enumerated),
    ("out-of-service", T::Boolean),
];

const ANALOG: &[(&str, PropertyType)] = &[
    ("present-value", T::Real),
    ("units", T::Enumerated),
    ("cov-increment", T::Real),
    ("min-pres-value", T::Real),
    ("max-pres-value", T::Real),
    ("resolution", T::Real),
    ("high-limit", T::Real),
    ("low-limit", T::Real),
    ("deadband", T::Real),
];

const BINARY: &[(&str, PropertyType)] = &[
    ("present-value", T::Enumerated),
    ("polarity", T::Enumerated),
    ("inactive-text", T::CharacterString),
    ("active-text", T::CharacterString),
    ("change-of-state-count", T::Unsigned),
];

const MULTI_STATE: &[(&str, PropertyType)] = &[
    ("present-value", T::Unsigned),
    ("number-of-states", T::Unsigned),
    ("state-text", T::Array),
];

const DEVICE: &[(&str, PropertyType)] = &[
    ("system-status", T::Enumerated),
    ("vendor-name", T::CharacterString),
    ("vendor-identifier", T::Unsigned),
    ("model-name", T::CharacterString),
    ("firmware-revision", T::CharacterString),
    ("application-software-version", T::CharacterString),
    ("location", T::CharacterString),
    ("protocol-version", T::Unsigned),
    ("protocol-revision", T::Unsigned),
    ("protocol-services-supported", T::BitString),
    ("protocol-object-types-supported", T::BitString),
    ("object-list", T::Array),
    ("structured-object-list", T::Array),
    ("max-apdu-length-accepted", T::Unsigned),
    ("segmentation-supported", T::Enumerated),
    ("max-segments-accepted", T::Unsigned),
    ("apdu-timeout", T::Unsigned),
    ("number-of-apdu-retries", T::Unsigned),
    ("device-address-binding", T::List),
    ("database-revision", T::Unsigned),
    ("local-date", T::Date),
    ("local-time", T::Time),
    ("utc-offset", T::Signed),
    ("daylight-savings-status", T::Boolean),
];

const SCHEDULE: &[(&str, PropertyType)] = &[
    ("present-value", T::Any),
    ("effective-period", T::Sequence),
    ("weekly-schedule", T::Array),
    ("exception-schedule", T::Array),
    ("schedule-default", T::Any),
    ("priority-for-writing", T::Unsigned),
];

const CALENDAR: &[(&str, PropertyType)] = &[("present-value", T::Boolean), ("date-list", T::List)];

const TREND_LOG: &[(&str, PropertyType)] = &[
    ("enable", T::Boolean),
    ("start-time", T::Sequence),
    ("stop-time", T::Sequence),
    ("log-device-object-property", T::Sequence),
    ("log-interval", T::Unsigned),
    ("stop-when-full", T::Boolean),
    ("buffer-size", T::Unsigned),
    ("log-buffer", T::List),
    ("record-count", T::Unsigned),
    ("total-record-count", T::Unsigned),
];

const NOTIFICATION_CLASS: &[(&str, PropertyType)] = &[
    ("notification-class", T::Unsigned),
    ("priority", T::Array),
    ("acked-transitions", T::BitString),
    ("recipient-list", T::List),
];

const LOOP: &[(&str, PropertyType)] = &[
    ("present-value", T::Real),
    ("output-units", T::Enumerated),
    ("manipulated-variable-reference", T::Sequence),
    ("controlled-variable-reference", T::Sequence),
    ("controlled-variable-value", T::Real),
    ("controlled-variable-units", T::Enumerated),
    ("setpoint-reference", T::Sequence),
    ("setpoint", T::Real),
    ("proportional-constant", T::Real),
    ("integral-constant", T::Real),
    ("derivative-constant", T::Real),
];

const ACCUMULATOR: &[(&str, PropertyType)] = &[
    ("present-value", T::Unsigned),
    ("units", T::Enumerated),
    ("scale", T::Any),
    ("prescale", T::Sequence),
    ("max-pres-value", T::Unsigned),
    ("pulse-rate", T::Unsigned),
];

const FILE: &[(&str, PropertyType)] = &[
    ("file-type", T::CharacterString),
    ("file-size", T::Unsigned),
    ("modification-date", T::Sequence),
    ("archive", T::Boolean),
    ("read-only", T::Boolean),
    ("file-access-method", T::Enumerated),
];

const STRUCTURED_VIEW: &[(&str, PropertyType)] = &[
    ("node-type", T::Enumerated),
    ("node-subtype", T::CharacterString),
    ("subordinate-list", T::Array),
    ("subordinate-annotations", T::Array),
];

const LIGHTING_OUTPUT: &[(&str, PropertyType)] = &[
    ("present-value", T::Real),
    ("tracking-value", T::Real),
    ("lighting-command", T::Sequence),
    ("in-progress", T::Enumerated),
    ("blink-warn-enable", T::Boolean),
    ("default-fade-time", T::Unsigned),
];

/// Remaining standard types: identity and status, with an untyped present-value
const GENERIC: &[(&str, PropertyType)] = &[("present-value", T::Any)];

const COMMANDABLE: &[(&str, PropertyType)] = &[("priority-array", T::Array)];

fn standard_class(object_type: ObjectType, groups: &[&[(&str, PropertyType)]]) -> ObjectClass {
    let name = object_type.name().unwrap_or("proprietary");
    let mut class = ObjectClass::new(name, object_type).with_properties(COMMON);
    for group in groups {
        class = class.with_properties(group);
    }
    if object_type.is_commandable() {
        let relinquish = class.property_type("present-value").unwrap_or(T::Any);
        class = class
            .with_properties(COMMANDABLE)
            .with_property("relinquish-default", relinquish);
    }
    class
}

/// Built-in schema: the standard object classes plus configured extensions
pub struct StandardSchema {
    standard: HashMap<ObjectType, Arc<ObjectClass>>,
    proprietary: HashMap<(u16, ObjectType), Arc<ObjectClass>>,
}

impl StandardSchema {
    pub fn new() -> Self {
        let mut standard = HashMap::new();
        let mut add = |object_type: ObjectType, groups: &[&[(&str, PropertyType)]]| {
            standard.insert(object_type, Arc::new(standard_class(object_type, groups)));
        };

        add(ObjectType::ANALOG_INPUT, &[ANALOG, STATUS]);
        add(ObjectType::ANALOG_OUTPUT, &[ANALOG, STATUS]);
        add(ObjectType::ANALOG_VALUE, &[ANALOG, STATUS]);
        add(ObjectType::BINARY_INPUT, &[BINARY, STATUS]);
        add(ObjectType::BINARY_OUTPUT, &[BINARY, STATUS]);
        add(ObjectType::BINARY_VALUE, &[BINARY, STATUS]);
        add(ObjectType::MULTI_STATE_INPUT, &[MULTI_STATE, STATUS]);
        add(ObjectType::MULTI_STATE_OUTPUT, &[MULTI_STATE, STATUS]);
        add(ObjectType::MULTI_STATE_VALUE, &[MULTI_STATE, STATUS]);
        add(ObjectType::DEVICE, &[DEVICE]);
        add(ObjectType::SCHEDULE, &[SCHEDULE, STATUS]);
        add(ObjectType::CALENDAR, &[CALENDAR]);
        add(ObjectType::TREND_LOG, &[TREND_LOG, STATUS]);
        add(ObjectType::NOTIFICATION_CLASS, &[NOTIFICATION_CLASS]);
        add(ObjectType::LOOP, &[LOOP, STATUS]);
        add(ObjectType::PROGRAM, &[STATUS]);
        add(ObjectType::NETWORK_PORT, &[STATUS]);
        add(
            ObjectType::CHARACTERSTRING_VALUE,
            &[&[("present-value", T::CharacterString)], STATUS],
        );
        add(ObjectType::INTEGER_VALUE, &[&[("present-value", T::Signed)], STATUS]);

        for (name, number) in OBJECT_TYPES {
            let Some(object_type) = ObjectType::from_number(*number) else {
                continue;
            };
            let groups: &[&[(&str, PropertyType)]] = match *name {
                "accumulator" => &[ACCUMULATOR, STATUS],
                "file" => &[FILE],
                "structured-view" => &[STRUCTURED_VIEW],
                "large-analog-value" => &[&[("present-value", T::Double)], STATUS],
                "positive-integer-value" => &[&[("present-value", T::Unsigned)], STATUS],
                "lighting-output" => &[LIGHTING_OUTPUT, STATUS],
                _ => &[GENERIC, STATUS],
            };
            standard
                .entry(object_type)
                .or_insert_with(|| Arc::new(standard_class(object_type, groups)));
        }

        Self {
            standard,
            proprietary: HashMap::new(),
        }
    }

    /// Register a vendor-defined class
    pub fn with_proprietary(mut self, vendor_id: u16, class: ObjectClass) -> Self {
        self.proprietary
            .insert((vendor_id, class.object_type), Arc::new(class));
        self
    }

    /// Standard classes extended with configured vendor classes
    pub fn from_config(classes: &[ProprietaryClassConfig]) -> Result<Self, GatewayError> {
        let mut schema = Self::new();
        for config in classes {
            let object_type = ObjectType::from_number(config.object_type)
                .filter(|t| t.is_proprietary())
                .ok_or_else(|| {
                    GatewayError::Validation(format!(
                        "object type {} of class '{}' is not in the proprietary range",
                        config.object_type, config.name
                    ))
                })?;
            let mut class = ObjectClass::new(&config.name, object_type).with_properties(COMMON);
            for (property, property_type) in &config.properties {
                class = class.with_property(property.clone(), *property_type);
            }
            schema = schema.with_proprietary(config.vendor_id, class);
        }
        Ok(schema)
    }
}

impl Default for StandardSchema {
    fn default() -> Self {
        Self::new()
    }
}

impl VendorSchema for StandardSchema {
    fn object_class(&self, vendor_id: u16, object_type: ObjectType) -> Option<Arc<ObjectClass>> {
        if object_type.is_proprietary() {
            self.proprietary.get(&(vendor_id, object_type)).cloned()
        } else {
            self.standard.get(&object_type).cloned()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_classes() {
        let schema = StandardSchema::new();
        let ai = schema.object_class(0, ObjectType::ANALOG_INPUT).unwrap();
        assert_eq!(ai.name, "analog-input");
        assert_eq!(schema.property_type(&ai, "present-value"), Some(PropertyType::Real));
        assert_eq!(schema.property_type(&ai, "units"), Some(PropertyType::Enumerated));
        assert_eq!(schema.property_type(&ai, "priority-array"), None);
        assert_eq!(schema.property_type(&ai, "weekly-schedule"), None);
    }

    #[test]
    fn test_commandable_classes_have_priority_array() {
        let schema = StandardSchema::new();
        let bv = schema.object_class(0, ObjectType::BINARY_VALUE).unwrap();
        assert_eq!(bv.property_type("priority-array"), Some(PropertyType::Array));
        assert_eq!(bv.property_type("relinquish-default"), Some(PropertyType::Enumerated));
    }

    #[test]
    fn test_every_standard_type_has_a_class() {
        let schema = StandardSchema::new();
        for (name, number) in OBJECT_TYPES {
            let object_type = ObjectType::from_number(*number).unwrap();
            let class = schema.object_class(0, object_type).unwrap();
            assert_eq!(class.name, *name);
            assert_eq!(class.property_type("object-name"), Some(PropertyType::CharacterString));
        }

        let accumulator = schema.object_class(0, "accumulator".parse().unwrap()).unwrap();
        assert_eq!(accumulator.property_type("present-value"), Some(PropertyType::Unsigned));
        assert_eq!(accumulator.property_type("units"), Some(PropertyType::Enumerated));

        let file = schema.object_class(0, "file".parse().unwrap()).unwrap();
        assert_eq!(file.property_type("file-size"), Some(PropertyType::Unsigned));
        assert_eq!(file.property_type("status-flags"), None);

        let averaging = schema.object_class(0, "averaging".parse().unwrap()).unwrap();
        assert_eq!(averaging.property_type("status-flags"), Some(PropertyType::BitString));
    }

    #[test]
    fn test_unregistered_proprietary_type_has_no_class() {
        let schema = StandardSchema::new();
        let object_type = ObjectType::from_number(600).unwrap();
        assert!(schema.object_class(0, object_type).is_none());
    }

    #[test]
    fn test_proprietary_classes_are_vendor_scoped() {
        let config = ProprietaryClassConfig {
            vendor_id: 260,
            object_type: 513,
            name: "vav-controller".to_string(),
            properties: BTreeMap::from([("present-value".to_string(), PropertyType::Real)]),
        };
        let schema = StandardSchema::from_config(&[config]).unwrap();
        let object_type = ObjectType::from_number(513).unwrap();

        let class = schema.object_class(260, object_type).unwrap();
        assert_eq!(class.name, "vav-controller");
        assert_eq!(class.property_type("present-value"), Some(PropertyType::Real));
        assert_eq!(class.property_type("object-name"), Some(PropertyType::CharacterString));
        assert!(schema.object_class(5, object_type).is_none());
    }

    #[test]
    fn test_proprietary_config_rejects_standard_numbers() {
        let config = ProprietaryClassConfig {
            vendor_id: 260,
            object_type: 2,
            name: "not-proprietary".to_string(),
            properties: BTreeMap::new(),
        };
        assert!(StandardSchema::from_config(&[config]).is_err());
    }
}
