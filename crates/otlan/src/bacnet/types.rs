//! BACnet types for the gateway core

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize, Serializer};

use crate::error::GatewayError;

use super::vocabulary::{
    object_type_name, object_type_number, FIRST_PROPRIETARY_OBJECT_TYPE, LAST_PROPRIETARY_OBJECT_TYPE,
};

/// Largest device or object instance number (22-bit field)
pub const MAX_INSTANCE: u32 = 4_194_303;

/// BACnet device instance number, `0..=4194303`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct DeviceInstance(u32);

impl DeviceInstance {
    /// Create a device instance, rejecting values outside the 22-bit range
    pub fn new(value: u32) -> Result<Self, GatewayError> {
        if value > MAX_INSTANCE {
            return Err(GatewayError::Validation(format!(
                "device instance {} is out of range (0..={})",
                value, MAX_INSTANCE
            )));
        }
        Ok(Self(value))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl TryFrom<i64> for DeviceInstance {
    type Error = GatewayError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u32::try_from(value)
            .map_err(|_| {
                GatewayError::Validation(format!(
                    "device instance {} is out of range (0..={})",
                    value, MAX_INSTANCE
                ))
            })
            .and_then(Self::new)
    }
}

impl FromStr for DeviceInstance {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: i64 = s
            .trim()
            .parse()
            .map_err(|_| GatewayError::Validation(format!("device instance '{}' is not an integer", s)))?;
        Self::try_from(value)
    }
}

impl fmt::Display for DeviceInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Network address of a device as reported by the stack
///
/// Opaque to the core: it is only ever handed back to the stack.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceAddress(String);

impl DeviceAddress {
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Segmentation support advertised in an I-Am
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Segmentation {
    #[default]
    Both,
    Transmit,
    Receive,
    None,
}

/// Device announcement from an I-Am response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceAnnouncement {
    /// BACnet device instance number
    pub device_id: u32,
    /// Address the I-Am came from
    pub address: DeviceAddress,
    /// Maximum APDU length the device supports
    pub max_apdu: u16,
    /// BACnet vendor ID
    pub vendor_id: u16,
    /// Segmentation support
    pub segmentation: Segmentation,
}

/// Learned address for a device instance
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AddressCacheEntry {
    pub instance: DeviceInstance,
    pub address: DeviceAddress,
    pub vendor_id: u16,
    pub learned_at: DateTime<Utc>,
}

/// BACnet object type: a standard vocabulary member or a proprietary number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectType(u16);

impl ObjectType {
    pub const ANALOG_INPUT: Self = Self(0);
    pub const ANALOG_OUTPUT: Self = Self(1);
    pub const ANALOG_VALUE: Self = Self(2);
    pub const BINARY_INPUT: Self = Self(3);
    pub const BINARY_OUTPUT: Self = Self(4);
    pub const BINARY_VALUE: Self = Self(5);
    pub const CALENDAR: Self = Self(6);
    pub const DEVICE: Self = Self(8);
    pub const LOOP: Self = Self(12);
    pub const MULTI_STATE_INPUT: Self = Self(13);
    pub const MULTI_STATE_OUTPUT: Self = Self(14);
    pub const NOTIFICATION_CLASS: Self = Self(15);
    pub const PROGRAM: Self = Self(16);
    pub const SCHEDULE: Self = Self(17);
    pub const MULTI_STATE_VALUE: Self = Self(19);
    pub const TREND_LOG: Self = Self(20);
    pub const CHARACTERSTRING_VALUE: Self = Self(40);
    pub const INTEGER_VALUE: Self = Self(45);
    pub const NETWORK_PORT: Self = Self(56);

    /// Build from a raw enumeration value; `None` for reserved numbers
    pub fn from_number(number: u16) -> Option<Self> {
        let known = object_type_name(number).is_some()
            || (FIRST_PROPRIETARY_OBJECT_TYPE..=LAST_PROPRIETARY_OBJECT_TYPE).contains(&number);
        known.then_some(Self(number))
    }

    pub fn number(self) -> u16 {
        self.0
    }

    /// Vocabulary name, `None` for proprietary types
    pub fn name(self) -> Option<&'static str> {
        object_type_name(self.0)
    }

    pub fn is_proprietary(self) -> bool {
        self.0 >= FIRST_PROPRIETARY_OBJECT_TYPE
    }

    /// Objects whose present-value is written through a priority array
    pub fn is_commandable(self) -> bool {
        matches!(
            self,
            Self::ANALOG_OUTPUT
                | Self::ANALOG_VALUE
                | Self::BINARY_OUTPUT
                | Self::BINARY_VALUE
                | Self::MULTI_STATE_OUTPUT
                | Self::MULTI_STATE_VALUE
        )
    }
}

impl FromStr for ObjectType {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(number) = object_type_number(s) {
            return Ok(Self(number));
        }
        s.parse::<u16>()
            .ok()
            .filter(|n| (FIRST_PROPRIETARY_OBJECT_TYPE..=LAST_PROPRIETARY_OBJECT_TYPE).contains(n))
            .map(Self)
            .ok_or_else(|| GatewayError::UnrecognizedObjectType(s.to_string()))
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "{}", self.0),
        }
    }
}

impl Serialize for ObjectType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Object identifier: `(type, instance)`, rendered `type,instance`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectIdentifier {
    pub object_type: ObjectType,
    pub instance: u32,
}

impl ObjectIdentifier {
    /// Create an identifier from values already decoded by the stack
    pub fn new(object_type: ObjectType, instance: u32) -> Self {
        Self { object_type, instance }
    }

    /// Parse caller input in the strict `type,instance` form
    pub fn parse(s: &str) -> Result<Self, GatewayError> {
        let (object_type, instance) = s.split_once(',').ok_or_else(|| {
            GatewayError::Validation(
                "object_identifier must include a type and an instance number separated by a comma"
                    .to_string(),
            )
        })?;
        Self::from_parts(object_type, instance)
    }

    /// Parse either `type,instance` or `type:instance`
    pub fn parse_lenient(s: &str) -> Result<Self, GatewayError> {
        let split = s
            .find([',', ':'])
            .ok_or_else(|| GatewayError::Validation(format!("'{}' is not an object identifier", s)))?;
        Self::from_parts(&s[..split], &s[split + 1..])
    }

    fn from_parts(object_type: &str, instance: &str) -> Result<Self, GatewayError> {
        let object_type: ObjectType = object_type.trim().parse()?;
        let instance: u32 = instance
            .trim()
            .parse()
            .map_err(|_| GatewayError::Validation(format!("Invalid instance number: '{}'", instance)))?;
        if instance == 0 || instance >= MAX_INSTANCE {
            return Err(GatewayError::Validation(format!(
                "Invalid instance number: {} is outside 1..{}",
                instance, MAX_INSTANCE
            )));
        }
        Ok(Self { object_type, instance })
    }
}

impl FromStr for ObjectIdentifier {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ObjectIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.object_type, self.instance)
    }
}

impl Serialize for ObjectIdentifier {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A decoded property value, one variant per application value kind
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Null,
    Boolean(bool),
    Unsigned(u64),
    Signed(i64),
    Real(f32),
    Double(f64),
    OctetString(Vec<u8>),
    CharacterString(String),
    BitString(Vec<bool>),
    Enumerated(u32),
    Date(NaiveDate),
    Time(NaiveTime),
    ObjectIdentifier(ObjectIdentifier),
    /// BACnetARRAY; index 0 on the wire is the length
    Array(Vec<PropertyValue>),
    /// BACnetLIST
    List(Vec<PropertyValue>),
    /// Constructed value with named fields, in declaration order
    Sequence(Vec<(String, PropertyValue)>),
}

impl PropertyValue {
    /// Elements of an array or list value
    pub fn elements(&self) -> Option<&[PropertyValue]> {
        match self {
            Self::Array(items) | Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Integer view of a numeric value, used for array lengths
    pub fn as_index(&self) -> Option<u64> {
        match self {
            Self::Unsigned(n) => Some(*n),
            Self::Signed(n) => u64::try_from(*n).ok(),
            Self::Enumerated(n) => Some(u64::from(*n)),
            Self::Real(r) if r.is_finite() && r.fract() == 0.0 && *r >= 0.0 => Some(*r as u64),
            Self::Double(d) if d.is_finite() && d.fract() == 0.0 && *d >= 0.0 => Some(*d as u64),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_instance_range() {
        assert!(DeviceInstance::new(0).is_ok());
        assert!(DeviceInstance::new(MAX_INSTANCE).is_ok());
        assert!(DeviceInstance::new(MAX_INSTANCE + 1).is_err());
        assert!(DeviceInstance::try_from(-1i64).is_err());
        assert_eq!("201201".parse::<DeviceInstance>().unwrap().value(), 201201);
        assert!("abc".parse::<DeviceInstance>().is_err());
    }

    #[test]
    fn test_object_identifier_parse() {
        let oid = ObjectIdentifier::parse("analog-value,11").unwrap();
        assert_eq!(oid.object_type, ObjectType::ANALOG_VALUE);
        assert_eq!(oid.instance, 11);
        assert_eq!(oid.to_string(), "analog-value,11");
    }

    #[test]
    fn test_object_identifier_requires_comma() {
        let err = ObjectIdentifier::parse("analog-value:11").unwrap_err();
        assert!(matches!(err, GatewayError::Validation(_)));
        assert!(ObjectIdentifier::parse_lenient("analog-value:11").is_ok());
    }

    #[test]
    fn test_object_identifier_rejects_instance_zero() {
        assert!(ObjectIdentifier::parse("analog-value,0").is_err());
        assert!(ObjectIdentifier::parse_lenient("analog-value:0").is_err());
        assert!(ObjectIdentifier::parse_lenient("analog-value,0").is_err());
    }

    #[test]
    fn test_object_identifier_rejects_bad_parts() {
        assert!(matches!(
            ObjectIdentifier::parse("asdf123-value,11"),
            Err(GatewayError::UnrecognizedObjectType(_))
        ));
        assert!(matches!(
            ObjectIdentifier::parse("analog-value,-11"),
            Err(GatewayError::Validation(_))
        ));
        assert!(matches!(
            ObjectIdentifier::parse("analog-value,asdf"),
            Err(GatewayError::Validation(_))
        ));
        assert!(ObjectIdentifier::parse("analog-value,0").is_err());
        assert!(ObjectIdentifier::parse("analog-value,4194303").is_err());
        assert!(ObjectIdentifier::parse("analog-value,4194302").is_ok());
    }

    #[test]
    fn test_proprietary_object_type() {
        let oid = ObjectIdentifier::parse("513,7").unwrap();
        assert!(oid.object_type.is_proprietary());
        assert_eq!(oid.to_string(), "513,7");
        assert!(ObjectIdentifier::parse("77,7").is_err());
    }

    #[test]
    fn test_as_index() {
        assert_eq!(PropertyValue::Unsigned(4).as_index(), Some(4));
        assert_eq!(PropertyValue::Real(3.0).as_index(), Some(3));
        assert_eq!(PropertyValue::Real(3.5).as_index(), None);
        assert_eq!(PropertyValue::CharacterString("4".into()).as_index(), None);
    }
}
