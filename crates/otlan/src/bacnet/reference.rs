//! Property reference parsing
//!
//! A property token is either `name` or `name[index]`. A token without a
//! bracket refers to the whole property, not to index 0.

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

use crate::error::GatewayError;

use super::vocabulary::is_property_identifier;

/// Property identifier with an optional array index
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PropertyReference {
    pub property_identifier: String,
    pub array_index: Option<u32>,
}

impl PropertyReference {
    /// Reference to a whole property
    pub fn new(property_identifier: impl Into<String>) -> Self {
        Self {
            property_identifier: property_identifier.into(),
            array_index: None,
        }
    }

    /// Reference to a single array element
    pub fn indexed(property_identifier: impl Into<String>, index: u32) -> Self {
        Self {
            property_identifier: property_identifier.into(),
            array_index: Some(index),
        }
    }
}

impl fmt::Display for PropertyReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.array_index {
            Some(index) => write!(f, "{}[{}]", self.property_identifier, index),
            None => f.write_str(&self.property_identifier),
        }
    }
}

impl Serialize for PropertyReference {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl FromStr for PropertyReference {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse(s)
    }
}

/// Parse `name` or `name[digits]`
pub fn parse(token: &str) -> Result<PropertyReference, GatewayError> {
    let malformed = || GatewayError::MalformedPropertyReference(token.to_string());

    let (name, array_index) = match token.split_once('[') {
        Some((name, rest)) => {
            let digits = rest.strip_suffix(']').ok_or_else(malformed)?;
            if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                return Err(malformed());
            }
            (name, Some(digits.parse::<u32>().map_err(|_| malformed())?))
        }
        None => (token, None),
    };

    if name.is_empty() || !name.bytes().all(|b| b.is_ascii_alphabetic() || b == b'-') {
        return Err(malformed());
    }

    Ok(PropertyReference {
        property_identifier: name.to_string(),
        array_index,
    })
}

/// Parse a token and require a standard property identifier
pub fn parse_standard(token: &str) -> Result<PropertyReference, GatewayError> {
    let reference = parse(token)?;
    if !is_property_identifier(&reference.property_identifier) {
        return Err(GatewayError::Validation(format!(
            "property_identifier '{}' is not a valid BACnet property identifier",
            reference.property_identifier
        )));
    }
    Ok(reference)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_whole_property() {
        let reference = parse("present-value").unwrap();
        assert_eq!(reference.property_identifier, "present-value");
        assert_eq!(reference.array_index, None);
    }

    #[test]
    fn test_parse_indexed_property() {
        let reference = parse("present-value[3]").unwrap();
        assert_eq!(reference, PropertyReference::indexed("present-value", 3));
        assert_eq!(reference.to_string(), "present-value[3]");

        let length = parse("object-list[0]").unwrap();
        assert_eq!(length.array_index, Some(0));
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for token in [
            "bad value",
            "",
            "[3]",
            "present-value[]",
            "present-value[3",
            "present-value[-1]",
            "present-value[3]x",
            "present_value",
            "analog-input,2",
            "present-value[99999999999]",
        ] {
            assert!(
                matches!(parse(token), Err(GatewayError::MalformedPropertyReference(_))),
                "{token:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_parse_standard_checks_vocabulary() {
        assert!(parse_standard("units").is_ok());
        assert!(parse_standard("priority-array[8]").is_ok());
        assert!(matches!(
            parse_standard("present-valu"),
            Err(GatewayError::Validation(_))
        ));
    }
}
