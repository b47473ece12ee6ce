//! Standard BACnet vocabularies
//!
//! Object type names with their enumeration values, and the property
//! identifiers accepted on single-property requests.

/// Standard object types (ASHRAE 135 clause 21, BACnetObjectType)
pub const OBJECT_TYPES: &[(&str, u16)] = &[
    ("analog-input", 0),
    ("analog-output", 1),
    ("analog-value", 2),
    ("binary-input", 3),
    ("binary-output", 4),
    ("binary-value", 5),
    ("calendar", 6),
    ("command", 7),
    ("device", 8),
    ("event-enrollment", 9),
    ("file", 10),
    ("group", 11),
    ("loop", 12),
    ("multi-state-input", 13),
    ("multi-state-output", 14),
    ("notification-class", 15),
    ("program", 16),
    ("schedule", 17),
    ("averaging", 18),
    ("multi-state-value", 19),
    ("trend-log", 20),
    ("life-safety-point", 21),
    ("life-safety-zone", 22),
    ("accumulator", 23),
    ("pulse-converter", 24),
    ("event-log", 25),
    ("global-group", 26),
    ("trend-log-multiple", 27),
    ("load-control", 28),
    ("structured-view", 29),
    ("access-door", 30),
    ("timer", 31),
    ("access-credential", 32),
    ("access-point", 33),
    ("access-rights", 34),
    ("access-user", 35),
    ("access-zone", 36),
    ("credential-data-input", 37),
    ("network-security", 38),
    ("bitstring-value", 39),
    ("characterstring-value", 40),
    ("date-pattern-value", 41),
    ("date-value", 42),
    ("datetime-pattern-value", 43),
    ("datetime-value", 44),
    ("integer-value", 45),
    ("large-analog-value", 46),
    ("octetstring-value", 47),
    ("positive-integer-value", 48),
    ("time-pattern-value", 49),
    ("time-value", 50),
    ("notification-forwarder", 51),
    ("alert-enrollment", 52),
    ("channel", 53),
    ("lighting-output", 54),
    ("binary-lighting-output", 55),
    ("network-port", 56),
    ("elevator-group", 57),
    ("escalator", 58),
    ("lift", 59),
];

/// First object type number reserved for vendor-proprietary types
pub const FIRST_PROPRIETARY_OBJECT_TYPE: u16 = 128;

/// Last valid object type number
pub const LAST_PROPRIETARY_OBJECT_TYPE: u16 = 1023;

/// Property identifiers that expand to a set of properties on batched reads
pub const WILDCARD_PROPERTIES: &[&str] = &["all", "required", "optional"];

/// Standard property identifiers
pub const PROPERTY_IDENTIFIERS: &[&str] = &[
    "acked-transitions",
    "action",
    "action-text",
    "active-text",
    "alarm-value",
    "alarm-values",
    "all",
    "apdu-segment-timeout",
    "apdu-timeout",
    "application-software-version",
    "buffer-size",
    "change-of-state-count",
    "change-of-state-time",
    "controlled-variable-reference",
    "controlled-variable-units",
    "controlled-variable-value",
    "cov-increment",
    "database-revision",
    "date-list",
    "daylight-savings-status",
    "deadband",
    "derivative-constant",
    "description",
    "device-address-binding",
    "effective-period",
    "enable",
    "event-enable",
    "event-state",
    "event-time-stamps",
    "exception-schedule",
    "feedback-value",
    "firmware-revision",
    "high-limit",
    "inactive-text",
    "integral-constant",
    "limit-enable",
    "local-date",
    "local-time",
    "location",
    "log-buffer",
    "log-device-object-property",
    "log-interval",
    "low-limit",
    "manipulated-variable-reference",
    "max-apdu-length-accepted",
    "max-pres-value",
    "max-segments-accepted",
    "min-pres-value",
    "model-name",
    "notification-class",
    "notify-type",
    "number-of-apdu-retries",
    "number-of-states",
    "object-identifier",
    "object-list",
    "object-name",
    "object-type",
    "optional",
    "out-of-service",
    "output-units",
    "polarity",
    "present-value",
    "priority",
    "priority-array",
    "priority-for-writing",
    "profile-name",
    "property-list",
    "proportional-constant",
    "protocol-object-types-supported",
    "protocol-revision",
    "protocol-services-supported",
    "protocol-version",
    "recipient-list",
    "record-count",
    "reliability",
    "relinquish-default",
    "required",
    "resolution",
    "schedule-default",
    "segmentation-supported",
    "setpoint",
    "setpoint-reference",
    "start-time",
    "state-text",
    "status-flags",
    "stop-time",
    "stop-when-full",
    "structured-object-list",
    "system-status",
    "tags",
    "time-delay",
    "total-record-count",
    "units",
    "utc-offset",
    "vendor-identifier",
    "vendor-name",
    "weekly-schedule",
];

/// Look up the enumeration value of a standard object type name
pub fn object_type_number(name: &str) -> Option<u16> {
    OBJECT_TYPES
        .iter()
        .find(|(candidate, _)| *candidate == name)
        .map(|(_, number)| *number)
}

/// Look up the name of a standard object type number
pub fn object_type_name(number: u16) -> Option<&'static str> {
    OBJECT_TYPES
        .iter()
        .find(|(_, candidate)| *candidate == number)
        .map(|(name, _)| *name)
}

/// Whether `name` is a standard property identifier
pub fn is_property_identifier(name: &str) -> bool {
    PROPERTY_IDENTIFIERS.binary_search(&name).is_ok()
}

/// Whether `name` is one of the batched-read wildcards
pub fn is_wildcard_property(name: &str) -> bool {
    WILDCARD_PROPERTIES.contains(&name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_identifiers_sorted() {
        // binary_search relies on this
        assert!(PROPERTY_IDENTIFIERS.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_object_type_lookup() {
        assert_eq!(object_type_number("analog-input"), Some(0));
        assert_eq!(object_type_number("device"), Some(8));
        assert_eq!(object_type_name(19), Some("multi-state-value"));
        assert_eq!(object_type_number("asdf123-value"), None);
    }

    #[test]
    fn test_property_lookup() {
        assert!(is_property_identifier("present-value"));
        assert!(is_property_identifier("object-list"));
        assert!(!is_property_identifier("present1234-value"));
        assert!(is_wildcard_property("required"));
        assert!(!is_wildcard_property("units"));
    }
}
