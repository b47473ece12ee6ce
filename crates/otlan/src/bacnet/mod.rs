//! BACnet Gateway Core
//!
//! Resolves device instances to addresses, validates and compiles property
//! requests against the vendor schema, walks device inventories, and shapes
//! every outcome into a `ResultEnvelope`.
//!
//! The wire stack is reached only through the `FieldBus` trait.

mod cache;
mod compiler;
mod points;
mod reconcile;
mod reference;
mod schema;
mod service;
mod stack;
mod types;
pub mod vocabulary;

pub use cache::{AddressCache, DiscoveredDevice};
pub use compiler::{compile, compile_grouped, flatten_pairs, GroupedRequest};
pub use points::{DiscoveredPoint, PointEnumerator};
pub use reconcile::{coerce_write_value, encode_batch, encode_item, encode_value, normalize_float, ResultEnvelope};
pub use reference::{parse as parse_property_reference, parse_standard as parse_standard_property, PropertyReference};
pub use schema::{ObjectClass, PropertyType, ProprietaryClassConfig, StandardSchema, VendorSchema};
pub use service::{BacnetService, WriteDirective};
pub use stack::{AbortReason, ErrorValue, FieldBus, PropertyRequestBlock, ProtocolError, ReadAccessResult};
pub use types::{
    AddressCacheEntry, DeviceAddress, DeviceAnnouncement, DeviceInstance, ObjectIdentifier, ObjectType,
    PropertyValue, Segmentation, MAX_INSTANCE,
};
