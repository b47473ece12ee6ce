//! Device address resolution cache
//!
//! Maps a device instance to the address it answered Who-Is from. Entries are
//! learned on first use and kept for the life of the process. Concurrent
//! lookups of the same uncached instance share one in-flight discovery.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{GatewayError, GatewayResult};

use super::reference::PropertyReference;
use super::stack::FieldBus;
use super::types::{
    AddressCacheEntry, DeviceAddress, DeviceAnnouncement, DeviceInstance, ObjectIdentifier, ObjectType,
    PropertyValue, Segmentation,
};

type Discovery = Shared<BoxFuture<'static, GatewayResult<AddressCacheEntry>>>;

/// A device found by a range discovery, with its description
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiscoveredDevice {
    pub device_id: u32,
    pub address: DeviceAddress,
    pub max_apdu: u16,
    pub vendor_id: u16,
    pub segmentation: Segmentation,
    pub description: Option<String>,
    /// Why the description could not be read
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Shared address cache
#[derive(Clone)]
pub struct AddressCache {
    inner: Arc<CacheInner>,
}

struct CacheInner {
    bus: Arc<dyn FieldBus>,
    entries: DashMap<DeviceInstance, AddressCacheEntry>,
    in_flight: Mutex<HashMap<DeviceInstance, Discovery>>,
}

impl AddressCache {
    pub fn new(bus: Arc<dyn FieldBus>) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                bus,
                entries: DashMap::new(),
                in_flight: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Resolve a device instance to its cache entry, discovering it on a miss
    pub async fn resolve(&self, instance: DeviceInstance) -> GatewayResult<AddressCacheEntry> {
        if let Some(entry) = self.inner.entries.get(&instance) {
            return Ok(entry.clone());
        }

        let discovery = {
            let mut in_flight = self.inner.in_flight.lock();
            // A discovery may have finished between the first check and the lock
            if let Some(entry) = self.inner.entries.get(&instance) {
                return Ok(entry.clone());
            }
            in_flight
                .entry(instance)
                .or_insert_with(|| Self::discovery(Arc::clone(&self.inner), instance))
                .clone()
        };

        discovery.await
    }

    fn discovery(inner: Arc<CacheInner>, instance: DeviceInstance) -> Discovery {
        async move {
            let result = inner.lookup(instance).await;
            inner.in_flight.lock().remove(&instance);
            result
        }
        .boxed()
        .shared()
    }

    /// Who-Is for a single instance, optionally directed at one address
    ///
    /// Returns every announcement received. A unique answer is remembered.
    pub async fn who_is(
        &self,
        instance: DeviceInstance,
        destination: Option<&DeviceAddress>,
    ) -> GatewayResult<Vec<DeviceAnnouncement>> {
        let announcements = self
            .inner
            .bus
            .who_is(instance.value(), instance.value(), destination)
            .await?;

        if let [announcement] = announcements.as_slice() {
            if announcement.device_id == instance.value() {
                self.inner.remember(instance, announcement);
            }
        }

        Ok(announcements)
    }

    /// Discover every device in `start..=end` and read each one's description
    ///
    /// Does not populate the cache. A failed description read degrades only
    /// its own entry.
    pub async fn resolve_range(
        &self,
        start: DeviceInstance,
        end: DeviceInstance,
    ) -> GatewayResult<Vec<DiscoveredDevice>> {
        let announcements = self.inner.bus.who_is(start.value(), end.value(), None).await?;
        debug!("Range {}..={} discovered {} devices", start, end, announcements.len());

        let description = PropertyReference::new("description");
        let reads = announcements.into_iter().map(|announcement| {
            let bus = Arc::clone(&self.inner.bus);
            let description = &description;
            async move {
                let device = ObjectIdentifier::new(ObjectType::DEVICE, announcement.device_id);
                let (description, error) =
                    match bus.read_property(&announcement.address, &device, description).await {
                        Ok(PropertyValue::CharacterString(text)) => (Some(text), None),
                        Ok(other) => (None, Some(format!("description is not a character string: {:?}", other))),
                        Err(e) => {
                            warn!("Failed to read description of device {}: {}", announcement.device_id, e);
                            (None, Some(e.to_string()))
                        }
                    };
                DiscoveredDevice {
                    device_id: announcement.device_id,
                    address: announcement.address,
                    max_apdu: announcement.max_apdu,
                    vendor_id: announcement.vendor_id,
                    segmentation: announcement.segmentation,
                    description,
                    error,
                }
            }
        });

        Ok(futures::future::join_all(reads).await)
    }

    /// Forget a learned address
    pub fn invalidate(&self, instance: DeviceInstance) -> Option<AddressCacheEntry> {
        self.inner.entries.remove(&instance).map(|(_, entry)| entry)
    }

    /// Cached entry for an instance, without discovery
    pub fn get(&self, instance: DeviceInstance) -> Option<AddressCacheEntry> {
        self.inner.entries.get(&instance).map(|entry| entry.clone())
    }

    /// Number of learned addresses
    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }
}

impl CacheInner {
    async fn lookup(&self, instance: DeviceInstance) -> GatewayResult<AddressCacheEntry> {
        debug!("Resolving device {} with Who-Is", instance);
        let announcements = self.bus.who_is(instance.value(), instance.value(), None).await?;

        match announcements.as_slice() {
            [] => Err(GatewayError::DeviceNotFound(instance.value())),
            [announcement] => Ok(self.remember(instance, announcement)),
            _ => {
                warn!("Device {} answered from {} addresses", instance, announcements.len());
                Err(GatewayError::AmbiguousDevice(instance.value()))
            }
        }
    }

    fn remember(&self, instance: DeviceInstance, announcement: &DeviceAnnouncement) -> AddressCacheEntry {
        let entry = AddressCacheEntry {
            instance,
            address: announcement.address.clone(),
            vendor_id: announcement.vendor_id,
            learned_at: Utc::now(),
        };
        debug!("Learned address {} for device {}", entry.address, instance);
        self.entries.insert(instance, entry.clone());
        entry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{SimDevice, SimulatedNetwork};
    use std::time::Duration;

    fn instance(value: u32) -> DeviceInstance {
        DeviceInstance::new(value).unwrap()
    }

    fn network() -> Arc<SimulatedNetwork> {
        let network = SimulatedNetwork::new().with_latency(Duration::from_millis(20));
        network.add_device(SimDevice::new(201201, "10.0.1.20:47808").with_description("AHU-1 controller"));
        network.add_device(SimDevice::new(201202, "10.0.1.21:47808"));
        Arc::new(network)
    }

    #[tokio::test]
    async fn test_resolve_hit_skips_discovery() {
        let network = network();
        let cache = AddressCache::new(network.clone());

        let first = cache.resolve(instance(201201)).await.unwrap();
        let second = cache.resolve(instance(201201)).await.unwrap();

        assert_eq!(first.address.as_str(), "10.0.1.20:47808");
        assert_eq!(first, second);
        assert_eq!(network.who_is_count(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_resolutions_share_one_discovery() {
        let network = network();
        let cache = AddressCache::new(network.clone());

        let lookups = (0..16).map(|_| {
            let cache = cache.clone();
            tokio::spawn(async move { cache.resolve(instance(201201)).await })
        });
        let results = futures::future::join_all(lookups).await;

        for result in results {
            let entry = result.unwrap().unwrap();
            assert_eq!(entry.address.as_str(), "10.0.1.20:47808");
        }
        assert_eq!(network.who_is_count(), 1);
    }

    #[tokio::test]
    async fn test_different_instances_resolve_independently() {
        let network = network();
        let cache = AddressCache::new(network.clone());

        let (a, b) = tokio::join!(cache.resolve(instance(201201)), cache.resolve(instance(201202)));
        assert_eq!(a.unwrap().address.as_str(), "10.0.1.20:47808");
        assert_eq!(b.unwrap().address.as_str(), "10.0.1.21:47808");
        assert_eq!(network.who_is_count(), 2);
    }

    #[tokio::test]
    async fn test_missing_device_is_not_cached() {
        let network = network();
        let cache = AddressCache::new(network.clone());

        let err = cache.resolve(instance(99)).await.unwrap_err();
        assert_eq!(err, GatewayError::DeviceNotFound(99));
        assert_eq!(err.to_string(), "Device not found: 99");

        let _ = cache.resolve(instance(99)).await;
        assert_eq!(network.who_is_count(), 2);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_instance_is_ambiguous() {
        let network = network();
        network.add_device(SimDevice::new(201201, "10.0.2.20:47808"));
        let cache = AddressCache::new(network.clone());

        let err = cache.resolve(instance(201201)).await.unwrap_err();
        assert_eq!(err, GatewayError::AmbiguousDevice(201201));
        assert!(cache.get(instance(201201)).is_none());
    }

    #[tokio::test]
    async fn test_who_is_remembers_unique_answer() {
        let network = network();
        let cache = AddressCache::new(network.clone());

        let found = cache.who_is(instance(201202), None).await.unwrap();
        assert_eq!(found.len(), 1);
        assert!(cache.get(instance(201202)).is_some());

        cache.resolve(instance(201202)).await.unwrap();
        assert_eq!(network.who_is_count(), 1);

        assert!(cache.invalidate(instance(201202)).is_some());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_directed_who_is() {
        let network = network();
        let cache = AddressCache::new(network.clone());

        let elsewhere = DeviceAddress::new("10.0.1.21:47808");
        let found = cache.who_is(instance(201201), Some(&elsewhere)).await.unwrap();
        assert!(found.is_empty());

        let here = DeviceAddress::new("10.0.1.20:47808");
        let found = cache.who_is(instance(201201), Some(&here)).await.unwrap();
        assert_eq!(found.len(), 1);
    }

    #[tokio::test]
    async fn test_resolve_range_enriches_and_degrades() {
        let network = network();
        network.add_device(SimDevice::new(201203, "10.0.1.22:47808"));
        let cache = AddressCache::new(network.clone());

        let devices = cache.resolve_range(instance(201200), instance(201210)).await.unwrap();
        assert_eq!(devices.len(), 3);

        let ahu = devices.iter().find(|d| d.device_id == 201201).unwrap();
        assert_eq!(ahu.description.as_deref(), Some("AHU-1 controller"));
        assert!(ahu.error.is_none());

        let degraded = devices.iter().find(|d| d.device_id == 201203).unwrap();
        assert!(degraded.description.is_none());
        assert!(degraded.error.as_deref().unwrap().contains("unknown-property"));

        assert!(cache.is_empty());
    }
}
