//! Simulation Project Types
//!
//! Defines the structure of a simulated site on disk.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::bacnet::Segmentation;

/// Project manifest (project.toml)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectManifest {
    pub project: ProjectInfo,
    #[serde(default)]
    pub network: NetworkConfig,
}

/// Project information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectInfo {
    pub id: String,
    pub name: String,
    #[serde(default = "default_version")]
    pub version: String,
    pub description: Option<String>,
}

fn default_version() -> String {
    "1.0.0".to_string()
}

/// Simulated network behaviour
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Artificial delay added to every confirmed request
    #[serde(default)]
    pub latency_ms: u64,
}

/// Device configuration (devices/*.device.toml)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub device: DeviceInfo,
    #[serde(default)]
    pub points: Vec<PointConfig>,
}

/// Device information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// BACnet device instance
    pub instance: u32,
    pub name: String,
    pub description: Option<String>,
    /// Address the device answers from; derived from the instance when absent
    pub address: Option<String>,
    #[serde(default)]
    pub vendor_id: u16,
    #[serde(default)]
    pub segmentation: Segmentation,
    #[serde(default = "default_max_apdu")]
    pub max_apdu: u16,
    pub model_name: Option<String>,
}

fn default_max_apdu() -> u16 {
    1476
}

/// Point configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointConfig {
    /// Object identifier, `analog-input,1`
    pub object: String,
    pub name: String,
    pub description: Option<String>,
    pub present_value: Option<toml::Value>,
    /// Engineering units, by name or enumeration value
    pub units: Option<toml::Value>,
    /// Any further properties, by property identifier
    #[serde(default)]
    pub properties: BTreeMap<String, toml::Value>,
}

/// A loaded simulation project
#[derive(Debug, Clone)]
pub struct Project {
    pub path: PathBuf,
    pub manifest: ProjectManifest,
    /// Devices in file-name order
    pub devices: Vec<DeviceConfig>,
}

impl Project {
    /// Get project ID
    pub fn id(&self) -> &str {
        &self.manifest.project.id
    }

    /// Get project name
    pub fn name(&self) -> &str {
        &self.manifest.project.name
    }

    /// Get a device by instance
    pub fn get_device(&self, instance: u32) -> Option<&DeviceConfig> {
        self.devices.iter().find(|d| d.device.instance == instance)
    }
}
