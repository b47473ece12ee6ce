//! Project Loader
//!
//! Loads a simulated site from disk.

use std::path::Path;

use tokio::fs;
use tracing::{debug, info, warn};

use super::config::*;

/// Error type for project loading
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Project path does not exist: {0}")]
    PathNotFound(std::path::PathBuf),

    #[error("Project manifest not found: {0}")]
    ManifestNotFound(std::path::PathBuf),

    #[error("Failed to read file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    TomlParseError(#[from] toml::de::Error),

    #[error("Invalid device {instance}: {reason}")]
    InvalidDevice { instance: u32, reason: String },
}

/// Project loader
pub struct ProjectLoader;

impl ProjectLoader {
    /// Load a project from the given path
    pub async fn load(path: impl AsRef<Path>) -> Result<Project, LoadError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(LoadError::PathNotFound(path.to_path_buf()));
        }

        info!("Loading project from: {}", path.display());

        let manifest_path = path.join("project.toml");
        if !manifest_path.exists() {
            return Err(LoadError::ManifestNotFound(manifest_path));
        }

        let manifest_content = fs::read_to_string(&manifest_path).await?;
        let manifest: ProjectManifest = toml::from_str(&manifest_content)?;
        info!("Loaded project manifest: {} ({})", manifest.project.name, manifest.project.id);

        let devices = Self::load_devices(path).await?;
        info!("Loaded {} devices", devices.len());

        Ok(Project {
            path: path.to_path_buf(),
            manifest,
            devices,
        })
    }

    /// Load all devices from the devices/ directory
    async fn load_devices(project_path: &Path) -> Result<Vec<DeviceConfig>, LoadError> {
        let devices_dir = project_path.join("devices");
        let mut files = Vec::new();

        if !devices_dir.exists() {
            debug!("No devices directory found");
            return Ok(Vec::new());
        }

        let mut entries = fs::read_dir(&devices_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                if name.ends_with(".device.toml") {
                    files.push(path);
                }
            }
        }
        files.sort();

        let mut devices = Vec::with_capacity(files.len());
        for path in files {
            match Self::load_device(&path).await {
                Ok(device) => {
                    debug!("Loaded device: {} ({})", device.device.instance, device.device.name);
                    devices.push(device);
                }
                Err(e) => {
                    warn!("Failed to load device from {}: {}", path.display(), e);
                }
            }
        }

        Ok(devices)
    }

    /// Load a single device configuration
    async fn load_device(path: &Path) -> Result<DeviceConfig, LoadError> {
        let content = fs::read_to_string(path).await?;
        let device: DeviceConfig = toml::from_str(&content)?;
        Ok(device)
    }
}
