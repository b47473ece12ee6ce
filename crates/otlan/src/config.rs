//! Gateway Configuration
//!
//! Layered with figment: built-in defaults, then the TOML file, then
//! `OTLAN_`-prefixed environment variables (`OTLAN_SERVER__PORT=9000`).
//! Command-line flags are applied on top by the binary.

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::bacnet::ProprietaryClassConfig;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "OTLAN_";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub schema: SchemaConfig,
}

/// HTTP listener
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

/// Simulated field network
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Project directory holding `project.toml` and `devices/`
    pub project: PathBuf,
    /// Extra latency per request, overriding the project's own setting
    pub latency_ms: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            project: PathBuf::from("./project"),
            latency_ms: None,
        }
    }
}

/// Vendor object classes beyond the standard ones
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaConfig {
    #[serde(default)]
    pub proprietary: Vec<ProprietaryClassConfig>,
}

impl GatewayConfig {
    /// Load from `path` (if it exists) and the environment
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_figment(Self::figment(path.as_ref()))
    }

    /// The provider stack used by `load`
    pub fn figment(path: &Path) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(GatewayConfig::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Extract and validate
    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let config: GatewayConfig = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for class in &self.schema.proprietary {
            if !(128..=1023).contains(&class.object_type) {
                return Err(ConfigError::Validation {
                    field: format!("schema.proprietary.{}", class.name),
                    reason: format!("object type {} is outside 128..=1023", class.object_type),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bacnet::PropertyType;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = GatewayConfig::from_figment(Figment::from(Serialized::defaults(GatewayConfig::default())))
            .unwrap();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.simulation.latency_ms, None);
        assert!(config.schema.proprietary.is_empty());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = GatewayConfig::load(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.server, ServerConfig::default());
    }

    #[test]
    fn test_file_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[server]
host = "127.0.0.1"
port = 9100

[simulation]
project = "/srv/site"

[[schema.proprietary]]
vendor_id = 260
object_type = 513
name = "vav-controller"

[schema.proprietary.properties]
present-value = "real"
damper-position = "unsigned"
"#
        )
        .unwrap();

        let config = GatewayConfig::load(file.path()).unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.simulation.project, PathBuf::from("/srv/site"));

        let class = &config.schema.proprietary[0];
        assert_eq!(class.object_type, 513);
        assert_eq!(class.properties["damper-position"], PropertyType::Unsigned);
    }

    #[test]
    fn test_rejects_standard_type_as_proprietary() {
        let figment = Figment::from(Serialized::defaults(GatewayConfig::default())).merge(Toml::string(
            r#"
[[schema.proprietary]]
vendor_id = 260
object_type = 2
name = "not-proprietary"
"#,
        ));
        assert!(matches!(
            GatewayConfig::from_figment(figment),
            Err(ConfigError::Validation { .. })
        ));
    }
}
