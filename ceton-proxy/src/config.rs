//! Configuration file format.

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::device::{
    DeviceConfig, RegistryConfig, DEFAULT_DEVICE_PATH_PREFIX, DEFAULT_PCIE_BASE_PORT,
    DEFAULT_STREAM_BASE_PORT,
};

pub const DEFAULT_LISTEN: &str = "0.0.0.0:5004";
pub const DEFAULT_CONFIG_FILE: &str = "ceton-proxy.toml";
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 5000;
const DEFAULT_FUSER_TIMEOUT_MS: u64 = 2000;

#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub ceton: CetonSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

#[derive(Debug, Deserialize, Default)]
pub struct ServerSection {
    pub listen: Option<SocketAddr>,
}

#[derive(Debug, Deserialize, Default)]
pub struct CetonSection {
    #[serde(default)]
    pub devices: Vec<DeviceConfig>,
    /// Legacy single-device form.
    pub address: Option<String>,
    pub tuners: Option<u32>,
    pub pcie_address: Option<String>,

    pub host_address: Option<String>,
    pub stream_base_port: Option<u16>,
    pub pcie_base_port: Option<u16>,
    pub device_path_prefix: Option<String>,
    pub request_timeout_ms: Option<u64>,
    pub fuser_command: Option<String>,
    pub fuser_timeout_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
pub struct LoggingSection {
    pub log_dir: Option<String>,
    pub retention_days: Option<u64>,
    pub level: Option<String>,
}

/// Default tuner count of a single legacy device.
const DEFAULT_TUNERS: u32 = 4;

impl CetonSection {
    /// Device list, falling back to the legacy `address`/`tuners` pair.
    pub fn device_list(&self) -> Vec<DeviceConfig> {
        if !self.devices.is_empty() {
            return self.devices.clone();
        }
        match &self.address {
            Some(address) if !address.trim().is_empty() => vec![DeviceConfig {
                address: address.trim().to_string(),
                tuners: self.tuners.unwrap_or(DEFAULT_TUNERS),
                pcie_address: self.pcie_address.clone(),
            }],
            _ => Vec::new(),
        }
    }

    pub fn registry_config(&self) -> RegistryConfig {
        let defaults = RegistryConfig::default();
        RegistryConfig {
            devices: self.device_list(),
            host_address: self.host_address.clone().unwrap_or(defaults.host_address),
            stream_base_port: self.stream_base_port.unwrap_or(DEFAULT_STREAM_BASE_PORT),
            pcie_base_port: self.pcie_base_port.unwrap_or(DEFAULT_PCIE_BASE_PORT),
            device_path_prefix: self
                .device_path_prefix
                .clone()
                .unwrap_or_else(|| DEFAULT_DEVICE_PATH_PREFIX.to_string()),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms.unwrap_or(DEFAULT_REQUEST_TIMEOUT_MS))
    }

    pub fn fuser_command(&self) -> &str {
        self.fuser_command.as_deref().unwrap_or("fuser")
    }

    pub fn fuser_timeout(&self) -> Duration {
        Duration::from_millis(self.fuser_timeout_ms.unwrap_or(DEFAULT_FUSER_TIMEOUT_MS))
    }
}

pub fn load_config(path: &Path) -> Result<ConfigFile, Box<dyn std::error::Error>> {
    let contents = std::fs::read_to_string(path)?;
    let config: ConfigFile = toml::from_str(&contents)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_devices_array() {
        let config: ConfigFile = toml::from_str(
            r#"
            [server]
            listen = "127.0.0.1:6000"

            [ceton]
            host_address = "192.168.1.10"
            stream_base_port = 42000
            devices = [
                { address = "192.168.1.20", tuners = 6 },
                { address = "192.168.200.1", tuners = 4, pcie_address = "192.168.200.2" },
            ]
            "#,
        )
        .unwrap();

        assert_eq!(config.server.listen, Some("127.0.0.1:6000".parse().unwrap()));
        let registry = config.ceton.registry_config();
        assert_eq!(registry.devices.len(), 2);
        assert_eq!(registry.devices[1].pcie_address.as_deref(), Some("192.168.200.2"));
        assert_eq!(registry.host_address, "192.168.1.10");
        assert_eq!(registry.stream_base_port, 42000);
        assert_eq!(registry.pcie_base_port, DEFAULT_PCIE_BASE_PORT);
    }

    #[test]
    fn test_legacy_single_device() {
        let config: ConfigFile = toml::from_str(
            r#"
            [ceton]
            address = "192.168.1.20"
            tuners = 4
            "#,
        )
        .unwrap();

        assert_eq!(
            config.ceton.device_list(),
            vec![DeviceConfig {
                address: "192.168.1.20".to_string(),
                tuners: 4,
                pcie_address: None,
            }]
        );
    }

    #[test]
    fn test_defaults() {
        let config = ConfigFile::default();
        assert!(config.ceton.device_list().is_empty());
        assert_eq!(config.ceton.request_timeout(), Duration::from_millis(5000));
        assert_eq!(config.ceton.fuser_command(), "fuser");
        assert_eq!(config.ceton.fuser_timeout(), Duration::from_millis(2000));
        assert_eq!(config.ceton.registry_config().device_path_prefix, DEFAULT_DEVICE_PATH_PREFIX);

        // An empty address counts as unset.
        let config: ConfigFile = toml::from_str("[ceton]\naddress = \"  \"\n").unwrap();
        assert!(config.ceton.device_list().is_empty());
    }
}
