//! Static device and tuner topology.

use std::path::PathBuf;

use log::info;
use serde::Deserialize;

use ceton_protocol::{DeliveryMode, SetupError, StreamLocator, TunerVar};

use crate::hardware::CetonBackend;

/// Default first UDP port for network relay tuners.
pub const DEFAULT_STREAM_BASE_PORT: u16 = 41001;

/// Default first relay port for PCIe tuners.
pub const DEFAULT_PCIE_BASE_PORT: u16 = 8000;

/// Default prefix of PCIe tuner device files.
pub const DEFAULT_DEVICE_PATH_PREFIX: &str = "/dev/ceton/ctn91xx_mpeg";

/// Configuration of one physical device.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DeviceConfig {
    /// Device web interface address (host or host:port).
    pub address: String,
    /// Number of tuner instances on the device.
    pub tuners: u32,
    /// Relay address used by PCIe cards.
    #[serde(default)]
    pub pcie_address: Option<String>,
}

/// Registry build parameters.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    pub devices: Vec<DeviceConfig>,
    /// Address network relay tuners stream to.
    pub host_address: String,
    pub stream_base_port: u16,
    pub pcie_base_port: u16,
    pub device_path_prefix: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            devices: Vec::new(),
            host_address: "127.0.0.1".to_string(),
            stream_base_port: DEFAULT_STREAM_BASE_PORT,
            pcie_base_port: DEFAULT_PCIE_BASE_PORT,
            device_path_prefix: DEFAULT_DEVICE_PATH_PREFIX.to_string(),
        }
    }
}

/// A physical Ceton device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    pub ordinal: usize,
    pub address: String,
    pub host_connection: String,
    pub delivery: DeliveryMode,
    pub tuner_count: u32,
}

/// Where a tuner delivers its stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// RTP/UDP relay to `dest_ip:port`.
    Network { dest_ip: String, port: u16 },
    /// Device file read locally; the card still relays to `relay_ip:relay_port`.
    DeviceFile {
        path: PathBuf,
        relay_ip: String,
        relay_port: u16,
    },
}

impl Destination {
    /// Address/port pair posted with stream requests.
    pub fn relay(&self) -> (&str, u16) {
        match self {
            Destination::Network { dest_ip, port } => (dest_ip, *port),
            Destination::DeviceFile {
                relay_ip,
                relay_port,
                ..
            } => (relay_ip, *relay_port),
        }
    }

    pub fn locator(&self) -> StreamLocator {
        match self {
            Destination::Network { dest_ip, port } => StreamLocator::Udp {
                url: format!("udp://{}:{}", dest_ip, port),
            },
            Destination::DeviceFile { path, .. } => StreamLocator::DeviceFile { path: path.clone() },
        }
    }

    /// Device file to check for usage, if any.
    pub fn device_path(&self) -> Option<&PathBuf> {
        match self {
            Destination::Network { .. } => None,
            Destination::DeviceFile { path, .. } => Some(path),
        }
    }
}

/// A tuner instance with its globally stable index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TunerSlot {
    pub index: usize,
    pub device: usize,
    pub instance: u32,
    pub delivery: DeliveryMode,
    pub destination: Destination,
}

/// Ordered devices and the flattened tuner list.
///
/// Immutable for the lifetime of the process.
#[derive(Debug, Clone)]
pub struct DeviceRegistry {
    devices: Vec<Device>,
    tuners: Vec<TunerSlot>,
}

impl DeviceRegistry {
    /// Build the registry, querying each device once for its host connection type.
    pub async fn discover(
        config: &RegistryConfig,
        backend: &dyn CetonBackend,
    ) -> Result<Self, SetupError> {
        if config.devices.is_empty() || config.devices.iter().any(|d| d.address.trim().is_empty()) {
            return Err(SetupError::NoDeviceAddress);
        }

        let mut devices = Vec::with_capacity(config.devices.len());
        let mut tuners = Vec::new();
        let mut pcie_ordinal = 0usize;

        for (ordinal, device_config) in config.devices.iter().enumerate() {
            if device_config.tuners == 0 {
                return Err(SetupError::NoTuners {
                    address: device_config.address.clone(),
                });
            }

            let host_connection = backend
                .get_var(&device_config.address, 0, TunerVar::HostConnection)
                .await
                .map_err(|source| SetupError::HardwareUnreachable {
                    address: device_config.address.clone(),
                    source,
                })?;
            let delivery = DeliveryMode::from_host_connection(&host_connection);
            info!(
                "Ceton hardware type at {}: {} ({:?}, {} tuners)",
                device_config.address, host_connection, delivery, device_config.tuners
            );

            let pcie_address = match delivery {
                DeliveryMode::DirectFile => Some(
                    device_config
                        .pcie_address
                        .clone()
                        .filter(|a| !a.trim().is_empty())
                        .ok_or_else(|| SetupError::MissingPcieAddress {
                            address: device_config.address.clone(),
                        })?,
                ),
                DeliveryMode::Network => None,
            };

            for instance in 0..device_config.tuners {
                let index = tuners.len();
                let destination = match &pcie_address {
                    Some(relay_ip) => Destination::DeviceFile {
                        path: PathBuf::from(format!(
                            "{}{}_{}",
                            config.device_path_prefix, pcie_ordinal, instance
                        )),
                        relay_ip: relay_ip.clone(),
                        relay_port: port_at(config.pcie_base_port, instance as usize)
                            .ok_or(SetupError::PortOutOfRange { index })?,
                    },
                    None => Destination::Network {
                        dest_ip: config.host_address.clone(),
                        port: port_at(config.stream_base_port, index)
                            .ok_or(SetupError::PortOutOfRange { index })?,
                    },
                };

                tuners.push(TunerSlot {
                    index,
                    device: ordinal,
                    instance,
                    delivery,
                    destination,
                });
            }

            if delivery == DeliveryMode::DirectFile {
                pcie_ordinal += 1;
            }

            devices.push(Device {
                ordinal,
                address: device_config.address.clone(),
                host_connection,
                delivery,
                tuner_count: device_config.tuners,
            });
        }

        Ok(Self { devices, tuners })
    }

    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    pub fn tuners(&self) -> &[TunerSlot] {
        &self.tuners
    }

    pub fn tuner(&self, index: usize) -> Option<&TunerSlot> {
        self.tuners.get(index)
    }

    pub fn device(&self, ordinal: usize) -> Option<&Device> {
        self.devices.get(ordinal)
    }

    /// Device hosting the given tuner.
    pub fn device_of(&self, slot: &TunerSlot) -> &Device {
        &self.devices[slot.device]
    }

    pub fn tuner_count(&self) -> usize {
        self.tuners.len()
    }
}

fn port_at(base: u16, offset: usize) -> Option<u16> {
    u16::try_from(base as usize + offset).ok()
}
