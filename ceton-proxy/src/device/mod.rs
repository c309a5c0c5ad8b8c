//! Device topology.

pub mod registry;

pub use registry::{
    DeviceConfig, DeviceRegistry, RegistryConfig, TunerSlot, DEFAULT_DEVICE_PATH_PREFIX,
    DEFAULT_PCIE_BASE_PORT, DEFAULT_STREAM_BASE_PORT,
};
