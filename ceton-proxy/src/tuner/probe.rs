//! Hardware probe: live tuner variables and device file usage.

use std::sync::Arc;

use log::debug;

use ceton_protocol::{
    DeliveryMode, DeviceSnapshot, ProbeError, SignalInfo, TransportState, TunerVar,
};

use crate::device::DeviceRegistry;
use crate::hardware::{CetonBackend, DeviceUsage};

/// Reads tuner state from the hardware.
///
/// Probe failures surface as `None` fields (unknown), never as a stopped tuner.
#[derive(Clone)]
pub struct HardwareProbe {
    registry: Arc<DeviceRegistry>,
    backend: Arc<dyn CetonBackend>,
    usage: Arc<dyn DeviceUsage>,
}

impl HardwareProbe {
    pub fn new(
        registry: Arc<DeviceRegistry>,
        backend: Arc<dyn CetonBackend>,
        usage: Arc<dyn DeviceUsage>,
    ) -> Self {
        Self {
            registry,
            backend,
            usage,
        }
    }

    /// Read one variable of a tuner.
    pub async fn probe(&self, index: usize, var: TunerVar) -> Result<String, ProbeError> {
        let slot = self
            .registry
            .tuner(index)
            .ok_or(ProbeError::UnknownTuner(index))?;
        let device = self.registry.device_of(slot);
        self.backend.get_var(&device.address, slot.instance, var).await
    }

    /// Whether a tuner's device file is held open by some process.
    ///
    /// Always false for network relay tuners.
    pub async fn is_device_busy(&self, index: usize) -> bool {
        let Some(slot) = self.registry.tuner(index) else {
            return false;
        };
        match slot.destination.device_path() {
            Some(path) if slot.delivery == DeliveryMode::DirectFile => {
                let busy = self.usage.is_busy(path).await;
                debug!("Ceton tuner {} device {} busy={}", index, path.display(), busy);
                busy
            }
            _ => false,
        }
    }

    /// Usage check result for the status table: `None` for network tuners.
    pub async fn device_busy_state(&self, index: usize) -> Option<bool> {
        match self.registry.tuner(index)?.delivery {
            DeliveryMode::DirectFile => Some(self.is_device_busy(index).await),
            DeliveryMode::Network => None,
        }
    }

    /// Read transport state and signal metrics of a tuner.
    pub async fn read_signal(&self, index: usize) -> SignalInfo {
        let (transport, channel, level, snr, ber, modulation, carrier_lock, pcr_lock) = tokio::join!(
            self.probe(index, TunerVar::TransportState),
            self.probe(index, TunerVar::SignalChannel),
            self.probe(index, TunerVar::SignalLevel),
            self.probe(index, TunerVar::SignalSnr),
            self.probe(index, TunerVar::SignalBer),
            self.probe(index, TunerVar::SignalModulation),
            self.probe(index, TunerVar::SignalCarrierLock),
            self.probe(index, TunerVar::SignalPcrLock),
        );

        SignalInfo {
            transport: transport.ok().map(|v| TransportState::from_var(&v)),
            channel: channel.ok(),
            level: level.ok(),
            snr: snr.ok(),
            ber: ber.ok(),
            modulation: modulation.ok(),
            carrier_lock: carrier_lock.ok(),
            pcr_lock: pcr_lock.ok(),
        }
    }

    /// Read identity and health variables of a device.
    pub async fn device_info(&self, ordinal: usize) -> Option<DeviceSnapshot> {
        let device = self.registry.device(ordinal)?;
        let address = device.address.as_str();
        let (temperature, hardware_revision, firmware, serial) = tokio::join!(
            self.backend.get_var(address, 0, TunerVar::Temperature),
            self.backend.get_var(address, 0, TunerVar::HostHardware),
            self.backend.get_var(address, 0, TunerVar::HostFirmware),
            self.backend.get_var(address, 0, TunerVar::HostSerial),
        );

        Some(DeviceSnapshot {
            address: device.address.clone(),
            host_connection: device.host_connection.clone(),
            delivery: Some(device.delivery),
            tuner_count: device.tuner_count,
            temperature: temperature.ok(),
            hardware_revision: hardware_revision.ok(),
            firmware: firmware.ok(),
            serial: serial.ok(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{DeviceConfig, RegistryConfig};
    use crate::hardware::fake::{FakeBackend, FakeUsage};

    async fn setup(host_connection: &str) -> (HardwareProbe, Arc<FakeBackend>, Arc<FakeUsage>) {
        let backend = Arc::new(FakeBackend::new().with_device("10.0.0.2", host_connection));
        let usage = Arc::new(FakeUsage::new());
        let config = RegistryConfig {
            devices: vec![DeviceConfig {
                address: "10.0.0.2".to_string(),
                tuners: 2,
                pcie_address: Some("192.168.200.2".to_string()),
            }],
            ..RegistryConfig::default()
        };
        let registry = Arc::new(DeviceRegistry::discover(&config, backend.as_ref()).await.unwrap());
        let probe = HardwareProbe::new(registry, backend.clone(), usage.clone());
        (probe, backend, usage)
    }

    #[tokio::test]
    async fn test_probe_unknown_tuner() {
        let (probe, _, _) = setup("usb").await;
        assert_eq!(
            probe.probe(9, TunerVar::TransportState).await,
            Err(ProbeError::UnknownTuner(9))
        );
    }

    #[tokio::test]
    async fn test_read_signal_degrades_to_unknown() {
        let (probe, backend, _) = setup("usb").await;

        let signal = probe.read_signal(0).await;
        assert_eq!(signal.transport, Some(TransportState::Stopped));
        assert_eq!(signal.level.as_deref(), Some("-2.5 dBmV"));

        backend.set_unreadable("10.0.0.2", 0, true);
        let signal = probe.read_signal(0).await;
        assert_eq!(signal, SignalInfo::default());
        assert!(probe.probe(0, TunerVar::TransportState).await.is_err());
    }

    #[tokio::test]
    async fn test_network_tuner_skips_usage_check() {
        let (probe, _, usage) = setup("usb").await;
        usage.set_busy("/dev/ceton/ctn91xx_mpeg0_0", true);

        assert!(!probe.is_device_busy(0).await);
        assert_eq!(probe.device_busy_state(0).await, None);
        assert_eq!(usage.checks(), 0);
    }

    #[tokio::test]
    async fn test_pcie_tuner_usage_check() {
        let (probe, _, usage) = setup("pci").await;
        usage.set_busy("/dev/ceton/ctn91xx_mpeg0_1", true);

        assert!(!probe.is_device_busy(0).await);
        assert!(probe.is_device_busy(1).await);
        assert_eq!(probe.device_busy_state(1).await, Some(true));
    }

    #[tokio::test]
    async fn test_device_info() {
        let (probe, _, _) = setup("usb").await;
        let info = probe.device_info(0).await.unwrap();
        assert_eq!(info.host_connection, "usb");
        assert_eq!(info.tuner_count, 2);
        assert_eq!(info.temperature.as_deref(), Some("52 C"));
        assert!(probe.device_info(3).await.is_none());
    }
}
