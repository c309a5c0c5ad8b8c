//! Command dispatcher: start/stop and tune requests.

use std::sync::Arc;

use log::{debug, error, info};

use ceton_protocol::{DeliveryMode, DispatchError, StreamLocator};

use crate::device::DeviceRegistry;
use crate::hardware::{CetonBackend, ChannelControl, StreamControl};

/// RTP over UDP.
const STREAM_PROTOCOL: u8 = 0;

/// Translates allocation decisions into device requests.
#[derive(Clone)]
pub struct CommandDispatcher {
    registry: Arc<DeviceRegistry>,
    backend: Arc<dyn CetonBackend>,
}

impl CommandDispatcher {
    pub fn new(registry: Arc<DeviceRegistry>, backend: Arc<dyn CetonBackend>) -> Self {
        Self { registry, backend }
    }

    /// Start or stop streaming on a tuner and return its stream locator.
    ///
    /// Stopping is always sent. Starting a PCIe tuner is not: the stream
    /// request would hold the card's device file, which the caller reads
    /// directly.
    pub async fn start_stop(&self, index: usize, start: bool) -> Result<StreamLocator, DispatchError> {
        let slot = self
            .registry
            .tuner(index)
            .ok_or(DispatchError::UnknownTuner(index))?;
        let device = self.registry.device_of(slot);
        let locator = slot.destination.locator();

        if start {
            info!("Ceton tuner {} to be started", index);
        } else {
            info!("Ceton tuner {} to be stopped", index);
        }

        if start && slot.delivery == DeliveryMode::DirectFile {
            debug!("Ceton tuner {} is PCIe, stream request skipped on start", index);
            return Ok(locator);
        }

        let (dest_ip, dest_port) = slot.destination.relay();
        let control = StreamControl {
            instance_id: slot.instance,
            dest_ip: dest_ip.to_string(),
            dest_port,
            protocol: STREAM_PROTOCOL,
            start: u8::from(start),
        };

        self.backend
            .stream_request(&device.address, &control)
            .await
            .map_err(|e| {
                error!("Error while setting station stream on tuner {}: {}", index, e);
                e
            })?;

        Ok(locator)
    }

    /// Tune a tuner to a virtual channel.
    pub async fn tune(&self, index: usize, channel: u32) -> Result<(), DispatchError> {
        let slot = self
            .registry
            .tuner(index)
            .ok_or(DispatchError::UnknownTuner(index))?;
        let device = self.registry.device_of(slot);

        let control = ChannelControl {
            instance_id: slot.instance,
            channel,
        };

        self.backend
            .channel_request(&device.address, &control)
            .await
            .map_err(|e| {
                error!("Error while tuning tuner {} to channel {}: {}", index, channel, e);
                e
            })
    }
}
