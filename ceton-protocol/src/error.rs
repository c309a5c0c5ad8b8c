//! Error types shared by the Ceton arbiter and its clients.

use thiserror::Error;

/// Fatal configuration or topology errors detected while starting up.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SetupError {
    /// No device address was configured.
    #[error("Ceton IP not set")]
    NoDeviceAddress,

    /// A device reports a PCIe host connection but no PCIe relay address is configured.
    #[error("Ceton PCIe IP not set for device {address}")]
    MissingPcieAddress { address: String },

    /// A tuner's stream destination port does not fit in 16 bits.
    #[error("Destination port for tuner {index} is out of range")]
    PortOutOfRange { index: usize },

    /// A device is configured with zero tuners.
    #[error("Device {address} has no tuners configured")]
    NoTuners { address: String },

    /// The host connection type could not be read from a device.
    #[error("Device {address} unreachable: {source}")]
    HardwareUnreachable {
        address: String,
        #[source]
        source: ProbeError,
    },
}

/// Failure to read a hardware variable from a tuner.
///
/// A probe error means the value is unknown. It must never be read as "stopped".
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    /// The HTTP request failed or timed out.
    #[error("Error while getting Ceton tuner variable for {var}: {reason}")]
    Transport { var: String, reason: String },

    /// The device answered with a non-success status.
    #[error("Ceton tuner variable {var} returned HTTP {status}")]
    Status { var: String, status: u16 },

    /// The response did not contain the expected value fragment.
    #[error("Unparseable response for Ceton tuner variable {var}")]
    Unparseable { var: String },

    /// The tuner index does not exist.
    #[error("Unknown tuner index: {0}")]
    UnknownTuner(usize),
}

/// Failure to deliver a start/stop or tune command to a device.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// The HTTP request failed or timed out.
    #[error("Request to {endpoint} failed: {reason}")]
    Transport { endpoint: String, reason: String },

    /// The device answered with a non-success status.
    #[error("Request to {endpoint} returned HTTP {status}")]
    Status { endpoint: String, status: u16 },

    /// The tuner index does not exist.
    #[error("Unknown tuner index: {0}")]
    UnknownTuner(usize),
}

/// Failure while collecting the channel map.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChannelMapError {
    /// The channel map page could not be fetched.
    #[error("Error while getting channel map page {page}: {reason}")]
    Transport { page: u32, reason: String },

    /// The channel count was not present on the summary page.
    #[error("Channel count not found in channel map summary")]
    MissingCount,

    /// The XML document could not be parsed.
    #[error("Invalid channel map XML: {0}")]
    Xml(String),

    /// A channel name was not valid base64-encoded ASCII.
    #[error("Invalid channel name for channel {number}: {reason}")]
    Name { number: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setup_error_display() {
        assert_eq!(SetupError::NoDeviceAddress.to_string(), "Ceton IP not set");

        let err = SetupError::HardwareUnreachable {
            address: "192.168.200.1".to_string(),
            source: ProbeError::Unparseable {
                var: "HostConnection".to_string(),
            },
        };
        assert!(err.to_string().contains("192.168.200.1"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
