//! Type definitions shared between the arbiter and its clients.

use std::fmt;
use std::path::PathBuf;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Transport state reported by a tuner that is not streaming.
pub const TRANSPORT_STOPPED: &str = "STOPPED";

/// Allocation status of a tuner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TunerStatus {
    /// Free and confirmed stopped.
    Inactive,
    /// Allocated by this process and streaming.
    Active,
    /// Stop issued, not yet confirmed by the hardware.
    StopPending,
    /// Driven by something other than this process.
    External,
}

impl TunerStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TunerStatus::Inactive => "Inactive",
            TunerStatus::Active => "Active",
            TunerStatus::StopPending => "StopPending",
            TunerStatus::External => "External",
        }
    }
}

impl fmt::Display for TunerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a device delivers its transport stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMode {
    /// RTP/UDP relay to a network address.
    Network,
    /// Local device special file (PCIe cards).
    DirectFile,
}

impl DeliveryMode {
    /// Classify a device from its `HostConnection` variable.
    pub fn from_host_connection(host_connection: &str) -> Self {
        if host_connection.to_ascii_lowercase().contains("pci") {
            DeliveryMode::DirectFile
        } else {
            DeliveryMode::Network
        }
    }
}

/// Variables readable through the device `get_var` endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TunerVar {
    Frequency,
    ProgramNumber,
    CopyProtectionStatus,
    Temperature,
    SignalChannel,
    SignalLevel,
    SignalSnr,
    SignalBer,
    SignalModulation,
    TransportState,
    HostConnection,
    HostSerial,
    HostFirmware,
    HostHardware,
    SignalCarrierLock,
    SignalPcrLock,
    OobStatus,
}

impl TunerVar {
    /// Section/variable query fragment appended after the instance number.
    pub fn query(self) -> &'static str {
        match self {
            TunerVar::Frequency => "&s=tuner&v=Frequency",
            TunerVar::ProgramNumber => "&s=mux&v=ProgramNumber",
            TunerVar::CopyProtectionStatus => "&s=diag&v=CopyProtectionStatus",
            TunerVar::Temperature => "&s=diag&v=Temperature",
            TunerVar::SignalChannel => "&s=diag&v=Signal_Channel",
            TunerVar::SignalLevel => "&s=diag&v=Signal_Level",
            TunerVar::SignalSnr => "&s=diag&v=Signal_SNR",
            TunerVar::SignalBer => "&s=tuner&v=BER",
            TunerVar::SignalModulation => "&s=tuner&v=Modulation",
            TunerVar::TransportState => "&s=av&v=TransportState",
            TunerVar::HostConnection => "&s=diag&v=Host_Connection",
            TunerVar::HostSerial => "&s=diag&v=Host_Serial_Number",
            TunerVar::HostFirmware => "&s=diag&v=Host_Firmware",
            TunerVar::HostHardware => "&s=diag&v=Hardware_Revision",
            TunerVar::SignalCarrierLock => "&s=diag&v=Signal_Carrier_Lock",
            TunerVar::SignalPcrLock => "&s=diag&v=Signal_PCR_Lock",
            TunerVar::OobStatus => "&s=diag&v=OOB_Status",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            TunerVar::Frequency => "Frequency",
            TunerVar::ProgramNumber => "ProgramNumber",
            TunerVar::CopyProtectionStatus => "CopyProtectionStatus",
            TunerVar::Temperature => "Temperature",
            TunerVar::SignalChannel => "Signal_Channel",
            TunerVar::SignalLevel => "Signal_Level",
            TunerVar::SignalSnr => "Signal_SNR",
            TunerVar::SignalBer => "Signal_BER",
            TunerVar::SignalModulation => "Signal_Modulation",
            TunerVar::TransportState => "TransportState",
            TunerVar::HostConnection => "HostConnection",
            TunerVar::HostSerial => "HostSerial",
            TunerVar::HostFirmware => "HostFirmware",
            TunerVar::HostHardware => "HostHardware",
            TunerVar::SignalCarrierLock => "SignalCarrierLock",
            TunerVar::SignalPcrLock => "SignalPCRLock",
            TunerVar::OobStatus => "OOBStatus",
        }
    }
}

impl fmt::Display for TunerVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Extract the value of a `get_var` response body.
///
/// Returns `None` when the marker/terminator pair is missing.
pub fn extract_var_value(body: &str) -> Option<&str> {
    static VALUE_RE: OnceLock<Regex> = OnceLock::new();
    let re = VALUE_RE.get_or_init(|| Regex::new(r"get.>(.*)</body").expect("static regex"));
    re.captures(body)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
}

/// Transport state of a tuner as last reported by the hardware.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "raw", rename_all = "snake_case")]
pub enum TransportState {
    Stopped,
    Running(String),
}

impl TransportState {
    pub fn from_var(value: &str) -> Self {
        if value.trim() == TRANSPORT_STOPPED {
            TransportState::Stopped
        } else {
            TransportState::Running(value.trim().to_string())
        }
    }

    pub fn is_stopped(&self) -> bool {
        matches!(self, TransportState::Stopped)
    }
}

/// Last probed signal metrics of a tuner. Advisory only.
///
/// `None` means the value was unknown at the last probe.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalInfo {
    pub transport: Option<TransportState>,
    pub channel: Option<String>,
    pub level: Option<String>,
    pub snr: Option<String>,
    pub ber: Option<String>,
    pub modulation: Option<String>,
    pub carrier_lock: Option<String>,
    pub pcr_lock: Option<String>,
}

/// Where a caller can pick up an allocated stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StreamLocator {
    /// Network relay, e.g. `udp://192.168.1.10:41001`.
    Udp { url: String },
    /// Direct device file, e.g. `/dev/ceton/ctn91xx_mpeg0_2`.
    DeviceFile { path: PathBuf },
}

impl fmt::Display for StreamLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamLocator::Udp { url } => f.write_str(url),
            StreamLocator::DeviceFile { path } => write!(f, "{}", path.display()),
        }
    }
}

/// Read-only view of one tuner for presentation layers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TunerSnapshot {
    pub index: usize,
    pub device_address: String,
    pub instance: u32,
    pub delivery: DeliveryMode,
    pub status: TunerStatus,
    pub destination: String,
    pub device_busy: Option<bool>,
    pub signal: SignalInfo,
    pub stream_args: Option<serde_json::Value>,
}

/// Read-only view of one device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSnapshot {
    pub address: String,
    pub host_connection: String,
    pub delivery: Option<DeliveryMode>,
    pub tuner_count: u32,
    pub temperature: Option<String>,
    pub hardware_revision: Option<String>,
    pub firmware: Option<String>,
    pub serial: Option<String>,
}

/// Body of a stream request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamRequestBody {
    /// Virtual channel number to tune.
    pub channel: u32,
    /// Opaque caller context, echoed back in status snapshots.
    #[serde(default)]
    pub context: Option<serde_json::Value>,
}

/// Successful stream allocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamGrant {
    pub tuner: usize,
    pub locator: StreamLocator,
}

/// Error body returned by the REST API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub success: bool,
    pub error: String,
}
