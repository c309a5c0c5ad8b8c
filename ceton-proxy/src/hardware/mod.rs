//! Access to Ceton devices and the host OS.
//!
//! This module provides:
//! - [`CetonBackend`]: the device web interface (`get_var`, stream and channel control, channel map)
//! - [`DeviceUsage`]: OS-level check whether a tuner's device file is held open
//! - [`HttpBackend`] and [`FuserUsage`]: the production implementations

pub mod fuser;
pub mod http;

#[cfg(test)]
pub mod fake;

use std::path::Path;

use async_trait::async_trait;
use serde::Serialize;

use ceton_protocol::{ChannelMapError, DispatchError, ProbeError, TunerVar};

pub use fuser::FuserUsage;
pub use http::HttpBackend;

/// Form fields posted to `stream_request.cgi`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamControl {
    pub instance_id: u32,
    pub dest_ip: String,
    pub dest_port: u16,
    pub protocol: u8,
    pub start: u8,
}

/// Form fields posted to `channel_request.cgi`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelControl {
    pub instance_id: u32,
    pub channel: u32,
}

/// Device web interface of a Ceton tuner.
///
/// Every call is a single request with no retry. `address` is the device
/// host, optionally with a port.
#[async_trait]
pub trait CetonBackend: Send + Sync {
    /// Read one variable of a tuner instance.
    async fn get_var(&self, address: &str, instance: u32, var: TunerVar) -> Result<String, ProbeError>;

    /// Start or stop streaming on a tuner instance.
    async fn stream_request(&self, address: &str, control: &StreamControl) -> Result<(), DispatchError>;

    /// Tune a tuner instance to a virtual channel.
    async fn channel_request(&self, address: &str, control: &ChannelControl) -> Result<(), DispatchError>;

    /// Fetch one page of the channel map, either the HTML summary or the XML listing.
    async fn channel_map_page(&self, address: &str, page: u32, xml: bool) -> Result<String, ChannelMapError>;
}

/// OS-level device file usage check.
#[async_trait]
pub trait DeviceUsage: Send + Sync {
    /// Returns true if any process holds `path` open.
    async fn is_busy(&self, path: &Path) -> bool;
}
