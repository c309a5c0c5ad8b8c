//! Shared definitions for the Ceton tuner arbiter.
//!
//! This crate holds everything that both the `ceton-proxy` server and its
//! clients need to agree on:
//!
//! - [`TunerStatus`]: the allocation state of a tuner
//! - [`TunerVar`]: the `get_var` selector table of the device web interface
//! - [`StreamLocator`]: where a caller picks up an allocated stream
//! - REST request/response bodies ([`StreamRequestBody`], [`StreamGrant`])
//! - [`channel_map`]: decoding of the paginated XML channel map
//!
//! ```rust
//! use ceton_protocol::{extract_var_value, TransportState, TunerVar};
//!
//! let body = "<body class=\"get\">STOPPED</body>";
//! let value = extract_var_value(body).unwrap();
//! assert!(TransportState::from_var(value).is_stopped());
//! assert_eq!(TunerVar::TransportState.query(), "&s=av&v=TransportState");
//! ```

pub mod channel_map;
pub mod error;
pub mod types;

pub use channel_map::{ChannelEntry, ChannelPage};
pub use error::{ChannelMapError, DispatchError, ProbeError, SetupError};
pub use types::{
    extract_var_value, ApiErrorBody, DeliveryMode, DeviceSnapshot, SignalInfo, StreamGrant,
    StreamLocator, StreamRequestBody, TransportState, TunerSnapshot, TunerStatus, TunerVar,
    TRANSPORT_STOPPED,
};
