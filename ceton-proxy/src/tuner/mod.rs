//! Tuner arbitration.
//!
//! This module provides:
//! - [`Allocator`]: serialized scan, select and start of free tuners
//! - [`table`]: per-tuner status, signal and stream context
//! - [`probe`]: live reads of tuner variables and device file usage
//! - [`dispatch`]: start/stop and tune requests

pub mod allocator;
pub mod dispatch;
pub mod probe;
pub mod table;

pub use allocator::{AllocateError, AllocationOutcome, Allocator, ReleaseError};
