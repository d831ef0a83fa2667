//! OSC control transport for the tag-reader rig.
//!
//! Encodes the two clip control messages as OSC 1.0 packets and ships
//! them over UDP:
//!
//! - `/live/clip/fire <track:i32> <clip:i32>` when a mapped tag lands
//! - `/live/track/stop_all_clips <track:i32>` for every track being held
//!   silent
//!
//! [`OscClient`] implements the session crate's `ControlSink`, so it slots
//! straight into a `SessionRunner`. The transport is fire-and-forget by
//! contract: the session loop re-asserts stops every idle cycle, which is
//! all the delivery guarantee the surface needs.

pub mod client;
pub mod encode;

pub use client::{DEFAULT_OSC_PORT, OscClient, OscClientConfig};
