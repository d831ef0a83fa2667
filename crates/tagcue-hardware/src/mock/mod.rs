//! Mock device implementations for testing and development.
//!
//! This module provides a simulated I2C segment (multiplexer, readers,
//! displays) that can be controlled programmatically without physical
//! hardware. The bus half plugs into anything generic over the hardware
//! traits; the paired handle injects tags and faults and inspects traffic.

pub mod bus;
pub mod display;

// Re-export commonly used types
pub use bus::{MockBus, MockBusHandle};
pub use display::{MockDisplay, MockDisplayHandle};
