//! Hardware layer for the multiplexed tag-reader rig.
//!
//! This crate owns everything between raw I2C traffic and the session loop:
//! the shared bus behind the channel multiplexer, reader link drivers with
//! their wake and framing protocol, channel discovery, and the text screen
//! model for the per-reader displays.
//!
//! # Design Philosophy
//!
//! - **Async-first**: All I/O operations are asynchronous using native
//!   `async fn` in traits (Rust 1.90 + Edition 2024 RPITIT).
//! - **One bus, many devices**: Every reader answers at the same address;
//!   the [`SharedBus`] routes by multiplexer channel and nothing below it
//!   caches routing state.
//! - **Degrade, don't die**: A dead reader or display takes itself out of
//!   the rotation; the rest of the rig keeps playing.
//!
//! # Bus Access
//!
//! The [`I2cBus`] trait is the seam between this crate and the platform.
//! Everything above it is generic, so the mock segment and a real bus run
//! the same code:
//!
//! ```no_run
//! use tagcue_core::Result;
//! use tagcue_hardware::bus::SharedBus;
//! use tagcue_hardware::discovery::{Topology, scan_channels};
//! use tagcue_hardware::traits::I2cBus;
//!
//! async fn bring_up<B: I2cBus>(raw: B) -> Result<Topology> {
//!     let mut bus = SharedBus::new(raw);
//!     let scans = scan_channels(&mut bus).await?;
//!     Ok(Topology::from_scans(&scans))
//! }
//! ```
//!
//! # Reader Links
//!
//! A [`ReaderLink`] drives one reader's frame protocol and tracks its wake
//! state and health. The caller selects the channel; the link never touches
//! the multiplexer:
//!
//! ```no_run
//! use tagcue_core::Result;
//! use tagcue_hardware::bus::SharedBus;
//! use tagcue_hardware::link::ReaderLink;
//! use tagcue_hardware::traits::I2cBus;
//!
//! async fn poll_one<B: I2cBus>(bus: &mut SharedBus<B>, link: &mut ReaderLink) -> Result<()> {
//!     bus.select(3).await?;
//!     if let Some(target) = link.read_passive_target(bus).await {
//!         println!("tag {}", target.uid);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Mock Hardware
//!
//! The [`mock`] module simulates the full segment down to the reader frame
//! protocol, so session logic is testable without a rig on the desk.

pub mod bus;
pub mod devices;
pub mod discovery;
pub mod display;
pub mod link;
pub mod mock;
pub mod traits;

// Re-export commonly used types for convenience
pub use bus::SharedBus;
pub use devices::{DeviceRegistry, DisplayHandle, ReaderHandle};
pub use discovery::{ChannelScan, ReaderSlot, Topology, scan_channels};
pub use display::{Screen, ScreenLine, VirtualPanel, render};
pub use link::{LinkConfig, LinkHealth, LinkState, ReaderLink};
pub use traits::{I2cBus, RenderSink};
