//! Bus and display trait definitions.
//!
//! These traits establish the contract between the session loop and the
//! physical rig: a shared I2C bus behind the channel multiplexer, and the
//! per-reader status displays. They enable substitution between the
//! emulated rig and real hardware drivers.
//!
//! All traits use native `async fn` methods (Rust 1.90 + Edition 2024
//! RPITIT), eliminating the need for the `async_trait` macro.

#![allow(async_fn_in_trait)]

use tagcue_core::Result;

/// Raw I2C bus access.
///
/// One bus instance serves the whole rig; the multiplexer routes it to a
/// single downstream channel at a time. Implementations model the bus
/// transactions only, not the devices behind them.
///
/// # Object Safety and Dynamic Dispatch
///
/// **NOTE**: This trait is NOT object-safe because `async fn` methods
/// return `impl Future` (Edition 2024 RPITIT). Use generic type parameters:
///
/// ```no_run
/// use tagcue_hardware::traits::I2cBus;
/// use tagcue_core::Result;
///
/// async fn probe<B: I2cBus>(bus: &mut B) -> Result<bool> {
///     let addresses = bus.scan().await?;
///     Ok(addresses.contains(&0x24))
/// }
/// ```
pub trait I2cBus: Send + Sync {
    /// Write bytes to a device address.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The address does not acknowledge
    /// - The transmission fails mid-transfer
    async fn write(&mut self, address: u8, bytes: &[u8]) -> Result<()>;

    /// Read `count` bytes from a device address.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The address does not acknowledge
    /// - The transmission fails mid-transfer
    async fn read(&mut self, address: u8, count: usize) -> Result<Vec<u8>>;

    /// Scan for devices that acknowledge on the currently routed channel.
    ///
    /// Returns the responding addresses in ascending order.
    ///
    /// # Errors
    ///
    /// Returns an error if the bus itself fails; an empty channel is a
    /// successful empty scan.
    async fn scan(&mut self) -> Result<Vec<u8>>;
}

/// Output surface for a status display.
///
/// Render calls follow a fixed shape: `clear`, zero or more `draw_text`
/// calls, then `present` to flush the staged content. Nothing staged is
/// visible until `present` completes.
///
/// # Object Safety and Dynamic Dispatch
///
/// Like [`I2cBus`], this trait is not object-safe; use generic type
/// parameters.
pub trait RenderSink: Send + Sync {
    /// Clear the staged content.
    ///
    /// # Errors
    ///
    /// Returns an error if the display does not respond.
    async fn clear(&mut self) -> Result<()>;

    /// Stage a line of text with its top-left corner at pixel `(x, y)`.
    ///
    /// Text wider than the surface is clipped at the right edge.
    ///
    /// # Errors
    ///
    /// Returns an error if the display does not respond.
    async fn draw_text(&mut self, x: usize, y: usize, text: &str) -> Result<()>;

    /// Flush the staged content to the surface.
    ///
    /// # Errors
    ///
    /// Returns an error if the display does not respond.
    async fn present(&mut self) -> Result<()>;
}
