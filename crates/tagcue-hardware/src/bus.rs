//! Multiplexed bus access.
//!
//! All rig devices share one I2C bus behind an 8-channel multiplexer. The
//! multiplexer routes the bus to whichever downstream channel was last
//! written into its control register; devices on other channels are
//! unreachable until the next select.

use crate::traits::I2cBus;
use tagcue_core::{
    BusChannel, Error, Result,
    constants::{MUX_CHANNEL_COUNT, MUX_I2C_ADDRESS},
};
use tracing::trace;

/// The shared bus and its multiplexer.
///
/// Wraps a raw [`I2cBus`] with channel selection. Selection is not cached:
/// every select transmits, matching the arbiter semantics the session loop
/// depends on after a reader power cycle.
#[derive(Debug)]
pub struct SharedBus<B> {
    inner: B,
    selected: Option<u8>,
}

impl<B: I2cBus> SharedBus<B> {
    /// Wrap a raw bus.
    pub fn new(inner: B) -> Self {
        SharedBus {
            inner,
            selected: None,
        }
    }

    /// Route the bus to a downstream channel.
    ///
    /// Channels 8 and above are accepted and ignored: the call succeeds
    /// without touching the bus. The multiplexer has no such outputs and
    /// writing a shifted-out selector would disconnect every channel.
    ///
    /// # Errors
    /// Returns `Error::Bus` if the selector write is not acknowledged.
    pub async fn select(&mut self, channel: u8) -> Result<()> {
        if channel >= MUX_CHANNEL_COUNT {
            trace!("Ignoring select of channel {} outside mux range", channel);
            return Ok(());
        }
        self.inner
            .write(MUX_I2C_ADDRESS, &[1u8 << channel])
            .await
            .map_err(|e| Error::bus(format!("channel {channel} select failed: {e}")))?;
        self.selected = Some(channel);
        Ok(())
    }

    /// Route the bus to a validated channel.
    ///
    /// # Errors
    /// Returns `Error::Bus` if the selector write is not acknowledged.
    pub async fn select_channel(&mut self, channel: BusChannel) -> Result<()> {
        self.select(channel.index()).await
    }

    /// The channel the last successful select routed to, if any.
    #[must_use]
    pub fn selected(&self) -> Option<u8> {
        self.selected
    }

    /// Write bytes to a device on the routed channel.
    ///
    /// # Errors
    /// Propagates the underlying bus error.
    pub async fn write(&mut self, address: u8, bytes: &[u8]) -> Result<()> {
        self.inner.write(address, bytes).await
    }

    /// Read bytes from a device on the routed channel.
    ///
    /// # Errors
    /// Propagates the underlying bus error.
    pub async fn read(&mut self, address: u8, count: usize) -> Result<Vec<u8>> {
        self.inner.read(address, count).await
    }

    /// Scan the routed channel for responding addresses.
    ///
    /// # Errors
    /// Propagates the underlying bus error.
    pub async fn scan(&mut self) -> Result<Vec<u8>> {
        self.inner.scan().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockBus;
    use proptest::prelude::*;
    use tagcue_core::constants::READER_I2C_ADDRESS;

    #[tokio::test]
    async fn test_select_writes_selector_byte() {
        let (raw, handle) = MockBus::new();
        let mut bus = SharedBus::new(raw);

        bus.select(3).await.unwrap();
        assert_eq!(bus.selected(), Some(3));
        assert_eq!(handle.selector_writes().await, vec![0x08]);

        bus.select(0).await.unwrap();
        assert_eq!(handle.selector_writes().await, vec![0x08, 0x01]);
    }

    #[tokio::test]
    async fn test_select_does_not_cache() {
        let (raw, handle) = MockBus::new();
        let mut bus = SharedBus::new(raw);

        bus.select(5).await.unwrap();
        bus.select(5).await.unwrap();
        assert_eq!(handle.selector_writes().await, vec![0x20, 0x20]);
    }

    #[tokio::test]
    async fn test_select_failure_is_bus_error() {
        let (raw, handle) = MockBus::new();
        handle.fail_writes(MUX_I2C_ADDRESS, 1).await;
        let mut bus = SharedBus::new(raw);

        let err = bus.select(2).await.unwrap_err();
        assert!(matches!(err, Error::Bus(_)));
        assert_eq!(bus.selected(), None);
    }

    #[tokio::test]
    async fn test_device_ops_pass_through() {
        let (raw, handle) = MockBus::new();
        handle.add_reader(1).await;
        let mut bus = SharedBus::new(raw);

        bus.select(1).await.unwrap();
        bus.write(READER_I2C_ADDRESS, &[0x55, 0x55]).await.unwrap();
        assert_eq!(
            handle.writes_to(READER_I2C_ADDRESS).await,
            vec![vec![0x55, 0x55]]
        );
    }

    proptest! {
        /// Selecting any channel past the multiplexer range succeeds
        /// without any bus transmission.
        #[test]
        fn prop_out_of_range_select_never_transmits(channel in 8u8..=255) {
            let rt = tokio::runtime::Builder::new_current_thread()
                .build()
                .unwrap();
            rt.block_on(async {
                let (raw, handle) = MockBus::new();
                let mut bus = SharedBus::new(raw);

                bus.select(channel).await.unwrap();

                prop_assert_eq!(bus.selected(), None);
                prop_assert_eq!(handle.write_count().await, 0);
                Ok(())
            })?;
        }
    }
}
