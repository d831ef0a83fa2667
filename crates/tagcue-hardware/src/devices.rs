//! Per-reader device handles and the registry that owns them.
//!
//! The registry is built once from a discovered [`Topology`] and owns the
//! link driver and display sink for every reader slot. Readers and their
//! displays live in parallel vectors indexed by reader position, so the
//! poll loop can borrow a reader and its display together.

use crate::{
    bus::SharedBus,
    discovery::Topology,
    link::{LinkConfig, ReaderLink},
    traits::{I2cBus, RenderSink},
};
use tagcue_core::types::{BusChannel, DisplayAddress, ReaderIndex, TrackGroup};
use tagcue_protocol::FirmwareVersion;
use tracing::{info, warn};

/// One reader with its link driver.
#[derive(Debug)]
pub struct ReaderHandle {
    /// Position in the topology; decides the track group.
    pub index: ReaderIndex,

    /// Channel the reader answers on.
    pub channel: BusChannel,

    /// Link driver carrying wake state and health.
    pub link: ReaderLink,

    /// Firmware identification, populated on first successful wake.
    pub firmware: Option<FirmwareVersion>,
}

impl ReaderHandle {
    /// Track window owned by this reader.
    #[must_use]
    pub fn track_group(&self) -> TrackGroup {
        TrackGroup::for_reader(self.index)
    }
}

/// One display with its render sink.
#[derive(Debug)]
pub struct DisplayHandle<S> {
    /// Channel the display answers on.
    pub channel: BusChannel,

    /// Strap address the display was found at.
    pub strap: DisplayAddress,

    /// Sink that draws to the panel.
    pub sink: S,
}

/// Owns every reader and display handle for the session.
#[derive(Debug)]
pub struct DeviceRegistry<S> {
    readers: Vec<ReaderHandle>,
    displays: Vec<Option<DisplayHandle<S>>>,
}

impl<S: RenderSink> DeviceRegistry<S> {
    /// Build handles for every slot in the topology.
    ///
    /// `make_sink` is called once per paired display, in slot order.
    pub fn from_topology<F>(topology: &Topology, config: LinkConfig, mut make_sink: F) -> Self
    where
        F: FnMut(BusChannel, DisplayAddress) -> S,
    {
        let mut readers = Vec::with_capacity(topology.reader_count());
        let mut displays = Vec::with_capacity(topology.reader_count());
        for slot in topology.slots() {
            readers.push(ReaderHandle {
                index: slot.index,
                channel: slot.reader_channel,
                link: ReaderLink::new(config),
                firmware: None,
            });
            displays.push(slot.display_channel.and_then(|channel| {
                topology.display_strap(channel).map(|strap| DisplayHandle {
                    channel,
                    strap,
                    sink: make_sink(channel, strap),
                })
            }));
        }
        DeviceRegistry { readers, displays }
    }

    /// Number of reader slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.readers.len()
    }

    /// True when the registry holds no readers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.readers.is_empty()
    }

    /// Reader handles in slot order.
    #[must_use]
    pub fn readers(&self) -> &[ReaderHandle] {
        &self.readers
    }

    /// Borrow a reader and its display together.
    pub fn pair_mut(
        &mut self,
        index: usize,
    ) -> Option<(&mut ReaderHandle, Option<&mut DisplayHandle<S>>)> {
        let reader = self.readers.get_mut(index)?;
        let display = self.displays.get_mut(index).and_then(Option::as_mut);
        Some((reader, display))
    }

    /// Wake every reader and query its firmware.
    ///
    /// Failures are logged and skipped; a reader that stays powered down
    /// is retried by the poll loop. Returns the number of awake readers.
    pub async fn wake_all<B: I2cBus>(&mut self, bus: &mut SharedBus<B>) -> usize {
        let mut awake = 0;
        for reader in &mut self.readers {
            if let Err(e) = bus.select_channel(reader.channel).await {
                warn!("Reader {} channel select failed: {}", reader.index, e);
                continue;
            }
            match reader.link.wake(bus).await {
                Ok(()) => {
                    awake += 1;
                    match reader.link.firmware_version(bus).await {
                        Ok(firmware) => {
                            info!("Reader {} firmware {}", reader.index, firmware);
                            reader.firmware = Some(firmware);
                        }
                        Err(e) => warn!("Reader {} firmware query failed: {}", reader.index, e),
                    }
                }
                Err(e) => warn!("Reader {} wake failed: {}", reader.index, e),
            }
        }
        awake
    }
}
