//! Channel discovery and reader/display pairing.
//!
//! At startup the multiplexer is walked channel by channel: select, settle,
//! scan, classify. The resulting per-channel inventories are folded into a
//! [`Topology`] that pairs each reader with a display and assigns the track
//! layout.
//!
//! Pairing is positional, not physical: readers in ascending channel order
//! are zipped with displays in ascending channel order, so the reader on
//! the lowest channel gets index 0 and the display on the lowest channel,
//! regardless of whether the two share a channel. Extra readers run without
//! a display; extra displays are recorded and left dark.

use crate::{bus::SharedBus, traits::I2cBus};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tagcue_core::{
    Result,
    constants::CHANNEL_SETTLE_DELAY_MS,
    types::{BusChannel, DeviceClass, DisplayAddress, ReaderIndex, TrackGroup},
};
use tokio::time::{Duration, sleep};
use tracing::{debug, info, warn};

/// Classified inventory of one multiplexer channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelScan {
    /// Channel that was routed for this scan.
    pub channel: BusChannel,

    /// Addresses that acknowledged, with their classification.
    pub devices: Vec<(u8, DeviceClass)>,
}

impl ChannelScan {
    /// Whether a reader answered on this channel.
    #[must_use]
    pub fn has_reader(&self) -> bool {
        self.devices.iter().any(|(_, class)| class.is_reader())
    }

    /// The display strap that answered on this channel, if any.
    #[must_use]
    pub fn display_strap(&self) -> Option<DisplayAddress> {
        self.devices.iter().find_map(|(_, class)| match class {
            DeviceClass::Display(strap) => Some(*strap),
            _ => None,
        })
    }

    /// Addresses that match no known device class.
    #[must_use]
    pub fn unknown_addresses(&self) -> Vec<u8> {
        self.devices
            .iter()
            .filter(|(_, class)| class.is_unknown())
            .map(|(address, _)| *address)
            .collect()
    }
}

/// Walk every multiplexer channel and classify what answers.
///
/// Each channel is selected, allowed to settle, then scanned. Unknown
/// addresses are logged and kept in the scan so callers can surface them.
///
/// # Errors
/// Propagates the first select or scan failure; a bus that cannot complete
/// discovery is not usable for the session either.
pub async fn scan_channels<B: I2cBus>(bus: &mut SharedBus<B>) -> Result<Vec<ChannelScan>> {
    let mut scans = Vec::with_capacity(usize::from(tagcue_core::constants::MUX_CHANNEL_COUNT));
    for channel in BusChannel::all() {
        bus.select_channel(channel).await?;
        sleep(Duration::from_millis(CHANNEL_SETTLE_DELAY_MS)).await;

        let addresses = bus.scan().await?;
        let devices: Vec<(u8, DeviceClass)> = addresses
            .iter()
            .map(|&address| (address, DeviceClass::classify(address)))
            .collect();

        for (address, class) in &devices {
            match class {
                DeviceClass::Unknown(_) => {
                    warn!("Unknown device 0x{:02x} on channel {}", address, channel);
                }
                _ => debug!("Found {} on channel {}", class, channel),
            }
        }
        scans.push(ChannelScan { channel, devices });
    }
    Ok(scans)
}

/// One reader position in the discovered topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReaderSlot {
    /// Position in ascending reader-channel order; decides the track group.
    pub index: ReaderIndex,

    /// Channel the reader answers on.
    pub reader_channel: BusChannel,

    /// Channel of the paired display, if one was available.
    pub display_channel: Option<BusChannel>,
}

impl ReaderSlot {
    /// Track window owned by this reader.
    #[must_use]
    pub fn track_group(&self) -> TrackGroup {
        TrackGroup::for_reader(self.index)
    }
}

/// Discovered arrangement of readers and displays across the multiplexer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topology {
    slots: Vec<ReaderSlot>,
    displays: BTreeMap<BusChannel, DisplayAddress>,
    unused_displays: Vec<BusChannel>,
}

impl Topology {
    /// Fold channel scans into reader slots and display pairings.
    #[must_use]
    pub fn from_scans(scans: &[ChannelScan]) -> Self {
        let mut reader_channels: Vec<BusChannel> = scans
            .iter()
            .filter(|scan| scan.has_reader())
            .map(|scan| scan.channel)
            .collect();
        reader_channels.sort_unstable();

        let displays: BTreeMap<BusChannel, DisplayAddress> = scans
            .iter()
            .filter_map(|scan| scan.display_strap().map(|strap| (scan.channel, strap)))
            .collect();
        let display_channels: Vec<BusChannel> = displays.keys().copied().collect();

        let slots: Vec<ReaderSlot> = reader_channels
            .iter()
            .enumerate()
            .map(|(i, &reader_channel)| ReaderSlot {
                index: ReaderIndex::new(i as u8),
                reader_channel,
                display_channel: display_channels.get(i).copied(),
            })
            .collect();
        let unused_displays = display_channels
            .get(slots.len()..)
            .unwrap_or_default()
            .to_vec();

        for slot in &slots {
            match slot.display_channel {
                Some(display_channel) => info!(
                    "Reader {} on channel {} paired with display on channel {}, tracks {}",
                    slot.index,
                    slot.reader_channel,
                    display_channel,
                    slot.track_group()
                ),
                None => info!(
                    "Reader {} on channel {} running without a display, tracks {}",
                    slot.index,
                    slot.reader_channel,
                    slot.track_group()
                ),
            }
        }
        for channel in &unused_displays {
            warn!("Display on channel {} has no reader to serve", channel);
        }

        Topology {
            slots,
            displays,
            unused_displays,
        }
    }

    /// Reader slots in ascending channel order.
    #[must_use]
    pub fn slots(&self) -> &[ReaderSlot] {
        &self.slots
    }

    /// Number of readers found.
    #[must_use]
    pub fn reader_count(&self) -> usize {
        self.slots.len()
    }

    /// Number of displays found, paired or not.
    #[must_use]
    pub fn display_count(&self) -> usize {
        self.displays.len()
    }

    /// Display channels left without a reader.
    #[must_use]
    pub fn unused_displays(&self) -> &[BusChannel] {
        &self.unused_displays
    }

    /// The strap address of the display on `channel`, if one was found.
    #[must_use]
    pub fn display_strap(&self, channel: BusChannel) -> Option<DisplayAddress> {
        self.displays.get(&channel).copied()
    }

    /// True when no readers were discovered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
