use crate::{
    Result,
    constants::{
        DISPLAY_PRIMARY_I2C_ADDRESS, DISPLAY_SECONDARY_I2C_ADDRESS, MAX_UID_LENGTH,
        MIN_UID_LENGTH, MUX_CHANNEL_COUNT, MUX_I2C_ADDRESS, READER_I2C_ADDRESS, TRACKS_PER_READER,
    },
    error::Error,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Multiplexer output channel (0-7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BusChannel(u8);

impl BusChannel {
    /// Create a new bus channel with validation.
    ///
    /// # Errors
    /// Returns `Error::InvalidChannel` if the channel is outside 0-7.
    pub fn new(channel: u8) -> Result<Self> {
        if channel >= MUX_CHANNEL_COUNT {
            return Err(Error::InvalidChannel(channel));
        }
        Ok(BusChannel(channel))
    }

    /// Get the raw channel number as u8.
    #[must_use]
    pub fn index(self) -> u8 {
        self.0
    }

    /// The single-bit byte written to the multiplexer to route this channel.
    #[must_use]
    pub fn selector_byte(self) -> u8 {
        1 << self.0
    }

    /// Iterate every valid channel in ascending order.
    pub fn all() -> impl Iterator<Item = BusChannel> {
        (0..MUX_CHANNEL_COUNT).map(BusChannel)
    }
}

impl fmt::Display for BusChannel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for BusChannel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let channel: u8 = s
            .parse()
            .map_err(|_| Error::Config(format!("Invalid bus channel: {s}")))?;
        BusChannel::new(channel)
    }
}

/// Position of a reader in the discovered topology (ascending channel order).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ReaderIndex(u8);

impl ReaderIndex {
    /// Create a reader index. Assigned by discovery; any value is structurally valid.
    #[must_use]
    pub const fn new(index: u8) -> Self {
        ReaderIndex(index)
    }

    /// Get the raw index as u8.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self.0
    }

    /// Get the index as usize for arena addressing.
    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ReaderIndex {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Clip track identifier on the remote launching surface.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct TrackId(u16);

impl TrackId {
    /// Create a track identifier.
    #[must_use]
    pub const fn new(track: u16) -> Self {
        TrackId(track)
    }

    /// Get the raw track number as u16.
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self.0
    }

    /// Get the track number as i32 for wire encoding.
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self.0 as i32
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Clip identifier within a track. Defaults to slot 0, the only clip fired.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct ClipId(u16);

impl ClipId {
    /// Create a clip identifier.
    #[must_use]
    pub const fn new(clip: u16) -> Self {
        ClipId(clip)
    }

    /// Get the raw clip number as u16.
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self.0
    }

    /// Get the clip number as i32 for wire encoding.
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self.0 as i32
    }
}

impl fmt::Display for ClipId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Slot within a reader's track group (0-5), the token a tag UID resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClipSlot(u8);

impl ClipSlot {
    /// Create a clip slot with validation.
    ///
    /// # Errors
    /// Returns `Error::InvalidSlot` if the slot is outside 0-5.
    pub fn new(slot: u8) -> Result<Self> {
        if slot >= TRACKS_PER_READER {
            return Err(Error::InvalidSlot(slot));
        }
        Ok(ClipSlot(slot))
    }

    /// Get the raw slot number as u8.
    #[must_use]
    pub fn index(self) -> u8 {
        self.0
    }
}

impl fmt::Display for ClipSlot {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The 6-track window owned by one reader index.
///
/// Derived from the index, never stored: reader `i` owns tracks
/// `[6i, 6i + 5]`. Reader 0 controls tracks 0-5, reader 1 controls 6-11,
/// and so on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackGroup {
    reader: ReaderIndex,
}

impl TrackGroup {
    /// The track group for a reader index.
    #[must_use]
    pub const fn for_reader(reader: ReaderIndex) -> Self {
        TrackGroup { reader }
    }

    /// The owning reader index.
    #[must_use]
    pub const fn reader(self) -> ReaderIndex {
        self.reader
    }

    /// First track in the group.
    #[must_use]
    pub fn first(self) -> TrackId {
        TrackId(self.reader.as_u8() as u16 * TRACKS_PER_READER as u16)
    }

    /// Last track in the group.
    #[must_use]
    pub fn last(self) -> TrackId {
        TrackId(self.first().as_u16() + TRACKS_PER_READER as u16 - 1)
    }

    /// Iterate every track in the group in ascending order.
    pub fn tracks(self) -> impl Iterator<Item = TrackId> {
        (self.first().as_u16()..=self.last().as_u16()).map(TrackId)
    }

    /// The track a clip slot resolves to inside this group.
    #[must_use]
    pub fn track_for(self, slot: ClipSlot) -> TrackId {
        TrackId(self.first().as_u16() + slot.index() as u16)
    }

    /// Returns `true` if the track falls inside this group.
    #[must_use]
    pub fn contains(self, track: TrackId) -> bool {
        (self.first()..=self.last()).contains(&track)
    }

    /// The clip slot a track occupies inside this group, or `None` if the
    /// track belongs to another reader.
    ///
    /// Inverse of [`TrackGroup::track_for`].
    #[must_use]
    pub fn slot_for(self, track: TrackId) -> Option<ClipSlot> {
        if !self.contains(track) {
            return None;
        }
        let offset = (track.as_u16() - self.first().as_u16()) as u8;
        ClipSlot::new(offset).ok()
    }
}

impl fmt::Display for TrackGroup {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}-{}", self.first(), self.last())
    }
}

/// Tag UID as a lowercase hex string (4-10 bytes).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TagUid(String);

impl TagUid {
    /// Parse a UID from its hex representation.
    ///
    /// The input is normalized (trimmed, lowercased) before validation.
    ///
    /// # Errors
    /// Returns `Error::InvalidUid` if:
    /// - The string is not valid hex or has odd length
    /// - The encoded UID is shorter than 4 or longer than 10 bytes
    pub fn parse(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase();

        if normalized.is_empty() || normalized.len() % 2 != 0 {
            return Err(Error::InvalidUid(format!(
                "hex string must have even length, got {:?}",
                s
            )));
        }
        if !normalized.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(Error::InvalidUid(format!("not a hex string: {:?}", s)));
        }

        let byte_len = normalized.len() / 2;
        if !(MIN_UID_LENGTH..=MAX_UID_LENGTH).contains(&byte_len) {
            return Err(Error::InvalidUid(format!(
                "UID must be {MIN_UID_LENGTH}-{MAX_UID_LENGTH} bytes, got {byte_len}"
            )));
        }

        Ok(TagUid(normalized))
    }

    /// Build a UID from raw bytes.
    ///
    /// # Errors
    /// Returns `Error::InvalidUid` if the byte count is outside 4-10.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let len = bytes.len();
        if !(MIN_UID_LENGTH..=MAX_UID_LENGTH).contains(&len) {
            return Err(Error::InvalidUid(format!(
                "UID must be {MIN_UID_LENGTH}-{MAX_UID_LENGTH} bytes, got {len}"
            )));
        }
        let hex: String = bytes.iter().map(|b| format!("{:02x}", b)).collect();
        Ok(TagUid(hex))
    }

    /// Get the UID as its lowercase hex string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decode the UID back into raw bytes.
    ///
    /// Inverse of [`TagUid::from_bytes`]; the stored string is always
    /// valid even-length hex, so decoding cannot fail.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        (0..self.0.len())
            .step_by(2)
            .filter_map(|i| u8::from_str_radix(&self.0[i..i + 2], 16).ok())
            .collect()
    }

    /// UID length in bytes.
    #[must_use]
    pub fn byte_len(&self) -> usize {
        self.0.len() / 2
    }
}

impl fmt::Display for TagUid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TagUid {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        TagUid::parse(s)
    }
}

/// Which of the two display strap addresses a display answers on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayAddress {
    Primary,
    Secondary,
}

impl DisplayAddress {
    /// Resolve a display strap from its bus address, if it is one.
    #[inline]
    #[must_use]
    pub fn from_address(address: u8) -> Option<Self> {
        match address {
            DISPLAY_PRIMARY_I2C_ADDRESS => Some(DisplayAddress::Primary),
            DISPLAY_SECONDARY_I2C_ADDRESS => Some(DisplayAddress::Secondary),
            _ => None,
        }
    }

    /// The bus address this strap answers on.
    #[inline]
    #[must_use]
    pub fn address(self) -> u8 {
        match self {
            DisplayAddress::Primary => DISPLAY_PRIMARY_I2C_ADDRESS,
            DisplayAddress::Secondary => DISPLAY_SECONDARY_I2C_ADDRESS,
        }
    }
}

impl fmt::Display for DisplayAddress {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DisplayAddress::Primary => write!(f, "primary"),
            DisplayAddress::Secondary => write!(f, "secondary"),
        }
    }
}

/// Classification of a device address observed during discovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceClass {
    /// NFC tag reader.
    TagReader,
    /// Status display on one of its two strap addresses.
    Display(DisplayAddress),
    /// The multiplexer itself, visible on every channel.
    Multiplexer,
    /// An address not in the known device set.
    Unknown(u8),
}

impl DeviceClass {
    /// Classify a bus address against the known device set.
    #[must_use]
    pub fn classify(address: u8) -> Self {
        if address == READER_I2C_ADDRESS {
            DeviceClass::TagReader
        } else if let Some(strap) = DisplayAddress::from_address(address) {
            DeviceClass::Display(strap)
        } else if address == MUX_I2C_ADDRESS {
            DeviceClass::Multiplexer
        } else {
            DeviceClass::Unknown(address)
        }
    }

    /// Returns `true` if this is a tag reader.
    #[inline]
    #[must_use]
    pub fn is_reader(self) -> bool {
        matches!(self, DeviceClass::TagReader)
    }

    /// Returns `true` if this is a display.
    #[inline]
    #[must_use]
    pub fn is_display(self) -> bool {
        matches!(self, DeviceClass::Display(_))
    }

    /// Returns `true` if the address matched no known device.
    #[inline]
    #[must_use]
    pub fn is_unknown(self) -> bool {
        matches!(self, DeviceClass::Unknown(_))
    }
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DeviceClass::TagReader => write!(f, "tag reader"),
            DeviceClass::Display(strap) => write!(f, "display ({strap})"),
            DeviceClass::Multiplexer => write!(f, "multiplexer"),
            DeviceClass::Unknown(address) => write!(f, "unknown (0x{address:02x})"),
        }
    }
}
