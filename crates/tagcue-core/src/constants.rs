//! Shared constants for the multiplexed reader bus.
//!
//! This module centralizes every fixed address, wire byte, and timing floor
//! used across the workspace: the I2C addresses of the multiplexer and the
//! devices behind it, the reader link framing bytes, the track layout owned
//! by each reader, and the delays that pace discovery and polling.
//!
//! # Bus layout
//!
//! One physical I2C segment carries an 8-channel multiplexer at a fixed
//! address. Selecting channel `n` is a single-byte write of `1 << n` to the
//! multiplexer; afterwards the devices on that channel are reachable at their
//! own addresses as if they sat on a private bus:
//!
//! ```text
//! host ──┬── multiplexer (0x70)
//!        ├── channel 0: reader (0x24), display (0x3C)
//!        ├── channel 1: reader (0x24), display (0x3D)
//!        └── ...
//! ```
//!
//! Because every channel exposes the same reader address, channel selection is
//! the only thing distinguishing one reader from another. All timing constants
//! are lower bounds taken from the device datasheet behavior; raising them is
//! safe, lowering them is not.

// ============================================================================
// Bus Addressing
// ============================================================================

/// I2C address of the 8-channel bus multiplexer.
///
/// The multiplexer sits on the root segment and therefore answers on every
/// channel scan; discovery classifies it and skips it.
pub const MUX_I2C_ADDRESS: u8 = 0x70;

/// Number of output channels on the multiplexer.
///
/// Channel identifiers are `0..MUX_CHANNEL_COUNT`; anything larger must never
/// reach the wire.
///
/// # Examples
///
/// ```
/// use tagcue_core::constants::MUX_CHANNEL_COUNT;
///
/// let selector = 1u8 << (MUX_CHANNEL_COUNT - 1);
/// assert_eq!(selector, 0b1000_0000);
/// ```
pub const MUX_CHANNEL_COUNT: u8 = 8;

/// I2C address of an NFC tag reader on its channel.
pub const READER_I2C_ADDRESS: u8 = 0x24;

/// I2C address of a status display (primary strap option).
pub const DISPLAY_PRIMARY_I2C_ADDRESS: u8 = 0x3C;

/// I2C address of a status display (secondary strap option).
pub const DISPLAY_SECONDARY_I2C_ADDRESS: u8 = 0x3D;

// ============================================================================
// Track Layout
// ============================================================================

/// Number of clip tracks owned by each reader.
///
/// Reader index `i` owns tracks `[6i, 6i + 5]`; the mapping table resolves a
/// tag to a slot inside that window.
///
/// # Examples
///
/// ```
/// use tagcue_core::constants::TRACKS_PER_READER;
///
/// let reader_index = 2u16;
/// let first_track = reader_index * TRACKS_PER_READER as u16;
/// assert_eq!(first_track, 12);
/// ```
pub const TRACKS_PER_READER: u8 = 6;

// ============================================================================
// Reader Link Framing
// ============================================================================

/// Leading byte of every link frame.
pub const FRAME_PREAMBLE: u8 = 0x00;

/// Two-byte start code following the preamble.
pub const FRAME_START_CODE: [u8; 2] = [0x00, 0xFF];

/// Trailing byte of every link frame.
///
/// Fixed-length reads frequently truncate the postamble; parsers must not
/// require it.
pub const FRAME_POSTAMBLE: u8 = 0x00;

/// Framing bytes around the body of an information frame.
///
/// Preamble (1) + start code (2) + length (1) + length checksum (1) +
/// data checksum (1) + postamble (1).
pub const FRAME_OVERHEAD: usize = 7;

/// Direction byte for frames sent host → reader.
pub const DIRECTION_HOST_TO_READER: u8 = 0xD4;

/// Direction byte for frames sent reader → host.
pub const DIRECTION_READER_TO_HOST: u8 = 0xD5;

/// The fixed acknowledgement frame a reader emits after accepting a command.
pub const ACK_FRAME: [u8; 6] = [0x00, 0x00, 0xFF, 0x00, 0xFF, 0x00];

/// Status byte a reader returns once a frame is available.
///
/// Until the reader is ready it returns other values (usually 0x00 or
/// garbage); readiness polling compares against this sentinel only.
pub const READY_SENTINEL: u8 = 0x01;

/// 17-byte preamble that wakes a reader out of low-power mode.
pub const WAKE_PREAMBLE: [u8; 17] = [
    0x55, 0x55, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00,
];

/// Minimum tag UID length in bytes.
pub const MIN_UID_LENGTH: usize = 4;

/// Maximum tag UID length in bytes.
pub const MAX_UID_LENGTH: usize = 10;

// ============================================================================
// Timing
// ============================================================================

/// Settle delay after switching multiplexer channels, in milliseconds.
///
/// Discovery waits this long after each select before scanning so the newly
/// routed channel has stabilized.
pub const CHANNEL_SETTLE_DELAY_MS: u64 = 100;

/// Delay after asserting a reader's reset line, in milliseconds.
pub const WAKE_RESET_DELAY_MS: u64 = 10;

/// Delay after transmitting the wake preamble, in milliseconds.
pub const WAKE_PREAMBLE_DELAY_MS: u64 = 100;

/// Interval between readiness polls, in milliseconds.
///
/// Readiness polling is bounded by wall-clock timeout, not attempt count;
/// this interval only paces the bus traffic.
pub const READY_POLL_INTERVAL_MS: u64 = 10;

/// Default deadline for a tag-detection readiness wait, in milliseconds.
///
/// A reader with no tag in its field simply never becomes ready, so this
/// value is also the per-reader cost of an idle poll cycle.
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 50;

/// Default deadline for command exchanges outside tag detection
/// (self-configuration, firmware query), in milliseconds.
pub const DEFAULT_COMMAND_TIMEOUT_MS: u64 = 1000;

/// Delay between poll cycles of the main loop, in milliseconds.
pub const CYCLE_DELAY_MS: u64 = 100;

// ============================================================================
// Link Health
// ============================================================================

/// Consecutive link failures after which a reader is annotated as degraded.
///
/// Readiness timeouts do not count; an idle reader times out on every
/// cycle. Only bus, busy, and write failures feed this threshold.
pub const LINK_DEGRADED_THRESHOLD: u32 = 3;

// ============================================================================
// Display Geometry
// ============================================================================

/// Display width in pixels.
pub const DISPLAY_WIDTH_PX: usize = 128;

/// Display height in pixels.
pub const DISPLAY_HEIGHT_PX: usize = 64;

/// Vertical offset between rendered text lines, in pixels.
pub const DISPLAY_LINE_HEIGHT_PX: usize = 10;

/// Width of one rendered character cell, in pixels.
pub const DISPLAY_CHAR_WIDTH_PX: usize = 8;

/// Number of addressable text lines on a display.
///
/// # Examples
///
/// ```
/// use tagcue_core::constants::{DISPLAY_HEIGHT_PX, DISPLAY_LINE_COUNT, DISPLAY_LINE_HEIGHT_PX};
///
/// assert_eq!(DISPLAY_LINE_COUNT, DISPLAY_HEIGHT_PX / DISPLAY_LINE_HEIGHT_PX);
/// ```
pub const DISPLAY_LINE_COUNT: usize = DISPLAY_HEIGHT_PX / DISPLAY_LINE_HEIGHT_PX;

/// Number of characters that fit on one display line.
pub const DISPLAY_COLUMNS: usize = DISPLAY_WIDTH_PX / DISPLAY_CHAR_WIDTH_PX;
