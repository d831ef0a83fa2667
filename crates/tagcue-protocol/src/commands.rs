//! Command definitions for the reader link protocol.
//!
//! Readers accept single-byte command codes carried inside information
//! frames. A reader answers a command `n` with a response frame whose code
//! is `n + 1`; the codes here are always the host-side command values.
//!
//! # Command Set
//!
//! Only the commands the session loop actually issues are modeled:
//! - `GetFirmwareVersion` (0x02): Query IC type and firmware revision
//! - `SamConfiguration` (0x14): Configure the secure access module; part
//!   of every wake sequence
//! - `InListPassiveTarget` (0x4A): Poll for a tag in the RF field
//!
//! # Usage
//!
//! ```
//! use tagcue_protocol::Command;
//!
//! let cmd = Command::InListPassiveTarget;
//! assert_eq!(cmd.code(), 0x4A);
//! assert_eq!(cmd.response_code(), 0x4B);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use tagcue_core::{Error, Result};

/// SAM configuration: normal mode, no virtual card.
pub const SAM_MODE_NORMAL: u8 = 0x01;

/// SAM timeout field in 50ms units. 0x14 = one second.
pub const SAM_TIMEOUT_UNITS: u8 = 0x14;

/// SAM configured to drive the IRQ pin.
pub const SAM_USE_IRQ: u8 = 0x01;

/// Poll for at most one target per listing.
pub const INLIST_MAX_TARGETS: u8 = 0x01;

/// Baud rate selector for ISO14443 Type A at 106 kbps.
pub const BAUD_ISO14443A: u8 = 0x00;

/// Command codes understood by the reader link.
///
/// # Examples
///
/// ```
/// use tagcue_protocol::Command;
///
/// let cmd = Command::from_code(0x14).unwrap();
/// assert_eq!(cmd, Command::SamConfiguration);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    GetFirmwareVersion,  // 0x02
    SamConfiguration,    // 0x14
    InListPassiveTarget, // 0x4A
}

impl Command {
    /// The wire code for this command.
    #[inline]
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Command::GetFirmwareVersion => 0x02,
            Command::SamConfiguration => 0x14,
            Command::InListPassiveTarget => 0x4A,
        }
    }

    /// The code a reader echoes in its response frame.
    #[inline]
    #[must_use]
    pub const fn response_code(self) -> u8 {
        self.code() + 1
    }

    /// Resolve a command from its wire code.
    ///
    /// # Errors
    /// Returns `Error::Busy` for codes outside the modeled command set.
    pub fn from_code(code: u8) -> Result<Self> {
        match code {
            0x02 => Ok(Command::GetFirmwareVersion),
            0x14 => Ok(Command::SamConfiguration),
            0x4A => Ok(Command::InListPassiveTarget),
            _ => Err(Error::busy(format!("unknown command code 0x{code:02x}"))),
        }
    }

    /// The canonical parameter bytes the session loop sends with this command.
    ///
    /// `GetFirmwareVersion` takes no parameters. The SAM and polling
    /// parameters are fixed; nothing in the session varies them.
    #[must_use]
    pub fn default_params(self) -> &'static [u8] {
        match self {
            Command::GetFirmwareVersion => &[],
            Command::SamConfiguration => &[SAM_MODE_NORMAL, SAM_TIMEOUT_UNITS, SAM_USE_IRQ],
            Command::InListPassiveTarget => &[INLIST_MAX_TARGETS, BAUD_ISO14443A],
        }
    }

    /// Expected response payload length in bytes, excluding direction and
    /// code bytes.
    ///
    /// Used to size the fixed-length read for the response frame. The
    /// passive target length covers the largest supported UID.
    #[must_use]
    pub const fn response_payload_len(self) -> usize {
        match self {
            Command::GetFirmwareVersion => 4,
            Command::SamConfiguration => 0,
            Command::InListPassiveTarget => 17,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Command::GetFirmwareVersion => "GetFirmwareVersion",
            Command::SamConfiguration => "SamConfiguration",
            Command::InListPassiveTarget => "InListPassiveTarget",
        };
        write!(f, "{name} (0x{:02x})", self.code())
    }
}
