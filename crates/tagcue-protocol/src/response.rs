//! Typed decoding of response payloads.
//!
//! The frame layer hands back raw payload bytes; this module turns the two
//! payloads the session cares about into structured values.

use serde::{Deserialize, Serialize};
use std::fmt;
use tagcue_core::{Error, Result, TagUid};

/// A tag found by `InListPassiveTarget`.
///
/// Payload layout after the response code:
///
/// ```text
/// [targets, target_num, SENS_RES hi, SENS_RES lo, SEL_RES, uid_len, UID...]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassiveTarget {
    /// ATQA bytes from target detection.
    pub sens_res: [u8; 2],

    /// SAK byte from target selection.
    pub sel_res: u8,

    /// The tag UID.
    pub uid: TagUid,
}

/// Parse an `InListPassiveTarget` response payload.
///
/// # Errors
/// Returns `Error::Busy` if the payload is too short, reports a target
/// count other than one, or carries a UID outside the supported length
/// range. Callers polling for tags downgrade these to "no tag".
pub fn parse_passive_target(payload: &[u8]) -> Result<PassiveTarget> {
    if payload.len() < 6 {
        return Err(Error::busy(format!(
            "target listing too short: {} bytes",
            payload.len()
        )));
    }
    if payload[0] != 0x01 {
        return Err(Error::busy(format!(
            "expected exactly one target, got {}",
            payload[0]
        )));
    }

    let uid_len = payload[5] as usize;
    if payload.len() < 6 + uid_len {
        return Err(Error::busy(format!(
            "target listing truncated: UID needs {uid_len} bytes"
        )));
    }
    let uid = TagUid::from_bytes(&payload[6..6 + uid_len])
        .map_err(|e| Error::busy(format!("bad target UID: {e}")))?;

    Ok(PassiveTarget {
        sens_res: [payload[2], payload[3]],
        sel_res: payload[4],
        uid,
    })
}

/// Firmware identification returned by `GetFirmwareVersion`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirmwareVersion {
    /// IC identifier (0x32 for the supported reader family).
    pub ic: u8,

    /// Major firmware version.
    pub version: u8,

    /// Firmware revision.
    pub revision: u8,

    /// Supported protocol bitfield.
    pub support: u8,
}

/// Parse a `GetFirmwareVersion` response payload.
///
/// # Errors
/// Returns `Error::Busy` if the payload is not exactly four bytes.
pub fn parse_firmware_version(payload: &[u8]) -> Result<FirmwareVersion> {
    if payload.len() != 4 {
        return Err(Error::busy(format!(
            "firmware response must be 4 bytes, got {}",
            payload.len()
        )));
    }
    Ok(FirmwareVersion {
        ic: payload[0],
        version: payload[1],
        revision: payload[2],
        support: payload[3],
    })
}

impl fmt::Display for FirmwareVersion {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}.{} (IC 0x{:02x})", self.version, self.revision, self.ic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_parse_single_target() {
        // One ISO14443A target: ATQA 0x0044, SAK 0x00, 4-byte UID.
        let payload = [
            0x01, 0x01, 0x00, 0x44, 0x00, 0x04, 0x33, 0xC2, 0x9C, 0x92,
        ];
        let target = parse_passive_target(&payload).unwrap();
        assert_eq!(target.uid.as_str(), "33c29c92");
        assert_eq!(target.sens_res, [0x00, 0x44]);
        assert_eq!(target.sel_res, 0x00);
    }

    #[test]
    fn test_parse_seven_byte_uid() {
        let payload = [
            0x01, 0x01, 0x00, 0x44, 0x00, 0x07, 0x04, 0xA2, 0x24, 0xB2, 0xC3, 0x5E, 0x80,
        ];
        let target = parse_passive_target(&payload).unwrap();
        assert_eq!(target.uid.as_str(), "04a224b2c35e80");
        assert_eq!(target.uid.byte_len(), 7);
    }

    #[test]
    fn test_parse_trailing_pad_ignored() {
        // Fixed-length reads pad the listing out to the maximum UID size.
        let payload = [
            0x01, 0x01, 0x00, 0x44, 0x00, 0x04, 0x33, 0xC2, 0x9C, 0x92, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00,
        ];
        let target = parse_passive_target(&payload).unwrap();
        assert_eq!(target.uid.as_str(), "33c29c92");
    }

    #[rstest]
    #[case(&[] as &[u8])]
    #[case(&[0x01, 0x01, 0x00])] // shorter than the fixed header
    #[case(&[0x00, 0x01, 0x00, 0x44, 0x00, 0x04, 0x33, 0xC2, 0x9C, 0x92])] // zero targets
    #[case(&[0x02, 0x01, 0x00, 0x44, 0x00, 0x04, 0x33, 0xC2, 0x9C, 0x92])] // two targets
    #[case(&[0x01, 0x01, 0x00, 0x44, 0x00, 0x08, 0x33, 0xC2, 0x9C, 0x92])] // UID length past end
    #[case(&[0x01, 0x01, 0x00, 0x44, 0x00, 0x02, 0x33, 0xC2])] // UID too short to be valid
    fn test_parse_target_invalid(#[case] payload: &[u8]) {
        assert!(parse_passive_target(payload).is_err());
    }

    #[test]
    fn test_parse_firmware_version() {
        let version = parse_firmware_version(&[0x32, 0x01, 0x06, 0x07]).unwrap();
        assert_eq!(version.ic, 0x32);
        assert_eq!(version.version, 1);
        assert_eq!(version.revision, 6);
        assert_eq!(version.to_string(), "1.6 (IC 0x32)");
    }

    #[test]
    fn test_parse_firmware_wrong_length() {
        assert!(parse_firmware_version(&[0x32, 0x01]).is_err());
        assert!(parse_firmware_version(&[0x32, 0x01, 0x06, 0x07, 0x00]).is_err());
    }
}
