//! Byte-level framing for the reader link.
//!
//! Every command and response travels inside an information frame:
//!
//! ```text
//! 00 | 00 FF | LEN | LCS | TFI | DATA... | DCS | 00
//! ^^   ^^^^^   ^^^   ^^^   ^^^             ^^^   ^^
//! preamble     length      direction       data  postamble
//!      start   checksum    byte            checksum
//!      code
//! ```
//!
//! - `LEN` counts the body bytes (direction byte + command/response code +
//!   payload); `LCS` is its two's complement, so `LEN + LCS ≡ 0 (mod 256)`
//! - `TFI` is `0xD4` host → reader, `0xD5` reader → host
//! - `DCS` is the two's complement of the body sum, so the body plus `DCS`
//!   sums to zero mod 256
//!
//! Acknowledgement is a fixed 6-byte frame with a zero-length body:
//! `00 00 FF 00 FF 00`.
//!
//! # Parsing Tolerance
//!
//! Responses arrive over fixed-length reads sized from the expected payload.
//! A reader may emit extra leading `0x00` bytes before the start code, which
//! shifts the frame right and clips the postamble off the end of the read.
//! The parser therefore scans for the start code and never requires the
//! postamble.
//!
//! # Example
//!
//! ```
//! use tagcue_protocol::{Command, frame};
//!
//! let wire = frame::build_command_frame(Command::SamConfiguration, &[0x01, 0x14, 0x01]);
//! assert_eq!(
//!     wire.as_ref(),
//!     &[0x00, 0x00, 0xFF, 0x05, 0xFB, 0xD4, 0x14, 0x01, 0x14, 0x01, 0x02, 0x00]
//! );
//! ```

use bytes::{BufMut, Bytes, BytesMut};
use std::fmt;
use tagcue_core::{Error, Result, constants::*};

/// Decoded body of an information frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameBody {
    /// Direction byte (`0xD4` or `0xD5`).
    pub direction: u8,

    /// Command or response code.
    pub code: u8,

    /// Payload bytes after the code.
    pub payload: Bytes,
}

impl FrameBody {
    /// Returns `true` if this frame was sent by a reader.
    #[inline]
    #[must_use]
    pub fn is_from_reader(&self) -> bool {
        self.direction == DIRECTION_READER_TO_HOST
    }
}

impl fmt::Display for FrameBody {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let hex: String = self
            .payload
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect::<Vec<_>>()
            .join(" ");
        write!(
            f,
            "FrameBody[dir=0x{:02x}, code=0x{:02x}, payload=[{}]]",
            self.direction, self.code, hex
        )
    }
}

/// Two's complement checksum byte for a running sum.
#[inline]
fn checksum(sum: u32) -> u8 {
    (!(sum as u8)).wrapping_add(1)
}

/// Build the wire bytes for a host → reader frame around a raw body.
///
/// The body is the direction byte, the code, and the payload. Callers
/// normally go through [`build_command_frame`].
#[must_use]
pub fn build_frame(body: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(body.len() + FRAME_OVERHEAD);
    buf.put_u8(FRAME_PREAMBLE);
    buf.put_slice(&FRAME_START_CODE);

    let len = body.len() as u8;
    buf.put_u8(len);
    buf.put_u8(checksum(len as u32));

    buf.put_slice(body);
    buf.put_u8(checksum(body.iter().map(|&b| b as u32).sum()));
    buf.put_u8(FRAME_POSTAMBLE);

    buf.freeze()
}

/// Build the wire bytes for a command with its parameters.
#[must_use]
pub fn build_command_frame(command: crate::Command, params: &[u8]) -> Bytes {
    let mut body = Vec::with_capacity(2 + params.len());
    body.push(DIRECTION_HOST_TO_READER);
    body.push(command.code());
    body.extend_from_slice(params);
    build_frame(&body)
}

/// Number of bytes to read off the bus for a response with the given
/// payload length.
///
/// Covers direction and code bytes plus framing. The leading ready byte
/// the link strips is not included.
#[inline]
#[must_use]
pub const fn response_read_len(payload_len: usize) -> usize {
    payload_len + 2 + FRAME_OVERHEAD
}

/// Returns `true` if the bytes begin with the fixed acknowledgement frame.
#[inline]
#[must_use]
pub fn is_ack(raw: &[u8]) -> bool {
    raw.len() >= ACK_FRAME.len() && raw[..ACK_FRAME.len()] == ACK_FRAME
}

/// Parse an information frame out of a fixed-length read.
///
/// Leading `0x00` bytes before the start code are skipped and a clipped
/// postamble is tolerated. Trailing bytes after the data checksum are
/// ignored.
///
/// # Errors
/// Returns `Error::Busy` if:
/// - No start code is found
/// - The length checksum does not match
/// - The read is too short for the advertised body
/// - The data checksum does not match
pub fn parse_frame(raw: &[u8]) -> Result<FrameBody> {
    // Skip the 0x00 run before the start code.
    let mut offset = 0;
    while offset < raw.len() && raw[offset] == 0x00 {
        offset += 1;
    }
    if offset >= raw.len() || raw[offset] != 0xFF {
        return Err(Error::busy("frame start code not found"));
    }
    offset += 1;

    if raw.len() < offset + 2 {
        return Err(Error::busy("frame truncated before length"));
    }
    let len = raw[offset] as usize;
    let lcs = raw[offset + 1];
    if (raw[offset] as u32 + lcs as u32) & 0xFF != 0 {
        return Err(Error::busy(format!(
            "length checksum mismatch: len=0x{:02x} lcs=0x{lcs:02x}",
            raw[offset]
        )));
    }
    offset += 2;

    if len < 2 {
        return Err(Error::busy(format!("frame body too short: {len} bytes")));
    }
    if raw.len() < offset + len + 1 {
        return Err(Error::busy(format!(
            "frame truncated: need {} body bytes, have {}",
            len + 1,
            raw.len() - offset
        )));
    }

    let body = &raw[offset..offset + len];
    let dcs = raw[offset + len];
    let sum: u32 = body.iter().map(|&b| b as u32).sum::<u32>() + dcs as u32;
    if sum & 0xFF != 0 {
        return Err(Error::busy(format!(
            "data checksum mismatch: residue 0x{:02x}",
            sum & 0xFF
        )));
    }

    Ok(FrameBody {
        direction: body[0],
        code: body[1],
        payload: Bytes::copy_from_slice(&body[2..]),
    })
}

/// Parse a response frame and check it answers the given command.
///
/// # Errors
/// Returns `Error::Busy` if the frame is malformed, was not sent by a
/// reader, or carries a different response code.
pub fn parse_response(raw: &[u8], command: crate::Command) -> Result<Bytes> {
    let body = parse_frame(raw)?;
    if !body.is_from_reader() {
        return Err(Error::busy(format!(
            "unexpected frame direction 0x{:02x}",
            body.direction
        )));
    }
    if body.code != command.response_code() {
        return Err(Error::busy(format!(
            "response code 0x{:02x} does not answer {command}",
            body.code
        )));
    }
    Ok(body.payload)
}
