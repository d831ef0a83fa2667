//! OSC 1.0 message encoding.
//!
//! Only the two messages the control surface understands are built here,
//! both with `i32` arguments:
//!
//! - `/live/clip/fire <track> <clip>`
//! - `/live/track/stop_all_clips <track>`
//!
//! OSC strings are NUL-terminated and padded to a four-byte boundary, the
//! type tag string opens with `,`, and integer arguments go out big-endian.
//! A fire message is therefore always 28 bytes: 16 of address, 4 of type
//! tags, 8 of arguments.

use bytes::{BufMut, Bytes, BytesMut};

use tagcue_core::types::{ClipId, TrackId};

/// OSC address for launching a clip.
pub const FIRE_CLIP_ADDRESS: &str = "/live/clip/fire";

/// OSC address for stopping all clips on a track.
pub const STOP_ALL_CLIPS_ADDRESS: &str = "/live/track/stop_all_clips";

/// Append an OSC string: the bytes, a NUL, then zero padding out to a
/// four-byte boundary.
fn put_padded_str(buf: &mut BytesMut, s: &str) {
    buf.put_slice(s.as_bytes());
    buf.put_u8(0);
    while buf.len() % 4 != 0 {
        buf.put_u8(0);
    }
}

fn encode_message(address: &str, args: &[i32]) -> Bytes {
    let mut buf = BytesMut::with_capacity(address.len() + args.len() * 4 + 8);
    put_padded_str(&mut buf, address);

    let mut tags = String::with_capacity(args.len() + 1);
    tags.push(',');
    for _ in args {
        tags.push('i');
    }
    put_padded_str(&mut buf, &tags);

    for &arg in args {
        buf.put_i32(arg);
    }
    buf.freeze()
}

/// Encode a clip fire message.
///
/// # Examples
///
/// ```
/// use tagcue_core::types::{ClipId, TrackId};
/// use tagcue_osc::encode::fire_clip;
///
/// let packet = fire_clip(TrackId::new(1), ClipId::new(0));
/// assert_eq!(packet.len(), 28);
/// assert!(packet.starts_with(b"/live/clip/fire\0"));
/// ```
#[must_use]
pub fn fire_clip(track: TrackId, clip: ClipId) -> Bytes {
    encode_message(FIRE_CLIP_ADDRESS, &[track.as_i32(), clip.as_i32()])
}

/// Encode a stop-all-clips message for one track.
#[must_use]
pub fn stop_all_clips(track: TrackId) -> Bytes {
    encode_message(STOP_ALL_CLIPS_ADDRESS, &[track.as_i32()])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fire_clip_golden_bytes() {
        let packet = fire_clip(TrackId::new(1), ClipId::new(0));

        let mut expected = Vec::new();
        expected.extend_from_slice(b"/live/clip/fire\0");
        expected.extend_from_slice(b",ii\0");
        expected.extend_from_slice(&1i32.to_be_bytes());
        expected.extend_from_slice(&0i32.to_be_bytes());
        assert_eq!(&packet[..], &expected[..]);
    }

    #[test]
    fn test_stop_all_clips_golden_bytes() {
        let packet = stop_all_clips(TrackId::new(7));

        let mut expected = Vec::new();
        expected.extend_from_slice(b"/live/track/stop_all_clips\0\0");
        expected.extend_from_slice(b",i\0\0");
        expected.extend_from_slice(&7i32.to_be_bytes());
        assert_eq!(&packet[..], &expected[..]);
        assert_eq!(packet.len(), 36);
    }

    #[test]
    fn test_arguments_are_big_endian() {
        let packet = fire_clip(TrackId::new(300), ClipId::new(0));
        assert_eq!(&packet[20..24], &[0x00, 0x00, 0x01, 0x2c]);
    }

    #[test]
    fn test_packets_are_four_byte_aligned() {
        for track in [0u16, 1, 47, 300] {
            assert_eq!(fire_clip(TrackId::new(track), ClipId::new(0)).len() % 4, 0);
            assert_eq!(stop_all_clips(TrackId::new(track)).len() % 4, 0);
        }
    }
}
