//! Screen composition for the per-reader status displays.
//!
//! Pure functions from session state to a [`Screen`]; the runner renders
//! the result through whatever [`RenderSink`] the pad carries. Two layouts
//! exist:
//!
//! - present: the tag UID, its slot, and the track now playing
//! - idle: a no-tag notice plus the track range being held stopped,
//!   prefixed by a `No WiFi` line while the control surface is
//!   unreachable and suffixed by a link warning once the reader has
//!   failed repeatedly
//!
//! Lines wider than the panel are clipped by the sink, not here.
//!
//! [`RenderSink`]: tagcue_hardware::traits::RenderSink

use tagcue_core::types::{ClipSlot, TagUid, TrackGroup, TrackId};
use tagcue_hardware::display::Screen;

use crate::state::{ReaderSession, SessionState};

/// Idle-screen line shown once a reader link is degraded.
const LINK_DEGRADED_LINE: &str = "Link degraded";

/// Screen shown while a mapped tag plays.
///
/// # Examples
///
/// ```
/// use tagcue_core::types::{ClipSlot, TagUid, TrackId};
/// use tagcue_session::presenter::present_screen;
///
/// let uid = TagUid::parse("33c29c92").unwrap();
/// let screen = present_screen(&uid, ClipSlot::new(1).unwrap(), TrackId::new(7));
/// assert_eq!(screen.lines()[0].text, "NFC id:33c29c92");
/// assert_eq!(screen.lines()[2].text, "Track id: 7");
/// ```
pub fn present_screen(uid: &TagUid, slot: ClipSlot, track: TrackId) -> Screen {
    let mut screen = Screen::new();
    screen.push_line(format!("NFC id:{uid}"));
    screen.push_line(format!("Tag id: {slot}"));
    screen.push_line(format!("Track id: {track}"));
    screen
}

/// Screen shown while a pad is empty or its tag is unmapped.
///
/// The track range line reads `<first>/<last>` for the reader's group.
pub fn idle_screen(group: TrackGroup, online: bool, degraded: bool) -> Screen {
    let mut screen = Screen::new();
    if !online {
        screen.push_line("No WiFi");
    }
    screen.push_line("No Tag detected");
    screen.push_line("Stopping tracks:");
    screen.push_line(format!("{}/{}", group.first(), group.last()));
    if degraded {
        screen.push_line(LINK_DEGRADED_LINE);
    }
    screen
}

/// Pick the screen for a session's current state.
///
/// Falls back to the idle layout if the session is `Present` without a
/// remembered UID or with a track outside its own group; neither happens
/// through [`ReaderSession::advance`], but a stale screen must never show
/// a tag that is not there.
pub fn screen_for(session: &ReaderSession, online: bool, degraded: bool) -> Screen {
    match (session.state(), session.last_uid()) {
        (SessionState::Present(track), Some(uid)) => match session.group().slot_for(track) {
            Some(slot) => present_screen(uid, slot, track),
            None => idle_screen(session.group(), online, degraded),
        },
        _ => idle_screen(session.group(), online, degraded),
    }
}
