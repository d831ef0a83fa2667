//! Per-reader session state tracking.
//!
//! Each reader pad owns a [`ReaderSession`] that turns the raw poll result
//! into clip actions for the control surface. The session is a two-state
//! machine:
//!
//! - `Idle`: no usable tag on the pad; every cycle re-asserts the stop set
//!   for the reader's track group
//! - `Present(track)`: a mapped tag sits on the pad and its clip is running
//!
//! # Transition Rules
//!
//! - Idle, tag resolves to a track: fire that track's clip (after stopping
//!   the group) and move to `Present`
//! - Idle, pad empty or tag unmapped: stay `Idle`, keep the group stopped
//! - Present, same track observed: no actions, the clip keeps running
//! - Present, a different mapped tag: stop the group, fire the new clip
//! - Present, pad empty or tag unmapped: stop the group, fall back to `Idle`
//!
//! A tag missing from the mapping table is treated exactly like an empty
//! pad. Firing is edge-triggered: holding a tag in place never re-fires its
//! clip, while the stop set is level-triggered and repeats on every idle
//! cycle.
//!
//! # Examples
//!
//! ```
//! use tagcue_core::types::{ClipSlot, ReaderIndex, TagUid, TrackId};
//! use tagcue_session::state::{Observation, ReaderSession, SessionState};
//!
//! let mut session = ReaderSession::new(ReaderIndex::new(0));
//! let uid = TagUid::parse("33c29c92").unwrap();
//! let slot = ClipSlot::new(1).unwrap();
//!
//! let actions = session.advance(Observation::Resolved(uid, slot));
//! assert_eq!(session.state(), SessionState::Present(TrackId::new(1)));
//! assert_eq!(actions.len(), 2); // stop the group, then fire
//! ```

use std::collections::VecDeque;
use std::fmt;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use tagcue_core::TagTable;
use tagcue_core::types::{ClipSlot, ReaderIndex, TagUid, TrackGroup, TrackId};

use crate::actions::{Action, LAUNCH_ROW};

/// Maximum number of transitions to keep per session.
///
/// A transition happens only when a tag arrives, leaves, or swaps, so 32
/// entries cover several minutes of heavy pad use while keeping the
/// per-reader footprint small.
const MAX_HISTORY_SIZE: usize = 32;

/// What one poll cycle observed on a reader pad.
///
/// Produced by [`Observation::classify`] from the raw poll result and the
/// tag mapping table, consumed by [`ReaderSession::advance`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation {
    /// No tag in the reader's field.
    Absent,

    /// A tag answered the poll but its UID has no mapping table entry.
    Unresolved(TagUid),

    /// A tag answered and its UID maps to a clip slot.
    Resolved(TagUid, ClipSlot),
}

impl Observation {
    /// Classify a poll result against the mapping table.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::collections::HashMap;
    /// use tagcue_core::TagTable;
    /// use tagcue_core::types::{ClipSlot, TagUid};
    /// use tagcue_session::state::Observation;
    ///
    /// let uid = TagUid::parse("33c29c92").unwrap();
    /// let table = TagTable::from_entries(HashMap::from([(
    ///     uid.clone(),
    ///     ClipSlot::new(1).unwrap(),
    /// )]));
    ///
    /// assert_eq!(Observation::classify(None, &table), Observation::Absent);
    /// assert!(matches!(
    ///     Observation::classify(Some(uid), &table),
    ///     Observation::Resolved(_, _)
    /// ));
    /// ```
    pub fn classify(uid: Option<TagUid>, table: &TagTable) -> Observation {
        match uid {
            None => Observation::Absent,
            Some(uid) => match table.resolve(&uid) {
                Some(slot) => Observation::Resolved(uid, slot),
                None => Observation::Unresolved(uid),
            },
        }
    }

    /// The observed UID, if any tag answered at all.
    pub fn uid(&self) -> Option<&TagUid> {
        match self {
            Observation::Absent => None,
            Observation::Unresolved(uid) | Observation::Resolved(uid, _) => Some(uid),
        }
    }
}

impl fmt::Display for Observation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Observation::Absent => write!(f, "absent"),
            Observation::Unresolved(uid) => write!(f, "unresolved {uid}"),
            Observation::Resolved(uid, slot) => write!(f, "{uid} at slot {slot}"),
        }
    }
}

/// Session state of a single reader pad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No usable tag; the track group is held stopped.
    Idle,

    /// A mapped tag is on the pad and this track's clip is running.
    Present(TrackId),
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Idle => write!(f, "Idle"),
            SessionState::Present(track) => write!(f, "Present(track {track})"),
        }
    }
}

/// A recorded session transition with timestamp.
///
/// # Serialization Note
///
/// The `at` field is not serialized as `Instant` is process-specific. Upon
/// deserialization it is set to the time of deserialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionTransition {
    /// The state transitioned from.
    pub from: SessionState,

    /// The state transitioned to.
    pub to: SessionState,

    /// The UID that drove the transition, if a tag was involved.
    pub uid: Option<TagUid>,

    /// When the transition occurred.
    #[serde(skip, default = "Instant::now")]
    pub at: Instant,
}

impl SessionTransition {
    fn new(from: SessionState, to: SessionState, uid: Option<TagUid>) -> Self {
        Self {
            from,
            to,
            uid,
            at: Instant::now(),
        }
    }

    /// Time elapsed since this transition occurred.
    pub fn elapsed(&self) -> Duration {
        self.at.elapsed()
    }
}

/// State machine for one reader pad.
///
/// The session owns nothing but bookkeeping: bus access, tag resolution,
/// action dispatch, and display rendering all happen in the calling loop.
/// [`advance`](ReaderSession::advance) is a pure transition function over
/// an [`Observation`], which keeps the transition rules testable without
/// any hardware in the loop.
///
/// # Examples
///
/// ```
/// use tagcue_core::types::{ClipSlot, ReaderIndex, TagUid};
/// use tagcue_session::state::{Observation, ReaderSession};
///
/// let mut session = ReaderSession::new(ReaderIndex::new(0));
/// let uid = TagUid::parse("04a224b2c35e80").unwrap();
///
/// // Tag arrives, plays, leaves.
/// session.advance(Observation::Resolved(uid, ClipSlot::new(0).unwrap()));
/// session.advance(Observation::Absent);
/// assert_eq!(session.history().len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct ReaderSession {
    /// The reader this session belongs to.
    index: ReaderIndex,

    /// Track window owned by the reader, derived from its index.
    group: TrackGroup,

    /// Current state of the pad.
    state: SessionState,

    /// UID most recently seen on the pad, kept for display feedback.
    last_uid: Option<TagUid>,

    /// Recent transitions, oldest first (limited to MAX_HISTORY_SIZE).
    history: VecDeque<SessionTransition>,
}

impl ReaderSession {
    /// Create a session for a reader, starting Idle.
    pub fn new(index: ReaderIndex) -> Self {
        Self {
            index,
            group: TrackGroup::for_reader(index),
            state: SessionState::Idle,
            last_uid: None,
            history: VecDeque::with_capacity(MAX_HISTORY_SIZE),
        }
    }

    /// The reader this session tracks.
    pub fn index(&self) -> ReaderIndex {
        self.index
    }

    /// The track group this session controls.
    pub fn group(&self) -> TrackGroup {
        self.group
    }

    /// Current state of the pad.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Returns `true` if a mapped tag is currently on the pad.
    pub fn is_present(&self) -> bool {
        matches!(self.state, SessionState::Present(_))
    }

    /// The UID most recently observed on the pad.
    ///
    /// Always `Some` while the session is `Present`. Cleared when the pad
    /// goes empty or the tag stops resolving.
    pub fn last_uid(&self) -> Option<&TagUid> {
        self.last_uid.as_ref()
    }

    /// Recent transitions, ordered oldest to newest.
    pub fn history(&self) -> &VecDeque<SessionTransition> {
        &self.history
    }

    /// Advance the session by one observation and return the actions the
    /// control surface must perform, in order.
    ///
    /// Stops always precede the fire within a batch, so a new clip never
    /// plays on top of the previous one. An Idle session returns the stop
    /// set on every call; a missed stop message therefore heals on the
    /// next cycle.
    pub fn advance(&mut self, observation: Observation) -> Vec<Action> {
        match observation {
            Observation::Resolved(uid, slot) => {
                let track = self.group.track_for(slot);
                match self.state {
                    SessionState::Present(current) if current == track => {
                        // Swapping one tag for another mapped to the same
                        // track lands here too: the clip keeps running and
                        // only the remembered UID moves.
                        self.last_uid = Some(uid);
                        Vec::new()
                    }
                    from => {
                        self.state = SessionState::Present(track);
                        self.last_uid = Some(uid.clone());
                        self.record(from, self.state, Some(uid));
                        vec![
                            Action::StopGroup(self.group),
                            Action::FireClip {
                                track,
                                clip: LAUNCH_ROW,
                            },
                        ]
                    }
                }
            }
            Observation::Absent | Observation::Unresolved(_) => {
                if let SessionState::Present(_) = self.state {
                    let from = self.state;
                    self.state = SessionState::Idle;
                    self.last_uid = None;
                    self.record(from, SessionState::Idle, observation.uid().cloned());
                }
                vec![Action::StopGroup(self.group)]
            }
        }
    }

    /// Force the session back to Idle.
    ///
    /// Used by shutdown paths right before the stop set is flushed. Returns
    /// the transition record if the pad was occupied.
    pub fn reset(&mut self) -> Option<SessionTransition> {
        if self.state == SessionState::Idle {
            return None;
        }
        let from = self.state;
        self.state = SessionState::Idle;
        let uid = self.last_uid.take();
        self.record(from, SessionState::Idle, uid);
        self.history.back().cloned()
    }

    fn record(&mut self, from: SessionState, to: SessionState, uid: Option<TagUid>) {
        self.history.push_back(SessionTransition::new(from, to, uid));
        if self.history.len() > MAX_HISTORY_SIZE {
            self.history.pop_front();
        }
    }
}
