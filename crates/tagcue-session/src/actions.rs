//! Clip actions and their dispatch to the control surface.
//!
//! Sessions emit [`Action`] values; [`dispatch`] expands them into the
//! per-track messages a [`ControlSink`] understands. The sink is the only
//! seam between session logic and the OSC transport, so the whole flow is
//! testable against the in-memory [`RecordingSink`].
//!
//! Dispatch never fails: the control surface is fire-and-forget, and a
//! reader loop must keep polling even when the surface is unreachable.
//! Failed stops are logged at debug (an Idle session resends them on the
//! next cycle anyway); failed fires are logged at warn because the user
//! placed a tag and heard nothing.

#![allow(async_fn_in_trait)]

use std::fmt;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, warn};

use tagcue_core::Result;
use tagcue_core::types::{ClipId, TrackGroup, TrackId};

/// Row of the clip grid that tags launch from.
///
/// Tag placement selects the track; the clip fired on it is always the
/// first row.
pub const LAUNCH_ROW: ClipId = ClipId::new(0);

/// One step the control surface must perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Launch a clip on a track.
    FireClip {
        /// Track to fire on.
        track: TrackId,
        /// Clip row to launch.
        clip: ClipId,
    },

    /// Stop every playing clip on every track of a group.
    StopGroup(TrackGroup),
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::FireClip { track, clip } => {
                write!(f, "fire clip {clip} on track {track}")
            }
            Action::StopGroup(group) => write!(f, "stop tracks {group}"),
        }
    }
}

/// Outgoing control surface commands.
///
/// Implemented by the OSC client for live use and by [`RecordingSink`]
/// for tests.
///
/// # Object Safety and Dynamic Dispatch
///
/// This trait is not object-safe because `async fn` methods return
/// `impl Future` (Edition 2024 RPITIT). Use generic type parameters.
pub trait ControlSink: Send + Sync {
    /// Launch a clip on a track.
    ///
    /// # Errors
    ///
    /// Returns an error if the message cannot be handed to the transport.
    async fn fire_clip(&mut self, track: TrackId, clip: ClipId) -> Result<()>;

    /// Stop all playing clips on a track.
    ///
    /// # Errors
    ///
    /// Returns an error if the message cannot be handed to the transport.
    async fn stop_all_clips(&mut self, track: TrackId) -> Result<()>;
}

/// Perform a batch of actions against the control surface, in order.
///
/// A [`Action::StopGroup`] expands to one stop message per track of the
/// group, lowest track first. Transport failures are logged and swallowed;
/// the caller keeps its cycle cadence regardless of surface health.
pub async fn dispatch<C: ControlSink>(sink: &mut C, actions: &[Action]) {
    for action in actions {
        match action {
            Action::StopGroup(group) => {
                for track in group.tracks() {
                    if let Err(e) = sink.stop_all_clips(track).await {
                        debug!("Stop for track {} failed: {}", track, e);
                    }
                }
            }
            Action::FireClip { track, clip } => {
                if let Err(e) = sink.fire_clip(*track, *clip).await {
                    warn!("Fire for track {} failed: {}", track, e);
                }
            }
        }
    }
}

/// A control message as seen by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMessage {
    /// A clip launch for `(track, clip)`.
    Fire {
        /// Track fired on.
        track: TrackId,
        /// Clip row launched.
        clip: ClipId,
    },

    /// A stop-all for one track.
    StopAll {
        /// Track stopped.
        track: TrackId,
    },
}

#[derive(Debug, Default)]
struct RecordingState {
    sent: Vec<ControlMessage>,
    fail_fires: u32,
    fail_stops: u32,
}

/// In-memory [`ControlSink`] that records every message.
///
/// Created as a pair: the sink goes wherever a `ControlSink` is needed,
/// the handle stays with the test to inspect traffic and inject failures.
///
/// # Examples
///
/// ```
/// use tagcue_core::types::{ClipId, TrackId};
/// use tagcue_session::actions::{ControlMessage, ControlSink, RecordingSink};
///
/// #[tokio::main]
/// async fn main() -> tagcue_core::Result<()> {
///     let (mut sink, handle) = RecordingSink::new();
///     sink.fire_clip(TrackId::new(3), ClipId::new(0)).await?;
///
///     assert_eq!(
///         handle.sent().await,
///         vec![ControlMessage::Fire {
///             track: TrackId::new(3),
///             clip: ClipId::new(0),
///         }]
///     );
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct RecordingSink {
    state: Arc<Mutex<RecordingState>>,
}

/// Test-side handle to a [`RecordingSink`].
#[derive(Debug, Clone)]
pub struct RecordingSinkHandle {
    state: Arc<Mutex<RecordingState>>,
}

impl RecordingSink {
    /// Create a sink and its inspection handle.
    pub fn new() -> (Self, RecordingSinkHandle) {
        let state = Arc::new(Mutex::new(RecordingState::default()));
        (
            Self {
                state: Arc::clone(&state),
            },
            RecordingSinkHandle { state },
        )
    }
}

impl ControlSink for RecordingSink {
    async fn fire_clip(&mut self, track: TrackId, clip: ClipId) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.fail_fires > 0 {
            state.fail_fires -= 1;
            return Err(std::io::Error::other("injected fire failure").into());
        }
        state.sent.push(ControlMessage::Fire { track, clip });
        Ok(())
    }

    async fn stop_all_clips(&mut self, track: TrackId) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.fail_stops > 0 {
            state.fail_stops -= 1;
            return Err(std::io::Error::other("injected stop failure").into());
        }
        state.sent.push(ControlMessage::StopAll { track });
        Ok(())
    }
}

impl RecordingSinkHandle {
    /// Every message delivered so far, in order.
    pub async fn sent(&self) -> Vec<ControlMessage> {
        self.state.lock().await.sent.clone()
    }

    /// Forget all recorded messages.
    pub async fn clear(&self) {
        self.state.lock().await.sent.clear();
    }

    /// Fail the next `count` fire messages.
    pub async fn fail_fires(&self, count: u32) {
        self.state.lock().await.fail_fires = count;
    }

    /// Fail the next `count` stop messages.
    pub async fn fail_stops(&self, count: u32) {
        self.state.lock().await.fail_stops = count;
    }
}
