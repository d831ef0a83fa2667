//! Session logic for the multiplexed tag-reader rig.
//!
//! This crate turns raw tag observations into clip control: one
//! [`ReaderSession`] per pad tracks what lies on it, [`dispatch`] pushes
//! the resulting actions to the control surface, the presenter composes
//! per-pad status screens, and [`SessionRunner`] drives the whole rig in
//! a single-task poll loop.
//!
//! # The Cycle
//!
//! Every pass over the rig does, per pad: route the multiplexer, poll the
//! reader, advance the session, dispatch actions, redraw the display. Tag
//! placement fires the mapped track's clip exactly once; tag removal (or
//! an unmapped tag) stops the pad's whole track group, and an idle pad
//! keeps re-asserting those stops so a lost message heals within a cycle.
//!
//! # Wiring
//!
//! ```no_run
//! use tagcue_core::{Result, TagTable};
//! use tagcue_hardware::VirtualPanel;
//! use tagcue_hardware::traits::I2cBus;
//! use tagcue_session::{ControlSink, OnlineFlag, SessionRunner, SessionRunnerConfig};
//!
//! async fn serve<B: I2cBus, C: ControlSink>(raw: B, table: TagTable, osc: C) -> Result<()> {
//!     let mut runner = SessionRunner::discover(
//!         raw,
//!         table,
//!         osc,
//!         SessionRunnerConfig::default(),
//!         OnlineFlag::default(),
//!         |channel, strap| VirtualPanel::new(format!("{channel}/{strap}")),
//!     )
//!     .await?;
//!     runner.run().await
//! }
//! ```
//!
//! [`ReaderSession`]: state::ReaderSession
//! [`dispatch`]: actions::dispatch
//! [`SessionRunner`]: runner::SessionRunner

pub mod actions;
pub mod presenter;
pub mod runner;
pub mod state;

// Re-export commonly used types for convenience
pub use actions::{
    Action, ControlMessage, ControlSink, LAUNCH_ROW, RecordingSink, RecordingSinkHandle, dispatch,
};
pub use presenter::{idle_screen, present_screen, screen_for};
pub use runner::{OnlineFlag, RunnerStats, SessionRunner, SessionRunnerConfig};
pub use state::{Observation, ReaderSession, SessionState, SessionTransition};
