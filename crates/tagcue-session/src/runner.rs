//! The session loop: discovery, polling, and shutdown.
//!
//! A [`SessionRunner`] owns the whole rig by value: the shared bus, the
//! device registry, one [`ReaderSession`] per pad, the mapping table, and
//! the control sink. Everything runs on a single task in a fixed cadence,
//! so no cycle ever observes a half-routed mux or a partially dispatched
//! action batch.
//!
//! Each cycle walks the pads in reader order. Per pad: route the mux to
//! the reader, re-wake it if a previous failure powered the link down,
//! poll for a tag, advance the session, dispatch the resulting actions,
//! then route to the pad's display and redraw it. Reader link failures and
//! display failures are contained to the pad that saw them; a mux routing
//! failure aborts the loop, because losing the selector breaks every pad
//! at once.
//!
//! Shutdown, graceful or fatal, ends with
//! [`stop_everything`](SessionRunner::stop_everything): one stop-all per
//! track of every reader's group, so no clip outlives the process.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::{Instant, sleep};
use tracing::{debug, error, info, warn};

use tagcue_core::constants::CYCLE_DELAY_MS;
use tagcue_core::types::{BusChannel, DisplayAddress};
use tagcue_core::{Result, TagTable};
use tagcue_hardware::bus::SharedBus;
use tagcue_hardware::devices::DeviceRegistry;
use tagcue_hardware::discovery::{Topology, scan_channels};
use tagcue_hardware::display::render;
use tagcue_hardware::link::LinkConfig;
use tagcue_hardware::traits::{I2cBus, RenderSink};

use crate::actions::{Action, ControlSink, dispatch};
use crate::presenter;
use crate::state::{Observation, ReaderSession};

/// Default number of cycles between periodic statistics log lines.
///
/// About a minute at the default cycle cadence.
const DEFAULT_STATS_INTERVAL_CYCLES: u64 = 600;

/// Shared online flag for the control surface connection.
///
/// The runner only reads it when composing idle screens; whatever task
/// watches connectivity holds a clone and flips it.
#[derive(Debug, Clone)]
pub struct OnlineFlag(Arc<AtomicBool>);

impl OnlineFlag {
    /// Create a flag with an initial state.
    pub fn new(online: bool) -> Self {
        Self(Arc::new(AtomicBool::new(online)))
    }

    /// Record the connection as up or down.
    pub fn set(&self, online: bool) {
        self.0.store(online, Ordering::Relaxed);
    }

    /// Current connection state.
    pub fn is_online(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

impl Default for OnlineFlag {
    fn default() -> Self {
        Self::new(true)
    }
}

/// Tuning knobs for the session loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionRunnerConfig {
    /// Delay between poll cycles in milliseconds.
    pub cycle_delay_ms: u64,

    /// Cycles between periodic statistics log lines. Zero disables the
    /// periodic line; shutdown still logs a summary.
    pub stats_interval_cycles: u64,

    /// Reader link timeouts.
    pub link: LinkConfig,
}

impl Default for SessionRunnerConfig {
    fn default() -> Self {
        Self {
            cycle_delay_ms: CYCLE_DELAY_MS,
            stats_interval_cycles: DEFAULT_STATS_INTERVAL_CYCLES,
            link: LinkConfig::default(),
        }
    }
}

/// Counters for one runner lifetime.
#[derive(Debug, Clone)]
pub struct RunnerStats {
    cycles: u64,
    fires: u64,
    stops: u64,
    link_failures: u64,
    started: Instant,
}

impl RunnerStats {
    fn new() -> Self {
        Self {
            cycles: 0,
            fires: 0,
            stops: 0,
            link_failures: 0,
            started: Instant::now(),
        }
    }

    /// Completed poll cycles.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Clip fire messages attempted.
    pub fn fires(&self) -> u64 {
        self.fires
    }

    /// Stop-all messages attempted.
    pub fn stops(&self) -> u64 {
        self.stops
    }

    /// Times a reader link dropped (failed wake, or powered down mid-poll).
    pub fn link_failures(&self) -> u64 {
        self.link_failures
    }

    /// Time since the runner came up.
    pub fn uptime(&self) -> Duration {
        self.started.elapsed()
    }
}

impl fmt::Display for RunnerStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} cycles, {} fires, {} stops, {} link failures in {}s",
            self.cycles,
            self.fires,
            self.stops,
            self.link_failures,
            self.uptime().as_secs()
        )
    }
}

/// The single-task session loop over one rig.
///
/// Generic over the bus, the display sinks, and the control sink, so the
/// same loop drives real hardware, the emulated rig, and tests.
pub struct SessionRunner<B, S, C>
where
    B: I2cBus,
    S: RenderSink,
    C: ControlSink,
{
    bus: SharedBus<B>,
    registry: DeviceRegistry<S>,
    sessions: Vec<ReaderSession>,
    table: TagTable,
    sink: C,
    config: SessionRunnerConfig,
    online: OnlineFlag,
    stats: RunnerStats,
}

impl<B, S, C> SessionRunner<B, S, C>
where
    B: I2cBus,
    S: RenderSink,
    C: ControlSink,
{
    /// Bring up the rig and build a runner over it.
    ///
    /// Walks every mux channel, pairs readers with displays by position,
    /// wakes each reader, and allocates one Idle session per pad.
    /// `make_sink` builds the render sink for each discovered display.
    ///
    /// A rig where some readers fail to wake still comes up; those links
    /// retry on every poll cycle.
    ///
    /// # Errors
    ///
    /// Returns an error if the mux cannot be routed during the scan.
    pub async fn discover<F>(
        raw: B,
        table: TagTable,
        sink: C,
        config: SessionRunnerConfig,
        online: OnlineFlag,
        make_sink: F,
    ) -> Result<Self>
    where
        F: FnMut(BusChannel, DisplayAddress) -> S,
    {
        let mut bus = SharedBus::new(raw);
        let scans = scan_channels(&mut bus).await?;
        let topology = Topology::from_scans(&scans);
        let mut registry = DeviceRegistry::from_topology(&topology, config.link, make_sink);
        let awake = registry.wake_all(&mut bus).await;
        info!(
            "Rig up: {} readers ({} awake), {} displays, {} mapped tags",
            registry.len(),
            awake,
            topology.display_count(),
            table.len()
        );

        let sessions = registry
            .readers()
            .iter()
            .map(|reader| ReaderSession::new(reader.index))
            .collect();

        Ok(Self {
            bus,
            registry,
            sessions,
            table,
            sink,
            config,
            online,
            stats: RunnerStats::new(),
        })
    }

    /// Number of reader pads under management.
    pub fn reader_count(&self) -> usize {
        self.sessions.len()
    }

    /// Per-pad sessions, in reader order.
    pub fn sessions(&self) -> &[ReaderSession] {
        &self.sessions
    }

    /// Counters since the runner came up.
    pub fn stats(&self) -> &RunnerStats {
        &self.stats
    }

    /// Run one poll pass over every reader pad.
    ///
    /// # Errors
    ///
    /// Returns an error only if the mux cannot be routed; everything else
    /// is contained to the pad that saw it.
    pub async fn poll_cycle(&mut self) -> Result<()> {
        for index in 0..self.sessions.len() {
            self.poll_reader(index).await?;
        }
        self.stats.cycles += 1;
        if self.config.stats_interval_cycles > 0
            && self.stats.cycles % self.config.stats_interval_cycles == 0
        {
            info!("Runner stats: {}", self.stats);
        }
        Ok(())
    }

    /// Poll until the loop fails.
    ///
    /// On a routing failure the stop set is flushed before the error is
    /// returned, so no clip keeps playing against a dead rig. Graceful
    /// shutdown is the caller's move: drop this future and call
    /// [`stop_everything`](SessionRunner::stop_everything).
    ///
    /// # Errors
    ///
    /// Returns the mux routing error that ended the loop.
    pub async fn run(&mut self) -> Result<()> {
        info!("Session loop started ({} readers)", self.sessions.len());
        loop {
            if let Err(e) = self.poll_cycle().await {
                error!("Poll cycle failed: {}", e);
                self.stop_everything().await;
                return Err(e);
            }
            sleep(Duration::from_millis(self.config.cycle_delay_ms)).await;
        }
    }

    /// Reset every session and flush one stop-all per track of every
    /// reader's group.
    ///
    /// Used on shutdown, graceful and fatal alike. Transport errors are
    /// already swallowed by dispatch; this is the last word the control
    /// surface hears from us.
    pub async fn stop_everything(&mut self) {
        for session in &mut self.sessions {
            session.reset();
            let group = session.group();
            self.stats.stops += group.tracks().count() as u64;
            dispatch(&mut self.sink, &[Action::StopGroup(group)]).await;
        }
        info!("Stop set flushed for {} readers", self.sessions.len());
        info!("Runner stats: {}", self.stats);
    }

    async fn poll_reader(&mut self, index: usize) -> Result<()> {
        let Some((reader, display)) = self.registry.pair_mut(index) else {
            return Ok(());
        };
        let Some(session) = self.sessions.get_mut(index) else {
            return Ok(());
        };

        self.bus.select_channel(reader.channel).await?;

        // A link that failed last cycle gets one fresh wake per cycle,
        // never an inline retry.
        if !reader.link.is_awake() {
            if let Err(e) = reader.link.wake(&mut self.bus).await {
                warn!("Reader {} re-wake failed: {}", reader.index, e);
                self.stats.link_failures += 1;
            }
        }

        let was_awake = reader.link.is_awake();
        let target = if was_awake {
            reader.link.read_passive_target(&mut self.bus).await
        } else {
            None
        };
        if was_awake && !reader.link.is_awake() {
            self.stats.link_failures += 1;
        }

        let uid = target.map(|t| t.uid);
        if let Some(uid) = &uid {
            debug!("Reader {} sees tag {}", reader.index, uid);
        }

        let before = session.state();
        let observation = Observation::classify(uid, &self.table);
        let actions = session.advance(observation);
        if session.state() != before {
            info!("Reader {} session {} -> {}", reader.index, before, session.state());
        }

        for action in &actions {
            match action {
                Action::FireClip { .. } => self.stats.fires += 1,
                Action::StopGroup(group) => {
                    self.stats.stops += group.tracks().count() as u64;
                }
            }
        }
        dispatch(&mut self.sink, &actions).await;

        if let Some(display) = display {
            let screen = presenter::screen_for(
                session,
                self.online.is_online(),
                reader.link.health().is_degraded(),
            );
            self.bus.select_channel(display.channel).await?;
            if let Err(e) = render(&mut display.sink, &screen).await {
                warn!("Reader {} display render failed: {}", reader.index, e);
            }
        }

        Ok(())
    }
}
