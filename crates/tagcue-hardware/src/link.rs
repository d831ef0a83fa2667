//! Reader link driver.
//!
//! Drives one NFC reader over the shared bus: wake sequencing, readiness
//! polling, frame exchange, and tag polling. The caller routes the bus to
//! the reader's channel before every operation; the driver itself never
//! selects.
//!
//! # Link States
//!
//! ```text
//! PoweredDown ──wake──► Awake ──command write──► AwaitingFrame
//!      ▲                  ▲                            │
//!      │                  └──────response read─────────┘
//!      └──────────────link failure (any state)
//! ```
//!
//! A reader fresh off a power cycle ignores command traffic until the wake
//! preamble and SAM configuration complete. Link-level write failures drop
//! the state back to `PoweredDown` so the next cycle re-runs the wake
//! sequence.

use crate::{bus::SharedBus, traits::I2cBus};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use tagcue_core::{
    Error, Result,
    constants::{
        DEFAULT_COMMAND_TIMEOUT_MS, DEFAULT_READ_TIMEOUT_MS, LINK_DEGRADED_THRESHOLD,
        READER_I2C_ADDRESS, READY_POLL_INTERVAL_MS, READY_SENTINEL, WAKE_PREAMBLE,
        WAKE_PREAMBLE_DELAY_MS,
    },
};
use tagcue_protocol::{
    Command, FirmwareVersion, PassiveTarget, build_command_frame, frame, is_ack,
    parse_firmware_version, parse_passive_target, parse_response,
};
use tokio::time::{Duration, Instant, sleep};
use tracing::{debug, trace, warn};

/// Power and protocol state of one reader link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkState {
    /// Reader has not completed a wake sequence since power-up.
    PoweredDown,

    /// Reader accepted SAM configuration and accepts commands.
    Awake,

    /// A command was written; the response frame is still outstanding.
    AwaitingFrame,
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LinkState::PoweredDown => write!(f, "powered down"),
            LinkState::Awake => write!(f, "awake"),
            LinkState::AwaitingFrame => write!(f, "awaiting frame"),
        }
    }
}

/// Rolling health of a reader link.
///
/// Counts consecutive failed exchanges. Readiness timeouts while polling
/// for tags are the idle norm and do not count against health.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkHealth {
    consecutive_failures: u32,
}

impl LinkHealth {
    /// Number of consecutive failed exchanges.
    #[must_use]
    pub fn consecutive_failures(self) -> u32 {
        self.consecutive_failures
    }

    /// Returns `true` once failures reach the degradation threshold.
    #[must_use]
    pub fn is_degraded(self) -> bool {
        self.consecutive_failures >= LINK_DEGRADED_THRESHOLD
    }

    fn record_failure(&mut self) {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
    }

    fn record_success(&mut self) {
        self.consecutive_failures = 0;
    }
}

/// Timeouts for link operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkConfig {
    /// Readiness timeout for tag polling. Kept short: an absent tag means
    /// the reader never signals ready, and the whole cycle waits on it.
    pub read_timeout_ms: u64,

    /// Readiness timeout for configuration commands.
    pub command_timeout_ms: u64,
}

impl Default for LinkConfig {
    fn default() -> Self {
        LinkConfig {
            read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
            command_timeout_ms: DEFAULT_COMMAND_TIMEOUT_MS,
        }
    }
}

/// Driver state for one reader.
///
/// The driver holds per-reader state and borrows the bus per operation,
/// so any number of readers can share the one bus.
#[derive(Debug)]
pub struct ReaderLink {
    state: LinkState,
    health: LinkHealth,
    config: LinkConfig,
}

impl ReaderLink {
    /// Create a link driver in the powered-down state.
    #[must_use]
    pub fn new(config: LinkConfig) -> Self {
        ReaderLink {
            state: LinkState::PoweredDown,
            health: LinkHealth::default(),
            config,
        }
    }

    /// Current link state.
    #[must_use]
    pub fn state(&self) -> LinkState {
        self.state
    }

    /// Current link health.
    #[must_use]
    pub fn health(&self) -> LinkHealth {
        self.health
    }

    /// Returns `true` if the reader accepts commands.
    #[must_use]
    pub fn is_awake(&self) -> bool {
        self.state == LinkState::Awake
    }

    /// Run the wake sequence: preamble, settle delay, SAM configuration.
    ///
    /// No reset line is driven; the host has no pin wired to the reader,
    /// so the preamble alone brings the chip out of power-down.
    ///
    /// Safe to call on an already-awake reader; the sequence is idempotent.
    ///
    /// # Errors
    /// Returns `Error::Link` if the preamble write is not acknowledged, or
    /// the SAM exchange error otherwise. The link is left `PoweredDown` on
    /// any failure.
    pub async fn wake<B: I2cBus>(&mut self, bus: &mut SharedBus<B>) -> Result<()> {
        self.state = LinkState::PoweredDown;

        bus.write(READER_I2C_ADDRESS, &WAKE_PREAMBLE)
            .await
            .map_err(|e| {
                self.health.record_failure();
                Error::link(format!("wake preamble write failed: {e}"))
            })?;
        sleep(Duration::from_millis(WAKE_PREAMBLE_DELAY_MS)).await;

        match self
            .call(
                bus,
                Command::SamConfiguration,
                Command::SamConfiguration.default_params(),
                self.config.command_timeout_ms,
            )
            .await
        {
            Ok(_) => {
                self.state = LinkState::Awake;
                debug!("Reader awake after SAM configuration");
                Ok(())
            }
            Err(e) => {
                self.state = LinkState::PoweredDown;
                Err(e)
            }
        }
    }

    /// Poll the status byte until the reader signals a frame is ready.
    ///
    /// Transient read errors are swallowed and retried; only the wall
    /// clock gives up. The call returns within one poll interval past the
    /// timeout.
    ///
    /// # Errors
    /// Returns `Error::TimedOut` when the deadline passes without the
    /// ready sentinel.
    pub async fn wait_ready<B: I2cBus>(
        &mut self,
        bus: &mut SharedBus<B>,
        timeout_ms: u64,
    ) -> Result<()> {
        let deadline = Instant::now() + Duration::from_millis(timeout_ms);
        loop {
            match bus.read(READER_I2C_ADDRESS, 1).await {
                Ok(status) if status.first() == Some(&READY_SENTINEL) => return Ok(()),
                Ok(_) => {}
                Err(e) => trace!("Readiness poll failed, retrying: {}", e),
            }
            if Instant::now() >= deadline {
                return Err(Error::timed_out(timeout_ms));
            }
            sleep(Duration::from_millis(READY_POLL_INTERVAL_MS)).await;
        }
    }

    /// Read `count` frame bytes, stripping the leading status byte.
    ///
    /// # Errors
    /// Returns `Error::Busy` if the read comes back empty or the status
    /// byte is not the ready sentinel.
    pub async fn read_frame<B: I2cBus>(
        &mut self,
        bus: &mut SharedBus<B>,
        count: usize,
    ) -> Result<Vec<u8>> {
        let raw = bus.read(READER_I2C_ADDRESS, count + 1).await?;
        if raw.is_empty() {
            return Err(Error::busy("zero-length frame read"));
        }
        if raw[0] != READY_SENTINEL {
            return Err(Error::busy(format!(
                "reader not ready: status 0x{:02x}",
                raw[0]
            )));
        }
        Ok(raw[1..].to_vec())
    }

    /// Write frame bytes to the reader verbatim.
    ///
    /// # Errors
    /// Returns `Error::Link` if the write is not acknowledged.
    pub async fn write_frame<B: I2cBus>(
        &mut self,
        bus: &mut SharedBus<B>,
        bytes: &[u8],
    ) -> Result<()> {
        bus.write(READER_I2C_ADDRESS, bytes)
            .await
            .map_err(|e| Error::link(format!("frame write failed: {e}")))
    }

    /// Execute one command exchange: write, ACK, response.
    ///
    /// # Errors
    /// - `Error::Link` if the command write fails; the link drops to
    ///   `PoweredDown`
    /// - `Error::TimedOut` if the reader never signals ready; the link
    ///   stays awake and health is unaffected
    /// - `Error::Busy` if the ACK or response frame is malformed
    pub async fn call<B: I2cBus>(
        &mut self,
        bus: &mut SharedBus<B>,
        command: Command,
        params: &[u8],
        timeout_ms: u64,
    ) -> Result<Bytes> {
        let result = self.exchange(bus, command, params, timeout_ms).await;
        match &result {
            Ok(_) => {
                self.state = LinkState::Awake;
                self.health.record_success();
            }
            Err(Error::TimedOut { .. }) => {
                // The command was accepted; the reader just has nothing to
                // report. Routine for an empty RF field.
                self.state = LinkState::Awake;
            }
            Err(Error::Link(_)) | Err(Error::Bus(_)) => {
                self.state = LinkState::PoweredDown;
                self.health.record_failure();
            }
            Err(_) => {
                self.state = LinkState::Awake;
                self.health.record_failure();
            }
        }
        result
    }

    async fn exchange<B: I2cBus>(
        &mut self,
        bus: &mut SharedBus<B>,
        command: Command,
        params: &[u8],
        timeout_ms: u64,
    ) -> Result<Bytes> {
        let wire = build_command_frame(command, params);
        self.write_frame(bus, &wire).await?;
        self.state = LinkState::AwaitingFrame;

        self.wait_ready(bus, timeout_ms).await?;
        let ack = self.read_frame(bus, tagcue_core::constants::ACK_FRAME.len()).await?;
        if !is_ack(&ack) {
            return Err(Error::busy(format!("expected ACK for {command}")));
        }

        self.wait_ready(bus, timeout_ms).await?;
        let raw = self
            .read_frame(bus, frame::response_read_len(command.response_payload_len()))
            .await?;
        parse_response(&raw, command)
    }

    /// Poll once for a tag in the RF field.
    ///
    /// All failures downgrade to "no tag": an absent tag, a garbled
    /// listing, and a dead reader are indistinguishable to the session and
    /// all mean nothing to play. Health bookkeeping still records real
    /// failures so the loop can report a degraded link.
    pub async fn read_passive_target<B: I2cBus>(
        &mut self,
        bus: &mut SharedBus<B>,
    ) -> Option<PassiveTarget> {
        let payload = match self
            .call(
                bus,
                Command::InListPassiveTarget,
                Command::InListPassiveTarget.default_params(),
                self.config.read_timeout_ms,
            )
            .await
        {
            Ok(payload) => payload,
            Err(Error::TimedOut { .. }) => return None,
            Err(e) => {
                debug!("Tag poll failed: {}", e);
                return None;
            }
        };

        match parse_passive_target(&payload) {
            Ok(target) => Some(target),
            Err(e) => {
                warn!("Discarding malformed target listing: {}", e);
                None
            }
        }
    }

    /// Query the reader's firmware identification.
    ///
    /// # Errors
    /// Propagates the exchange error; used at startup where a dead reader
    /// is worth reporting.
    pub async fn firmware_version<B: I2cBus>(
        &mut self,
        bus: &mut SharedBus<B>,
    ) -> Result<FirmwareVersion> {
        let payload = self
            .call(
                bus,
                Command::GetFirmwareVersion,
                &[],
                self.config.command_timeout_ms,
            )
            .await?;
        parse_firmware_version(&payload)
    }
}

impl Default for ReaderLink {
    fn default() -> Self {
        Self::new(LinkConfig::default())
    }
}
