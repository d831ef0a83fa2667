//! `tagcue` binary: runs the tag-to-clip session loop over an emulated rig.
//!
//! The binary wires four pieces together:
//!
//! 1. A [`MockBus`] populated from the `rig` section of the config, standing
//!    in for the multiplexed I2C segment.
//! 2. The UID-to-slot [`TagTable`] loaded from `mapping_path`.
//! 3. An [`OscClient`] aimed at the control surface from the `osc` section.
//! 4. A [`SessionRunner`] polling the rig and driving clip state.
//!
//! An optional `scenario` list in the config scripts tag placements against
//! the emulated pads, so `tagcue demo.json` exercises the whole pipeline
//! end to end. Ctrl+C (or SIGTERM) stops the loop after flushing a stop to
//! every mapped track.

mod config;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::time::sleep;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use tagcue_core::{DisplayAddress, TagTable};
use tagcue_hardware::VirtualPanel;
use tagcue_hardware::mock::{MockBus, MockBusHandle};
use tagcue_osc::OscClient;
use tagcue_session::{OnlineFlag, SessionRunner};

use crate::config::{DEFAULT_CONFIG_PATH, RunConfig, ScenarioEvent};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    let config = RunConfig::load(&path)?;
    let events = config.scenario_events()?;
    let table = load_table(&config)?;

    let (bus, rig) = MockBus::new();
    for &channel in &config.rig.readers {
        rig.add_reader(channel).await;
    }
    for &channel in &config.rig.displays {
        rig.add_display(channel, DisplayAddress::Primary).await;
    }

    let sink = OscClient::connect(config.osc.clone())
        .await
        .context("connecting OSC client")?;

    let mut runner = SessionRunner::discover(
        bus,
        table,
        sink,
        config.runner,
        OnlineFlag::default(),
        |channel, strap| {
            VirtualPanel::new(format!("display {channel}/{strap}")).with_announcements(true)
        },
    )
    .await
    .context("bringing up the rig")?;

    if runner.reader_count() == 0 {
        warn!("No readers found on the rig; the loop will only idle");
    }

    let script = tokio::spawn(run_scenario(rig, events));

    let outcome = tokio::select! {
        result = runner.run() => Some(result),
        () = shutdown_signal() => None,
    };
    script.abort();

    match outcome {
        // The loop already flushed its stops before returning the error.
        Some(result) => result.context("session loop failed")?,
        None => {
            info!("Shutdown requested");
            runner.stop_everything().await;
        }
    }
    Ok(())
}

/// Load the mapping table, treating a missing file as an empty table.
///
/// A missing table is a usable (if silent) rig: every tag reads as
/// unmapped and every pad keeps its group stopped. A malformed table is
/// a config error and aborts startup.
fn load_table(config: &RunConfig) -> Result<TagTable> {
    match TagTable::load(&config.mapping_path) {
        Ok(table) => {
            info!(
                "Loaded {} tag mappings from {}",
                table.len(),
                config.mapping_path.display()
            );
            Ok(table)
        }
        Err(tagcue_core::Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(
                "No mapping table at {}; every tag will read as unmapped",
                config.mapping_path.display()
            );
            Ok(TagTable::default())
        }
        Err(e) => Err(e).with_context(|| {
            format!("loading tag table from {}", config.mapping_path.display())
        }),
    }
}

/// Apply scripted tag events to the emulated rig, spaced by their delays.
async fn run_scenario(rig: MockBusHandle, events: Vec<ScenarioEvent>) {
    for event in events {
        sleep(Duration::from_millis(event.after_ms)).await;
        match &event.tag {
            Some(uid) => {
                info!("Scenario: tag {} lands on channel {}", uid, event.channel);
                rig.present_tag(event.channel, uid).await;
            }
            None => {
                info!("Scenario: channel {} pad cleared", event.channel);
                rig.remove_tag(event.channel).await;
            }
        }
    }
}

/// Resolve when the process is asked to stop.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Ctrl+C handler failed: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("SIGTERM handler failed: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
