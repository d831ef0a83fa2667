//! Run configuration for the `tagcue` binary.
//!
//! Everything is optional: an empty JSON document (or no file at all)
//! yields a rig with one reader on channel 2, one display on channel 0,
//! and an OSC target on localhost. The `scenario` list scripts tag
//! placements against the emulated rig so the whole pipeline can be
//! exercised without hardware.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use tagcue_core::{BusChannel, TagUid};
use tagcue_osc::OscClientConfig;
use tagcue_session::SessionRunnerConfig;

/// Config file the binary reads when no path argument is given.
pub const DEFAULT_CONFIG_PATH: &str = "tagcue.json";

/// Top-level configuration document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Path of the UID-to-slot mapping table.
    pub mapping_path: PathBuf,
    /// OSC control surface target.
    pub osc: OscClientConfig,
    /// Session loop tuning.
    pub runner: SessionRunnerConfig,
    /// Emulated rig layout.
    pub rig: RigConfig,
    /// Scripted tag events applied while the loop runs.
    pub scenario: Vec<ScenarioStep>,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            mapping_path: PathBuf::from("mapping.json"),
            osc: OscClientConfig::default(),
            runner: SessionRunnerConfig::default(),
            rig: RigConfig::default(),
            scenario: Vec::new(),
        }
    }
}

/// Which mux channels carry which emulated devices.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RigConfig {
    /// Channels with a reader pad.
    pub readers: Vec<u8>,
    /// Channels with a display panel.
    pub displays: Vec<u8>,
}

impl Default for RigConfig {
    fn default() -> Self {
        RigConfig {
            readers: vec![2],
            displays: vec![0],
        }
    }
}

/// One scripted tag event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioStep {
    /// Milliseconds to wait after the previous step before applying this one.
    pub after_ms: u64,
    /// Mux channel of the reader pad the step touches.
    pub channel: u8,
    /// Hex UID to place on the pad; omit to clear the pad instead.
    #[serde(default)]
    pub uid: Option<String>,
}

/// A scenario step with its UID parsed and its channel checked.
#[derive(Debug, Clone)]
pub struct ScenarioEvent {
    pub after_ms: u64,
    pub channel: u8,
    pub tag: Option<TagUid>,
}

impl RunConfig {
    /// Read a config file, falling back to defaults when it does not exist.
    ///
    /// A file that exists but fails to parse is an error: silently running
    /// with defaults after a typo would mask the mistake.
    pub fn load(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(json) => {
                let config = serde_json::from_str(&json)
                    .with_context(|| format!("parsing config file {}", path.display()))?;
                info!("Loaded config from {}", path.display());
                Ok(config)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("No config at {}; using defaults", path.display());
                Ok(RunConfig::default())
            }
            Err(e) => {
                Err(e).with_context(|| format!("reading config file {}", path.display()))
            }
        }
    }

    /// Validate every scenario step up front.
    ///
    /// Catching a bad UID here beats discovering it minutes into a
    /// scripted run.
    pub fn scenario_events(&self) -> Result<Vec<ScenarioEvent>> {
        self.scenario
            .iter()
            .enumerate()
            .map(|(index, step)| {
                BusChannel::new(step.channel)
                    .with_context(|| format!("scenario step {index}"))?;
                let tag = step
                    .uid
                    .as_deref()
                    .map(TagUid::parse)
                    .transpose()
                    .with_context(|| format!("scenario step {index}"))?;
                Ok(ScenarioEvent {
                    after_ms: step.after_ms,
                    channel: step.channel,
                    tag,
                })
            })
            .collect()
    }
}
