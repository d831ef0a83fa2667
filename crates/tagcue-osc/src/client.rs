//! UDP client for the OSC control surface.
//!
//! The client binds an ephemeral local socket, points it at the configured
//! target, and sends each message as one datagram. There is no handshake,
//! no acknowledgement, and no retry: the session loop re-asserts stops on
//! every idle cycle, so a lost datagram heals on its own. A fire that
//! fails to send is reported through the sink's error and logged by
//! dispatch.
//!
//! # Design Principles
//!
//! - **No automatic retry**: the caller's cadence is the retry loop
//! - **No connection state**: UDP connect only fixes the destination
//! - **Simple error handling**: clear errors, no recovery

use std::net::SocketAddr;

use serde::{Deserialize, Serialize};
use tokio::net::UdpSocket;
use tracing::{debug, info};

use tagcue_core::Result;
use tagcue_core::types::{ClipId, TrackId};
use tagcue_session::actions::ControlSink;

use crate::encode;

/// Default OSC target port the control surface listens on.
pub const DEFAULT_OSC_PORT: u16 = 11000;

/// Where the control surface listens.
///
/// # Examples
///
/// ```
/// use tagcue_osc::OscClientConfig;
///
/// let config = OscClientConfig::default();
/// assert_eq!(config.port, 11000);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OscClientConfig {
    /// Host running the control surface.
    pub host: String,

    /// UDP port the surface listens on.
    pub port: u16,
}

impl Default for OscClientConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_OSC_PORT,
        }
    }
}

/// Fire-and-forget OSC sender over UDP.
///
/// Implements [`ControlSink`], so a [`SessionRunner`] can drive a live
/// control surface with it directly.
///
/// [`SessionRunner`]: tagcue_session::runner::SessionRunner
///
/// # Examples
///
/// ```no_run
/// use tagcue_core::types::{ClipId, TrackId};
/// use tagcue_osc::{OscClient, OscClientConfig};
/// use tagcue_session::actions::ControlSink;
///
/// #[tokio::main]
/// async fn main() -> tagcue_core::Result<()> {
///     let mut client = OscClient::connect(OscClientConfig::default()).await?;
///     client.fire_clip(TrackId::new(1), ClipId::new(0)).await?;
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct OscClient {
    socket: UdpSocket,
    peer: SocketAddr,
}

impl OscClient {
    /// Bind an ephemeral local socket and aim it at the target.
    ///
    /// UDP connect only fixes the destination; no datagram leaves until
    /// the first message, and an absent peer is not an error here.
    ///
    /// # Errors
    ///
    /// Returns an error if the local bind fails or the target host does
    /// not resolve.
    pub async fn connect(config: OscClientConfig) -> Result<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        socket
            .connect((config.host.as_str(), config.port))
            .await?;
        let peer = socket.peer_addr()?;
        info!("OSC client aimed at {}", peer);
        Ok(Self { socket, peer })
    }

    /// The resolved target address.
    pub fn peer(&self) -> SocketAddr {
        self.peer
    }
}

impl ControlSink for OscClient {
    async fn fire_clip(&mut self, track: TrackId, clip: ClipId) -> Result<()> {
        let packet = encode::fire_clip(track, clip);
        self.socket.send(&packet).await?;
        debug!("Sent OSC: {} {} {}", encode::FIRE_CLIP_ADDRESS, track, clip);
        Ok(())
    }

    async fn stop_all_clips(&mut self, track: TrackId) -> Result<()> {
        let packet = encode::stop_all_clips(track);
        self.socket.send(&packet).await?;
        debug!("Sent OSC: {} {}", encode::STOP_ALL_CLIPS_ADDRESS, track);
        Ok(())
    }
}
