//! Mock I2C segment for testing and development.
//!
//! This module simulates the full multiplexed bus: the channel multiplexer,
//! reader chips with their frame protocol, and display controllers. Tests
//! wire devices onto channels through the handle, then drive the bus half
//! through the same traits the real hardware implements.

use crate::traits::I2cBus;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tagcue_core::{
    Error, Result, TagUid,
    constants::{
        ACK_FRAME, DIRECTION_HOST_TO_READER, DIRECTION_READER_TO_HOST, MUX_I2C_ADDRESS,
        READER_I2C_ADDRESS, READY_SENTINEL, WAKE_PREAMBLE,
    },
    types::DisplayAddress,
};
use tagcue_protocol::{Command, build_frame, parse_frame};
use tokio::sync::Mutex;

/// Simulated reader chip state.
#[derive(Debug, Default)]
struct ReaderSim {
    /// Whether the chip has seen a wake preamble since power-up.
    powered: bool,

    /// Frames queued for the host to read, oldest first.
    pending: VecDeque<Vec<u8>>,

    /// Tag currently in the RF field, if any.
    tag: Option<TagUid>,

    /// A detection command arrived with an empty field; the listing frame
    /// materializes when a tag is presented.
    awaiting_target: bool,
}

impl ReaderSim {
    fn handle_frame(&mut self, bytes: &[u8]) {
        if bytes == WAKE_PREAMBLE {
            self.powered = true;
            self.pending.clear();
            self.awaiting_target = false;
            return;
        }
        if !self.powered {
            // A sleeping chip acknowledges the address but drops the bytes.
            return;
        }
        let Ok(body) = parse_frame(bytes) else {
            return;
        };
        if body.direction != DIRECTION_HOST_TO_READER {
            return;
        }
        let Ok(command) = Command::from_code(body.code) else {
            self.pending.push_back(ACK_FRAME.to_vec());
            return;
        };

        self.pending.push_back(ACK_FRAME.to_vec());
        match command {
            Command::SamConfiguration => {
                self.queue_response(command, &[]);
            }
            Command::GetFirmwareVersion => {
                self.queue_response(command, &[0x32, 0x01, 0x06, 0x07]);
            }
            Command::InListPassiveTarget => match self.tag.clone() {
                Some(uid) => self.queue_target(&uid),
                None => self.awaiting_target = true,
            },
        }
    }

    fn queue_response(&mut self, command: Command, payload: &[u8]) {
        let mut body = vec![DIRECTION_READER_TO_HOST, command.response_code()];
        body.extend_from_slice(payload);
        self.pending.push_back(build_frame(&body).to_vec());
    }

    fn queue_target(&mut self, uid: &TagUid) {
        let raw = uid.to_bytes();
        let mut payload = vec![0x01, 0x01, 0x00, 0x44, 0x00, raw.len() as u8];
        payload.extend_from_slice(&raw);
        self.queue_response(Command::InListPassiveTarget, &payload);
    }
}

/// Devices wired onto one multiplexer channel.
#[derive(Debug, Default)]
struct ChannelSim {
    reader: Option<ReaderSim>,
    display: Option<DisplayAddress>,
    extra_addresses: Vec<u8>,
}

impl ChannelSim {
    fn answers_at(&self, address: u8) -> bool {
        (self.reader.is_some() && address == READER_I2C_ADDRESS)
            || self.display.map(DisplayAddress::address) == Some(address)
            || self.extra_addresses.contains(&address)
    }
}

#[derive(Debug, Default)]
struct BusState {
    /// Channel currently routed by the multiplexer.
    selected: Option<u8>,

    channels: HashMap<u8, ChannelSim>,

    /// Every selector byte written to the multiplexer, in order.
    selector_writes: Vec<u8>,

    /// Every device write, in order, as (address, bytes).
    write_log: Vec<(u8, Vec<u8>)>,

    /// Reads issued per address.
    read_counts: HashMap<u8, usize>,

    /// Remaining injected write failures per address.
    write_faults: HashMap<u8, u32>,

    /// Remaining injected read failures per address.
    read_faults: HashMap<u8, u32>,
}

impl BusState {
    fn take_fault(faults: &mut HashMap<u8, u32>, address: u8) -> bool {
        match faults.get_mut(&address) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                true
            }
            _ => false,
        }
    }

    fn routed_channel(&mut self, address: u8) -> Result<&mut ChannelSim> {
        let channel = self
            .selected
            .ok_or_else(|| Error::bus(format!("address 0x{address:02x}: no channel routed")))?;
        match self.channels.get_mut(&channel) {
            Some(sim) if sim.answers_at(address) => Ok(sim),
            _ => Err(Error::bus(format!(
                "address 0x{address:02x} did not acknowledge on channel {channel}"
            ))),
        }
    }
}

/// Mock I2C bus behind a simulated channel multiplexer.
///
/// The bus half implements [`I2cBus`] and plugs into [`SharedBus`]; the
/// paired [`MockBusHandle`] wires devices onto channels, injects tags and
/// faults, and inspects the traffic the code under test produced.
///
/// Reader chips are simulated down to the frame protocol: they need the
/// wake preamble before accepting commands, acknowledge each command, and
/// serve the response on the following reads.
///
/// [`SharedBus`]: crate::bus::SharedBus
///
/// # Examples
///
/// ```
/// use tagcue_core::TagUid;
/// use tagcue_hardware::bus::SharedBus;
/// use tagcue_hardware::link::ReaderLink;
/// use tagcue_hardware::mock::MockBus;
///
/// #[tokio::main]
/// async fn main() -> tagcue_core::Result<()> {
///     let (raw, handle) = MockBus::new();
///     handle.add_reader(0).await;
///     handle.present_tag(0, &TagUid::parse("33c29c92")?).await;
///
///     let mut bus = SharedBus::new(raw);
///     bus.select(0).await?;
///
///     let mut link = ReaderLink::default();
///     link.wake(&mut bus).await?;
///
///     let target = link.read_passive_target(&mut bus).await;
///     assert_eq!(target.unwrap().uid.as_str(), "33c29c92");
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct MockBus {
    state: Arc<Mutex<BusState>>,
}

impl MockBus {
    /// Create a mock bus with no devices wired.
    ///
    /// Returns the bus half and the control handle.
    pub fn new() -> (Self, MockBusHandle) {
        let state = Arc::new(Mutex::new(BusState::default()));
        let bus = MockBus {
            state: Arc::clone(&state),
        };
        (bus, MockBusHandle { state })
    }
}

impl I2cBus for MockBus {
    async fn write(&mut self, address: u8, bytes: &[u8]) -> Result<()> {
        let mut state = self.state.lock().await;
        if BusState::take_fault(&mut state.write_faults, address) {
            return Err(Error::bus(format!(
                "injected write failure at 0x{address:02x}"
            )));
        }
        state.write_log.push((address, bytes.to_vec()));

        if address == MUX_I2C_ADDRESS {
            let [selector] = bytes else {
                return Err(Error::bus("multiplexer expects a single selector byte"));
            };
            state.selector_writes.push(*selector);
            state.selected = if *selector == 0 {
                None
            } else {
                Some(selector.trailing_zeros() as u8)
            };
            return Ok(());
        }

        let sim = state.routed_channel(address)?;
        if address == READER_I2C_ADDRESS {
            if let Some(reader) = sim.reader.as_mut() {
                reader.handle_frame(bytes);
            }
        }
        Ok(())
    }

    async fn read(&mut self, address: u8, count: usize) -> Result<Vec<u8>> {
        let mut state = self.state.lock().await;
        if BusState::take_fault(&mut state.read_faults, address) {
            return Err(Error::bus(format!(
                "injected read failure at 0x{address:02x}"
            )));
        }
        *state.read_counts.entry(address).or_insert(0) += 1;

        let sim = state.routed_channel(address)?;
        let Some(reader) = sim.reader.as_mut().filter(|_| address == READER_I2C_ADDRESS) else {
            return Ok(vec![0x00; count]);
        };

        if count <= 1 {
            // Status peek: ready exactly when a frame is waiting.
            let status = if reader.pending.front().is_some() {
                READY_SENTINEL
            } else {
                0x00
            };
            return Ok(vec![status; count.min(1)]);
        }

        match reader.pending.pop_front() {
            Some(frame) => {
                let mut out = Vec::with_capacity(count);
                out.push(READY_SENTINEL);
                out.extend_from_slice(&frame);
                // Fixed-size reads clip long frames and pad short ones.
                out.resize(count, 0x00);
                Ok(out)
            }
            None => Ok(vec![0x00; count]),
        }
    }

    async fn scan(&mut self) -> Result<Vec<u8>> {
        let state = self.state.lock().await;
        let mut found = vec![MUX_I2C_ADDRESS];
        if let Some(sim) = state.selected.and_then(|ch| state.channels.get(&ch)) {
            if sim.reader.is_some() {
                found.push(READER_I2C_ADDRESS);
            }
            if let Some(strap) = sim.display {
                found.push(strap.address());
            }
            found.extend_from_slice(&sim.extra_addresses);
        }
        found.sort_unstable();
        found.dedup();
        Ok(found)
    }
}

/// Handle for controlling a [`MockBus`].
///
/// All methods take effect immediately; the bus half observes them on its
/// next operation.
#[derive(Debug, Clone)]
pub struct MockBusHandle {
    state: Arc<Mutex<BusState>>,
}

impl MockBusHandle {
    /// Wire a powered-down reader onto a channel.
    pub async fn add_reader(&self, channel: u8) {
        let mut state = self.state.lock().await;
        state.channels.entry(channel).or_default().reader = Some(ReaderSim::default());
    }

    /// Wire a display onto a channel at the given strap address.
    pub async fn add_display(&self, channel: u8, strap: DisplayAddress) {
        let mut state = self.state.lock().await;
        state.channels.entry(channel).or_default().display = Some(strap);
    }

    /// Wire an arbitrary address onto a channel.
    ///
    /// The device acknowledges reads and writes but has no behavior; use it
    /// to exercise discovery of unexpected hardware.
    pub async fn add_device(&self, channel: u8, address: u8) {
        let mut state = self.state.lock().await;
        state
            .channels
            .entry(channel)
            .or_default()
            .extra_addresses
            .push(address);
    }

    /// Place a tag in the field of the reader on `channel`.
    ///
    /// If the reader has a detection command outstanding, the target
    /// listing materializes immediately. No effect unless a reader was
    /// wired onto the channel.
    pub async fn present_tag(&self, channel: u8, uid: &TagUid) {
        let mut state = self.state.lock().await;
        if let Some(reader) = state.channels.entry(channel).or_default().reader.as_mut() {
            reader.tag = Some(uid.clone());
            if reader.awaiting_target {
                reader.awaiting_target = false;
                let uid = uid.clone();
                reader.queue_target(&uid);
            }
        }
    }

    /// Remove the tag from the field of the reader on `channel`.
    pub async fn remove_tag(&self, channel: u8) {
        let mut state = self.state.lock().await;
        if let Some(reader) = state.channels.entry(channel).or_default().reader.as_mut() {
            reader.tag = None;
        }
    }

    /// Queue raw bytes as the next frame the reader serves.
    ///
    /// Used to exercise malformed-frame handling.
    pub async fn push_raw_frame(&self, channel: u8, bytes: Vec<u8>) {
        let mut state = self.state.lock().await;
        if let Some(reader) = state.channels.entry(channel).or_default().reader.as_mut() {
            reader.pending.push_back(bytes);
        }
    }

    /// Fail the next `count` writes to `address`.
    pub async fn fail_writes(&self, address: u8, count: u32) {
        let mut state = self.state.lock().await;
        *state.write_faults.entry(address).or_insert(0) += count;
    }

    /// Fail the next `count` reads from `address`.
    pub async fn fail_reads(&self, address: u8, count: u32) {
        let mut state = self.state.lock().await;
        *state.read_faults.entry(address).or_insert(0) += count;
    }

    /// Channel currently routed by the multiplexer.
    pub async fn selected(&self) -> Option<u8> {
        self.state.lock().await.selected
    }

    /// Every selector byte written to the multiplexer, in order.
    pub async fn selector_writes(&self) -> Vec<u8> {
        self.state.lock().await.selector_writes.clone()
    }

    /// Every write made to `address`, in order.
    pub async fn writes_to(&self, address: u8) -> Vec<Vec<u8>> {
        self.state
            .lock()
            .await
            .write_log
            .iter()
            .filter(|(a, _)| *a == address)
            .map(|(_, bytes)| bytes.clone())
            .collect()
    }

    /// Total number of writes on the bus, selector writes included.
    pub async fn write_count(&self) -> usize {
        self.state.lock().await.write_log.len()
    }

    /// Number of reads issued to `address`, injected failures excluded.
    pub async fn read_count(&self, address: u8) -> usize {
        self.state
            .lock()
            .await
            .read_counts
            .get(&address)
            .copied()
            .unwrap_or(0)
    }

    /// Whether the reader on `channel` has completed a wake sequence.
    pub async fn is_powered(&self, channel: u8) -> bool {
        self.state
            .lock()
            .await
            .channels
            .get(&channel)
            .and_then(|sim| sim.reader.as_ref())
            .is_some_and(|reader| reader.powered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tagcue_protocol::{build_command_frame, is_ack};

    async fn select(bus: &mut MockBus, channel: u8) {
        bus.write(MUX_I2C_ADDRESS, &[1u8 << channel]).await.unwrap();
    }

    #[tokio::test]
    async fn test_mock_bus_scan_sees_selected_channel_only() {
        let (mut bus, handle) = MockBus::new();
        handle.add_reader(1).await;
        handle.add_display(1, DisplayAddress::Primary).await;
        handle.add_display(4, DisplayAddress::Secondary).await;

        select(&mut bus, 1).await;
        assert_eq!(bus.scan().await.unwrap(), vec![0x24, 0x3C, 0x70]);

        select(&mut bus, 4).await;
        assert_eq!(bus.scan().await.unwrap(), vec![0x3D, 0x70]);

        select(&mut bus, 6).await;
        assert_eq!(bus.scan().await.unwrap(), vec![0x70]);
    }

    #[tokio::test]
    async fn test_mock_bus_unrouted_write_is_rejected() {
        let (mut bus, handle) = MockBus::new();
        handle.add_reader(0).await;

        let err = bus
            .write(READER_I2C_ADDRESS, &WAKE_PREAMBLE)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Bus(_)));

        // The reader answers only on its own channel.
        select(&mut bus, 3).await;
        assert!(bus.write(READER_I2C_ADDRESS, &WAKE_PREAMBLE).await.is_err());
        select(&mut bus, 0).await;
        assert!(bus.write(READER_I2C_ADDRESS, &WAKE_PREAMBLE).await.is_ok());
    }

    #[tokio::test]
    async fn test_mock_reader_ignores_commands_before_wake() {
        let (mut bus, handle) = MockBus::new();
        handle.add_reader(0).await;
        select(&mut bus, 0).await;

        let frame = build_command_frame(Command::GetFirmwareVersion, &[]);
        bus.write(READER_I2C_ADDRESS, &frame).await.unwrap();
        assert_eq!(bus.read(READER_I2C_ADDRESS, 1).await.unwrap(), vec![0x00]);

        bus.write(READER_I2C_ADDRESS, &WAKE_PREAMBLE).await.unwrap();
        bus.write(READER_I2C_ADDRESS, &frame).await.unwrap();
        assert_eq!(bus.read(READER_I2C_ADDRESS, 1).await.unwrap(), vec![0x01]);
    }

    #[tokio::test]
    async fn test_mock_reader_serves_ack_then_response() {
        let (mut bus, handle) = MockBus::new();
        handle.add_reader(0).await;
        select(&mut bus, 0).await;
        bus.write(READER_I2C_ADDRESS, &WAKE_PREAMBLE).await.unwrap();

        let frame = build_command_frame(
            Command::SamConfiguration,
            Command::SamConfiguration.default_params(),
        );
        bus.write(READER_I2C_ADDRESS, &frame).await.unwrap();

        let ack = bus.read(READER_I2C_ADDRESS, 7).await.unwrap();
        assert_eq!(ack[0], READY_SENTINEL);
        assert!(is_ack(&ack[1..]));

        let response = bus.read(READER_I2C_ADDRESS, 10).await.unwrap();
        assert_eq!(response[0], READY_SENTINEL);
        assert_eq!(&response[1..4], &[0x00, 0x00, 0xFF]);
    }

    #[tokio::test]
    async fn test_mock_reader_pads_and_clips_fixed_reads() {
        let (mut bus, handle) = MockBus::new();
        handle.add_reader(0).await;
        handle.push_raw_frame(0, vec![0xAA, 0xBB, 0xCC]).await;
        select(&mut bus, 0).await;

        // Read larger than the frame pads with zeros.
        let long = bus.read(READER_I2C_ADDRESS, 6).await.unwrap();
        assert_eq!(long, vec![0x01, 0xAA, 0xBB, 0xCC, 0x00, 0x00]);

        // Read smaller than the frame clips the tail.
        handle.push_raw_frame(0, vec![0xAA, 0xBB, 0xCC]).await;
        let short = bus.read(READER_I2C_ADDRESS, 3).await.unwrap();
        assert_eq!(short, vec![0x01, 0xAA, 0xBB]);
    }

    #[tokio::test]
    async fn test_mock_late_tag_materializes_listing() {
        let (mut bus, handle) = MockBus::new();
        handle.add_reader(0).await;
        select(&mut bus, 0).await;
        bus.write(READER_I2C_ADDRESS, &WAKE_PREAMBLE).await.unwrap();

        let frame = build_command_frame(
            Command::InListPassiveTarget,
            Command::InListPassiveTarget.default_params(),
        );
        bus.write(READER_I2C_ADDRESS, &frame).await.unwrap();

        // ACK is immediate, but the listing waits on a tag.
        let ack = bus.read(READER_I2C_ADDRESS, 7).await.unwrap();
        assert!(is_ack(&ack[1..]));
        assert_eq!(bus.read(READER_I2C_ADDRESS, 1).await.unwrap(), vec![0x00]);

        handle
            .present_tag(0, &TagUid::parse("33c29c92").unwrap())
            .await;
        assert_eq!(bus.read(READER_I2C_ADDRESS, 1).await.unwrap(), vec![0x01]);
    }

    #[tokio::test]
    async fn test_mock_fault_injection_is_consumed() {
        let (mut bus, handle) = MockBus::new();
        handle.add_reader(0).await;
        handle.fail_writes(READER_I2C_ADDRESS, 1).await;
        select(&mut bus, 0).await;

        assert!(bus.write(READER_I2C_ADDRESS, &WAKE_PREAMBLE).await.is_err());
        assert!(bus.write(READER_I2C_ADDRESS, &WAKE_PREAMBLE).await.is_ok());

        handle.fail_reads(READER_I2C_ADDRESS, 2).await;
        assert!(bus.read(READER_I2C_ADDRESS, 1).await.is_err());
        assert!(bus.read(READER_I2C_ADDRESS, 1).await.is_err());
        assert!(bus.read(READER_I2C_ADDRESS, 1).await.is_ok());
    }
}
