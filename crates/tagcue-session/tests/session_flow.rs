//! End-to-end session flow over the emulated rig.
//!
//! Drives a complete rig (mock bus, simulated reader chips, mock displays,
//! recording control sink) through the whole tag lifecycle:
//! 1. Empty pad → stop set re-asserted, idle screen
//! 2. Tag placed → group stopped, clip fired, present screen
//! 3. Tag held → silence, clip keeps running
//! 4. Tag removed or unmapped → group stopped, idle screen
//!
//! Connectivity loss, link degradation, and the shutdown flush ride the
//! same loop and are covered here too.

use std::collections::HashMap;

use tagcue_core::TagTable;
use tagcue_core::constants::READER_I2C_ADDRESS;
use tagcue_core::types::{ClipId, ClipSlot, DisplayAddress, TagUid, TrackId};
use tagcue_hardware::mock::{MockBus, MockBusHandle, MockDisplay, MockDisplayHandle};
use tagcue_session::{
    ControlMessage, OnlineFlag, RecordingSink, RecordingSinkHandle, SessionRunner,
    SessionRunnerConfig, SessionState,
};

// ============================================================================
// Test Rig
// ============================================================================

/// UID mapped to slot 1 in the test table.
const MAPPED_UID: &str = "33c29c92";

/// Seven-byte UID mapped to slot 4.
const LONG_UID: &str = "04a224b2c35e80";

/// UID with no table entry.
const UNMAPPED_UID: &str = "deadbeef";

struct Rig {
    runner: SessionRunner<MockBus, MockDisplay, RecordingSink>,
    bus: MockBusHandle,
    sink: RecordingSinkHandle,
    displays: Vec<MockDisplayHandle>,
    online: OnlineFlag,
}

/// Bring up a rig with readers and displays on the given mux channels and
/// the standard two-entry mapping table.
async fn bring_up(reader_channels: &[u8], display_channels: &[u8]) -> Rig {
    let (raw, bus) = MockBus::new();
    for &channel in reader_channels {
        bus.add_reader(channel).await;
    }
    for &channel in display_channels {
        bus.add_display(channel, DisplayAddress::Primary).await;
    }

    let table = TagTable::from_entries(HashMap::from([
        (uid(MAPPED_UID), slot(1)),
        (uid(LONG_UID), slot(4)),
    ]));

    let online = OnlineFlag::default();
    let (sink, sink_handle) = RecordingSink::new();
    let mut displays = Vec::new();
    let runner = SessionRunner::discover(
        raw,
        table,
        sink,
        SessionRunnerConfig::default(),
        online.clone(),
        |_, _| {
            let (display, handle) = MockDisplay::new();
            displays.push(handle);
            display
        },
    )
    .await
    .expect("rig discovery");

    Rig {
        runner,
        bus,
        sink: sink_handle,
        displays,
        online,
    }
}

fn uid(hex: &str) -> TagUid {
    TagUid::parse(hex).unwrap()
}

fn slot(index: u8) -> ClipSlot {
    ClipSlot::new(index).unwrap()
}

fn fire(track: u16) -> ControlMessage {
    ControlMessage::Fire {
        track: TrackId::new(track),
        clip: ClipId::new(0),
    }
}

fn stops(range: std::ops::Range<u16>) -> Vec<ControlMessage> {
    range
        .map(|track| ControlMessage::StopAll {
            track: TrackId::new(track),
        })
        .collect()
}

// ============================================================================
// Tag Lifecycle
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_tag_lifecycle_on_one_pad() {
    let mut rig = bring_up(&[2], &[0]).await;

    // Cycle 1: empty pad holds the group stopped and draws the idle screen.
    rig.runner.poll_cycle().await.unwrap();
    assert_eq!(rig.sink.sent().await, stops(0..6));
    assert_eq!(
        rig.displays[0].visible_lines().await,
        vec!["No Tag detected", "Stopping tracks:", "0/5"]
    );

    // Cycle 2: the mapped tag lands; slot 1 on reader 0 is track 1.
    rig.sink.clear().await;
    rig.bus.present_tag(2, &uid(MAPPED_UID)).await;
    rig.runner.poll_cycle().await.unwrap();

    let mut expected = stops(0..6);
    expected.push(fire(1));
    assert_eq!(rig.sink.sent().await, expected);
    assert_eq!(
        rig.runner.sessions()[0].state(),
        SessionState::Present(TrackId::new(1))
    );
    assert_eq!(
        rig.displays[0].visible_lines().await,
        vec!["NFC id:33c29c92", "Tag id: 1", "Track id: 1"]
    );

    // Cycles 3-5: holding the tag is silence, no re-fire.
    rig.sink.clear().await;
    for _ in 0..3 {
        rig.runner.poll_cycle().await.unwrap();
    }
    assert!(rig.sink.sent().await.is_empty());
    assert_eq!(rig.runner.stats().fires(), 1);

    // Cycle 6: removal stops the group and falls back to the idle screen.
    rig.bus.remove_tag(2).await;
    rig.runner.poll_cycle().await.unwrap();
    assert_eq!(rig.sink.sent().await, stops(0..6));
    assert_eq!(rig.runner.sessions()[0].state(), SessionState::Idle);
    assert_eq!(
        rig.displays[0].visible_lines().await,
        vec!["No Tag detected", "Stopping tracks:", "0/5"]
    );
}

#[tokio::test(start_paused = true)]
async fn test_unmapped_tag_never_fires() {
    let mut rig = bring_up(&[2], &[0]).await;

    rig.bus.present_tag(2, &uid(UNMAPPED_UID)).await;
    rig.runner.poll_cycle().await.unwrap();

    assert_eq!(rig.sink.sent().await, stops(0..6));
    assert_eq!(rig.runner.sessions()[0].state(), SessionState::Idle);
    assert_eq!(rig.runner.stats().fires(), 0);
    assert_eq!(
        rig.displays[0].visible_lines().await,
        vec!["No Tag detected", "Stopping tracks:", "0/5"]
    );
}

#[tokio::test(start_paused = true)]
async fn test_tag_swap_restops_before_firing() {
    let mut rig = bring_up(&[2], &[0]).await;

    rig.bus.present_tag(2, &uid(MAPPED_UID)).await;
    rig.runner.poll_cycle().await.unwrap();
    rig.sink.clear().await;

    // Swap for the tag mapped to slot 4 without an empty cycle between.
    rig.bus.present_tag(2, &uid(LONG_UID)).await;
    rig.runner.poll_cycle().await.unwrap();

    let mut expected = stops(0..6);
    expected.push(fire(4));
    assert_eq!(rig.sink.sent().await, expected);
    assert_eq!(
        rig.runner.sessions()[0].state(),
        SessionState::Present(TrackId::new(4))
    );
}

#[tokio::test(start_paused = true)]
async fn test_long_uid_is_clipped_by_the_panel() {
    let mut rig = bring_up(&[2], &[0]).await;

    rig.bus.present_tag(2, &uid(LONG_UID)).await;
    rig.runner.poll_cycle().await.unwrap();

    // 21 characters of UID line, 16 columns of panel.
    assert_eq!(
        rig.displays[0].visible_lines().await,
        vec!["NFC id:04a224b2c", "Tag id: 4", "Track id: 4"]
    );
}

// ============================================================================
// Multiple Readers
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_second_reader_controls_its_own_window() {
    let mut rig = bring_up(&[2, 5], &[0, 3]).await;

    // Tag on the second pad: slot 1 inside track group 6-11 is track 7.
    rig.bus.present_tag(5, &uid(MAPPED_UID)).await;
    rig.runner.poll_cycle().await.unwrap();

    let mut expected = stops(0..6); // pad 0 idles
    expected.extend(stops(6..12)); // pad 1 stops its own group
    expected.push(fire(7));
    assert_eq!(rig.sink.sent().await, expected);

    assert_eq!(rig.runner.sessions()[0].state(), SessionState::Idle);
    assert_eq!(
        rig.runner.sessions()[1].state(),
        SessionState::Present(TrackId::new(7))
    );

    // Each pad draws its own feedback.
    assert_eq!(
        rig.displays[0].visible_lines().await,
        vec!["No Tag detected", "Stopping tracks:", "0/5"]
    );
    assert_eq!(
        rig.displays[1].visible_lines().await,
        vec!["NFC id:33c29c92", "Tag id: 1", "Track id: 7"]
    );
}

// ============================================================================
// Connectivity and Link Health
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_offline_flag_prefixes_idle_screen() {
    let mut rig = bring_up(&[2], &[0]).await;

    rig.online.set(false);
    rig.runner.poll_cycle().await.unwrap();
    assert_eq!(
        rig.displays[0].visible_lines().await,
        vec!["No WiFi", "No Tag detected", "Stopping tracks:", "0/5"]
    );

    rig.online.set(true);
    rig.runner.poll_cycle().await.unwrap();
    assert_eq!(
        rig.displays[0].visible_lines().await,
        vec!["No Tag detected", "Stopping tracks:", "0/5"]
    );
}

#[tokio::test(start_paused = true)]
async fn test_degraded_link_annotates_idle_screen() {
    let mut rig = bring_up(&[2], &[0]).await;

    // One failed poll powers the link down, two failed wakes follow: three
    // consecutive failures crosses the degraded threshold.
    rig.bus.fail_writes(READER_I2C_ADDRESS, 3).await;
    for _ in 0..3 {
        rig.runner.poll_cycle().await.unwrap();
    }
    assert_eq!(
        rig.displays[0].visible_lines().await,
        vec![
            "No Tag detected",
            "Stopping tracks:",
            "0/5",
            "Link degraded"
        ]
    );
    assert_eq!(rig.runner.stats().link_failures(), 3);

    // Faults exhausted: the next wake succeeds and the warning clears.
    rig.runner.poll_cycle().await.unwrap();
    assert_eq!(
        rig.displays[0].visible_lines().await,
        vec!["No Tag detected", "Stopping tracks:", "0/5"]
    );
}

// ============================================================================
// Shutdown
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_shutdown_flushes_stops_for_every_group() {
    let mut rig = bring_up(&[2, 5], &[0, 3]).await;

    rig.bus.present_tag(2, &uid(MAPPED_UID)).await;
    rig.runner.poll_cycle().await.unwrap();
    rig.sink.clear().await;

    rig.runner.stop_everything().await;

    assert_eq!(rig.sink.sent().await, stops(0..12));
    assert!(rig.runner.sessions().iter().all(|s| !s.is_present()));
}
