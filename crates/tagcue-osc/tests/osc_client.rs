//! Integration tests for OscClient.
//!
//! These tests run real UDP I/O over loopback: a receiver socket stands in
//! for the control surface and asserts the exact bytes on the wire.

use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::time::timeout;

use tagcue_core::types::{ClipId, TrackId};
use tagcue_osc::{OscClient, OscClientConfig};
use tagcue_session::actions::ControlSink;

/// Bind a loopback receiver and a client aimed at it.
async fn loopback_pair() -> (UdpSocket, OscClient) {
    let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let port = receiver.local_addr().unwrap().port();

    let client = OscClient::connect(OscClientConfig {
        host: "127.0.0.1".to_string(),
        port,
    })
    .await
    .unwrap();

    (receiver, client)
}

async fn recv_packet(receiver: &UdpSocket) -> Vec<u8> {
    let mut buf = [0u8; 256];
    let len = timeout(Duration::from_secs(2), receiver.recv(&mut buf))
        .await
        .expect("datagram within deadline")
        .unwrap();
    buf[..len].to_vec()
}

#[tokio::test]
async fn test_fire_clip_reaches_the_surface() {
    let (receiver, mut client) = loopback_pair().await;

    client
        .fire_clip(TrackId::new(1), ClipId::new(0))
        .await
        .unwrap();

    let packet = recv_packet(&receiver).await;
    let mut expected = Vec::new();
    expected.extend_from_slice(b"/live/clip/fire\0");
    expected.extend_from_slice(b",ii\0");
    expected.extend_from_slice(&1i32.to_be_bytes());
    expected.extend_from_slice(&0i32.to_be_bytes());
    assert_eq!(packet, expected);
}

#[tokio::test]
async fn test_stop_all_clips_reaches_the_surface() {
    let (receiver, mut client) = loopback_pair().await;

    client.stop_all_clips(TrackId::new(11)).await.unwrap();

    let packet = recv_packet(&receiver).await;
    let mut expected = Vec::new();
    expected.extend_from_slice(b"/live/track/stop_all_clips\0\0");
    expected.extend_from_slice(b",i\0\0");
    expected.extend_from_slice(&11i32.to_be_bytes());
    assert_eq!(packet, expected);
}

#[tokio::test]
async fn test_messages_arrive_as_separate_datagrams() {
    let (receiver, mut client) = loopback_pair().await;

    // An idle pad's cycle: six stops, then a fire when a tag lands.
    for track in 0..6 {
        client.stop_all_clips(TrackId::new(track)).await.unwrap();
    }
    client
        .fire_clip(TrackId::new(2), ClipId::new(0))
        .await
        .unwrap();

    for _ in 0..6 {
        let packet = recv_packet(&receiver).await;
        assert!(packet.starts_with(b"/live/track/stop_all_clips\0"));
    }
    let last = recv_packet(&receiver).await;
    assert!(last.starts_with(b"/live/clip/fire\0"));
}

#[tokio::test]
async fn test_peer_reports_the_resolved_target() {
    let (receiver, client) = loopback_pair().await;
    assert_eq!(client.peer(), receiver.local_addr().unwrap());
}
