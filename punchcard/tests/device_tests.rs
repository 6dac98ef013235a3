//! Device tests against a scripted transport
//!
//! Each test scripts the exact packet sequence a terminal would send
//! and drives the public API over it. No sockets involved.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use bytes::BytesMut;

use punchcard::{
    extract_all, ChecksumKind, Command, Device, DeviceEndpoint, Error, ExtractionStep,
    MemoryInfoCache, Packet, Transport, TransportKind,
};

/// One scripted transport event, consumed per `receive` call
enum ScriptItem {
    /// Hand these bytes to the caller
    Reply(Vec<u8>),
    /// Simulate a read timeout
    Timeout,
    /// Simulate the remote closing the connection
    Drop,
}

struct ScriptedTransport {
    script: VecDeque<ScriptItem>,
    connected: bool,
}

impl ScriptedTransport {
    fn new(script: Vec<ScriptItem>) -> Box<Self> {
        Box::new(Self {
            script: script.into(),
            connected: false,
        })
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn connect(&mut self) -> punchcard_transport::Result<()> {
        self.connected = true;
        Ok(())
    }

    async fn disconnect(&mut self) -> punchcard_transport::Result<()> {
        self.connected = false;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    async fn send(&mut self, _data: &[u8]) -> punchcard_transport::Result<()> {
        Ok(())
    }

    async fn receive(&mut self, _timeout: Duration) -> punchcard_transport::Result<BytesMut> {
        match self.script.pop_front() {
            Some(ScriptItem::Reply(bytes)) => Ok(BytesMut::from(&bytes[..])),
            Some(ScriptItem::Timeout) | None => Err(punchcard_transport::Error::ReadTimeout),
            Some(ScriptItem::Drop) => {
                self.connected = false;
                Err(punchcard_transport::Error::ConnectionClosed)
            }
        }
    }

    fn remote_addr(&self) -> String {
        "scripted:4370".to_string()
    }
}

/// Encode one terminal reply
fn reply(command: Command, session_id: u16, reply_id: u16, payload: &[u8]) -> ScriptItem {
    let packet = Packet::with_payload(command, session_id, reply_id, payload.to_vec());
    ScriptItem::Reply(packet.encode(ChecksumKind::OnesComplement).to_vec())
}

/// Same reply with one payload byte corrupted after encoding
fn corrupted_reply(command: Command, session_id: u16, reply_id: u16, payload: &[u8]) -> ScriptItem {
    let packet = Packet::with_payload(command, session_id, reply_id, payload.to_vec());
    let mut bytes = packet.encode(ChecksumKind::OnesComplement).to_vec();
    let last = bytes.len() - 1;
    bytes[last] ^= 0xFF;
    ScriptItem::Reply(bytes)
}

const SESSION: u16 = 0x1234;

async fn connect(script: Vec<ScriptItem>, endpoint: &DeviceEndpoint) -> punchcard::Result<Device> {
    Device::connect_with(ScriptedTransport::new(script), endpoint).await
}

fn modern_user_slice(uid: u16, user_id: &str, name: &str) -> Vec<u8> {
    let mut slice = vec![0u8; 72];
    slice[0..2].copy_from_slice(&uid.to_le_bytes());
    slice[11..11 + name.len()].copy_from_slice(name.as_bytes());
    slice[48..48 + user_id.len()].copy_from_slice(user_id.as_bytes());
    slice
}

fn legacy_attendance_slice(uid: u16) -> Vec<u8> {
    // 2024-03-15 08:30:00 in packed-calendar form
    let ts: u32 = ((((24u32 * 12 + 2) * 31 + 14) * 24 + 8) * 60 + 30) * 60;

    let mut slice = vec![0u8; 16];
    slice[0..2].copy_from_slice(&uid.to_le_bytes());
    slice[2] = 0;
    slice[3] = 1;
    slice[4..8].copy_from_slice(&ts.to_le_bytes());
    slice
}

#[tokio::test]
async fn test_connect_without_auth() {
    let endpoint = DeviceEndpoint::new("scripted");
    let device = connect(vec![reply(Command::AckOk, SESSION, 0, &[])], &endpoint)
        .await
        .unwrap();

    assert!(device.is_connected());
    assert_eq!(device.session_id(), SESSION);
}

#[tokio::test]
async fn test_connect_with_auth_challenge() {
    let endpoint = DeviceEndpoint::new("scripted").with_password(123456);
    let device = connect(
        vec![
            reply(Command::AckUnauth, SESSION, 0, &[]),
            reply(Command::AckOk, SESSION, 0, &[]),
        ],
        &endpoint,
    )
    .await
    .unwrap();

    assert!(device.is_connected());
    assert_eq!(device.session_id(), SESSION);
}

#[tokio::test]
async fn test_auth_rejection() {
    let endpoint = DeviceEndpoint::new("scripted").with_password(1);
    let result = connect(
        vec![
            reply(Command::AckUnauth, SESSION, 0, &[]),
            reply(Command::AckError, SESSION, 0, &[]),
        ],
        &endpoint,
    )
    .await;

    assert!(matches!(result, Err(Error::Authentication)));
}

#[tokio::test]
async fn test_connect_timeout() {
    let endpoint = DeviceEndpoint::new("scripted");
    let result = connect(vec![ScriptItem::Timeout], &endpoint).await;

    assert!(matches!(result, Err(Error::Timeout { .. })));
}

#[tokio::test]
async fn test_stale_reply_discarded() {
    // A leftover reply from a previous session arrives first; the
    // handshake must skip it and match its own reply id
    let endpoint = DeviceEndpoint::new("scripted");
    let device = connect(
        vec![
            reply(Command::AckOk, 99, 5, &[]),
            reply(Command::AckOk, SESSION, 0, &[]),
        ],
        &endpoint,
    )
    .await
    .unwrap();

    assert_eq!(device.session_id(), SESSION);
}

#[tokio::test]
async fn test_checksum_failure_retried_once() {
    let users: Vec<u8> = modern_user_slice(1, "1001", "Alice");

    let endpoint = DeviceEndpoint::new("scripted");
    let mut device = connect(
        vec![
            reply(Command::AckOk, SESSION, 0, &[]),
            corrupted_reply(Command::Data, SESSION, 65534, &users),
            reply(Command::Data, SESSION, 65534, &users),
        ],
        &endpoint,
    )
    .await
    .unwrap();

    let (records, diagnostics) = device.get_users().await.unwrap().collect_all();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].name, "Alice");
    assert!(diagnostics.is_empty());
}

#[tokio::test]
async fn test_second_checksum_failure_is_fatal() {
    let users: Vec<u8> = modern_user_slice(1, "1001", "Alice");

    let endpoint = DeviceEndpoint::new("scripted");
    let mut device = connect(
        vec![
            reply(Command::AckOk, SESSION, 0, &[]),
            corrupted_reply(Command::Data, SESSION, 65534, &users),
            corrupted_reply(Command::Data, SESSION, 65534, &users),
        ],
        &endpoint,
    )
    .await
    .unwrap();

    let result = device.get_users().await;
    assert!(matches!(
        result,
        Err(Error::Protocol(punchcard_core::Error::ChecksumMismatch { .. }))
    ));

    // An exhausted retry budget invalidates the session
    assert!(!device.is_connected());
}

#[tokio::test]
async fn test_get_users_single_packet() {
    let mut table = Vec::new();
    table.extend_from_slice(&modern_user_slice(1, "1001", "Alice"));
    table.extend_from_slice(&modern_user_slice(2, "1002", "Bob"));

    let endpoint = DeviceEndpoint::new("scripted");
    let mut device = connect(
        vec![
            reply(Command::AckOk, SESSION, 0, &[]),
            reply(Command::Data, SESSION, 65534, &table),
        ],
        &endpoint,
    )
    .await
    .unwrap();

    let (users, diagnostics) = device.get_users().await.unwrap().collect_all();
    assert_eq!(users.len(), 2);
    assert_eq!(users[0].user_id, "1001");
    assert_eq!(users[1].name, "Bob");
    assert!(diagnostics.is_empty());
}

#[tokio::test]
async fn test_get_users_empty_table() {
    let endpoint = DeviceEndpoint::new("scripted");
    let mut device = connect(
        vec![
            reply(Command::AckOk, SESSION, 0, &[]),
            reply(Command::AckOk, SESSION, 65534, &[]),
        ],
        &endpoint,
    )
    .await
    .unwrap();

    let (users, diagnostics) = device.get_users().await.unwrap().collect_all();
    assert!(users.is_empty());
    assert!(diagnostics.is_empty());
}

#[tokio::test]
async fn test_chunked_attendance_over_udp() {
    // 1025 legacy records: one full 16 KiB chunk plus a 16-byte tail
    let mut log = Vec::new();
    for uid in 1..=1025u16 {
        log.extend_from_slice(&legacy_attendance_slice(uid));
    }
    assert_eq!(log.len(), 16400);

    let mut announce = vec![0u8];
    announce.extend_from_slice(&(log.len() as u32).to_le_bytes());

    let endpoint = DeviceEndpoint::new("scripted").with_transport(TransportKind::Udp);
    let mut device = connect(
        vec![
            reply(Command::AckOk, SESSION, 0, &[]),
            // Bulk request announces the total
            reply(Command::PrepareData, SESSION, 65534, &announce),
            // First read-buffer request covers 16384 bytes
            reply(Command::Data, SESSION, 65535, &log[..16384]),
            // Second covers the tail
            reply(Command::Data, SESSION, 0, &log[16384..]),
            // Free-data ack
            reply(Command::AckOk, SESSION, 1, &[]),
        ],
        &endpoint,
    )
    .await
    .unwrap();

    let (records, diagnostics) = device.get_attendance().await.unwrap().collect_all();
    assert_eq!(records.len(), 1025);
    assert!(diagnostics.is_empty());
    assert_eq!(records[0].user_id, "1");
    assert_eq!(records[1024].uid, 1025);
    assert_eq!(records[0].timestamp.format("%Y-%m-%d %H:%M:%S").to_string(), "2024-03-15 08:30:00");
}

#[tokio::test]
async fn test_chunk_split_across_data_packets() {
    // One chunk request answered by two data packets
    let mut log = Vec::new();
    for uid in 1..=3u16 {
        log.extend_from_slice(&legacy_attendance_slice(uid));
    }

    let mut announce = vec![0u8];
    announce.extend_from_slice(&(log.len() as u32).to_le_bytes());

    let endpoint = DeviceEndpoint::new("scripted").with_transport(TransportKind::Udp);
    let mut device = connect(
        vec![
            reply(Command::AckOk, SESSION, 0, &[]),
            reply(Command::PrepareData, SESSION, 65534, &announce),
            reply(Command::Data, SESSION, 65535, &log[..16]),
            reply(Command::Data, SESSION, 65535, &log[16..]),
            reply(Command::AckOk, SESSION, 0, &[]),
        ],
        &endpoint,
    )
    .await
    .unwrap();

    let (records, _) = device.get_attendance().await.unwrap().collect_all();
    assert_eq!(records.len(), 3);
}

#[tokio::test]
async fn test_truncated_transfer_is_partial_data() {
    let endpoint = DeviceEndpoint::new("scripted").with_transport(TransportKind::Udp);

    let total: u32 = 16400;
    let mut announce = vec![0u8];
    announce.extend_from_slice(&total.to_le_bytes());

    let chunk = vec![0xAB; 16384];

    let mut device = connect(
        vec![
            reply(Command::AckOk, SESSION, 0, &[]),
            reply(Command::PrepareData, SESSION, 65534, &announce),
            reply(Command::Data, SESSION, 65535, &chunk),
            // The tail never arrives
            ScriptItem::Timeout,
        ],
        &endpoint,
    )
    .await
    .unwrap();

    let result = device.get_attendance().await;
    match result {
        Err(Error::PartialData { expected, received }) => {
            assert_eq!(expected, 16400);
            assert_eq!(received, 16384);
        }
        Err(other) => panic!("expected PartialData, got {other:?}"),
        Ok(_) => panic!("expected PartialData, got a complete scan"),
    }
}

#[tokio::test]
async fn test_connection_drop_mid_transfer_is_partial_data() {
    let endpoint = DeviceEndpoint::new("scripted").with_transport(TransportKind::Udp);

    let total: u32 = 16400;
    let mut announce = vec![0u8];
    announce.extend_from_slice(&total.to_le_bytes());

    let mut device = connect(
        vec![
            reply(Command::AckOk, SESSION, 0, &[]),
            reply(Command::PrepareData, SESSION, 65534, &announce),
            ScriptItem::Drop,
        ],
        &endpoint,
    )
    .await
    .unwrap();

    let result = device.get_attendance().await;
    assert!(matches!(
        result,
        Err(Error::PartialData { expected: 16400, received: 0 })
    ));
}

#[tokio::test]
async fn test_get_device_info() {
    let mut free_sizes = vec![0u8; 80];
    let mut set = |slot: usize, value: i32| {
        free_sizes[slot * 4..slot * 4 + 4].copy_from_slice(&value.to_le_bytes());
    };
    set(4, 12); // users
    set(6, 24); // fingers
    set(8, 1000); // records
    set(12, 3); // cards
    set(14, 2000); // finger capacity
    set(15, 3000); // user capacity
    set(16, 100_000); // record capacity
    set(17, 1976);
    set(18, 2988);
    set(19, 99_000);

    let endpoint = DeviceEndpoint::new("scripted");
    let mut device = connect(
        vec![
            reply(Command::AckOk, SESSION, 0, &[]),
            reply(Command::AckOk, SESSION, 65534, b"Ver 6.60 Apr 2019\0"),
            reply(Command::AckOk, SESSION, 65535, b"~Platform=ZMM210_TFT\0"),
            reply(Command::AckOk, SESSION, 0, b"~SerialNumber=0316144680030\0"),
            reply(Command::AckOk, SESSION, 1, &free_sizes),
        ],
        &endpoint,
    )
    .await
    .unwrap();

    let info = device.get_device_info().await.unwrap();
    assert_eq!(info.firmware_version, "Ver 6.60 Apr 2019");
    assert_eq!(info.platform, "ZMM210_TFT");
    assert_eq!(info.serial_number, "0316144680030");
    assert_eq!(info.user_count, 12);
    assert_eq!(info.record_count, 1000);
    assert_eq!(info.record_capacity, 100_000);
    assert_eq!(info.users_available, 2988);
}

#[tokio::test]
async fn test_device_info_cache_skips_second_query() {
    let mut free_sizes = vec![0u8; 80];
    free_sizes[16..20].copy_from_slice(&7i32.to_le_bytes()); // slot 4

    // The script only covers one info query; a second would time out
    let endpoint = DeviceEndpoint::new("scripted");
    let mut device = connect(
        vec![
            reply(Command::AckOk, SESSION, 0, &[]),
            reply(Command::AckOk, SESSION, 65534, b"Ver 6.60\0"),
            reply(Command::AckOk, SESSION, 65535, b"~Platform=ZMM210_TFT\0"),
            reply(Command::AckOk, SESSION, 0, b"~SerialNumber=001\0"),
            reply(Command::AckOk, SESSION, 1, &free_sizes),
        ],
        &endpoint,
    )
    .await
    .unwrap();

    let cache = MemoryInfoCache::new();
    let ttl = Duration::from_secs(60);

    let first = device.get_device_info_cached(&cache, ttl).await.unwrap();
    let second = device.get_device_info_cached(&cache, ttl).await.unwrap();

    assert_eq!(first.user_count, 7);
    assert_eq!(second, first);
}

#[tokio::test]
async fn test_extract_all_is_fail_soft() {
    let user = modern_user_slice(1, "1001", "Alice");

    let endpoint = DeviceEndpoint::new("scripted");
    let mut device = connect(
        vec![
            reply(Command::AckOk, SESSION, 0, &[]),
            // Device info: version query times out
            ScriptItem::Timeout,
            // Users succeed
            reply(Command::Data, SESSION, 65535, &user),
            // Attendance times out
            ScriptItem::Timeout,
        ],
        &endpoint,
    )
    .await
    .unwrap();

    let result = extract_all(&mut device).await;

    assert!(!result.is_complete());
    assert!(result.device_info.is_none());
    assert_eq!(result.users.len(), 1);
    assert!(result.attendance.is_empty());

    let failed: Vec<ExtractionStep> = result.failures.iter().map(|(s, _)| *s).collect();
    assert_eq!(failed, vec![ExtractionStep::DeviceInfo, ExtractionStep::Attendance]);
}

#[tokio::test]
async fn test_disconnect_tolerates_missing_exit_ack() {
    let endpoint = DeviceEndpoint::new("scripted");
    let mut device = connect(vec![reply(Command::AckOk, SESSION, 0, &[])], &endpoint)
        .await
        .unwrap();

    // No exit ack scripted; disconnect must still succeed
    device.disconnect().await.unwrap();
    assert!(!device.is_connected());
    assert_eq!(device.session_id(), 0);
}

#[tokio::test]
async fn test_operations_require_connection() {
    let endpoint = DeviceEndpoint::new("scripted");
    let mut device = connect(vec![reply(Command::AckOk, SESSION, 0, &[])], &endpoint)
        .await
        .unwrap();
    device.disconnect().await.unwrap();

    let result = device.get_users().await;
    assert!(matches!(result, Err(Error::NotConnected)));
}
