//! Protocol packet structure and encoding/decoding

use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::fmt;

use crate::{
    checksum::{self, ChecksumKind},
    command::Command,
    error::{Error, Result},
};

/// Protocol packet
///
/// # Packet Structure
///
/// ```text
/// ┌─────────────┬─────────────┬─────────────┬─────────────┬─────────────┐
/// │   Command   │  Checksum   │  SessionID  │  ReplyID    │   Payload   │
/// │   2 bytes   │   2 bytes   │   2 bytes   │   2 bytes   │   N bytes   │
/// │ (LE u16)    │  (LE u16)   │  (LE u16)   │  (LE u16)   │   (bytes)   │
/// └─────────────┴─────────────┴─────────────┴─────────────┴─────────────┘
/// ```
///
/// All multi-byte values are in little-endian format. On TCP this inner
/// packet travels inside an 8-byte magic-prefixed stream frame, which is
/// the transport layer's concern; UDP datagrams carry it bare.
///
/// # Examples
///
/// ```
/// use punchcard_core::{Packet, Command, ChecksumKind};
///
/// // Create a connection packet
/// let packet = Packet::new(Command::Connect, 0, 0);
/// let encoded = packet.encode(ChecksumKind::OnesComplement);
///
/// // Decode it back
/// let decoded = Packet::decode(encoded, ChecksumKind::OnesComplement).unwrap();
/// assert_eq!(packet.command, decoded.command);
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Packet {
    /// Command code
    pub command: Command,

    /// Session identifier (assigned by device on connect)
    pub session_id: u16,

    /// Reply number (increments per command in session)
    pub reply_id: u16,

    /// Packet payload (command-specific data)
    pub payload: Bytes,
}

impl Packet {
    /// Packet header size in bytes
    pub const HEADER_SIZE: usize = 8;

    /// Maximum payload size
    pub const MAX_PAYLOAD_SIZE: usize = 65535 - Self::HEADER_SIZE;

    /// Create a new packet with empty payload
    pub fn new(command: Command, session_id: u16, reply_id: u16) -> Self {
        Self {
            command,
            session_id,
            reply_id,
            payload: Bytes::new(),
        }
    }

    /// Create a packet with payload
    ///
    /// # Examples
    ///
    /// ```
    /// use punchcard_core::{Packet, Command};
    ///
    /// let payload = vec![1, 2, 3, 4];
    /// let packet = Packet::with_payload(Command::Auth, 1234, 65534, payload);
    /// assert_eq!(packet.payload.len(), 4);
    /// ```
    pub fn with_payload(
        command: Command,
        session_id: u16,
        reply_id: u16,
        payload: impl Into<Bytes>,
    ) -> Self {
        Self {
            command,
            session_id,
            reply_id,
            payload: payload.into(),
        }
    }

    /// Calculate checksum for this packet under the given variant
    pub fn checksum(&self, kind: ChecksumKind) -> u16 {
        checksum::calculate(
            kind,
            self.command.into(),
            self.session_id,
            self.reply_id,
            &self.payload,
        )
    }

    /// Encode packet to bytes
    ///
    /// # Examples
    ///
    /// ```
    /// use punchcard_core::{Packet, Command, ChecksumKind};
    ///
    /// let packet = Packet::new(Command::Connect, 0, 0);
    /// let bytes = packet.encode(ChecksumKind::OnesComplement);
    /// assert_eq!(bytes.len(), 8); // Header only
    /// ```
    pub fn encode(&self, kind: ChecksumKind) -> BytesMut {
        let total_size = Self::HEADER_SIZE + self.payload.len();
        let mut buf = BytesMut::with_capacity(total_size);

        // Encode header (little-endian)
        buf.put_u16_le(self.command.into());
        buf.put_u16_le(self.checksum(kind));
        buf.put_u16_le(self.session_id);
        buf.put_u16_le(self.reply_id);

        // Append payload
        buf.put_slice(&self.payload);

        buf
    }

    /// Decode packet from bytes
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Buffer is too short (< 8 bytes)
    /// - Checksum verification fails
    /// - Command code is invalid
    pub fn decode(mut buf: BytesMut, kind: ChecksumKind) -> Result<Self> {
        if buf.len() < Self::HEADER_SIZE {
            return Err(Error::PacketTooShort {
                expected: Self::HEADER_SIZE,
                actual: buf.len(),
            });
        }

        // Decode header
        let command_raw = buf.get_u16_le();
        let checksum_received = buf.get_u16_le();
        let session_id = buf.get_u16_le();
        let reply_id = buf.get_u16_le();

        let command = Command::try_from(command_raw)?;

        // Remaining bytes are payload
        let payload = buf.freeze();

        let packet = Self {
            command,
            session_id,
            reply_id,
            payload,
        };

        // Verify checksum
        let checksum_calculated = packet.checksum(kind);
        if checksum_calculated != checksum_received {
            tracing::trace!(
                packet = %hex::encode(&packet.payload[..packet.payload.len().min(32)]),
                "Checksum rejected packet"
            );
            return Err(Error::ChecksumMismatch {
                expected: checksum_calculated,
                received: checksum_received,
            });
        }

        Ok(packet)
    }

    /// Check if this is a response packet (ACK)
    pub fn is_response(&self) -> bool {
        self.command.is_response()
    }

    /// Check if this is a success response
    pub fn is_success(&self) -> bool {
        self.command.is_success()
    }

    /// Check if this is an error response
    pub fn is_error(&self) -> bool {
        self.command.is_error()
    }

    /// Get total packet size
    pub fn size(&self) -> usize {
        Self::HEADER_SIZE + self.payload.len()
    }
}

impl fmt::Debug for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Packet")
            .field("command", &self.command)
            .field("session_id", &format!("0x{:04X}", self.session_id))
            .field("reply_id", &format!("0x{:04X}", self.reply_id))
            .field("payload_len", &self.payload.len())
            .finish()
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Packet[{}](session={}, reply={}, len={})",
            self.command,
            self.session_id,
            self.reply_id,
            self.payload.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_packet_new() {
        let packet = Packet::new(Command::Connect, 0, 0);
        assert_eq!(packet.command, Command::Connect);
        assert_eq!(packet.session_id, 0);
        assert_eq!(packet.reply_id, 0);
        assert_eq!(packet.payload.len(), 0);
    }

    #[test]
    fn test_packet_encode_decode() {
        for kind in [ChecksumKind::OnesComplement, ChecksumKind::XorFold] {
            let original = Packet::with_payload(Command::Connect, 0, 0, vec![1, 2, 3, 4]);

            let encoded = original.encode(kind);
            let decoded = Packet::decode(encoded, kind).unwrap();

            assert_eq!(original.command, decoded.command);
            assert_eq!(original.session_id, decoded.session_id);
            assert_eq!(original.reply_id, decoded.reply_id);
            assert_eq!(original.payload, decoded.payload);
        }
    }

    #[test]
    fn test_packet_checksum_verification() {
        let packet = Packet::with_payload(Command::Data, 10, 65534, vec![0xAA, 0xBB]);
        let mut encoded = packet.encode(ChecksumKind::OnesComplement);

        // Corrupt one payload byte
        let last = encoded.len() - 1;
        encoded[last] ^= 0x01;

        let result = Packet::decode(encoded, ChecksumKind::OnesComplement);
        assert!(matches!(result, Err(Error::ChecksumMismatch { .. })));
    }

    #[test]
    fn test_packet_wrong_checksum_kind_rejected() {
        let packet = Packet::with_payload(Command::Data, 10, 0, vec![1, 2, 3, 4]);
        let encoded = packet.encode(ChecksumKind::OnesComplement);

        let result = Packet::decode(encoded, ChecksumKind::XorFold);
        assert!(matches!(result, Err(Error::ChecksumMismatch { .. })));
    }

    #[test]
    fn test_packet_too_short() {
        let buf = BytesMut::from(&[1, 2, 3][..]);
        let result = Packet::decode(buf, ChecksumKind::OnesComplement);

        assert!(matches!(result, Err(Error::PacketTooShort { .. })));
    }

    #[test]
    fn test_packet_empty() {
        let packet = Packet::new(Command::Connect, 0, 0);
        let encoded = packet.encode(ChecksumKind::OnesComplement);

        assert_eq!(encoded.len(), Packet::HEADER_SIZE);

        let decoded = Packet::decode(encoded, ChecksumKind::OnesComplement).unwrap();
        assert_eq!(decoded.payload.len(), 0);
    }

    #[test]
    fn test_packet_large_payload() {
        let payload = vec![0xAB; 1000];
        let packet = Packet::with_payload(Command::Auth, 100, 200, payload.clone());

        let encoded = packet.encode(ChecksumKind::OnesComplement);
        let decoded = Packet::decode(encoded, ChecksumKind::OnesComplement).unwrap();

        assert_eq!(decoded.payload.as_ref(), payload.as_slice());
    }

    #[test]
    fn test_is_response() {
        assert!(Packet::new(Command::AckOk, 0, 0).is_response());
        assert!(Packet::new(Command::AckError, 0, 0).is_response());
        assert!(!Packet::new(Command::Connect, 0, 0).is_response());
    }

    #[test]
    fn test_is_success() {
        assert!(Packet::new(Command::AckOk, 0, 0).is_success());
        assert!(Packet::new(Command::AckData, 0, 0).is_success());
        assert!(!Packet::new(Command::AckError, 0, 0).is_success());
    }
}
