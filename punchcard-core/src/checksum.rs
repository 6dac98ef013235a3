//! Packet checksum algorithms
//!
//! Checksums cover the header (with the checksum field zeroed) plus the
//! payload, read as little-endian 16-bit words:
//!
//! `[cmd_lo, cmd_hi, 0, 0, sess_lo, sess_hi, reply_lo, reply_hi, ...payload]`
//!
//! Firmware generations differ in how the words are folded, so the
//! variant is carried on the device profile rather than hardcoded.

use tracing::trace;

/// Checksum variant, selected by the device profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChecksumKind {
    /// Sum 16-bit words, fold into 16 bits, ones-complement the result
    #[default]
    OnesComplement,

    /// XOR 16-bit words, complement the result
    XorFold,
}

/// Calculate a packet checksum
///
/// # Examples
///
/// ```
/// use punchcard_core::checksum::{calculate, ChecksumKind};
///
/// let checksum = calculate(ChecksumKind::OnesComplement, 1000, 0, 0, &[]);
/// println!("Checksum: 0x{:04X}", checksum);
/// ```
pub fn calculate(
    kind: ChecksumKind,
    command: u16,
    session_id: u16,
    reply_id: u16,
    payload: &[u8],
) -> u16 {
    // Build complete buffer with the checksum field zeroed
    let mut buf = Vec::with_capacity(8 + payload.len());
    buf.extend_from_slice(&command.to_le_bytes());
    buf.extend_from_slice(&[0, 0]);
    buf.extend_from_slice(&session_id.to_le_bytes());
    buf.extend_from_slice(&reply_id.to_le_bytes());
    buf.extend_from_slice(payload);

    let checksum = match kind {
        ChecksumKind::OnesComplement => ones_complement(&buf),
        ChecksumKind::XorFold => xor_fold(&buf),
    };

    trace!(
        ?kind,
        command = command,
        session_id = session_id,
        reply_id = reply_id,
        payload_len = payload.len(),
        checksum = format!("0x{:04X}", checksum),
        "Calculated checksum"
    );

    checksum
}

/// Verify a received checksum
pub fn verify(
    kind: ChecksumKind,
    command: u16,
    session_id: u16,
    reply_id: u16,
    payload: &[u8],
    expected: u16,
) -> bool {
    calculate(kind, command, session_id, reply_id, payload) == expected
}

fn ones_complement(buf: &[u8]) -> u16 {
    let mut sum: u32 = 0;

    for chunk in buf.chunks(2) {
        let word = if chunk.len() == 2 {
            u16::from_le_bytes([chunk[0], chunk[1]]) as u32
        } else {
            // Odd trailing byte - low byte of a final word
            chunk[0] as u32
        };

        sum = sum.wrapping_add(word);
    }

    // Fold carries back into 16 bits
    while sum > 0xFFFF {
        sum = (sum & 0xFFFF) + (sum >> 16);
    }

    !(sum as u16)
}

fn xor_fold(buf: &[u8]) -> u16 {
    let mut acc: u16 = 0;

    for chunk in buf.chunks(2) {
        let word = if chunk.len() == 2 {
            u16::from_le_bytes([chunk[0], chunk[1]])
        } else {
            chunk[0] as u16
        };

        acc ^= word;
    }

    !acc
}
