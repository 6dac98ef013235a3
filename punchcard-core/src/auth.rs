//! Commkey authentication scrambling
//!
//! When a terminal answers the handshake with CMD_ACK_UNAUTH, the numeric
//! device password must be scrambled together with the session_id before
//! it is sent in the CMD_AUTH payload. The scheme comes from the vendor's
//! commpro.c MakeKey routine.

use bytes::Bytes;

/// Create authentication key from password and session_id
///
/// # Algorithm
///
/// 1. Reverse bits of the password
/// 2. Add session_id to reversed password
/// 3. XOR with 'Z', 'K', 'S', 'O' bytes
/// 4. Swap the two 16-bit halves
/// 5. XOR with ticks value
///
/// # Arguments
///
/// * `password` - The commkey password (usually 0 for default)
/// * `session_id` - The session ID from the CMD_ACK_UNAUTH response
/// * `ticks` - Ticks value (default: 50)
///
/// # Returns
///
/// 4-byte authentication key to send in the CMD_AUTH payload
pub fn make_commkey(password: u32, session_id: u16, ticks: u8) -> Bytes {
    // Reverse bits of password
    let mut k: u32 = 0;
    for i in 0..32 {
        k <<= 1;
        if password & (1 << i) != 0 {
            k |= 1;
        }
    }

    k = k.wrapping_add(session_id as u32);

    // XOR with the vendor tag bytes
    let bytes = k.to_le_bytes();
    let xored = [
        bytes[0] ^ b'Z',
        bytes[1] ^ b'K',
        bytes[2] ^ b'S',
        bytes[3] ^ b'O',
    ];

    // Swap the two 16-bit halves
    let low = u16::from_le_bytes([xored[0], xored[1]]);
    let high = u16::from_le_bytes([xored[2], xored[3]]);

    let mut result = [0u8; 4];
    result[0..2].copy_from_slice(&high.to_le_bytes());
    result[2..4].copy_from_slice(&low.to_le_bytes());

    // Mix in the ticks byte; the third byte carries it verbatim
    result[0] ^= ticks;
    result[1] ^= ticks;
    result[2] = ticks;
    result[3] ^= ticks;

    Bytes::copy_from_slice(&result)
}
