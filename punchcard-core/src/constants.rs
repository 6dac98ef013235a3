//! Protocol constants

/// Default connect and per-read timeout (seconds)
pub const DEFAULT_TIMEOUT: u64 = 5;

/// Maximum bulk-transfer chunk per continuation request on TCP
pub const MAX_CHUNK_TCP: usize = 0xFFC0;

/// Maximum bulk-transfer chunk per continuation request on UDP
pub const MAX_CHUNK_UDP: usize = 16384;

/// Ticks value mixed into the commkey scramble
pub const COMMKEY_TICKS: u8 = 50;

/// Data table selectors (sent inside CMD_PREPARE_BUFFER)
pub mod data_types {
    /// Attendance log
    pub const FCT_ATTLOG: i32 = 1;

    /// Fingerprint template
    pub const FCT_FINGERTMP: i32 = 2;

    /// Operation log
    pub const FCT_OPLOG: i32 = 4;

    /// User record
    pub const FCT_USER: i32 = 5;
}
