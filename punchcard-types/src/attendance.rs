//! Attendance punch records and the deduplication hash

use std::fmt;

use chrono::NaiveDateTime;
use serde::Serialize;
use sha2::{Digest, Sha256};

/// Attendance event status
///
/// The terminal classifies every punch with one of six codes. Anything
/// else is preserved as `Other` rather than dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PunchStatus {
    CheckOut,
    CheckIn,
    BreakOut,
    BreakIn,
    OvertimeIn,
    OvertimeOut,
    Other(u8),
}

impl PunchStatus {
    /// Raw status code as stored on the device
    pub fn code(self) -> u8 {
        match self {
            Self::CheckOut => 0,
            Self::CheckIn => 1,
            Self::BreakOut => 2,
            Self::BreakIn => 3,
            Self::OvertimeIn => 4,
            Self::OvertimeOut => 5,
            Self::Other(code) => code,
        }
    }
}

impl From<u8> for PunchStatus {
    fn from(code: u8) -> Self {
        match code {
            0 => Self::CheckOut,
            1 => Self::CheckIn,
            2 => Self::BreakOut,
            3 => Self::BreakIn,
            4 => Self::OvertimeIn,
            5 => Self::OvertimeOut,
            other => Self::Other(other),
        }
    }
}

impl fmt::Display for PunchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CheckOut => write!(f, "Check-Out"),
            Self::CheckIn => write!(f, "Check-In"),
            Self::BreakOut => write!(f, "Break-Out"),
            Self::BreakIn => write!(f, "Break-In"),
            Self::OvertimeIn => write!(f, "Overtime-In"),
            Self::OvertimeOut => write!(f, "Overtime-Out"),
            Self::Other(code) => write!(f, "Other({code})"),
        }
    }
}

/// One attendance punch, decoded from a fixed-width slice of the
/// attendance log
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttendanceRecord {
    /// Device-local slot number of the user who punched
    pub uid: u16,

    /// External user identifier
    pub user_id: String,

    /// Punch time on the terminal's wall clock
    pub timestamp: NaiveDateTime,

    /// Event status
    pub status: PunchStatus,

    /// Verification sub-type (fingerprint, card, password, ...)
    pub punch: u8,
}

impl AttendanceRecord {
    /// Stable deduplication key for this punch
    ///
    /// A pure function of (user_id, timestamp, status): re-extracting
    /// the same underlying event always yields the same hash.
    pub fn record_hash(&self) -> String {
        record_hash(&self.user_id, self.timestamp, self.status)
    }
}

impl fmt::Display for AttendanceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Punch[uid={}, id={}, {} {}]",
            self.uid,
            self.user_id,
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.status
        )
    }
}

/// Compute the deduplication hash for an attendance event
///
/// SHA-256 over `user_id|YYYY-MM-DD HH:MM:SS|status_code`, hex encoded.
/// Deterministic across extractions; two events collide only when all
/// three components are identical.
pub fn record_hash(user_id: &str, timestamp: NaiveDateTime, status: PunchStatus) -> String {
    let mut hasher = Sha256::new();
    hasher.update(user_id.as_bytes());
    hasher.update(b"|");
    hasher.update(timestamp.format("%Y-%m-%d %H:%M:%S").to_string().as_bytes());
    hasher.update(b"|");
    hasher.update([status.code()]);
    hex::encode(hasher.finalize())
}
