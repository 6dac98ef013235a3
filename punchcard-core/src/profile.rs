//! Device profile
//!
//! Record widths, timestamp packing and the checksum variant differ by
//! firmware generation. The profile is resolved once at connect time,
//! either configured explicitly or defaulted from the transport kind,
//! and threaded through dispatch and parsing. It is never re-derived
//! per call.

use crate::checksum::ChecksumKind;

/// Transport kind for a device endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    Tcp,
    Udp,
}

/// Timestamp packing scheme used in attendance records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimestampFormat {
    /// A single u32 packing second/minute/hour/day/month/year components
    #[default]
    PackedCalendar,

    /// Seconds elapsed since 2000-01-01 00:00:00 terminal time
    SecondsSince2000,
}

/// Per-firmware layout parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceProfile {
    /// Byte width of one user record in the bulk user table
    pub user_record_width: usize,

    /// Byte width of one attendance record in the bulk log
    pub attendance_record_width: usize,

    /// Timestamp packing scheme
    pub timestamp_format: TimestampFormat,

    /// Checksum variant
    pub checksum: ChecksumKind,
}

impl DeviceProfile {
    /// Profile for current-generation firmware (72-byte users,
    /// 40-byte attendance slices, epoch-offset timestamps)
    pub fn modern() -> Self {
        Self {
            user_record_width: 72,
            attendance_record_width: 40,
            timestamp_format: TimestampFormat::SecondsSince2000,
            checksum: ChecksumKind::OnesComplement,
        }
    }

    /// Profile for legacy firmware (28-byte users, 16-byte attendance
    /// slices, packed-calendar timestamps)
    pub fn legacy() -> Self {
        Self {
            user_record_width: 28,
            attendance_record_width: 16,
            timestamp_format: TimestampFormat::PackedCalendar,
            checksum: ChecksumKind::OnesComplement,
        }
    }

    /// Default profile for a transport kind, used when the caller does
    /// not configure one explicitly. Current-generation firmware speaks
    /// TCP; the UDP-only devices in the field are the legacy ones.
    pub fn for_transport(kind: TransportKind) -> Self {
        match kind {
            TransportKind::Tcp => Self::modern(),
            TransportKind::Udp => Self::legacy(),
        }
    }

    /// Override the checksum variant
    pub fn with_checksum(mut self, checksum: ChecksumKind) -> Self {
        self.checksum = checksum;
        self
    }

    /// Override the timestamp packing scheme
    pub fn with_timestamp_format(mut self, format: TimestampFormat) -> Self {
        self.timestamp_format = format;
        self
    }
}

impl Default for DeviceProfile {
    fn default() -> Self {
        Self::modern()
    }
}
