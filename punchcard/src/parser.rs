//! Fixed-width record parsing
//!
//! Bulk buffers are arrays of fixed-width slices whose layout depends on
//! the firmware profile. A slice that cannot be decoded (uid 0 marks an
//! empty slot; a garbage timestamp marks corruption) is skipped and
//! recorded as a diagnostic. One bad slice never aborts a scan.

use std::fmt;

use byteorder::{ByteOrder, LittleEndian};
use bytes::Bytes;
use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use tracing::{trace, warn};

use punchcard_core::{DeviceProfile, TimestampFormat};
use punchcard_types::{AttendanceRecord, Privilege, PunchStatus, UserRecord};

/// One skipped slice, with enough detail to diagnose a profile mismatch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeDiagnostic {
    /// Slice index within the buffer
    pub index: usize,

    /// Byte offset of the slice
    pub offset: usize,

    /// Why the slice was skipped
    pub reason: String,
}

impl fmt::Display for DecodeDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slice {} at byte {}: {}", self.index, self.offset, self.reason)
    }
}

/// Drop the leading u32 size prefix some firmware prepends to bulk
/// buffers, when it matches the remaining length
pub(crate) fn strip_size_prefix(buf: Bytes) -> Bytes {
    if buf.len() >= 4 {
        let prefix = LittleEndian::read_u32(&buf[0..4]) as usize;
        if prefix == buf.len() - 4 {
            return buf.slice(4..);
        }
    }
    buf
}

/// Lazy scan over a bulk user buffer
///
/// Decodes one record per `next()`; skipped slices accumulate as
/// diagnostics retrievable after the scan.
pub struct UserScan {
    buf: Bytes,
    profile: DeviceProfile,
    index: usize,
    count: usize,
    diagnostics: Vec<DecodeDiagnostic>,
}

impl UserScan {
    pub(crate) fn new(buf: Bytes, profile: DeviceProfile) -> Self {
        let width = profile.user_record_width;
        let (count, diagnostics) = scan_bounds(&buf, width, "user");
        Self { buf, profile, index: 0, count, diagnostics }
    }

    /// Diagnostics collected so far
    pub fn diagnostics(&self) -> &[DecodeDiagnostic] {
        &self.diagnostics
    }

    /// Drain the scan into records plus all diagnostics
    pub fn collect_all(mut self) -> (Vec<UserRecord>, Vec<DecodeDiagnostic>) {
        let records: Vec<UserRecord> = self.by_ref().collect();
        (records, self.diagnostics)
    }
}

impl Iterator for UserScan {
    type Item = UserRecord;

    fn next(&mut self) -> Option<UserRecord> {
        while self.index < self.count {
            let i = self.index;
            self.index += 1;

            let width = self.profile.user_record_width;
            let offset = i * width;
            let slice = &self.buf[offset..offset + width];

            match decode_user(slice, width) {
                Ok(record) => return Some(record),
                Err(reason) => {
                    trace!(index = i, %reason, "Skipping user slice");
                    self.diagnostics.push(DecodeDiagnostic { index: i, offset, reason });
                }
            }
        }
        None
    }
}

/// Lazy scan over a bulk attendance buffer
pub struct AttendanceScan {
    buf: Bytes,
    profile: DeviceProfile,
    index: usize,
    count: usize,
    diagnostics: Vec<DecodeDiagnostic>,
}

impl AttendanceScan {
    pub(crate) fn new(buf: Bytes, profile: DeviceProfile) -> Self {
        let width = profile.attendance_record_width;
        let (count, diagnostics) = scan_bounds(&buf, width, "attendance");
        Self { buf, profile, index: 0, count, diagnostics }
    }

    /// Diagnostics collected so far
    pub fn diagnostics(&self) -> &[DecodeDiagnostic] {
        &self.diagnostics
    }

    /// Drain the scan into records plus all diagnostics
    pub fn collect_all(mut self) -> (Vec<AttendanceRecord>, Vec<DecodeDiagnostic>) {
        let records: Vec<AttendanceRecord> = self.by_ref().collect();
        (records, self.diagnostics)
    }
}

impl Iterator for AttendanceScan {
    type Item = AttendanceRecord;

    fn next(&mut self) -> Option<AttendanceRecord> {
        while self.index < self.count {
            let i = self.index;
            self.index += 1;

            let width = self.profile.attendance_record_width;
            let offset = i * width;
            let slice = &self.buf[offset..offset + width];

            match decode_attendance(slice, width, self.profile.timestamp_format) {
                Ok(record) => return Some(record),
                Err(reason) => {
                    trace!(index = i, %reason, "Skipping attendance slice");
                    self.diagnostics.push(DecodeDiagnostic { index: i, offset, reason });
                }
            }
        }
        None
    }
}

/// Whole-record count for a buffer, warning when the length is not an
/// exact multiple of the record width (a profile mismatch symptom)
fn scan_bounds(buf: &Bytes, width: usize, table: &str) -> (usize, Vec<DecodeDiagnostic>) {
    let count = buf.len() / width;
    let remainder = buf.len() % width;
    let mut diagnostics = Vec::new();

    if remainder != 0 {
        warn!(
            table,
            remainder,
            width,
            "Buffer is not a whole number of records; profile may not match firmware"
        );
        diagnostics.push(DecodeDiagnostic {
            index: count,
            offset: count * width,
            reason: format!("{remainder} trailing bytes beyond the last whole record"),
        });
    }

    (count, diagnostics)
}

fn decode_user(slice: &[u8], width: usize) -> std::result::Result<UserRecord, String> {
    let uid = LittleEndian::read_u16(&slice[0..2]);
    if uid == 0 {
        return Err("empty slot (uid 0)".into());
    }

    match width {
        // Modern layout
        72 => Ok(UserRecord {
            uid,
            user_id: string_field(&slice[48..57]),
            name: string_field(&slice[11..35]),
            privilege: Privilege::from(slice[2]),
            password: string_field(&slice[3..11]),
            group_id: slice[39],
            card: LittleEndian::read_u32(&slice[35..39]),
        }),
        // Legacy layout: the external id is numeric, not a string field
        28 => Ok(UserRecord {
            uid,
            user_id: LittleEndian::read_u32(&slice[24..28]).to_string(),
            name: string_field(&slice[8..16]),
            privilege: Privilege::from(slice[2]),
            password: string_field(&slice[3..8]),
            group_id: slice[21],
            card: LittleEndian::read_u32(&slice[16..20]),
        }),
        other => Err(format!("unsupported user record width {other}")),
    }
}

fn decode_attendance(
    slice: &[u8],
    width: usize,
    format: TimestampFormat,
) -> std::result::Result<AttendanceRecord, String> {
    let uid = LittleEndian::read_u16(&slice[0..2]);
    if uid == 0 {
        return Err("empty slot (uid 0)".into());
    }

    let (user_id, status, raw_timestamp, punch) = match width {
        40 => (
            string_field(&slice[2..26]),
            slice[26],
            LittleEndian::read_u32(&slice[27..31]),
            slice[31],
        ),
        16 => (
            String::new(),
            slice[2],
            LittleEndian::read_u32(&slice[4..8]),
            slice[3],
        ),
        other => return Err(format!("unsupported attendance record width {other}")),
    };

    let timestamp = decode_timestamp(raw_timestamp, format)
        .ok_or_else(|| format!("invalid timestamp 0x{raw_timestamp:08X}"))?;

    // Legacy records carry no external id; fall back to the slot number
    let user_id = if user_id.is_empty() { uid.to_string() } else { user_id };

    Ok(AttendanceRecord {
        uid,
        user_id,
        timestamp,
        status: PunchStatus::from(status),
        punch,
    })
}

/// Unpack a raw timestamp field per the profile's packing scheme
///
/// Returns `None` when the decoded calendar fields are out of range
/// (e.g. a day that does not exist in its month).
pub fn decode_timestamp(raw: u32, format: TimestampFormat) -> Option<NaiveDateTime> {
    match format {
        TimestampFormat::PackedCalendar => {
            let mut t = raw;
            let second = t % 60;
            t /= 60;
            let minute = t % 60;
            t /= 60;
            let hour = t % 24;
            t /= 24;
            let day = t % 31 + 1;
            t /= 31;
            let month = t % 12 + 1;
            t /= 12;
            let year = 2000 + t;

            NaiveDate::from_ymd_opt(year as i32, month, day)?.and_hms_opt(hour, minute, second)
        }
        TimestampFormat::SecondsSince2000 => {
            let base = NaiveDate::from_ymd_opt(2000, 1, 1)?.and_hms_opt(0, 0, 0)?;
            base.checked_add_signed(TimeDelta::seconds(i64::from(raw)))
        }
    }
}

/// Take a fixed-length string field up to its first NUL
fn string_field(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).trim().to_string()
}
