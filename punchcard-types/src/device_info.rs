//! Device information structures

use std::fmt;

use serde::Serialize;

/// Device information
///
/// Aggregated from the version query, the option table and the
/// free-sizes counter block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    /// Firmware version string
    pub firmware_version: String,

    /// Platform name (e.g. "ZMM220_TFT")
    pub platform: String,

    /// Device serial number
    pub serial_number: String,

    /// Enrolled user count
    pub user_count: u32,

    /// Enrolled fingerprint count
    pub finger_count: u32,

    /// Stored attendance record count
    pub record_count: u32,

    /// Registered card count
    pub card_count: u32,

    /// Maximum user slots
    pub user_capacity: u32,

    /// Maximum fingerprint slots
    pub finger_capacity: u32,

    /// Maximum attendance record slots
    pub record_capacity: u32,

    /// Free user slots
    pub users_available: u32,

    /// Free fingerprint slots
    pub fingers_available: u32,

    /// Free attendance record slots
    pub records_available: u32,
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Device[SN: {}, FW: {}, platform: {}, users: {}/{}, records: {}/{}]",
            self.serial_number,
            self.firmware_version,
            self.platform,
            self.user_count,
            self.user_capacity,
            self.record_count,
            self.record_capacity,
        )
    }
}
