//! Full extraction orchestration
//!
//! One pass over a connected terminal: device info, users, attendance.
//! Each step is independent; a step that fails is recorded and the pass
//! moves on, so a flaky options query never costs the attendance pull.

use std::fmt;

use tracing::{error, info};

use punchcard_types::{AttendanceRecord, DeviceInfo, UserRecord};

use crate::device::Device;
use crate::error::Error;
use crate::parser::DecodeDiagnostic;

/// One step of the extraction pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionStep {
    DeviceInfo,
    Users,
    Attendance,
}

impl fmt::Display for ExtractionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeviceInfo => write!(f, "device info"),
            Self::Users => write!(f, "users"),
            Self::Attendance => write!(f, "attendance"),
        }
    }
}

/// Everything one extraction pass produced
#[derive(Debug, Default)]
pub struct ExtractionResult {
    pub device_info: Option<DeviceInfo>,
    pub users: Vec<UserRecord>,
    pub attendance: Vec<AttendanceRecord>,

    /// Slices skipped while decoding the user table
    pub user_diagnostics: Vec<DecodeDiagnostic>,

    /// Slices skipped while decoding the attendance log
    pub attendance_diagnostics: Vec<DecodeDiagnostic>,

    /// Steps that failed outright, with their errors
    pub failures: Vec<(ExtractionStep, Error)>,
}

impl ExtractionResult {
    /// True when every step succeeded
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// One-line account of the pass
    pub fn summary(&self) -> String {
        let mut line = format!(
            "{} users, {} attendance records",
            self.users.len(),
            self.attendance.len()
        );

        let skipped = self.user_diagnostics.len() + self.attendance_diagnostics.len();
        if skipped > 0 {
            line.push_str(&format!(", {skipped} slices skipped"));
        }

        if self.failures.is_empty() {
            line.push_str(" (complete)");
        } else {
            let failed: Vec<String> = self
                .failures
                .iter()
                .map(|(step, _)| step.to_string())
                .collect();
            line.push_str(&format!(" (failed: {})", failed.join(", ")));
        }

        line
    }
}

/// Run the full extraction pass against a connected device
///
/// Never fails as a whole: whatever each step produced is in the
/// result, and [`ExtractionResult::failures`] names what did not.
pub async fn extract_all(device: &mut Device) -> ExtractionResult {
    let mut result = ExtractionResult::default();

    info!("Starting full extraction");

    match device.get_device_info().await {
        Ok(info) => {
            info!(%info, "Device info extracted");
            result.device_info = Some(info);
        }
        Err(e) => {
            error!(error = %e, "Device info step failed");
            result.failures.push((ExtractionStep::DeviceInfo, e));
        }
    }

    match device.get_users().await {
        Ok(scan) => {
            let (users, diagnostics) = scan.collect_all();
            info!(count = users.len(), skipped = diagnostics.len(), "Users extracted");
            result.users = users;
            result.user_diagnostics = diagnostics;
        }
        Err(e) => {
            error!(error = %e, "User step failed");
            result.failures.push((ExtractionStep::Users, e));
        }
    }

    match device.get_attendance().await {
        Ok(scan) => {
            let (records, diagnostics) = scan.collect_all();
            info!(
                count = records.len(),
                skipped = diagnostics.len(),
                "Attendance extracted"
            );
            result.attendance = records;
            result.attendance_diagnostics = diagnostics;
        }
        Err(e) => {
            error!(error = %e, "Attendance step failed");
            result.failures.push((ExtractionStep::Attendance, e));
        }
    }

    info!("Extraction finished: {}", result.summary());
    result
}
