//! File export
//!
//! Writes an extraction result out as CSV and pretty JSON, plus a short
//! text summary, under a caller-chosen directory. File names carry a
//! timestamp so repeated runs never clobber each other.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::info;

use punchcard_types::{AttendanceRecord, UserRecord};

use crate::orchestrator::ExtractionResult;

/// Write `result` out as CSV, JSON, and a summary file
///
/// Creates `dir` if needed. Returns the paths written. Tables that came
/// back empty still produce files with a header row, so downstream
/// pipelines always find the artifacts they expect.
pub fn export_extraction(dir: impl AsRef<Path>, result: &ExtractionResult) -> io::Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;

    let stamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
    let mut written = Vec::new();

    let path = dir.join(format!("users_{stamp}.csv"));
    fs::write(&path, users_csv(&result.users))?;
    written.push(path);

    let path = dir.join(format!("users_{stamp}.json"));
    fs::write(&path, serde_json::to_string_pretty(&result.users)?)?;
    written.push(path);

    let path = dir.join(format!("attendance_{stamp}.csv"));
    fs::write(&path, attendance_csv(&result.attendance))?;
    written.push(path);

    let path = dir.join(format!("attendance_{stamp}.json"));
    fs::write(&path, serde_json::to_string_pretty(&result.attendance)?)?;
    written.push(path);

    let path = dir.join(format!("summary_{stamp}.txt"));
    fs::write(&path, summary_text(result))?;
    written.push(path);

    info!(dir = %dir.display(), files = written.len(), "Extraction exported");
    Ok(written)
}

/// Render the user table as CSV
pub fn users_csv(users: &[UserRecord]) -> String {
    let mut out = String::from("UID,User ID,Name,Privilege,Password,Group ID,Card\n");

    for user in users {
        out.push_str(&format!(
            "{},{},{},{},{},{},{}\n",
            user.uid,
            csv_field(&user.user_id),
            csv_field(&user.name),
            user.privilege,
            csv_field(&user.password),
            user.group_id,
            user.card,
        ));
    }

    out
}

/// Render the attendance log as CSV
pub fn attendance_csv(records: &[AttendanceRecord]) -> String {
    let mut out = String::from("UID,User ID,Date,Time,Timestamp,Status,Punch\n");

    for record in records {
        out.push_str(&format!(
            "{},{},{},{},{},{},{}\n",
            record.uid,
            csv_field(&record.user_id),
            record.timestamp.format("%Y-%m-%d"),
            record.timestamp.format("%H:%M:%S"),
            record.timestamp.format("%Y-%m-%d %H:%M:%S"),
            record.status,
            record.punch,
        ));
    }

    out
}

fn summary_text(result: &ExtractionResult) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "Extraction at {}\n",
        Local::now().format("%Y-%m-%d %H:%M:%S")
    ));
    out.push_str(&format!("{}\n", result.summary()));

    if let Some(info) = &result.device_info {
        out.push_str(&format!("\n{info}\n"));
    }

    for (step, error) in &result.failures {
        out.push_str(&format!("\nFailed step {step}: {error}\n"));
    }

    out
}

/// Quote a field when it contains a delimiter, quote, or newline
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
