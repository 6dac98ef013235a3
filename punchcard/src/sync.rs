//! Record synchronization
//!
//! Terminals re-send their whole attendance log on every pull, so the
//! sync layer upserts by natural key instead of inserting blindly:
//! users key on their external id, attendance records on the hash of
//! (user, timestamp, status). Syncing the same pull twice changes
//! nothing.

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use punchcard_types::{AttendanceRecord, UserRecord};

use crate::error::Result;

/// Outcome of a single keyed upsert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    /// The key was new
    Inserted,
    /// The key existed and the row was refreshed
    Updated,
}

/// Destination for synced records
///
/// Implementations must be idempotent per key: upserting the same
/// record twice leaves one row.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert or refresh a user, keyed by external id
    async fn upsert_user(&self, user_id: &str, user: &UserRecord) -> Result<Upsert>;

    /// Insert or refresh an attendance record, keyed by its hash
    async fn upsert_attendance(
        &self,
        record_hash: &str,
        record: &AttendanceRecord,
    ) -> Result<Upsert>;
}

/// Tally of one sync pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub total: usize,
    pub inserted: usize,
    pub updated: usize,
    pub failed: usize,
}

impl SyncReport {
    fn tally(&mut self, outcome: Upsert) {
        match outcome {
            Upsert::Inserted => self.inserted += 1,
            Upsert::Updated => self.updated += 1,
        }
    }
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} records: {} inserted, {} updated, {} failed",
            self.total, self.inserted, self.updated, self.failed
        )
    }
}

/// Sync users into `store`, one upsert per record
///
/// A failed upsert is logged and counted; the pass continues.
pub async fn sync_users(store: &dyn RecordStore, users: &[UserRecord]) -> SyncReport {
    let mut report = SyncReport {
        total: users.len(),
        ..SyncReport::default()
    };

    for user in users {
        match store.upsert_user(&user.user_id, user).await {
            Ok(outcome) => report.tally(outcome),
            Err(e) => {
                warn!(user_id = %user.user_id, error = %e, "User upsert failed");
                report.failed += 1;
            }
        }
    }

    info!("User sync: {}", report);
    report
}

/// Sync attendance records into `store`, keyed by record hash
pub async fn sync_attendance(store: &dyn RecordStore, records: &[AttendanceRecord]) -> SyncReport {
    let mut report = SyncReport {
        total: records.len(),
        ..SyncReport::default()
    };

    for record in records {
        let hash = record.record_hash();
        match store.upsert_attendance(&hash, record).await {
            Ok(outcome) => report.tally(outcome),
            Err(e) => {
                warn!(
                    user_id = %record.user_id,
                    timestamp = %record.timestamp,
                    error = %e,
                    "Attendance upsert failed"
                );
                report.failed += 1;
            }
        }
    }

    info!("Attendance sync: {}", report);
    report
}

/// In-process [`RecordStore`] backed by mutexed maps
///
/// Suitable for tests and one-shot extraction runs; durable stores
/// implement the same trait against their own backend.
#[derive(Default)]
pub struct MemoryStore {
    users: Mutex<HashMap<String, UserRecord>>,
    attendance: Mutex<HashMap<String, AttendanceRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user_count(&self) -> usize {
        self.users.lock().len()
    }

    pub fn attendance_count(&self) -> usize {
        self.attendance.lock().len()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn upsert_user(&self, user_id: &str, user: &UserRecord) -> Result<Upsert> {
        let existed = self
            .users
            .lock()
            .insert(user_id.to_string(), user.clone())
            .is_some();

        debug!(user_id, existed, "User upserted");
        Ok(if existed { Upsert::Updated } else { Upsert::Inserted })
    }

    async fn upsert_attendance(
        &self,
        record_hash: &str,
        record: &AttendanceRecord,
    ) -> Result<Upsert> {
        let existed = self
            .attendance
            .lock()
            .insert(record_hash.to_string(), record.clone())
            .is_some();

        Ok(if existed { Upsert::Updated } else { Upsert::Inserted })
    }
}
