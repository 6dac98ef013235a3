//! Type definitions for punchcard
//!
//! Plain data records produced by terminal extraction. No protocol or
//! transport code lives here.

pub mod attendance;
pub mod device_info;
pub mod user;

pub use attendance::{record_hash, AttendanceRecord, PunchStatus};
pub use device_info::DeviceInfo;
pub use user::{Privilege, UserRecord};
