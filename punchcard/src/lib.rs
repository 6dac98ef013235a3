//! # punchcard
//!
//! Client for networked biometric time-and-attendance terminals.
//!
//! Talks the binary protocol on port 4370 over TCP or UDP: session
//! handshake with optional commkey authentication, chunked bulk
//! transfers for the user table and attendance log, fixed-width record
//! decoding per firmware profile, and a keyed sync layer that makes
//! repeated pulls idempotent.
//!
//! ## Quick start
//!
//! ```no_run
//! use punchcard::{extract_all, Device, DeviceEndpoint};
//!
//! #[tokio::main]
//! async fn main() -> punchcard::Result<()> {
//!     let endpoint = DeviceEndpoint::new("192.168.1.201").with_password(123456);
//!     let mut device = Device::connect(&endpoint).await?;
//!
//!     let result = extract_all(&mut device).await;
//!     println!("{}", result.summary());
//!
//!     device.disconnect().await?;
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod device;
pub mod endpoint;
pub mod error;
pub mod export;
pub mod orchestrator;
pub mod parser;
pub mod sync;

mod transfer;

pub use cache::{InfoCache, MemoryInfoCache};
pub use device::Device;
pub use endpoint::DeviceEndpoint;
pub use error::{Error, Result};
pub use export::{attendance_csv, export_extraction, users_csv};
pub use orchestrator::{extract_all, ExtractionResult, ExtractionStep};
pub use parser::{AttendanceScan, DecodeDiagnostic, UserScan};
pub use sync::{sync_attendance, sync_users, MemoryStore, RecordStore, SyncReport, Upsert};

// Re-exports from the layer crates
pub use punchcard_core::{
    ChecksumKind, Command, DeviceProfile, Packet, Session, TimestampFormat, TransportKind,
    DEFAULT_PORT,
};
pub use punchcard_transport::{TcpTransport, Transport, UdpTransport};
pub use punchcard_types::{
    record_hash, AttendanceRecord, DeviceInfo, Privilege, PunchStatus, UserRecord,
};
