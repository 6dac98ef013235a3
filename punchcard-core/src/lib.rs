//! # punchcard-core
//!
//! Core protocol implementation for networked attendance terminals.
//!
//! This crate provides the low-level protocol primitives:
//! - Packet structure and encoding/decoding
//! - Pluggable checksum calculation
//! - Command definitions
//! - Session state machine
//! - Commkey authentication scrambling
//! - Device profile (record widths, timestamp packing, checksum variant)

pub mod auth;
pub mod checksum;
pub mod command;
pub mod constants;
pub mod error;
pub mod packet;
pub mod profile;
pub mod session;

pub use auth::make_commkey;
pub use checksum::ChecksumKind;
pub use command::Command;
pub use error::{Error, Result};
pub use packet::Packet;
pub use profile::{DeviceProfile, TimestampFormat, TransportKind};
pub use session::{Session, SessionState};

/// Default device port
pub const DEFAULT_PORT: u16 = 4370;

/// Maximum packet size (64KB)
pub const MAX_PACKET_SIZE: usize = 65535;

/// Packet header size
pub const HEADER_SIZE: usize = 8;
