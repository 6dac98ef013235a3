//! Transport layer for the terminal protocol
//!
//! Provides TCP/UDP communication with devices. TCP streams wrap every
//! packet in an 8-byte magic-prefixed frame; UDP datagrams carry the
//! packet bare. Both transports hand complete inner packets to the
//! caller, so the layers above never see the framing difference.

pub mod error;
pub mod tcp;
pub mod udp;

pub use error::{Error, Result};
pub use tcp::TcpTransport;
pub use udp::UdpTransport;

use std::time::Duration;

use async_trait::async_trait;
use bytes::BytesMut;

/// Transport trait for different communication methods
#[async_trait]
pub trait Transport: Send + Sync {
    /// Connect to device
    async fn connect(&mut self) -> Result<()>;

    /// Disconnect from device
    ///
    /// Must tolerate an already-broken socket.
    async fn disconnect(&mut self) -> Result<()>;

    /// Check if connected
    fn is_connected(&self) -> bool;

    /// Send one complete packet
    async fn send(&mut self, data: &[u8]) -> Result<()>;

    /// Receive one complete packet (bounded by `timeout` per read)
    async fn receive(&mut self, timeout: Duration) -> Result<BytesMut>;

    /// Get remote address
    fn remote_addr(&self) -> String;
}
